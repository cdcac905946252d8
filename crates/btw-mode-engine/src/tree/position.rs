use super::{NodeId, Tree};

/// Where `other` sits relative to `node` in [`Tree::compare_document_position`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentPosition {
    Same,
    /// The nodes do not share a root (detached or removed)
    Disconnected,
    /// `other` is an ancestor of `node`
    Contains,
    /// `other` is a descendant of `node`
    ContainedBy,
    /// `other` comes before `node` in document order
    Preceding,
    /// `other` comes after `node` in document order
    Following,
}

impl Tree {
    /// Document-order comparison, DOM `compareDocumentPosition` style
    pub fn compare_document_position(&self, node: NodeId, other: NodeId) -> DocumentPosition {
        if node == other {
            return if self.kind(node).is_some() {
                DocumentPosition::Same
            } else {
                DocumentPosition::Disconnected
            };
        }
        let (Some(node_path), Some(other_path)) = (self.path_from_top(node), self.path_from_top(other))
        else {
            return DocumentPosition::Disconnected;
        };
        if node_path[0] != other_path[0] {
            return DocumentPosition::Disconnected;
        }
        if other_path.len() < node_path.len() && node_path[other_path.len() - 1] == other {
            return DocumentPosition::Contains;
        }
        if node_path.len() < other_path.len() && other_path[node_path.len() - 1] == node {
            return DocumentPosition::ContainedBy;
        }

        let split = node_path
            .iter()
            .zip(other_path.iter())
            .take_while(|(a, b)| a == b)
            .count();
        // split >= 1 since both paths share the top node
        let parent = node_path[split - 1];
        let siblings = self.children(parent);
        let node_branch = siblings.iter().position(|&c| c == node_path[split]);
        let other_branch = siblings.iter().position(|&c| c == other_path[split]);
        match (node_branch, other_branch) {
            (Some(a), Some(b)) if b < a => DocumentPosition::Preceding,
            (Some(_), Some(_)) => DocumentPosition::Following,
            _ => DocumentPosition::Disconnected,
        }
    }

    /// Path from the topmost ancestor down to `node`, inclusive
    fn path_from_top(&self, node: NodeId) -> Option<Vec<NodeId>> {
        self.kind(node)?;
        let mut path: Vec<NodeId> = std::iter::once(node).chain(self.ancestors(node)).collect();
        path.reverse();
        Some(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> (Tree, NodeId, NodeId, NodeId, NodeId) {
        // root
        // ├── a
        // │   └── a1
        // └── b
        let mut tree = Tree::new("root");
        let root = tree.root();
        let a = tree.create_element("a");
        let a1 = tree.create_element("a1");
        let b = tree.create_element("b");
        tree.append_child(root, a);
        tree.append_child(a, a1);
        tree.append_child(root, b);
        (tree, root, a, a1, b)
    }

    #[test]
    fn test_siblings() {
        let (tree, _root, a, _a1, b) = doc();
        assert_eq!(tree.compare_document_position(a, b), DocumentPosition::Following);
        assert_eq!(tree.compare_document_position(b, a), DocumentPosition::Preceding);
    }

    #[test]
    fn test_cousins() {
        let (tree, _root, _a, a1, b) = doc();
        assert_eq!(tree.compare_document_position(a1, b), DocumentPosition::Following);
        assert_eq!(tree.compare_document_position(b, a1), DocumentPosition::Preceding);
    }

    #[test]
    fn test_ancestry() {
        let (tree, root, a, a1, _b) = doc();
        assert_eq!(tree.compare_document_position(a1, a), DocumentPosition::Contains);
        assert_eq!(tree.compare_document_position(root, a1), DocumentPosition::ContainedBy);
        assert_eq!(tree.compare_document_position(a, a), DocumentPosition::Same);
    }

    #[test]
    fn test_disconnected() {
        let (mut tree, _root, a, _a1, b) = doc();
        let loose = tree.create_element("loose");
        assert_eq!(tree.compare_document_position(a, loose), DocumentPosition::Disconnected);

        tree.remove(b);
        assert_eq!(tree.compare_document_position(a, b), DocumentPosition::Disconnected);
    }
}
