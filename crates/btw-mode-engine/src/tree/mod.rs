//! # Document Tree
//!
//! An arena-backed, DOM-like tree standing in for the host editor's live
//! document. Decoration routines observe and edit it only through the
//! mutation primitives below; each call is atomic and immediately visible.
//!
//! ## Roles
//!
//! Every node carries a [`Role`]:
//!
//! - **`Data`**: part of the XML data model (elements and text of the article)
//! - **`Phantom`**: decoration the data model does not own (headings, link
//!   text, affordance controls). Skipped together with its subtree when the
//!   data view of the tree is computed.
//! - **`Wrapper`**: decoration that *contains* data nodes (collapsible
//!   widgets). Transparent in the data view: its data descendants belong to
//!   the wrapper's own data parent.
//!
//! ## Identity
//!
//! [`NodeId`]s are arena indices and are never reused, so a removed node's id
//! stays dead and [`Tree::is_live`] can guard deferred work against it.

pub mod position;
pub mod xml;

use std::fmt;

pub use position::DocumentPosition;

/// Arena index of a node in a [`Tree`]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Whether a node belongs to the data model or to decoration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Data,
    Phantom,
    Wrapper,
}

/// Element payload
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ElementData {
    /// Qualified element name, e.g. `btw:sense`
    pub name: String,
    /// Attributes in document order, qualified names (`xml:id`, `target`)
    pub attrs: Vec<(String, String)>,
    /// Decoration classes (`head`, `_phantom`, `_va_instantiator`, ...)
    pub classes: Vec<String>,
    /// Render-time identifier (`BTW-S.1`), distinct from the persisted `xml:id`
    pub id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Element(ElementData),
    Text(String),
}

#[derive(Debug, Clone)]
struct Slot {
    kind: NodeKind,
    role: Role,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// The live document tree
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Option<Slot>>,
    root: NodeId,
}

impl Tree {
    /// Create a tree holding a single data element as its root
    pub fn new(root_name: &str) -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            root: NodeId(0),
        };
        tree.root = tree.create_element(root_name);
        tree
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    fn slot(&self, node: NodeId) -> Option<&Slot> {
        self.nodes.get(node.0).and_then(|s| s.as_ref())
    }

    fn slot_mut(&mut self, node: NodeId) -> Option<&mut Slot> {
        self.nodes.get_mut(node.0).and_then(|s| s.as_mut())
    }

    fn push(&mut self, kind: NodeKind, role: Role) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Some(Slot {
            kind,
            role,
            parent: None,
            children: Vec::new(),
        }));
        id
    }

    // ============ Creation ============

    /// Create a detached data element
    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.push(
            NodeKind::Element(ElementData {
                name: name.to_string(),
                ..Default::default()
            }),
            Role::Data,
        )
    }

    /// Create a detached decoration element carrying the given classes
    pub fn create_phantom(&mut self, name: &str, classes: &[&str]) -> NodeId {
        self.create_decoration(name, classes, Role::Phantom)
    }

    /// Create a detached wrapper element (transparent in the data view)
    pub fn create_wrapper(&mut self, name: &str, classes: &[&str]) -> NodeId {
        self.create_decoration(name, classes, Role::Wrapper)
    }

    fn create_decoration(&mut self, name: &str, classes: &[&str], role: Role) -> NodeId {
        let mut all: Vec<String> = classes.iter().map(|c| c.to_string()).collect();
        if role == Role::Phantom && !all.iter().any(|c| c == "_phantom") {
            all.push("_phantom".to_string());
        }
        self.push(
            NodeKind::Element(ElementData {
                name: name.to_string(),
                classes: all,
                ..Default::default()
            }),
            role,
        )
    }

    /// Create a detached data text node
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeKind::Text(text.to_string()), Role::Data)
    }

    /// Create a phantom element with a single text child
    pub fn create_phantom_text(&mut self, name: &str, classes: &[&str], text: &str) -> NodeId {
        let el = self.create_phantom(name, classes);
        let t = self.push(NodeKind::Text(text.to_string()), Role::Phantom);
        self.append_child(el, t);
        el
    }

    // ============ Structure queries ============

    pub fn kind(&self, node: NodeId) -> Option<&NodeKind> {
        self.slot(node).map(|s| &s.kind)
    }

    pub fn role(&self, node: NodeId) -> Option<Role> {
        self.slot(node).map(|s| s.role)
    }

    pub fn element(&self, node: NodeId) -> Option<&ElementData> {
        match self.kind(node) {
            Some(NodeKind::Element(data)) => Some(data),
            _ => None,
        }
    }

    fn element_mut(&mut self, node: NodeId) -> Option<&mut ElementData> {
        match self.slot_mut(node).map(|s| &mut s.kind) {
            Some(NodeKind::Element(data)) => Some(data),
            _ => None,
        }
    }

    pub fn is_element(&self, node: NodeId) -> bool {
        self.element(node).is_some()
    }

    /// Element name, `None` for text or dead nodes
    pub fn name(&self, node: NodeId) -> Option<&str> {
        self.element(node).map(|e| e.name.as_str())
    }

    pub fn is_phantom(&self, node: NodeId) -> bool {
        self.role(node) == Some(Role::Phantom)
    }

    pub fn is_data(&self, node: NodeId) -> bool {
        self.role(node) == Some(Role::Data)
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.slot(node).and_then(|s| s.parent)
    }

    /// Direct children, decoration included
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.slot(node).map(|s| s.children.as_slice()).unwrap_or(&[])
    }

    /// Index of `node` among its parent's direct children
    pub fn index_in_parent(&self, node: NodeId) -> Option<usize> {
        let parent = self.parent(node)?;
        self.children(parent).iter().position(|&c| c == node)
    }

    /// Children in the data view: phantoms skipped, wrappers flattened
    pub fn data_children(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_data_children(node, &mut out);
        out
    }

    fn collect_data_children(&self, node: NodeId, out: &mut Vec<NodeId>) {
        for &child in self.children(node) {
            match self.role(child) {
                Some(Role::Data) => out.push(child),
                Some(Role::Wrapper) => self.collect_data_children(child, out),
                _ => {}
            }
        }
    }

    /// Data element children only (text skipped)
    pub fn data_element_children(&self, node: NodeId) -> Vec<NodeId> {
        self.data_children(node)
            .into_iter()
            .filter(|&c| self.is_element(c))
            .collect()
    }

    /// Nearest ancestor in the data view, skipping wrappers
    pub fn data_parent(&self, node: NodeId) -> Option<NodeId> {
        let mut current = self.parent(node);
        while let Some(p) = current {
            if self.is_data(p) {
                return Some(p);
            }
            current = self.parent(p);
        }
        None
    }

    /// The direct child of `ancestor` that holds `node` (possibly `node` itself)
    pub fn holder_in(&self, ancestor: NodeId, node: NodeId) -> Option<NodeId> {
        let mut current = node;
        loop {
            let parent = self.parent(current)?;
            if parent == ancestor {
                return Some(current);
            }
            current = parent;
        }
    }

    /// Ancestors from the parent upward
    pub fn ancestors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(node), move |&n| self.parent(n))
    }

    /// First node matching `pred`, starting at `node` itself and walking up
    pub fn closest(&self, node: NodeId, pred: impl Fn(&Tree, NodeId) -> bool) -> Option<NodeId> {
        std::iter::once(node)
            .chain(self.ancestors(node))
            .find(|&n| pred(self, n))
    }

    /// Preorder (document order) walk of `node` and its descendants
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if self.slot(node).is_none() {
            return out;
        }
        let mut stack = vec![node];
        while let Some(n) = stack.pop() {
            out.push(n);
            for &child in self.children(n).iter().rev() {
                stack.push(child);
            }
        }
        out
    }

    /// Data elements of the subtree in document order, decoration excluded
    pub fn data_descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![node];
        while let Some(n) = stack.pop() {
            if self.is_data(n) && self.is_element(n) {
                out.push(n);
            }
            for &child in self.data_children(n).iter().rev() {
                stack.push(child);
            }
        }
        out
    }

    /// Whether the node is still reachable from the root
    pub fn is_live(&self, node: NodeId) -> bool {
        if self.slot(node).is_none() {
            return false;
        }
        node == self.root || self.ancestors(node).any(|a| a == self.root)
    }

    /// Concatenated text of the subtree, decoration included
    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        for n in self.descendants(node) {
            if let Some(NodeKind::Text(t)) = self.kind(n) {
                out.push_str(t);
            }
        }
        out
    }

    /// Concatenated text of the data view of the subtree
    pub fn data_text(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.collect_data_text(node, &mut out);
        out
    }

    fn collect_data_text(&self, node: NodeId, out: &mut String) {
        match self.kind(node) {
            Some(NodeKind::Text(t)) => out.push_str(t),
            Some(NodeKind::Element(_)) => {
                for child in self.data_children(node) {
                    self.collect_data_text(child, out);
                }
            }
            None => {}
        }
    }

    // ============ Attributes, ids and classes ============

    pub fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        self.element(node)?
            .attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attr(&mut self, node: NodeId, name: &str, value: &str) {
        if let Some(el) = self.element_mut(node) {
            match el.attrs.iter_mut().find(|(k, _)| k == name) {
                Some((_, v)) => *v = value.to_string(),
                None => el.attrs.push((name.to_string(), value.to_string())),
            }
        }
    }

    /// Render-time identifier
    pub fn id(&self, node: NodeId) -> Option<&str> {
        self.element(node)?.id.as_deref()
    }

    pub fn set_id(&mut self, node: NodeId, id: &str) {
        if let Some(el) = self.element_mut(node) {
            el.id = Some(id.to_string());
        }
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.element(node)
            .is_some_and(|e| e.classes.iter().any(|c| c == class))
    }

    pub fn add_class(&mut self, node: NodeId, class: &str) {
        if let Some(el) = self.element_mut(node)
            && !el.classes.iter().any(|c| c == class)
        {
            el.classes.push(class.to_string());
        }
    }

    pub fn remove_classes_with_prefix(&mut self, node: NodeId, prefix: &str) {
        if let Some(el) = self.element_mut(node) {
            el.classes.retain(|c| !c.starts_with(prefix));
        }
    }

    /// Live element whose render id equals `id`
    pub fn find_by_id(&self, id: &str) -> Option<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .find(|&n| self.id(n) == Some(id))
    }

    /// Live data element carrying `name="value"`
    pub fn find_by_attr(&self, name: &str, value: &str) -> Option<NodeId> {
        self.data_descendants(self.root)
            .into_iter()
            .find(|&n| self.attr(n, name) == Some(value))
    }

    pub fn first_child_by_class(&self, node: NodeId, class: &str) -> Option<NodeId> {
        self.children(node)
            .iter()
            .copied()
            .find(|&c| self.has_class(c, class))
    }

    pub fn children_by_class(&self, node: NodeId, class: &str) -> Vec<NodeId> {
        self.children(node)
            .iter()
            .copied()
            .filter(|&c| self.has_class(c, class))
            .collect()
    }

    /// Remove every direct child carrying `class`; returns how many went
    pub fn remove_children_by_class(&mut self, node: NodeId, class: &str) -> usize {
        let doomed = self.children_by_class(node, class);
        for &child in &doomed {
            self.remove(child);
        }
        doomed.len()
    }

    /// Number of leading children that are editor chrome (`_start_wrapper`)
    pub fn leading_chrome_len(&self, node: NodeId) -> usize {
        self.children(node)
            .iter()
            .take_while(|&&c| self.has_class(c, "_start_wrapper"))
            .count()
    }

    // ============ Text ============

    pub fn text(&self, node: NodeId) -> Option<&str> {
        match self.kind(node) {
            Some(NodeKind::Text(t)) => Some(t),
            _ => None,
        }
    }

    /// Replace the text of a text node, or of the first text child of an element
    pub fn set_text(&mut self, node: NodeId, text: &str) {
        let target = if self.is_element(node) {
            self.children(node)
                .iter()
                .copied()
                .find(|&c| self.text(c).is_some())
        } else {
            Some(node)
        };
        match target {
            Some(t) => {
                if let Some(slot) = self.slot_mut(t) {
                    slot.kind = NodeKind::Text(text.to_string());
                }
            }
            None => {
                let role = self.role(node).unwrap_or(Role::Data);
                let t = self.push(NodeKind::Text(text.to_string()), role);
                self.append_child(node, t);
            }
        }
    }

    // ============ Mutation ============

    /// Append `child` as the last child of `parent`, detaching it first
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        let len = self.children(parent).len();
        self.insert_at(parent, len, child);
    }

    /// Insert `child` at `index` among `parent`'s direct children
    pub fn insert_at(&mut self, parent: NodeId, index: usize, child: NodeId) {
        if self.slot(parent).is_none() || self.slot(child).is_none() || parent == child {
            return;
        }
        self.detach(child);
        if let Some(slot) = self.slot_mut(parent) {
            let index = index.min(slot.children.len());
            slot.children.insert(index, child);
        }
        if let Some(slot) = self.slot_mut(child) {
            slot.parent = Some(parent);
        }
    }

    /// Insert `child` before `reference`, or append when `reference` is `None`
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
        self.detach(child);
        let index = reference
            .and_then(|r| self.children(parent).iter().position(|&c| c == r))
            .unwrap_or(self.children(parent).len());
        self.insert_at(parent, index, child);
    }

    /// Insert `child` right after `reference`
    pub fn insert_after(&mut self, reference: NodeId, child: NodeId) {
        if let Some(parent) = self.parent(reference) {
            self.detach(child);
            let index = self
                .index_in_parent(reference)
                .map(|i| i + 1)
                .unwrap_or(self.children(parent).len());
            self.insert_at(parent, index, child);
        }
    }

    /// Insert `child` so it becomes the data child at `data_index` of `parent`.
    ///
    /// `end` is the node before which end-of-content insertions go (editor
    /// chrome closing the element's editable contents).
    pub fn insert_data_child(
        &mut self,
        parent: NodeId,
        data_index: usize,
        child: NodeId,
        end: Option<NodeId>,
    ) {
        let reference = self
            .data_children(parent)
            .get(data_index)
            .and_then(|&c| self.holder_in(parent, c))
            .or(end);
        self.insert_before(parent, child, reference);
    }

    /// Unlink `node` from its parent without freeing it
    pub fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.parent(node) {
            if let Some(slot) = self.slot_mut(parent) {
                slot.children.retain(|&c| c != node);
            }
            if let Some(slot) = self.slot_mut(node) {
                slot.parent = None;
            }
        }
    }

    /// Detach and free `node` with its whole subtree; its ids stay dead
    pub fn remove(&mut self, node: NodeId) {
        if node == self.root {
            return;
        }
        self.detach(node);
        for n in self.descendants(node) {
            if let Some(slot) = self.nodes.get_mut(n.0) {
                *slot = None;
            }
        }
    }

    /// Put `new` where `old` is; `old` is detached but not freed
    pub fn replace(&mut self, old: NodeId, new: NodeId) {
        if let Some(parent) = self.parent(old) {
            self.detach(new);
            if let Some(index) = self.index_in_parent(old) {
                self.detach(old);
                self.insert_at(parent, index, new);
            }
        }
    }

    /// Move every child of `from` to the end of `to`
    pub fn move_children(&mut self, from: NodeId, to: NodeId) {
        for child in self.children(from).to_vec() {
            self.append_child(to, child);
        }
    }

    // ============ Fragments ============

    /// Throwaway copy of the subtree at `node`, rooted at the copy of `node`
    pub fn clone_fragment(&self, node: NodeId) -> Tree {
        let mut fragment = Tree {
            nodes: Vec::new(),
            root: NodeId(0),
        };
        if let Some(root) = self.copy_into(&mut fragment, node) {
            fragment.root = root;
        }
        fragment
    }

    fn copy_into(&self, target: &mut Tree, node: NodeId) -> Option<NodeId> {
        let slot = self.slot(node)?;
        let copy = target.push(slot.kind.clone(), slot.role);
        for &child in &slot.children {
            if let Some(c) = self.copy_into(target, child) {
                target.append_child(copy, c);
            }
        }
        Some(copy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> (Tree, NodeId, NodeId, NodeId) {
        let mut tree = Tree::new("btw:entry");
        let root = tree.root();
        let a = tree.create_element("btw:sense");
        let b = tree.create_element("btw:sense");
        tree.append_child(root, a);
        tree.append_child(root, b);
        let t = tree.create_text("hello");
        tree.append_child(a, t);
        (tree, root, a, b)
    }

    #[test]
    fn test_append_and_children() {
        let (tree, root, a, b) = sample();
        assert_eq!(tree.children(root), &[a, b]);
        assert_eq!(tree.parent(a), Some(root));
        assert_eq!(tree.data_text(a), "hello");
    }

    #[test]
    fn test_remove_kills_subtree() {
        let (mut tree, _root, a, b) = sample();
        let text = tree.children(a)[0];
        tree.remove(a);
        assert!(!tree.is_live(a));
        assert!(!tree.is_live(text));
        assert!(tree.is_live(b));
    }

    #[test]
    fn test_detached_node_is_not_live() {
        let (mut tree, _root, _a, _b) = sample();
        let loose = tree.create_element("btw:sense");
        assert!(!tree.is_live(loose));
    }

    #[test]
    fn test_phantoms_hidden_from_data_view() {
        let (mut tree, _root, a, _b) = sample();
        let head = tree.create_phantom_text("div", &["head"], "SENSE A");
        tree.insert_at(a, 0, head);

        assert_eq!(tree.text_content(a), "SENSE Ahello");
        assert_eq!(tree.data_text(a), "hello");
        assert_eq!(tree.data_children(a).len(), 1);
        assert!(tree.has_class(head, "_phantom"));
    }

    #[test]
    fn test_wrappers_are_transparent() {
        let (mut tree, root, a, b) = sample();
        let group = tree.create_wrapper("div", &["_collapsible"]);
        tree.replace(a, group);
        tree.append_child(group, a);

        assert_eq!(tree.data_children(root), vec![a, b]);
        assert_eq!(tree.data_parent(a), Some(root));
        assert_eq!(tree.holder_in(root, a), Some(group));
    }

    #[test]
    fn test_insert_data_child_respects_wrappers() {
        let (mut tree, root, a, b) = sample();
        let group = tree.create_wrapper("div", &["_collapsible"]);
        tree.replace(a, group);
        tree.append_child(group, a);

        let c = tree.create_element("btw:sense");
        tree.insert_data_child(root, 0, c, None);
        assert_eq!(tree.data_children(root), vec![c, a, b]);

        let d = tree.create_element("btw:sense");
        tree.insert_data_child(root, 3, d, None);
        assert_eq!(tree.data_children(root), vec![c, a, b, d]);
    }

    #[test]
    fn test_set_attr_overwrites() {
        let (mut tree, _root, a, _b) = sample();
        tree.set_attr(a, "xml:id", "S.0");
        tree.set_attr(a, "xml:id", "S.1");
        assert_eq!(tree.attr(a, "xml:id"), Some("S.1"));
        assert_eq!(tree.find_by_attr("xml:id", "S.1"), Some(a));
    }

    #[test]
    fn test_clone_fragment_is_independent() {
        let (mut tree, _root, a, _b) = sample();
        let mut fragment = tree.clone_fragment(a);
        let extra = fragment.create_element("btw:subsense");
        let froot = fragment.root();
        fragment.append_child(froot, extra);

        assert_eq!(fragment.name(froot), Some("btw:sense"));
        assert_eq!(fragment.children(froot).len(), 2);
        assert_eq!(tree.children(a).len(), 1);

        tree.set_text(a, "changed");
        assert_eq!(fragment.data_text(froot), "hello");
    }

    #[test]
    fn test_descendants_document_order() {
        let (tree, root, a, b) = sample();
        let text = tree.children(a)[0];
        assert_eq!(tree.descendants(root), vec![root, a, text, b]);
        assert_eq!(tree.data_descendants(root), vec![root, a, b]);
    }
}
