use crate::decorating::heading::heading_text;
use crate::kind::ElementKind;
use crate::tree::{DocumentPosition, NodeId, Tree};

use super::RefmanError;

/// Describes examples in prose relative to the pointer citing them.
/// Holds no labels; every answer is derived from the current tree.
#[derive(Debug, Default)]
pub struct ExampleReferenceManager;

impl ExampleReferenceManager {
    pub fn new() -> Self {
        Self
    }

    pub fn name(&self) -> &str {
        "example"
    }

    /// `See {cit} quoted above|below in {heading}[, {term}].`
    pub fn get_positional_label(
        &self,
        tree: &Tree,
        pointer: NodeId,
        target: NodeId,
    ) -> Result<String, RefmanError> {
        let order = match tree.compare_document_position(pointer, target) {
            DocumentPosition::Preceding | DocumentPosition::Contains => "above",
            DocumentPosition::Following => "below",
            DocumentPosition::Disconnected => return Err(RefmanError::InvalidTopology),
            DocumentPosition::ContainedBy | DocumentPosition::Same => {
                return Err(RefmanError::Structural { pointer, target });
            }
        };

        let mut label = format!("See {} quoted {order}", citation_text(tree, target));

        let section = tree.data_parent(target).and_then(|p| {
            tree.closest(p, |t, n| {
                matches!(
                    ElementKind::of(t, n),
                    ElementKind::Sense | ElementKind::Subsense
                )
            })
        });
        if let Some(heading) = section.and_then(|s| heading_text(tree, s)) {
            let heading = heading.trim().trim_end_matches(':').trim_end();
            if !heading.is_empty() {
                label.push_str(" in ");
                label.push_str(heading);
            }
        }

        let target_holder = term_holder(tree, target);
        if target_holder.is_some() && target_holder != term_holder(tree, pointer) {
            let term = target_holder.and_then(|h| term_text(tree, h));
            if let Some(term) = term {
                label.push_str(", ");
                label.push_str(&term);
            }
        }

        let trimmed = label.trim_end().trim_end_matches('.');
        Ok(format!("{trimmed}."))
    }
}

/// The `ref` inside an example's `btw:cit`
pub fn citation_ref(tree: &Tree, example: NodeId) -> Option<NodeId> {
    tree.data_element_children(example)
        .into_iter()
        .find(|&c| ElementKind::of(tree, c) == ElementKind::Cit)
        .and_then(|cit| {
            tree.data_element_children(cit)
                .into_iter()
                .find(|&c| ElementKind::of(tree, c) == ElementKind::Ref)
        })
}

/// Current citation text of an example: the decorated abbreviation of its
/// `ref` when present, otherwise the ref's own text
pub fn citation_text(tree: &Tree, example: NodeId) -> String {
    let Some(reference) = citation_ref(tree, example) else {
        return "(...)".to_string();
    };
    if let Some(abbr) = tree.first_child_by_class(reference, "_ref_abbr") {
        return tree.text_content(abbr);
    }
    let text = tree.data_text(reference);
    let text = text.trim();
    if text.is_empty() {
        "(...)".to_string()
    } else {
        text.to_string()
    }
}

/// Nearest antonym, cognate or conceptual proximate around `node`, else the
/// entry whose lemma is the default term
fn term_holder(tree: &Tree, node: NodeId) -> Option<NodeId> {
    tree.closest(node, |t, n| ElementKind::of(t, n).is_term_holder())
        .or_else(|| tree.closest(node, |t, n| ElementKind::of(t, n) == ElementKind::Entry))
}

fn term_text(tree: &Tree, holder: NodeId) -> Option<String> {
    let term_kind = match ElementKind::of(tree, holder) {
        ElementKind::Entry => ElementKind::Lemma,
        _ => ElementKind::Term,
    };
    let term = tree
        .data_element_children(holder)
        .into_iter()
        .find(|&c| ElementKind::of(tree, c) == term_kind)?;
    let text = tree.data_text(term).trim().to_string();
    (!text.is_empty()).then_some(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r##"<btw:entry>
  <btw:lemma>prajñā</btw:lemma>
  <btw:sense xml:id="S.0">
    <btw:citations>
      <btw:example xml:id="E.0"><btw:cit><ref target="/bibl/1">Foo 1990</ref></btw:cit></btw:example>
    </btw:citations>
    <btw:contrastive-section>
      <btw:antonyms>
        <btw:antonym>
          <btw:term>ashes</btw:term>
          <btw:citations>
            <btw:example xml:id="E.1"><btw:cit><ref target="/bibl/2">Bar 2001</ref></btw:cit></btw:example>
          </btw:citations>
        </btw:antonym>
      </btw:antonyms>
    </btw:contrastive-section>
  </btw:sense>
  <ptr target="#E.0"/>
</btw:entry>"##;

    fn load() -> Tree {
        Tree::from_xml(DOC).unwrap()
    }

    fn by_id(tree: &Tree, id: &str) -> NodeId {
        tree.find_by_attr("xml:id", id).unwrap()
    }

    fn trailing_ptr(tree: &Tree) -> NodeId {
        *tree.data_element_children(tree.root()).last().unwrap()
    }

    #[test]
    fn test_pointer_after_target_reads_above() {
        let tree = load();
        let label = ExampleReferenceManager::new()
            .get_positional_label(&tree, trailing_ptr(&tree), by_id(&tree, "E.0"))
            .unwrap();
        assert_eq!(label, "See Foo 1990 quoted above.");
    }

    #[test]
    fn test_pointer_before_target_reads_below() {
        let mut tree = load();
        let ptr = trailing_ptr(&tree);
        let root = tree.root();
        tree.insert_at(root, 0, ptr);
        let label = ExampleReferenceManager::new()
            .get_positional_label(&tree, ptr, by_id(&tree, "E.0"))
            .unwrap();
        assert_eq!(label, "See Foo 1990 quoted below.");
    }

    #[test]
    fn test_heading_and_term_segments() {
        let mut tree = load();
        let sense = by_id(&tree, "S.0");
        let head = tree.create_phantom_text("div", &["head"], "SENSE A:");
        tree.insert_at(sense, 0, head);

        let label = ExampleReferenceManager::new()
            .get_positional_label(&tree, trailing_ptr(&tree), by_id(&tree, "E.1"))
            .unwrap();
        assert_eq!(label, "See Bar 2001 quoted above in SENSE A, ashes.");
    }

    #[test]
    fn test_term_omitted_when_pointer_shares_it() {
        let mut tree = load();
        let e1 = by_id(&tree, "E.1");
        let antonym = tree
            .closest(e1, |t, n| ElementKind::of(t, n) == ElementKind::Antonym)
            .unwrap();
        let ptr = trailing_ptr(&tree);
        tree.append_child(antonym, ptr);

        let label = ExampleReferenceManager::new()
            .get_positional_label(&tree, ptr, e1)
            .unwrap();
        assert_eq!(label, "See Bar 2001 quoted above.");
    }

    #[test]
    fn test_pointer_in_antonym_names_the_lemma() {
        // Given a pointer inside an antonym citing an example of the sense itself
        let mut tree = load();
        let antonym = tree
            .closest(by_id(&tree, "E.1"), |t, n| {
                ElementKind::of(t, n) == ElementKind::Antonym
            })
            .unwrap();
        let ptr = trailing_ptr(&tree);
        tree.append_child(antonym, ptr);

        // Then the label names the entry's lemma as the term
        let label = ExampleReferenceManager::new()
            .get_positional_label(&tree, ptr, by_id(&tree, "E.0"))
            .unwrap();
        assert_eq!(label, "See Foo 1990 quoted above, prajñā.");
    }

    #[test]
    fn test_decorated_abbreviation_wins_over_ref_text() {
        let mut tree = load();
        let e0 = by_id(&tree, "E.0");
        let reference = tree
            .data_descendants(e0)
            .into_iter()
            .find(|&n| ElementKind::of(&tree, n) == ElementKind::Ref)
            .unwrap();
        let abbr = tree.create_phantom_text("span", &["_ref_abbr"], "(...)");
        tree.insert_at(reference, 0, abbr);
        assert_eq!(citation_text(&tree, e0), "(...)");
    }

    #[test]
    fn test_disconnected_nodes_fail() {
        let mut tree = load();
        let loose = tree.create_element("ptr");
        let result =
            ExampleReferenceManager::new().get_positional_label(&tree, loose, by_id(&tree, "E.0"));
        assert_eq!(result, Err(RefmanError::InvalidTopology));
    }

    #[test]
    fn test_pointer_containing_target_is_structural() {
        let tree = load();
        let sense = by_id(&tree, "S.0");
        let e0 = by_id(&tree, "E.0");
        let result = ExampleReferenceManager::new().get_positional_label(&tree, sense, e0);
        assert_eq!(
            result,
            Err(RefmanError::Structural {
                pointer: sense,
                target: e0
            })
        );
    }
}
