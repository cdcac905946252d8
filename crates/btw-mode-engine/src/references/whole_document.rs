use crate::kind::ElementKind;
use crate::tree::{NodeId, Tree};

use super::example::ExampleReferenceManager;
use super::label_manager::{LabelError, LabelManager};
use super::sense::SenseReferenceManager;
use super::RefmanError;

/// Pointer chains longer than this are treated as cycles
const MAX_POINTER_HOPS: usize = 16;

/// Which manager governs an element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefmanRef {
    Sense,
    Subsense { sense_id: String },
    Example,
}

/// Per-document registry of reference managers. Owned by the session and
/// handed to decoration routines by reference.
#[derive(Debug, Default)]
pub struct WholeDocumentManager {
    senses: SenseReferenceManager,
    examples: ExampleReferenceManager,
}

impl WholeDocumentManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn senses(&self) -> &SenseReferenceManager {
        &self.senses
    }

    pub fn examples(&self) -> &ExampleReferenceManager {
        &self.examples
    }

    /// Follow `ptr`/`ref` internal targets until a non-pointer element
    pub fn resolve_target(&self, tree: &Tree, el: NodeId) -> Result<NodeId, RefmanError> {
        let mut current = el;
        for _ in 0..=MAX_POINTER_HOPS {
            match ElementKind::of(tree, current) {
                ElementKind::Ptr | ElementKind::Ref => {
                    let target = tree.attr(current, "target").unwrap_or_default();
                    let id = internal_target(target)
                        .ok_or_else(|| RefmanError::UnknownTarget(target.to_string()))?;
                    current = tree
                        .find_by_attr("xml:id", id)
                        .ok_or_else(|| RefmanError::UnknownTarget(target.to_string()))?;
                }
                _ => return Ok(current),
            }
        }
        Err(RefmanError::UnknownTarget(
            tree.attr(el, "target").unwrap_or_default().to_string(),
        ))
    }

    pub fn get_refman_for_element(
        &self,
        tree: &Tree,
        el: NodeId,
    ) -> Result<RefmanRef, RefmanError> {
        let el = self.resolve_target(tree, el)?;
        match ElementKind::of(tree, el) {
            ElementKind::Sense => Ok(RefmanRef::Sense),
            ElementKind::Subsense => {
                let sense = enclosing(tree, el, ElementKind::Sense, true).ok_or_else(|| {
                    RefmanError::MissingAncestor {
                        name: element_name(tree, el),
                        ancestor: "btw:sense",
                    }
                })?;
                let sense_id = tree
                    .attr(sense, "xml:id")
                    .ok_or_else(|| RefmanError::MissingId(element_name(tree, sense)))?;
                Ok(RefmanRef::Subsense {
                    sense_id: sense_id.to_string(),
                })
            }
            ElementKind::Example | ElementKind::ExampleExplained => Ok(RefmanRef::Example),
            _ => Err(RefmanError::UnsupportedElement(element_name(tree, el))),
        }
    }

    /// Allocate through the governing manager. `Ok(None)` when the manager
    /// does not hand out short labels or does not exist yet (subsenses of a
    /// sense that has not been labeled).
    pub fn allocate_label(
        &mut self,
        refman: &RefmanRef,
        id: &str,
    ) -> Result<Option<String>, LabelError> {
        match refman {
            RefmanRef::Sense => self.senses.allocate_label(id).map(Some),
            RefmanRef::Subsense { sense_id } => match self.senses.subsense_manager_mut(sense_id) {
                Some(manager) => manager.allocate_label(id).map(Some),
                None => Ok(None),
            },
            RefmanRef::Example => Ok(None),
        }
    }

    pub fn id_to_label(&self, refman: &RefmanRef, id: &str) -> Option<String> {
        match refman {
            RefmanRef::Sense => self.senses.id_to_label(id),
            RefmanRef::Subsense { sense_id } => self
                .senses
                .subsense_manager(sense_id)
                .and_then(|m| m.id_to_label(id)),
            RefmanRef::Example => None,
        }
    }

    /// Inline label of whatever `el` points at or is
    pub fn label_for(&self, tree: &Tree, el: NodeId) -> Result<Option<String>, RefmanError> {
        let target = self.resolve_target(tree, el)?;
        let refman = self.get_refman_for_element(tree, target)?;
        Ok(tree
            .attr(target, "xml:id")
            .and_then(|id| self.id_to_label(&refman, id)))
    }

    pub fn get_sense_label(&self, tree: &Tree, el: NodeId) -> Result<Option<String>, RefmanError> {
        let id = self.sense_id(tree, el)?;
        Ok(id.and_then(|id| self.senses.id_to_label(id)))
    }

    pub fn get_sense_label_for_head(
        &self,
        tree: &Tree,
        el: NodeId,
    ) -> Result<Option<String>, RefmanError> {
        let id = self.sense_id(tree, el)?;
        Ok(id.and_then(|id| self.senses.id_to_label_for_head(id)))
    }

    /// Full subsense label (`c2`). `None` while any piece is still missing.
    pub fn get_subsense_label(&self, tree: &Tree, el: NodeId) -> Option<String> {
        let (sense_id, id) = self.subsense_ids(tree, el)?;
        self.senses.subsense_manager(sense_id)?.id_to_label(id)
    }

    /// Numeral only (`2`)
    pub fn get_subsense_sublabel(&self, tree: &Tree, el: NodeId) -> Option<String> {
        let (sense_id, id) = self.subsense_ids(tree, el)?;
        self.senses.subsense_manager(sense_id)?.id_to_sublabel(id)
    }

    pub fn deallocate_all(&mut self) {
        self.senses.deallocate_all();
    }

    fn sense_id<'t>(&self, tree: &'t Tree, el: NodeId) -> Result<Option<&'t str>, RefmanError> {
        let sense = enclosing(tree, el, ElementKind::Sense, false).ok_or_else(|| {
            RefmanError::MissingAncestor {
                name: element_name(tree, el),
                ancestor: "btw:sense",
            }
        })?;
        Ok(tree.attr(sense, "xml:id"))
    }

    fn subsense_ids<'t>(&self, tree: &'t Tree, el: NodeId) -> Option<(&'t str, &'t str)> {
        let subsense = enclosing(tree, el, ElementKind::Subsense, false)?;
        let sense = enclosing(tree, subsense, ElementKind::Sense, true)?;
        Some((tree.attr(sense, "xml:id")?, tree.attr(subsense, "xml:id")?))
    }
}

/// `#X` → `X`; anything else is an external reference
pub fn internal_target(target: &str) -> Option<&str> {
    target.strip_prefix('#').filter(|id| !id.is_empty())
}

fn enclosing(tree: &Tree, el: NodeId, kind: ElementKind, strict: bool) -> Option<NodeId> {
    let start = if strict { tree.data_parent(el)? } else { el };
    tree.closest(start, |t, n| t.is_data(n) && ElementKind::of(t, n) == kind)
}

fn element_name(tree: &Tree, el: NodeId) -> String {
    tree.name(el).unwrap_or("#text").to_string()
}
