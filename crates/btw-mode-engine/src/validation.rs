//! Validator contract used by the visible-absence generator, and a small
//! content-model implementation of it for the BTW vocabulary.

use std::collections::HashMap;

use crate::tree::{NodeId, Tree};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValidationError {
    pub element: NodeId,
    pub message: String,
}

/// Opaque failure of the validator itself
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("validator failed: {0}")]
pub struct ValidatorError(pub String);

pub trait Validator {
    /// Data-child indices of `parent` where an element named `name` may go
    fn possible_where(
        &self,
        tree: &Tree,
        parent: NodeId,
        name: &str,
    ) -> Result<Vec<usize>, ValidatorError>;

    /// Every validity error in the data view of the subtree at `root`
    fn validate(&self, tree: &Tree, root: NodeId) -> Result<Vec<ValidationError>, ValidatorError>;

    /// Build a detached, minimal element named `name` in `tree`
    fn instantiate(&self, tree: &mut Tree, name: &str) -> NodeId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occurs {
    One,
    Optional,
    ZeroOrMore,
    OneOrMore,
}

impl Occurs {
    fn required(self) -> bool {
        matches!(self, Occurs::One | Occurs::OneOrMore)
    }

    fn repeatable(self) -> bool {
        matches!(self, Occurs::ZeroOrMore | Occurs::OneOrMore)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub name: String,
    pub occurs: Occurs,
}

/// Ordered-sequence content models keyed by element name. Elements without
/// a model accept anything.
#[derive(Debug, Clone, Default)]
pub struct SchemaRules {
    models: HashMap<String, Vec<Slot>>,
}

/// Guards `instantiate` against self-requiring models
const MAX_INSTANTIATE_DEPTH: usize = 8;

impl SchemaRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn model(mut self, name: &str, slots: &[(&str, Occurs)]) -> Self {
        self.models.insert(
            name.to_string(),
            slots
                .iter()
                .map(|(n, occurs)| Slot {
                    name: n.to_string(),
                    occurs: *occurs,
                })
                .collect(),
        );
        self
    }

    /// Rules for BTW articles
    pub fn btw() -> Self {
        use Occurs::*;
        Self::new()
            .model(
                "btw:entry",
                &[
                    ("btw:lemma", One),
                    ("btw:overview", Optional),
                    ("btw:sense-discrimination", One),
                    ("btw:historico-semantical-data", Optional),
                    ("btw:credits", Optional),
                ],
            )
            .model("btw:overview", &[("btw:definition", One)])
            .model("btw:sense-discrimination", &[("btw:sense", OneOrMore)])
            .model(
                "btw:sense",
                &[
                    ("btw:english-renditions", One),
                    ("btw:subsense", ZeroOrMore),
                    ("btw:explanation", Optional),
                    ("btw:citations", Optional),
                    ("btw:other-citations", Optional),
                    ("btw:contrastive-section", Optional),
                ],
            )
            .model("btw:english-renditions", &[("btw:english-rendition", OneOrMore)])
            .model("btw:english-rendition", &[("btw:term", One)])
            .model(
                "btw:subsense",
                &[
                    ("btw:explanation", One),
                    ("btw:citations", Optional),
                    ("btw:other-citations", Optional),
                ],
            )
            .model(
                "btw:citations",
                &[
                    ("btw:example", ZeroOrMore),
                    ("btw:example-explained", ZeroOrMore),
                ],
            )
            .model("btw:other-citations", &[("btw:example", ZeroOrMore)])
            .model(
                "btw:example",
                &[
                    ("btw:semantic-fields", Optional),
                    ("btw:cit", One),
                    ("btw:tr", Optional),
                ],
            )
            .model(
                "btw:example-explained",
                &[
                    ("btw:explanation", One),
                    ("btw:semantic-fields", Optional),
                    ("btw:cit", One),
                    ("btw:tr", Optional),
                ],
            )
            .model("btw:cit", &[("ref", One)])
            .model(
                "btw:contrastive-section",
                &[
                    ("btw:antonyms", One),
                    ("btw:cognates", One),
                    ("btw:conceptual-proximates", One),
                ],
            )
            .model("btw:antonyms", &[("btw:antonym", ZeroOrMore)])
            .model("btw:cognates", &[("btw:cognate", ZeroOrMore)])
            .model(
                "btw:conceptual-proximates",
                &[("btw:conceptual-proximate", ZeroOrMore)],
            )
            .model("btw:antonym", &[("btw:term", One), ("btw:citations", Optional)])
            .model("btw:cognate", &[("btw:term", One), ("btw:citations", Optional)])
            .model(
                "btw:conceptual-proximate",
                &[("btw:term", One), ("btw:citations", Optional)],
            )
            .model("btw:semantic-fields", &[("btw:sf", OneOrMore)])
            .model("btw:historico-semantical-data", &[("btw:etymology", One)])
    }

    fn slot_index(slots: &[Slot], name: &str) -> Option<usize> {
        slots.iter().position(|s| s.name == name)
    }

    fn check_element(&self, tree: &Tree, el: NodeId, errors: &mut Vec<ValidationError>) {
        let Some(slots) = tree.name(el).and_then(|n| self.models.get(n)) else {
            return;
        };
        let mut error = |message: String| {
            errors.push(ValidationError {
                element: el,
                message,
            })
        };

        let mut slot = 0;
        let mut count = 0;
        for child in tree.data_element_children(el) {
            let name = tree.name(child).unwrap_or_default();
            let Some(wanted) = Self::slot_index(slots, name) else {
                error(format!("unexpected {name}"));
                continue;
            };
            if wanted < slot {
                error(format!("{name} out of order"));
                continue;
            }
            while slot < wanted {
                if count == 0 && slots[slot].occurs.required() {
                    error(format!("missing {}", slots[slot].name));
                }
                slot += 1;
                count = 0;
            }
            count += 1;
            if count > 1 && !slots[slot].occurs.repeatable() {
                error(format!("too many {name}"));
            }
        }
        for (i, s) in slots.iter().enumerate().skip(slot) {
            let filled = i == slot && count > 0;
            if !filled && s.occurs.required() {
                error(format!("missing {}", s.name));
            }
        }
    }

    fn build(&self, tree: &mut Tree, name: &str, depth: usize) -> NodeId {
        let el = tree.create_element(name);
        if depth >= MAX_INSTANTIATE_DEPTH {
            return el;
        }
        let required: Vec<String> = self
            .models
            .get(name)
            .map(|slots| {
                slots
                    .iter()
                    .filter(|s| s.occurs.required())
                    .map(|s| s.name.clone())
                    .collect()
            })
            .unwrap_or_default();
        for child_name in required {
            let child = self.build(tree, &child_name, depth + 1);
            tree.append_child(el, child);
        }
        el
    }
}

impl Validator for SchemaRules {
    fn possible_where(
        &self,
        tree: &Tree,
        parent: NodeId,
        name: &str,
    ) -> Result<Vec<usize>, ValidatorError> {
        let Some(slots) = tree.name(parent).and_then(|n| self.models.get(n)) else {
            return Ok(Vec::new());
        };
        let Some(wanted) = Self::slot_index(slots, name) else {
            return Ok(Vec::new());
        };
        let children: Vec<Option<usize>> = tree
            .data_element_children(parent)
            .into_iter()
            .map(|c| Self::slot_index(slots, tree.name(c).unwrap_or_default()))
            .collect();
        if !slots[wanted].occurs.repeatable() && children.contains(&Some(wanted)) {
            return Ok(Vec::new());
        }

        // A data-child index counts text too
        let data_children = tree.data_children(parent);
        let mut positions = Vec::new();
        for at in 0..=data_children.len() {
            let element_index = data_children[..at]
                .iter()
                .filter(|&&c| tree.is_element(c))
                .count();
            let before_ok = children[..element_index]
                .iter()
                .flatten()
                .all(|&s| s <= wanted);
            let after_ok = children[element_index..]
                .iter()
                .flatten()
                .all(|&s| s >= wanted);
            if before_ok && after_ok {
                positions.push(at);
            }
        }
        positions.dedup_by_key(|at| {
            data_children[..*at]
                .iter()
                .filter(|&&c| tree.is_element(c))
                .count()
        });
        Ok(positions)
    }

    fn validate(&self, tree: &Tree, root: NodeId) -> Result<Vec<ValidationError>, ValidatorError> {
        let mut errors = Vec::new();
        for el in tree.data_descendants(root) {
            self.check_element(tree, el, &mut errors);
        }
        Ok(errors)
    }

    fn instantiate(&self, tree: &mut Tree, name: &str) -> NodeId {
        self.build(tree, name, 0)
    }
}
