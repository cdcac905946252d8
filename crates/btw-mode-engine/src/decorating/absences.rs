//! Insertion controls for optional children an element does not have yet.
//!
//! A candidate position is kept only when inserting a minimal instance there
//! leaves the element no less valid than it is now. Trials run against a
//! throwaway fragment, never the live tree.

use std::collections::BTreeMap;

use log::debug;

use crate::kind::ElementKind;
use crate::tree::{NodeId, Tree};
use crate::validation::{ValidationError, Validator, ValidatorError};

/// Class carried by every generated control
pub const CONTROL_CLASS: &str = "_va_instantiator";

/// Children whose absence `parent` should make visible
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbsenceSpec {
    pub parent: ElementKind,
    pub children: Vec<String>,
}

impl AbsenceSpec {
    pub fn new(parent: ElementKind, children: &[&str]) -> Self {
        Self {
            parent,
            children: children.iter().map(|c| c.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct VisibleAbsences {
    specs: Vec<AbsenceSpec>,
}

impl Default for VisibleAbsences {
    fn default() -> Self {
        Self::btw()
    }
}

impl VisibleAbsences {
    pub fn new(specs: Vec<AbsenceSpec>) -> Self {
        Self { specs }
    }

    pub fn btw() -> Self {
        Self::new(vec![
            AbsenceSpec::new(
                ElementKind::Sense,
                &[
                    "btw:subsense",
                    "btw:explanation",
                    "btw:citations",
                    "btw:other-citations",
                    "btw:contrastive-section",
                ],
            ),
            AbsenceSpec::new(
                ElementKind::Subsense,
                &["btw:explanation", "btw:citations", "btw:other-citations"],
            ),
            AbsenceSpec::new(
                ElementKind::Citations,
                &["btw:example", "btw:example-explained"],
            ),
            AbsenceSpec::new(ElementKind::Example, &["btw:semantic-fields"]),
            AbsenceSpec::new(ElementKind::ExampleExplained, &["btw:semantic-fields"]),
            AbsenceSpec::new(ElementKind::SenseDiscrimination, &["btw:sense"]),
        ])
    }

    pub fn spec_for(&self, kind: &ElementKind) -> Option<&AbsenceSpec> {
        self.specs.iter().find(|s| &s.parent == kind)
    }

    /// Rebuild the controls of `el`; returns how many were inserted.
    ///
    /// `end` is the chrome node closing `el`'s editable contents.
    pub fn refresh(
        &self,
        tree: &mut Tree,
        validator: &dyn Validator,
        el: NodeId,
        end: Option<NodeId>,
    ) -> Result<usize, ValidatorError> {
        tree.remove_children_by_class(el, CONTROL_CLASS);
        let Some(spec) = self.spec_for(&ElementKind::of(tree, el)) else {
            return Ok(0);
        };

        let present: Vec<&str> = tree
            .data_element_children(el)
            .into_iter()
            .filter_map(|c| tree.name(c))
            .collect();
        let absent: Vec<&String> = spec
            .children
            .iter()
            .filter(|c| !present.contains(&c.as_str()))
            .collect();
        if absent.is_empty() {
            return Ok(0);
        }

        let fragment = tree.clone_fragment(el);
        let baseline = validator.validate(&fragment, fragment.root())?;

        let mut by_index: BTreeMap<usize, Vec<String>> = BTreeMap::new();
        for name in absent {
            for index in validator.possible_where(tree, el, name)? {
                if accepts(validator, &fragment, &baseline, index, name)? {
                    by_index.entry(index).or_default().push(name.clone());
                }
            }
        }

        for (&index, names) in &by_index {
            let control = build_control(tree, index, names);
            tree.insert_data_child(el, index, control, end);
        }
        debug!(
            "{} insertion control(s) for <{}>",
            by_index.len(),
            tree.name(el).unwrap_or_default()
        );
        Ok(by_index.len())
    }
}

/// Does inserting a fresh `name` at `index` keep the fragment as valid as
/// `baseline`?
fn accepts(
    validator: &dyn Validator,
    fragment: &Tree,
    baseline: &[ValidationError],
    index: usize,
    name: &str,
) -> Result<bool, ValidatorError> {
    let mut trial = fragment.clone();
    let root = trial.root();
    let child = validator.instantiate(&mut trial, name);
    trial.insert_data_child(root, index, child, None);
    let errors = validator.validate(&trial, root)?;
    Ok(errors.iter().all(|e| baseline.contains(e)))
}

fn local_name(name: &str) -> &str {
    name.rsplit(':').next().unwrap_or(name)
}

/// One kind at a position gives a button, several give a menu
fn build_control(tree: &mut Tree, index: usize, names: &[String]) -> NodeId {
    let control = match names {
        [single] => {
            let text = format!("+ {}", local_name(single));
            tree.create_phantom_text("button", &["_gui", CONTROL_CLASS], &text)
        }
        _ => {
            let menu = tree.create_phantom_text("span", &["_gui", CONTROL_CLASS, "_va_menu"], "+");
            for name in names {
                let item = tree.create_phantom_text("span", &["_va_action"], local_name(name));
                tree.append_child(menu, item);
            }
            menu
        }
    };
    tree.set_attr(control, "index", &index.to_string());
    tree.set_attr(control, "actions", &names.join("|"));
    control
}
