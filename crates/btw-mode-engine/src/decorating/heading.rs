//! Heading insertion driven by an ordered table of [`HeadingSpec`]s.
//!
//! A decorated element carries at most one heading: a phantom `div.head`
//! placed right after any leading editor chrome, or, for collapsible
//! sections, a wrapper `div._collapsible` that replaces the element in its
//! parent and holds the heading plus a content box around the element.
//! Every refresh unwraps and removes what the previous pass built before
//! computing the new heading.

use std::sync::LazyLock;

use regex::Regex;

use crate::kind::ElementKind;
use crate::references::{IdManager, RefmanError, WholeDocumentManager};
use crate::tree::{NodeId, Tree};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HeadingError {
    #[error("no unit heading for <{0}>")]
    UnknownUnit(String),
    #[error("invalid heading selector {0:?}")]
    InvalidSelector(String),
    #[error(transparent)]
    Reference(#[from] RefmanError),
}

/// Label lookups a heading can embed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelFn {
    Sense,
    SenseForHead,
    Subsense,
}

impl LabelFn {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "sense" => Some(LabelFn::Sense),
            "sense-head" => Some(LabelFn::SenseForHead),
            "subsense" => Some(LabelFn::Subsense),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            LabelFn::Sense => "sense",
            LabelFn::SenseForHead => "sense-head",
            LabelFn::Subsense => "subsense",
        }
    }

    pub fn apply(
        self,
        tree: &Tree,
        refmans: &WholeDocumentManager,
        el: NodeId,
    ) -> Result<Option<String>, RefmanError> {
        match self {
            LabelFn::Sense => refmans.get_sense_label(tree, el),
            LabelFn::SenseForHead => refmans.get_sense_label_for_head(tree, el),
            LabelFn::Subsense => Ok(refmans.get_subsense_label(tree, el)),
        }
    }
}

static SELECTOR_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*[A-Za-z_][\w.:-]*(\s*>\s*[A-Za-z_][\w.:-]*)*\s*$")
        .expect("Invalid selector regex")
});

/// Element-name path with `>` child steps, matched against the data view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    steps: Vec<String>,
}

impl Selector {
    pub fn parse(source: &str) -> Result<Self, HeadingError> {
        if !SELECTOR_REGEX.is_match(source) {
            return Err(HeadingError::InvalidSelector(source.to_string()));
        }
        Ok(Self::from_steps(source))
    }

    fn from_steps(source: &str) -> Self {
        let steps: Vec<String> = source.split('>').map(|s| s.trim().to_string()).collect();
        Self {
            source: steps.join(">"),
            steps,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, tree: &Tree, el: NodeId) -> bool {
        let mut current = Some(el);
        for step in self.steps.iter().rev() {
            let Some(node) = current else {
                return false;
            };
            if tree.name(node) != Some(step.as_str()) {
                return false;
            }
            current = tree.data_parent(node);
        }
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollapseSpec {
    pub kind: String,
    pub additional_classes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingSpec {
    pub selector: Selector,
    pub heading: String,
    pub label: Option<LabelFn>,
    pub suffix: Option<String>,
    pub collapse: Option<CollapseSpec>,
}

impl HeadingSpec {
    pub fn new(selector: &str, heading: &str) -> Result<Self, HeadingError> {
        Ok(Self::build(Selector::parse(selector)?, heading))
    }

    fn build(selector: Selector, heading: &str) -> Self {
        Self {
            selector,
            heading: heading.to_string(),
            label: None,
            suffix: None,
            collapse: None,
        }
    }

    pub fn with_label(mut self, label: LabelFn) -> Self {
        self.label = Some(label);
        self
    }

    pub fn with_suffix(mut self, suffix: &str) -> Self {
        self.suffix = Some(suffix.to_string());
        self
    }

    pub fn with_collapse(mut self, kind: &str, additional_classes: &[&str]) -> Self {
        self.collapse = Some(CollapseSpec {
            kind: kind.to_string(),
            additional_classes: additional_classes.iter().map(|c| c.to_string()).collect(),
        });
        self
    }
}

fn spec(selector: &str, heading: &str) -> HeadingSpec {
    HeadingSpec::build(Selector::from_steps(selector), heading)
}

/// Heading table used while editing
pub fn editing_specs() -> Vec<HeadingSpec> {
    vec![
        spec("btw:definition", "definition"),
        spec("btw:sense", "SENSE")
            .with_label(LabelFn::SenseForHead)
            .with_suffix(":"),
        spec("btw:subsense", "SUBSENSE")
            .with_label(LabelFn::Subsense)
            .with_suffix(":"),
        spec("btw:sense>btw:explanation", "brief explanation of sense").with_label(LabelFn::Sense),
        spec("btw:subsense>btw:explanation", "brief explanation of sense")
            .with_label(LabelFn::Subsense),
        spec("btw:english-renditions", "English renditions"),
        spec("btw:etymology", "etymology"),
        spec("btw:sense>btw:citations", "citations for sense").with_label(LabelFn::Sense),
        spec("btw:subsense>btw:citations", "citations for sense").with_label(LabelFn::Subsense),
        spec("btw:antonyms", "antonyms"),
        spec("btw:cognates", "cognates"),
        spec("btw:conceptual-proximates", "conceptual proximates"),
        spec("btw:contrastive-section", "contrastive section for sense").with_label(LabelFn::Sense),
        spec("btw:sense>btw:other-citations", "more citations for sense")
            .with_label(LabelFn::Sense)
            .with_collapse("default", &["other-citations"]),
        spec("btw:other-citations", "more citations").with_collapse("default", &["other-citations"]),
        spec("btw:semantic-fields", "semantic categories"),
    ]
}

/// Heading table used by the read-only viewer: nothing collapses
pub fn viewer_specs() -> Vec<HeadingSpec> {
    let mut decorator = HeadingDecorator::with_specs(editing_specs());
    decorator.add_spec(
        spec("btw:sense>btw:other-citations", "more citations for sense").with_label(LabelFn::Sense),
    );
    decorator.add_spec(spec("btw:other-citations", "more citations"));
    decorator.specs
}

#[derive(Debug)]
pub struct HeadingDecorator {
    specs: Vec<HeadingSpec>,
    head_ids: IdManager,
    content_ids: IdManager,
}

impl HeadingDecorator {
    pub fn with_specs(specs: Vec<HeadingSpec>) -> Self {
        Self {
            specs,
            head_ids: IdManager::new("BTW-H."),
            content_ids: IdManager::new("BTW-C."),
        }
    }

    pub fn editing() -> Self {
        Self::with_specs(editing_specs())
    }

    pub fn viewer() -> Self {
        Self::with_specs(viewer_specs())
    }

    pub fn specs(&self) -> &[HeadingSpec] {
        &self.specs
    }

    /// Replace the entry with the same selector, or put the new one first
    pub fn add_spec(&mut self, spec: HeadingSpec) {
        match self
            .specs
            .iter_mut()
            .find(|s| s.selector == spec.selector)
        {
            Some(existing) => *existing = spec,
            None => self.specs.insert(0, spec),
        }
    }

    /// First spec whose selector matches `el`
    pub fn spec_for(&self, tree: &Tree, el: NodeId) -> Option<&HeadingSpec> {
        self.specs.iter().find(|s| s.selector.matches(tree, el))
    }

    pub fn section_heading_decorator(
        &mut self,
        tree: &mut Tree,
        refmans: &WholeDocumentManager,
        el: NodeId,
        explicit: Option<&str>,
    ) -> Result<(), HeadingError> {
        unwrap_collapse(tree, el);
        tree.remove_children_by_class(el, "head");

        let (text, collapse) = match explicit {
            Some(text) => (text.to_string(), None),
            None => {
                let Some(spec) = self.spec_for(tree, el) else {
                    return Ok(());
                };
                let mut text = spec.heading.clone();
                if let Some(label_fn) = spec.label
                    && let Some(label) = label_fn.apply(tree, refmans, el)?
                {
                    text.push(' ');
                    text.push_str(&label);
                }
                if let Some(suffix) = &spec.suffix {
                    text.push_str(suffix);
                }
                (text, spec.collapse.clone())
            }
        };

        match collapse {
            Some(collapse) if tree.parent(el).is_some() => {
                self.wrap_collapsible(tree, el, &text, &collapse)
            }
            _ => insert_plain_heading(tree, el, &text),
        }
        Ok(())
    }

    fn wrap_collapsible(&mut self, tree: &mut Tree, el: NodeId, text: &str, collapse: &CollapseSpec) {
        let kind_class = format!("_collapse_{}", collapse.kind);
        let mut classes = vec!["_collapsible", kind_class.as_str()];
        classes.extend(collapse.additional_classes.iter().map(String::as_str));

        let wrapper = tree.create_wrapper("div", &classes);
        let head = tree.create_phantom_text("div", &["head", "_collapse_head"], text);
        tree.set_id(head, &self.head_ids.generate());
        let content = tree.create_wrapper("div", &["_collapse_content"]);
        tree.set_id(content, &self.content_ids.generate());

        tree.replace(el, wrapper);
        tree.append_child(wrapper, head);
        tree.append_child(wrapper, content);
        tree.append_child(content, el);
    }

    /// Static headings of the top-level article units
    pub fn unit_heading_decorator(&self, tree: &mut Tree, el: NodeId) -> Result<(), HeadingError> {
        let text = match ElementKind::of(tree, el) {
            ElementKind::Overview => "UNIT 1: OVERVIEW",
            ElementKind::SenseDiscrimination => "UNIT 2: SENSE DISCRIMINATION",
            ElementKind::HistoricoSemanticalData => "UNIT 3: HISTORICO-SEMANTICAL DATA",
            ElementKind::Credits => "CREDITS",
            other => return Err(HeadingError::UnknownUnit(other.name().to_string())),
        };
        tree.remove_children_by_class(el, "head");
        insert_plain_heading(tree, el, text);
        Ok(())
    }

    pub fn update_headings_for_sense(
        &mut self,
        tree: &mut Tree,
        refmans: &WholeDocumentManager,
        sense: NodeId,
    ) -> Result<usize, HeadingError> {
        self.update_headings_matching(tree, refmans, sense, &[LabelFn::Sense, LabelFn::SenseForHead])
    }

    pub fn update_headings_for_subsense(
        &mut self,
        tree: &mut Tree,
        refmans: &WholeDocumentManager,
        subsense: NodeId,
    ) -> Result<usize, HeadingError> {
        self.update_headings_matching(tree, refmans, subsense, &[LabelFn::Subsense])
    }

    /// Re-run the section decorator on every element under `el` (inclusive)
    /// whose spec embeds one of `label_fns`; returns how many were refreshed
    fn update_headings_matching(
        &mut self,
        tree: &mut Tree,
        refmans: &WholeDocumentManager,
        el: NodeId,
        label_fns: &[LabelFn],
    ) -> Result<usize, HeadingError> {
        let mut refreshed = 0;
        for node in tree.data_descendants(el) {
            let matches = self
                .spec_for(tree, node)
                .and_then(|s| s.label)
                .is_some_and(|f| label_fns.contains(&f));
            if matches {
                self.section_heading_decorator(tree, refmans, node, None)?;
                refreshed += 1;
            }
        }
        Ok(refreshed)
    }
}

fn insert_plain_heading(tree: &mut Tree, el: NodeId, text: &str) {
    let head = tree.create_phantom_text("div", &["head"], text);
    let at = tree.leading_chrome_len(el);
    tree.insert_at(el, at, head);
}

/// The `_collapsible` wrapper currently holding `el`, if any
pub fn collapse_wrapper(tree: &Tree, el: NodeId) -> Option<NodeId> {
    let content = tree.parent(el)?;
    let wrapper = tree.parent(content)?;
    (tree.has_class(content, "_collapse_content") && tree.has_class(wrapper, "_collapsible"))
        .then_some(wrapper)
}

/// Put `el` back where its collapse wrapper is and drop the wrapper
fn unwrap_collapse(tree: &mut Tree, el: NodeId) -> bool {
    match collapse_wrapper(tree, el) {
        Some(wrapper) => {
            tree.replace(wrapper, el);
            tree.remove(wrapper);
            true
        }
        None => false,
    }
}

pub fn heading_node(tree: &Tree, el: NodeId) -> Option<NodeId> {
    tree.first_child_by_class(el, "head").or_else(|| {
        collapse_wrapper(tree, el).and_then(|w| tree.first_child_by_class(w, "head"))
    })
}

/// Text of the heading currently rendered for `el`
pub fn heading_text(tree: &Tree, el: NodeId) -> Option<String> {
    heading_node(tree, el).map(|h| tree.text_content(h))
}
