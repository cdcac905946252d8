//! Closed set of element kinds the decoration engine knows about.

use crate::tree::{NodeId, Tree};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Entry,
    Lemma,
    Overview,
    SenseDiscrimination,
    HistoricoSemanticalData,
    Credits,
    Sense,
    Subsense,
    Explanation,
    Definition,
    EnglishRenditions,
    EnglishRendition,
    Etymology,
    Citations,
    OtherCitations,
    ContrastiveSection,
    Antonyms,
    Cognates,
    ConceptualProximates,
    Antonym,
    Cognate,
    ConceptualProximate,
    Term,
    SemanticFields,
    Sf,
    Example,
    ExampleExplained,
    Cit,
    Tr,
    Ptr,
    Ref,
    None,
    Foreign,
    /// Any element name outside the BTW vocabulary
    Other(String),
}

const NAMES: &[(&str, ElementKind)] = &[
    ("btw:entry", ElementKind::Entry),
    ("btw:lemma", ElementKind::Lemma),
    ("btw:overview", ElementKind::Overview),
    ("btw:sense-discrimination", ElementKind::SenseDiscrimination),
    (
        "btw:historico-semantical-data",
        ElementKind::HistoricoSemanticalData,
    ),
    ("btw:credits", ElementKind::Credits),
    ("btw:sense", ElementKind::Sense),
    ("btw:subsense", ElementKind::Subsense),
    ("btw:explanation", ElementKind::Explanation),
    ("btw:definition", ElementKind::Definition),
    ("btw:english-renditions", ElementKind::EnglishRenditions),
    ("btw:english-rendition", ElementKind::EnglishRendition),
    ("btw:etymology", ElementKind::Etymology),
    ("btw:citations", ElementKind::Citations),
    ("btw:other-citations", ElementKind::OtherCitations),
    ("btw:contrastive-section", ElementKind::ContrastiveSection),
    ("btw:antonyms", ElementKind::Antonyms),
    ("btw:cognates", ElementKind::Cognates),
    ("btw:conceptual-proximates", ElementKind::ConceptualProximates),
    ("btw:antonym", ElementKind::Antonym),
    ("btw:cognate", ElementKind::Cognate),
    ("btw:conceptual-proximate", ElementKind::ConceptualProximate),
    ("btw:term", ElementKind::Term),
    ("btw:semantic-fields", ElementKind::SemanticFields),
    ("btw:sf", ElementKind::Sf),
    ("btw:example", ElementKind::Example),
    ("btw:example-explained", ElementKind::ExampleExplained),
    ("btw:cit", ElementKind::Cit),
    ("btw:tr", ElementKind::Tr),
    ("ptr", ElementKind::Ptr),
    ("ref", ElementKind::Ref),
    ("btw:none", ElementKind::None),
    ("foreign", ElementKind::Foreign),
];

impl ElementKind {
    pub fn from_name(name: &str) -> Self {
        NAMES
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, kind)| kind.clone())
            .unwrap_or_else(|| ElementKind::Other(name.to_string()))
    }

    /// Qualified element name
    pub fn name(&self) -> &str {
        match self {
            ElementKind::Other(name) => name,
            known => NAMES
                .iter()
                .find(|(_, kind)| kind == known)
                .map(|(n, _)| *n)
                .unwrap_or_default(),
        }
    }

    /// Kind of an element node; text and dead nodes map to `Other("")`
    pub fn of(tree: &Tree, node: NodeId) -> Self {
        Self::from_name(tree.name(node).unwrap_or_default())
    }

    /// Top-level article units carrying static headings
    pub fn is_unit(&self) -> bool {
        matches!(
            self,
            ElementKind::Overview
                | ElementKind::SenseDiscrimination
                | ElementKind::HistoricoSemanticalData
                | ElementKind::Credits
        )
    }

    pub fn is_example(&self) -> bool {
        matches!(self, ElementKind::Example | ElementKind::ExampleExplained)
    }

    /// Kinds whose `btw:term` child names what a nested citation is about
    pub fn is_term_holder(&self) -> bool {
        matches!(
            self,
            ElementKind::Antonym | ElementKind::Cognate | ElementKind::ConceptualProximate
        )
    }
}
