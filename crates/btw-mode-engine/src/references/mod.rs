//! Label allocation and lookup for senses, subsenses and examples.

pub mod example;
pub mod id_manager;
pub mod label_manager;
pub mod sense;
pub mod subsense;
pub mod whole_document;

pub use example::ExampleReferenceManager;
pub use id_manager::{IdError, IdManager};
pub use label_manager::{LabelError, LabelManager, SENSE_LABEL_LIMIT};
pub use sense::SenseReferenceManager;
pub use subsense::SubsenseReferenceManager;
pub use whole_document::{RefmanRef, WholeDocumentManager, internal_target};

use crate::tree::NodeId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RefmanError {
    #[error("no reference manager governs <{0}>")]
    UnsupportedElement(String),
    #[error("<{name}> has no {ancestor} ancestor")]
    MissingAncestor { name: String, ancestor: &'static str },
    #[error("pointer and target are not in the same tree")]
    InvalidTopology,
    #[error("pointer {pointer} contains its target {target}")]
    Structural { pointer: NodeId, target: NodeId },
    #[error("cannot resolve reference target {0:?}")]
    UnknownTarget(String),
    #[error("<{0}> has no xml:id")]
    MissingId(String),
}
