use crate::decorating::heading::HeadingError;
use crate::references::{IdError, LabelError, RefmanError};
use crate::tree::NodeId;
use crate::validation::ValidatorError;

/// Anything that can stop a decoration pass
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecorationError {
    #[error(transparent)]
    Id(#[from] IdError),
    #[error(transparent)]
    Label(#[from] LabelError),
    #[error(transparent)]
    Reference(#[from] RefmanError),
    #[error(transparent)]
    Heading(#[from] HeadingError),
    #[error(transparent)]
    Validator(#[from] ValidatorError),
    #[error("{0} is not an insertion control")]
    InvalidControl(NodeId),
    #[error("insertion control {control} has no action {index}")]
    UnknownAction { control: NodeId, index: usize },
}
