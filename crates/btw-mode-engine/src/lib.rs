pub mod decorating;
pub mod editing;
pub mod error;
pub mod fetch;
pub mod io;
pub mod kind;
pub mod references;
pub mod session;
pub mod tree;
pub mod validation;
pub mod viewer;

#[cfg(test)]
pub mod tests;

// Re-export key types for easier usage
pub use decorating::{DispatchCapable, HeadingDecorator, HeadingSpec, LabelFn, VisibleAbsences};
pub use editing::EditingDecorator;
pub use error::DecorationError;
pub use fetch::{BiblItem, ChangeRecord, JsonFileSource, MemorySource, SemanticFieldRecord, Sources};
pub use io::*;
pub use kind::ElementKind;
pub use session::Session;
pub use tree::{NodeId, Tree};
pub use validation::{SchemaRules, Validator};
pub use viewer::{OutlineEntry, Viewer};
