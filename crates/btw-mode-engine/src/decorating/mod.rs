//! Decoration of the rendered tree: headings, labels, links, insertion
//! controls and the deferred work that keeps them current.

pub mod absences;
pub mod dispatch;
pub mod events;
pub mod heading;
pub mod scheduler;

pub use absences::{AbsenceSpec, VisibleAbsences};
pub use dispatch::DispatchCapable;
pub use events::EventBus;
pub use heading::{HeadingDecorator, HeadingError, HeadingSpec, LabelFn, Selector};
pub use scheduler::{Scheduler, Task};
