//! Schedule editing engine: lesson identity, pool filtering, selection,
//! week containers, duration summaries and the edit session state machine.

pub mod catalog;
pub mod filter;
pub mod generate;
pub mod model;
pub mod selection;
pub mod session;
pub mod summary;

pub use catalog::{Lesson, LessonKey, LoadWarning};
pub use filter::{DurationDirection, DurationFilter, FilterSpec, SortKey};
pub use generate::{generate, GeneratorConfig};
pub use model::MoveOutcome;
pub use session::{Ack, EditSession, SessionError};
