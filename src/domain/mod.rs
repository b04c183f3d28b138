//! Domain models for taskdeck
//!
//! Contains the task entity, queries and statistics without any I/O concerns.

mod id;
mod task;
mod query;
mod stats;

pub use id::{IdError, TaskId};
pub use task::{NewTask, ParseEnumError, Priority, Task, TaskPatch, TaskStatus, ValidationError};
pub use query::{Query, QueryContext, SortField, SortOrder, DEFAULT_DUE_SOON_HOURS};
pub use stats::Statistics;
