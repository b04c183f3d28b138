//! taskdeck - an immutable, in-memory task state core
//!
//! Tasks are immutable values with a guarded status lifecycle. A
//! [`StateContainer`] snapshot holds the collection together with the active
//! [`Query`] and async bookkeeping; every operation returns a new snapshot.
//! Filtered views and [`Statistics`] are derived on demand. A [`Session`]
//! owns the current snapshot and drops completions of superseded operations.
//!
//! The `storage` and `cli` modules persist tasks as JSONL and expose them
//! through the `deck` binary.

pub mod domain;
pub mod state;
pub mod storage;
pub mod cli;

pub use domain::{
    NewTask, Priority, Query, QueryContext, Statistics, Task, TaskId, TaskPatch, TaskStatus,
};
pub use state::{Session, StateContainer, StateError};
