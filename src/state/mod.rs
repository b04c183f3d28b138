//! # State Management
//!
//! The immutable [`StateContainer`] and the [`Session`] that owns it.
//!
//! ## Snapshots
//!
//! Container operations take `&self` and return a new container. A failed
//! operation returns a typed error and the caller keeps the previous
//! snapshot, so two snapshots can always be compared with `==`.
//!
//! ## Async Bookkeeping
//!
//! | Call | Loading state | Notes |
//! |------|---------------|-------|
//! | `begin_operation` | `loading` | issues a new generation, clears the error |
//! | `succeed` | `success` | upserts returned tasks |
//! | `fail` | `error` | stores the message |
//! | `clear_error` | `idle` | only from `error` |
//!
//! Completions carrying an older generation are rejected as
//! [`StaleOperation`]; [`Session`] drops them silently.
//!
//! ## Collaborators
//!
//! - [`Clock`] - time source ([`SystemClock`], [`ManualClock`])
//! - [`TaskValidator`] - extra checks before add/update
//! - [`OperationObserver`] - telemetry ([`TracingObserver`])
//! - [`Session::subscribe`] - channel of replacement snapshots

mod clock;
mod container;
mod observer;
mod session;
mod validator;

pub use clock::{Clock, ManualClock, SystemClock};
pub use container::{LoadingState, OperationTicket, StaleOperation, StateContainer, StateError};
pub use observer::{OperationEvent, OperationObserver, OperationOutcome, TracingObserver};
pub use session::{Session, SessionSettings};
pub use validator::{TaskValidator, TitleLengthValidator, DEFAULT_MAX_TITLE_LENGTH};
