//! # Command-Line Interface
//!
//! The `deck` binary: a thin presentation layer over [`crate::storage::Project`]
//! and [`crate::state::Session`]. Every mutating command loads the project's
//! tasks into a session, applies one operation and persists the result.
//!
//! ## Commands
//!
//! | Group | Commands |
//! |-------|----------|
//! | Project | `init` |
//! | Task | `add`, `show`, `start`, `done`, `cancel`, `edit`, `remove` |
//! | Query | `list`, `stats` |
//!
//! ## Output Formats
//!
//! All commands support the `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! Without the flag the global config's `default_format` applies.
//!
//! ## Logging
//!
//! Logs go to stderr. `--verbose` enables debug events, `RUST_LOG` overrides:
//! ```bash
//! deck --verbose list --overdue
//! ```

mod app;
mod output;
mod query;
mod task;

pub use app::{run, Cli, Commands};
pub use output::{Output, OutputFormat};
