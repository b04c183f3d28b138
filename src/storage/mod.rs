//! # Storage Layer
//!
//! Persistence collaborator for the task state, using git-friendly files.
//!
//! ## Storage Formats
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Tasks | JSONL (one JSON per line) | `.deck/tasks.jsonl` |
//! | Config | TOML | `.deck/config.toml` |
//!
//! ## Concurrency Safety
//!
//! - [`TaskStore`] uses file locking (`fs2`) for concurrent access
//! - Full rewrites are atomic (temp file + rename)
//!
//! ## Key Types
//!
//! - [`Project`] - Entry point for accessing a taskdeck project
//! - [`TaskRepository`] - Load/save contract used by the session
//! - [`TaskStore`] - Read/write tasks as JSONL
//! - [`Config`] - Project and global configuration

mod jsonl;
mod config;
mod project;
mod repository;

pub use jsonl::TaskStore;
pub use config::{Config, ConfigError, GlobalConfig, OutputFormat, ProjectConfig, SortConfig};
pub use project::{Project, ProjectError};
pub use repository::{load_into, save_from, TaskRepository};
