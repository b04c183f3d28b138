//! Project management
//!
//! Handles project initialization and wires stores and configuration into
//! a ready-to-use [`Session`].

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;

use super::repository::{load_into, save_from};
use super::{Config, TaskStore};
use crate::state::{Session, TitleLengthValidator, TracingObserver};

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("Not in a taskdeck project. Run 'deck init' first.")]
    NotInProject,
}

const DEFAULT_CONFIG: &str = r#"# taskdeck configuration

# Hours ahead of now that count as "due soon"
due_soon_hours = 48

# Maximum task title length in characters
max_title_length = 200

# Default ordering for 'deck list'
# field: createdAt, dueDate, priority, title, status
# order: asc, desc
[default_sort]
field = "createdAt"
order = "asc"
"#;

const DEFAULT_GITIGNORE: &str = r#"# Ignore interrupted writes
*.tmp
"#;

/// A taskdeck project
pub struct Project {
    root: PathBuf,
    config: Config,
}

impl Project {
    /// Opens an existing project at the given path
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let deck_dir = root.join(".deck");

        if !deck_dir.is_dir() {
            return Err(ProjectError::NotInProject.into());
        }

        let config = Config::for_project(&root)?;

        Ok(Self { root, config })
    }

    /// Opens the project at the current directory or a parent
    pub fn open_current() -> Result<Self> {
        let root = Config::find_project_root().ok_or(ProjectError::NotInProject)?;

        Self::open(root)
    }

    /// Initializes a new project at the given path
    pub fn init(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let deck_dir = root.join(".deck");

        fs::create_dir_all(&deck_dir).with_context(|| {
            format!("Failed to create .deck directory: {}", deck_dir.display())
        })?;

        let config_path = deck_dir.join("config.toml");
        if !config_path.exists() {
            fs::write(&config_path, DEFAULT_CONFIG)
                .with_context(|| format!("Failed to write config: {}", config_path.display()))?;
        }

        let gitignore_path = deck_dir.join(".gitignore");
        if !gitignore_path.exists() {
            fs::write(&gitignore_path, DEFAULT_GITIGNORE).with_context(|| {
                format!("Failed to write .gitignore: {}", gitignore_path.display())
            })?;
        }

        Self::open(root)
    }

    /// Returns the project root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the .deck directory path
    pub fn deck_dir(&self) -> PathBuf {
        self.root.join(".deck")
    }

    /// Returns the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the task store
    pub fn task_store(&self) -> TaskStore {
        TaskStore::for_project(&self.root)
    }

    /// Builds a configured session and loads the stored tasks into it
    pub fn session(&self) -> Result<Session> {
        let project = &self.config.project;
        let mut session = Session::new()
            .settings(project.session_settings())
            .validator(TitleLengthValidator::new(project.max_title_length))
            .observer(TracingObserver);
        session.set_query(project.default_query());

        load_into(&mut session, &self.task_store())?;
        Ok(session)
    }

    /// Writes the session's tasks back to the store
    pub fn persist(&self, session: &mut Session) -> Result<()> {
        save_from(session, &self.task_store())
    }
}
