//! Configuration handling for taskdeck
//!
//! Configuration is stored in `.deck/config.toml` (project) and
//! `~/.config/taskdeck/config.toml` (global).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::TimeDelta;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Query, SortField, SortOrder, DEFAULT_DUE_SOON_HOURS};
use crate::state::{SessionSettings, DEFAULT_MAX_TITLE_LENGTH};

/// Largest accepted `due_soon_hours` (100 years)
pub const MAX_DUE_SOON_HOURS: u32 = 876_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Default ordering for `deck list`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct SortConfig {
    pub field: SortField,
    pub order: SortOrder,
}

/// Project-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProjectConfig {
    /// Hours ahead of now that count as "due soon"
    pub due_soon_hours: u32,

    /// Maximum title length in characters
    pub max_title_length: usize,

    /// Default sort for listings
    pub default_sort: SortConfig,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            due_soon_hours: DEFAULT_DUE_SOON_HOURS,
            max_title_length: DEFAULT_MAX_TITLE_LENGTH,
            default_sort: SortConfig::default(),
        }
    }
}

impl ProjectConfig {
    /// Rejects values the session cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.due_soon_hours == 0 {
            return Err(ConfigError::Invalid(
                "due_soon_hours must be at least 1".to_string(),
            ));
        }
        if self.due_soon_hours > MAX_DUE_SOON_HOURS {
            return Err(ConfigError::Invalid(format!(
                "due_soon_hours must be at most {}",
                MAX_DUE_SOON_HOURS
            )));
        }
        if self.max_title_length == 0 {
            return Err(ConfigError::Invalid(
                "max_title_length must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn due_soon_horizon(&self) -> TimeDelta {
        TimeDelta::try_hours(i64::from(self.due_soon_hours)).unwrap_or(TimeDelta::MAX)
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            due_soon_horizon: self.due_soon_horizon(),
        }
    }

    /// The query a fresh session starts with
    pub fn default_query(&self) -> Query {
        Query::new().sort_by(self.default_sort.field, self.default_sort.order)
    }
}

/// Global user configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GlobalConfig {
    /// Default output format (text or json)
    pub default_format: OutputFormat,
}

/// Output format for commands
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Combined configuration (global + project)
#[derive(Debug, Clone)]
pub struct Config {
    pub project: ProjectConfig,
    pub global: GlobalConfig,
    pub project_root: Option<PathBuf>,
}

impl Config {
    /// Loads configuration from default locations
    pub fn load() -> Result<Self> {
        let global = Self::load_global()?;
        let project_root = Self::find_project_root();
        let project = match &project_root {
            Some(root) => Self::load_project_config(root)?,
            None => ProjectConfig::default(),
        };

        Ok(Self {
            project,
            global,
            project_root,
        })
    }

    /// Loads configuration for a specific project
    pub fn for_project(project_root: &Path) -> Result<Self> {
        let global = Self::load_global()?;
        let project = Self::load_project_config(project_root)?;

        Ok(Self {
            project,
            global,
            project_root: Some(project_root.to_path_buf()),
        })
    }

    /// Returns the global config directory
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("dev", "taskdeck", "taskdeck")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Loads global configuration
    fn load_global() -> Result<GlobalConfig> {
        let config_dir = match Self::global_config_dir() {
            Some(dir) => dir,
            None => return Ok(GlobalConfig::default()),
        };

        let config_path = config_dir.join("config.toml");
        if !config_path.exists() {
            return Ok(GlobalConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read global config: {}", config_path.display()))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse global config")
    }

    /// Loads and validates project configuration from a specific root
    fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
        let config_path = project_root.join(".deck").join("config.toml");

        if !config_path.exists() {
            return Ok(ProjectConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read project config: {}", config_path.display()))?;

        Self::parse_project_config(&content)
    }

    fn parse_project_config(content: &str) -> Result<ProjectConfig> {
        let config: ProjectConfig = toml::from_str(content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse project config")?;

        config.validate().context("Invalid project config")?;
        Ok(config)
    }

    /// Finds the project root by looking for `.deck/` from the current directory up
    pub fn find_project_root() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;
        Self::find_project_root_from(&current)
    }

    /// Finds the project root by looking for `.deck/` from `start` up
    pub fn find_project_root_from(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .find(|dir| dir.join(".deck").is_dir())
            .map(Path::to_path_buf)
    }
}
