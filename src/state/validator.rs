//! Pluggable validation applied by the session before tasks enter the state

use crate::domain::{Task, ValidationError};

/// Default maximum title length in characters
pub const DEFAULT_MAX_TITLE_LENGTH: usize = 200;

/// Checks a task before it is added or updated
pub trait TaskValidator {
    fn validate(&self, task: &Task) -> Result<(), ValidationError>;
}

impl<F> TaskValidator for F
where
    F: Fn(&Task) -> Result<(), ValidationError>,
{
    fn validate(&self, task: &Task) -> Result<(), ValidationError> {
        self(task)
    }
}

/// Rejects titles longer than a configured number of characters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TitleLengthValidator {
    max: usize,
}

impl TitleLengthValidator {
    pub fn new(max: usize) -> Self {
        Self { max }
    }

    pub fn max(&self) -> usize {
        self.max
    }
}

impl Default for TitleLengthValidator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TITLE_LENGTH)
    }
}

impl TaskValidator for TitleLengthValidator {
    fn validate(&self, task: &Task) -> Result<(), ValidationError> {
        let actual = task.title().chars().count();
        if actual > self.max {
            return Err(ValidationError::TitleTooLong {
                max: self.max,
                actual,
            });
        }
        Ok(())
    }
}
