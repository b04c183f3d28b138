//! Task domain model
//!
//! Tasks are immutable value objects. Every change (`apply_patch`,
//! `transition_status`) returns a new `Task`; nothing is mutated in place.
//! The serialized record uses camelCase field names and enum values, which
//! is the shape handed to persistence collaborators.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::id::TaskId;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ValidationError {
    #[error("Task title must not be empty")]
    EmptyTitle,

    #[error("Task title is too long: {actual} characters (max {max})")]
    TitleTooLong { max: usize, actual: usize },

    #[error("Tags must not be blank")]
    BlankTag,

    #[error("Task already exists: {0}")]
    DuplicateId(TaskId),

    #[error("Illegal status transition for {id}: {from} -> {to}")]
    IllegalTransition {
        id: TaskId,
        from: TaskStatus,
        to: TaskStatus,
    },

    #[error("Creation time of {id} cannot change")]
    CreatedAtChanged { id: TaskId },
}

/// Error returned when parsing an enum value from user input
#[derive(Debug, Error, PartialEq, Eq, Clone)]
#[error("Unknown {kind}: '{value}' (expected one of: {expected})")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
    expected: &'static str,
}

impl ParseEnumError {
    pub(crate) fn new(kind: &'static str, value: &str, expected: &'static str) -> Self {
        Self {
            kind,
            value: value.to_string(),
            expected,
        }
    }
}

/// Normalizes user spellings like `in_progress`, `In-Progress` or `inProgress`
pub(crate) fn normalize_keyword(s: &str) -> String {
    s.trim()
        .chars()
        .filter(|c| *c != '_' && *c != '-' && *c != ' ')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Status of a task
///
/// Variant order is the declared order used when sorting by status.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "camelCase")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::Pending,
        TaskStatus::InProgress,
        TaskStatus::Completed,
        TaskStatus::Cancelled,
    ];

    /// Returns true for `completed` and `cancelled`
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Cancelled)
    }

    /// Returns true if the state machine allows moving from `self` to `next`
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        matches!(
            (self, next),
            (TaskStatus::Pending, TaskStatus::InProgress)
                | (TaskStatus::InProgress, TaskStatus::Completed)
                | (TaskStatus::Pending, TaskStatus::Cancelled)
                | (TaskStatus::InProgress, TaskStatus::Cancelled)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "inProgress",
            TaskStatus::Completed => "completed",
            TaskStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_keyword(s).as_str() {
            "pending" => Ok(TaskStatus::Pending),
            "inprogress" => Ok(TaskStatus::InProgress),
            "completed" => Ok(TaskStatus::Completed),
            "cancelled" | "canceled" => Ok(TaskStatus::Cancelled),
            _ => Err(ParseEnumError::new(
                "status",
                s,
                "pending, inProgress, completed, cancelled",
            )),
        }
    }
}

/// Priority of a task
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "camelCase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    /// Numeric weight used for sorting
    pub fn weight(&self) -> u8 {
        match self {
            Priority::Low => 1,
            Priority::Medium => 2,
            Priority::High => 3,
            Priority::Urgent => 4,
        }
    }

    /// Returns true for `high` and `urgent`
    pub fn is_high(&self) -> bool {
        self.weight() >= Priority::High.weight()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_keyword(s).as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            "urgent" => Ok(Priority::Urgent),
            _ => Err(ParseEnumError::new(
                "priority",
                s,
                "low, medium, high, urgent",
            )),
        }
    }
}

/// Serializes an optional duration as whole milliseconds
pub(crate) mod duration_millis {
    use chrono::TimeDelta;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<TimeDelta>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(duration) => serializer.serialize_some(&duration.num_milliseconds()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<TimeDelta>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis: Option<i64> = Option::deserialize(deserializer)?;
        millis
            .map(|ms| {
                TimeDelta::try_milliseconds(ms).ok_or_else(|| {
                    serde::de::Error::custom(format!("duration out of range: {}ms", ms))
                })
            })
            .transpose()
    }
}

fn normalize_title(title: &str) -> Result<String, ValidationError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    Ok(title.to_string())
}

fn normalize_tags<I, S>(tags: I) -> Result<BTreeSet<String>, ValidationError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tags.into_iter()
        .map(|tag| {
            let tag = tag.as_ref().trim().to_lowercase();
            if tag.is_empty() {
                Err(ValidationError::BlankTag)
            } else {
                Ok(tag)
            }
        })
        .collect()
}

/// Fields supplied by the caller when creating a task
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewTask {
    pub id: Option<TaskId>,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub tags: Vec<String>,
    pub due_date: Option<DateTime<Utc>>,
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Uses a caller-supplied ID instead of generating one
    pub fn with_id(mut self, id: TaskId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn due(mut self, due_date: DateTime<Utc>) -> Self {
        self.due_date = Some(due_date);
        self
    }
}

/// Field-wise changes applied by [`Task::apply_patch`]
///
/// Unset fields are copied unchanged. `due_date` distinguishes "leave as
/// is" (`None`) from "clear" (`Some(None)`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub tags: Option<Vec<String>>,
    pub due_date: Option<Option<DateTime<Utc>>>,
}

impl TaskPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Replaces the whole tag set
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    pub fn due(mut self, due_date: DateTime<Utc>) -> Self {
        self.due_date = Some(Some(due_date));
        self
    }

    pub fn clear_due(mut self) -> Self {
        self.due_date = Some(None);
        self
    }

    /// Returns true if the patch changes nothing
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.priority.is_none()
            && self.tags.is_none()
            && self.due_date.is_none()
    }
}

/// A task record
///
/// Deserialization goes through [`TaskRecord`], so stored records get the
/// same title and tag normalization as [`Task::create`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "TaskRecord")]
pub struct Task {
    id: TaskId,

    title: String,

    #[serde(default)]
    description: String,

    #[serde(default)]
    status: TaskStatus,

    #[serde(default)]
    priority: Priority,

    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    tags: BTreeSet<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    due_date: Option<DateTime<Utc>>,

    created_at: DateTime<Utc>,

    /// Set exactly once, when the task enters `completed`
    #[serde(
        default,
        with = "duration_millis",
        skip_serializing_if = "Option::is_none"
    )]
    completion_duration: Option<TimeDelta>,
}

/// Unchecked wire form of a [`Task`]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskRecord {
    id: TaskId,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    status: TaskStatus,
    #[serde(default)]
    priority: Priority,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    due_date: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    #[serde(default, with = "duration_millis")]
    completion_duration: Option<TimeDelta>,
}

impl TryFrom<TaskRecord> for Task {
    type Error = ValidationError;

    fn try_from(record: TaskRecord) -> Result<Self, Self::Error> {
        // Only completed tasks carry a duration
        let completion_duration = match record.status {
            TaskStatus::Completed => record.completion_duration,
            _ => None,
        };

        Ok(Self {
            id: record.id,
            title: normalize_title(&record.title)?,
            description: record.description.trim().to_string(),
            status: record.status,
            priority: record.priority,
            tags: normalize_tags(&record.tags)?,
            due_date: record.due_date,
            created_at: record.created_at,
            completion_duration,
        })
    }
}

impl Task {
    /// Creates a pending task, stamping its ID and `created_at`
    pub fn create(fields: NewTask, now: DateTime<Utc>) -> Result<Self, ValidationError> {
        let title = normalize_title(&fields.title)?;
        let tags = normalize_tags(&fields.tags)?;
        let id = fields
            .id
            .unwrap_or_else(|| TaskId::generate(&title, now));

        Ok(Self {
            id,
            title,
            description: fields.description.trim().to_string(),
            status: TaskStatus::Pending,
            priority: fields.priority,
            tags,
            due_date: fields.due_date,
            created_at: now,
            completion_duration: None,
        })
    }

    pub fn id(&self) -> &TaskId {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    pub fn due_date(&self) -> Option<DateTime<Utc>> {
        self.due_date
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn completion_duration(&self) -> Option<TimeDelta> {
        self.completion_duration
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Past its due date and still open
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.is_terminal() && self.due_date.is_some_and(|due| due < now)
    }

    /// Due within `[now, now + horizon]` and still open
    ///
    /// A horizon reaching past the representable range has no upper bound.
    pub fn is_due_soon(&self, now: DateTime<Utc>, horizon: TimeDelta) -> bool {
        let end = now.checked_add_signed(horizon);
        !self.is_terminal()
            && self
                .due_date
                .is_some_and(|due| due >= now && end.map_or(true, |end| due <= end))
    }

    /// Case-insensitive tag membership
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(&tag.trim().to_lowercase())
    }

    /// Returns true if `needle` (already lowercased) occurs in the title,
    /// description or any tag
    pub(crate) fn contains_text(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
            || self.description.to_lowercase().contains(needle)
            || self.tags.iter().any(|tag| tag.contains(needle))
    }

    /// Moves the task to `next`, returning the new value
    ///
    /// Entering `completed` records `completion_duration = at - created_at`.
    pub fn transition_status(
        &self,
        next: TaskStatus,
        at: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        if !self.status.can_transition_to(next) {
            return Err(ValidationError::IllegalTransition {
                id: self.id.clone(),
                from: self.status,
                to: next,
            });
        }

        Ok(Self {
            status: next,
            completion_duration: self.completion_after(next, at),
            ..self.clone()
        })
    }

    /// Accepts `replacement` as the next version of this task
    ///
    /// `created_at` must match, a status change must be a legal transition,
    /// and `completion_duration` is only ever set by entering `completed`.
    pub fn supersede(
        &self,
        replacement: Task,
        at: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        if replacement.created_at != self.created_at {
            return Err(ValidationError::CreatedAtChanged {
                id: self.id.clone(),
            });
        }

        let completion_duration = if replacement.status == self.status {
            self.completion_duration
        } else {
            self.transition_status(replacement.status, at)?
                .completion_duration
        };

        Ok(Self {
            completion_duration,
            ..replacement
        })
    }

    fn completion_after(&self, next: TaskStatus, at: DateTime<Utc>) -> Option<TimeDelta> {
        if next == TaskStatus::Completed {
            Some((at - self.created_at).max(TimeDelta::zero()))
        } else {
            self.completion_duration
        }
    }

    /// Returns a copy with the patched fields replaced
    pub fn apply_patch(&self, patch: TaskPatch) -> Result<Self, ValidationError> {
        let title = match patch.title {
            Some(title) => normalize_title(&title)?,
            None => self.title.clone(),
        };
        let tags = match patch.tags {
            Some(tags) => normalize_tags(&tags)?,
            None => self.tags.clone(),
        };

        Ok(Self {
            title,
            description: patch
                .description
                .map(|d| d.trim().to_string())
                .unwrap_or_else(|| self.description.clone()),
            priority: patch.priority.unwrap_or(self.priority),
            tags,
            due_date: patch.due_date.unwrap_or(self.due_date),
            ..self.clone()
        })
    }
}
