//! Declarative filter + sort queries over tasks
//!
//! A [`Query`] is a plain value. Applying it is pure: time-dependent
//! criteria read `now` from an explicit [`QueryContext`], so the same query,
//! collection and context always produce the same result.
//!
//! Sorting is stable. Tasks without a due date always sort after dated
//! tasks when sorting by due date, in both directions.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use super::task::{normalize_keyword, ParseEnumError, Priority, Task, TaskStatus};

/// Default window for "due soon"
pub const DEFAULT_DUE_SOON_HOURS: u32 = 48;

/// Field used to order query results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    #[default]
    CreatedAt,
    DueDate,
    Priority,
    Title,
    Status,
}

impl SortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::CreatedAt => "createdAt",
            SortField::DueDate => "dueDate",
            SortField::Priority => "priority",
            SortField::Title => "title",
            SortField::Status => "status",
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for SortField {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_keyword(s).as_str() {
            "createdat" | "created" => Ok(SortField::CreatedAt),
            "duedate" | "due" => Ok(SortField::DueDate),
            "priority" => Ok(SortField::Priority),
            "title" => Ok(SortField::Title),
            "status" => Ok(SortField::Status),
            _ => Err(ParseEnumError::new(
                "sort field",
                s,
                "createdAt, dueDate, priority, title, status",
            )),
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortOrder {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_keyword(s).as_str() {
            "asc" | "ascending" => Ok(SortOrder::Asc),
            "desc" | "descending" => Ok(SortOrder::Desc),
            _ => Err(ParseEnumError::new("sort order", s, "asc, desc")),
        }
    }
}

/// Evaluation context for time-dependent criteria
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryContext {
    pub now: DateTime<Utc>,
    pub due_soon_horizon: TimeDelta,
}

impl QueryContext {
    pub fn new(now: DateTime<Utc>, due_soon_horizon: TimeDelta) -> Self {
        Self {
            now,
            due_soon_horizon,
        }
    }

    /// Context at `now` with the default 48h horizon
    pub fn at(now: DateTime<Utc>) -> Self {
        Self::new(now, TimeDelta::hours(i64::from(DEFAULT_DUE_SOON_HOURS)))
    }
}

/// Filter and sort criteria
///
/// Every set criterion must match (AND semantics). Unset criteria and an
/// empty `search_text` match everything.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Query {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_filter: Option<TaskStatus>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority_filter: Option<Priority>,

    pub search_text: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_filter: Option<String>,

    pub overdue_only: bool,

    pub due_soon_only: bool,

    /// Inclusive lower bound on `created_at`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_after: Option<DateTime<Utc>>,

    /// Inclusive upper bound on `created_at`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_before: Option<DateTime<Utc>>,

    pub sort_field: SortField,

    pub sort_order: SortOrder,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: TaskStatus) -> Self {
        self.status_filter = Some(status);
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority_filter = Some(priority);
        self
    }

    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search_text = text.into();
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag_filter = Some(tag.into());
        self
    }

    pub fn overdue_only(mut self) -> Self {
        self.overdue_only = true;
        self
    }

    pub fn due_soon_only(mut self) -> Self {
        self.due_soon_only = true;
        self
    }

    pub fn created_between(
        mut self,
        after: Option<DateTime<Utc>>,
        before: Option<DateTime<Utc>>,
    ) -> Self {
        self.created_after = after;
        self.created_before = before;
        self
    }

    pub fn sort_by(mut self, field: SortField, order: SortOrder) -> Self {
        self.sort_field = field;
        self.sort_order = order;
        self
    }

    /// Returns true if no filter criterion is set
    pub fn is_match_all(&self) -> bool {
        self.status_filter.is_none()
            && self.priority_filter.is_none()
            && self.search_text.trim().is_empty()
            && self.tag_filter.is_none()
            && !self.overdue_only
            && !self.due_soon_only
            && self.created_after.is_none()
            && self.created_before.is_none()
    }

    /// Returns true if `task` satisfies every active criterion
    pub fn matches(&self, task: &Task, ctx: &QueryContext) -> bool {
        let needle = self.search_text.trim().to_lowercase();
        self.matches_with_needle(task, ctx, &needle)
    }

    fn matches_with_needle(&self, task: &Task, ctx: &QueryContext, needle: &str) -> bool {
        if self.status_filter.is_some_and(|s| task.status() != s) {
            return false;
        }
        if self.priority_filter.is_some_and(|p| task.priority() != p) {
            return false;
        }
        if let Some(tag) = &self.tag_filter {
            if !task.has_tag(tag) {
                return false;
            }
        }
        if !needle.is_empty() && !task.contains_text(needle) {
            return false;
        }
        if self.overdue_only && !task.is_overdue(ctx.now) {
            return false;
        }
        if self.due_soon_only && !task.is_due_soon(ctx.now, ctx.due_soon_horizon) {
            return false;
        }
        if self.created_after.is_some_and(|after| task.created_at() < after) {
            return false;
        }
        if self.created_before.is_some_and(|before| task.created_at() > before) {
            return false;
        }
        true
    }

    /// Compares two tasks by the configured sort field and order
    pub fn compare(&self, a: &Task, b: &Task) -> Ordering {
        let directed = |ordering: Ordering| match self.sort_order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        };

        match self.sort_field {
            SortField::CreatedAt => directed(a.created_at().cmp(&b.created_at())),
            SortField::Title => directed(
                a.title()
                    .to_lowercase()
                    .cmp(&b.title().to_lowercase()),
            ),
            SortField::Status => directed(a.status().cmp(&b.status())),
            SortField::Priority => directed(a.priority().weight().cmp(&b.priority().weight())),
            // Missing due dates go last in both directions
            SortField::DueDate => match (a.due_date(), b.due_date()) {
                (Some(x), Some(y)) => directed(x.cmp(&y)),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
        }
    }

    /// Filters then stably sorts `tasks`
    pub fn apply(&self, tasks: &[Task], ctx: &QueryContext) -> Vec<Task> {
        let needle = self.search_text.trim().to_lowercase();
        let mut view: Vec<Task> = tasks
            .iter()
            .filter(|task| self.matches_with_needle(task, ctx, &needle))
            .cloned()
            .collect();

        view.sort_by(|a, b| self.compare(a, b));
        view
    }
}
