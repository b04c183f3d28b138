//! Immutable state container
//!
//! Every operation borrows the current snapshot and returns a new one, so a
//! failed operation leaves the caller holding the untouched prior value.
//!
//! Async bookkeeping uses generations: `begin_operation` issues a ticket
//! with a strictly increasing generation, and only the ticket of the latest
//! in-flight operation may complete it. Earlier tickets are stale.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::domain::{Query, QueryContext, Statistics, Task, TaskId, TaskStatus, ValidationError};

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum StateError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Task not found: {0}")]
    NotFound(TaskId),
}

/// A completion that arrived after a newer operation started
#[derive(Debug, Error, PartialEq, Eq, Clone)]
#[error("Stale completion of '{tag}' (generation {generation}, latest {latest})")]
pub struct StaleOperation {
    pub tag: String,
    pub generation: u64,
    pub latest: u64,
}

/// Async operation state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum LoadingState {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

/// Handle for an in-flight operation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct OperationTicket {
    tag: String,
    generation: u64,
}

impl OperationTicket {
    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// A snapshot of the task state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateContainer {
    tasks: Vec<Task>,
    query: Query,
    loading_state: LoadingState,
    current_operation: Option<OperationTicket>,
    error_message: Option<String>,
    selected_id: Option<TaskId>,
    last_updated: DateTime<Utc>,
    /// Latest issued operation generation
    generation: u64,
}

impl StateContainer {
    /// The empty starting state
    pub fn initial(now: DateTime<Utc>) -> Self {
        Self {
            tasks: Vec::new(),
            query: Query::default(),
            loading_state: LoadingState::Idle,
            current_operation: None,
            error_message: None,
            selected_id: None,
            last_updated: now,
            generation: 0,
        }
    }

    /// Starting state seeded with a collection, rejecting duplicate IDs
    pub fn with_tasks(tasks: Vec<Task>, now: DateTime<Utc>) -> Result<Self, StateError> {
        tasks
            .into_iter()
            .try_fold(Self::initial(now), |state, task| state.add_task(task, now))
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn loading_state(&self) -> LoadingState {
        self.loading_state
    }

    pub fn current_operation(&self) -> Option<&OperationTicket> {
        self.current_operation.as_ref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn selected_id(&self) -> Option<&TaskId> {
        self.selected_id.as_ref()
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    fn position(&self, id: &TaskId) -> Option<usize> {
        self.tasks.iter().position(|t| t.id() == id)
    }

    pub fn contains(&self, id: &TaskId) -> bool {
        self.position(id).is_some()
    }

    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id() == id)
    }

    /// The selected task, if the selection points at an existing one
    pub fn selected(&self) -> Option<&Task> {
        self.selected_id.as_ref().and_then(|id| self.get(id))
    }

    /// Keeps `last_updated` monotonic even if the clock steps back
    fn touched(mut self, at: DateTime<Utc>) -> Self {
        self.last_updated = self.last_updated.max(at);
        self
    }

    pub fn add_task(&self, task: Task, at: DateTime<Utc>) -> Result<Self, StateError> {
        if self.contains(task.id()) {
            return Err(ValidationError::DuplicateId(task.id().clone()).into());
        }

        let mut next = self.clone();
        next.tasks.push(task);
        Ok(next.touched(at))
    }

    /// Replaces the task with the same ID, keeping its position
    ///
    /// The replacement goes through [`Task::supersede`], so creation time,
    /// terminal statuses and the recorded completion duration survive.
    pub fn update_task(&self, task: Task, at: DateTime<Utc>) -> Result<Self, StateError> {
        let index = self
            .position(task.id())
            .ok_or_else(|| StateError::NotFound(task.id().clone()))?;
        let task = self.tasks[index].supersede(task, at)?;

        let mut next = self.clone();
        next.tasks[index] = task;
        Ok(next.touched(at))
    }

    /// Removes a task; absent IDs are a no-op
    pub fn remove_task(&self, id: &TaskId, at: DateTime<Utc>) -> Self {
        let Some(index) = self.position(id) else {
            return self.clone();
        };

        let mut next = self.clone();
        next.tasks.remove(index);
        if next.selected_id.as_ref() == Some(id) {
            next.selected_id = None;
        }
        next.touched(at)
    }

    pub fn transition_task(
        &self,
        id: &TaskId,
        status: TaskStatus,
        at: DateTime<Utc>,
    ) -> Result<Self, StateError> {
        let task = self
            .get(id)
            .ok_or_else(|| StateError::NotFound(id.clone()))?
            .transition_status(status, at)?;

        self.update_task(task, at)
    }

    pub fn set_query(&self, query: Query) -> Self {
        Self {
            query,
            ..self.clone()
        }
    }

    pub fn select(&self, id: Option<TaskId>) -> Self {
        Self {
            selected_id: id,
            ..self.clone()
        }
    }

    /// Starts tracking an operation, superseding any in-flight one
    pub fn begin_operation(
        &self,
        tag: impl Into<String>,
        at: DateTime<Utc>,
    ) -> (Self, OperationTicket) {
        let ticket = OperationTicket {
            tag: tag.into(),
            generation: self.generation + 1,
        };

        let next = Self {
            loading_state: LoadingState::Loading,
            current_operation: Some(ticket.clone()),
            error_message: None,
            generation: ticket.generation,
            ..self.clone()
        };

        (next.touched(at), ticket)
    }

    fn check_current(&self, ticket: &OperationTicket) -> Result<(), StaleOperation> {
        match &self.current_operation {
            Some(current) if current.generation == ticket.generation => Ok(()),
            _ => Err(StaleOperation {
                tag: ticket.tag.clone(),
                generation: ticket.generation,
                latest: self.generation,
            }),
        }
    }

    /// Completes the current operation, upserting any returned tasks
    ///
    /// Tasks with known IDs replace the existing entry in place; new IDs are
    /// appended in the order given.
    pub fn succeed(
        &self,
        ticket: &OperationTicket,
        tasks: Option<Vec<Task>>,
        at: DateTime<Utc>,
    ) -> Result<Self, StaleOperation> {
        self.check_current(ticket)?;

        let mut next = Self {
            loading_state: LoadingState::Success,
            current_operation: None,
            ..self.clone()
        };

        for task in tasks.into_iter().flatten() {
            match next.position(task.id()) {
                Some(index) => next.tasks[index] = task,
                None => next.tasks.push(task),
            }
        }

        Ok(next.touched(at))
    }

    pub fn fail(
        &self,
        ticket: &OperationTicket,
        message: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Result<Self, StaleOperation> {
        self.check_current(ticket)?;

        let next = Self {
            loading_state: LoadingState::Error,
            current_operation: None,
            error_message: Some(message.into()),
            ..self.clone()
        };

        Ok(next.touched(at))
    }

    /// Returns to `idle` from `error`; no-op in any other state
    pub fn clear_error(&self) -> Self {
        if self.loading_state != LoadingState::Error {
            return self.clone();
        }

        Self {
            loading_state: LoadingState::Idle,
            error_message: None,
            ..self.clone()
        }
    }

    /// Tasks matching the active query, in query order
    pub fn filtered_view(&self, ctx: &QueryContext) -> Vec<Task> {
        self.query.apply(&self.tasks, ctx)
    }

    pub fn statistics(&self, ctx: &QueryContext) -> Statistics {
        Statistics::compute(&self.tasks, ctx)
    }

    pub fn filtered_statistics(&self, ctx: &QueryContext) -> Statistics {
        Statistics::compute(&self.filtered_view(ctx), ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NewTask, SortField, SortOrder, TaskPatch};
    use chrono::TimeDelta;

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn t0() -> DateTime<Utc> {
        ts("2025-01-01T00:00:00Z")
    }

    fn id(s: &str) -> TaskId {
        s.parse().unwrap()
    }

    fn make_task(s: &str) -> Task {
        Task::create(NewTask::new(format!("Task {}", s)).with_id(id(s)), t0()).unwrap()
    }

    fn seeded(ids: &[&str]) -> StateContainer {
        StateContainer::with_tasks(ids.iter().map(|s| make_task(s)).collect(), t0()).unwrap()
    }

    #[test]
    fn initial_state() {
        let state = StateContainer::initial(t0());

        assert!(state.is_empty());
        assert_eq!(state.loading_state(), LoadingState::Idle);
        assert!(state.current_operation().is_none());
        assert!(state.error_message().is_none());
        assert!(state.selected_id().is_none());
        assert_eq!(state.generation(), 0);
        assert_eq!(state.last_updated(), t0());
    }

    #[test]
    fn add_appends_and_stamps() {
        let state = StateContainer::initial(t0());
        let later = t0() + TimeDelta::minutes(5);

        let next = state.add_task(make_task("1"), later).unwrap();
        assert_eq!(next.len(), 1);
        assert_eq!(next.last_updated(), later);
        assert!(state.is_empty());
    }

    #[test]
    fn add_duplicate_fails_and_leaves_state_unchanged() {
        let state = seeded(&["1", "2"]);
        let before = state.clone();

        let err = state.add_task(make_task("1"), t0()).unwrap_err();
        assert_eq!(err, StateError::Validation(ValidationError::DuplicateId(id("1"))));
        assert_eq!(state, before);
    }

    #[test]
    fn with_tasks_rejects_duplicates() {
        let result = StateContainer::with_tasks(vec![make_task("1"), make_task("1")], t0());
        assert!(matches!(
            result,
            Err(StateError::Validation(ValidationError::DuplicateId(_)))
        ));
    }

    #[test]
    fn update_preserves_position() {
        let state = seeded(&["1", "2", "3"]);
        let renamed = state
            .get(&id("2"))
            .unwrap()
            .apply_patch(TaskPatch::new().title("Renamed"))
            .unwrap();

        let next = state.update_task(renamed, t0()).unwrap();
        let titles: Vec<_> = next.tasks().iter().map(|t| t.title()).collect();
        assert_eq!(titles, vec!["Task 1", "Renamed", "Task 3"]);
    }

    #[test]
    fn update_unknown_is_not_found() {
        let state = seeded(&["1"]);
        let err = state.update_task(make_task("9"), t0()).unwrap_err();
        assert_eq!(err, StateError::NotFound(id("9")));
    }

    #[test]
    fn update_cannot_move_created_at() {
        let state = seeded(&["1"]);
        let later = t0() + TimeDelta::days(1);
        let recreated =
            Task::create(NewTask::new("Task 1").with_id(id("1")), ts("2030-01-01T00:00:00Z"))
                .unwrap();

        let err = state.update_task(recreated, later).unwrap_err();
        assert_eq!(
            err,
            StateError::Validation(ValidationError::CreatedAtChanged { id: id("1") })
        );
        assert_eq!(state.get(&id("1")).unwrap().created_at(), t0());
    }

    #[test]
    fn update_cannot_reopen_completed_task() {
        let at = t0() + TimeDelta::hours(2);
        let pending = make_task("1");
        let state = seeded(&["1"])
            .transition_task(&id("1"), TaskStatus::InProgress, at)
            .unwrap()
            .transition_task(&id("1"), TaskStatus::Completed, at)
            .unwrap();
        let before = state.clone();

        let err = state.update_task(pending, at).unwrap_err();
        assert!(matches!(
            err,
            StateError::Validation(ValidationError::IllegalTransition {
                from: TaskStatus::Completed,
                to: TaskStatus::Pending,
                ..
            })
        ));
        assert_eq!(state, before);
    }

    #[test]
    fn update_keeps_recorded_completion_duration() {
        let done_at = t0() + TimeDelta::hours(2);
        let state = seeded(&["1"])
            .transition_task(&id("1"), TaskStatus::InProgress, t0())
            .unwrap()
            .transition_task(&id("1"), TaskStatus::Completed, done_at)
            .unwrap();

        let renamed = state
            .get(&id("1"))
            .unwrap()
            .apply_patch(TaskPatch::new().title("Renamed"))
            .unwrap();
        let next = state
            .update_task(renamed, done_at + TimeDelta::days(3))
            .unwrap();

        let task = next.get(&id("1")).unwrap();
        assert_eq!(task.title(), "Renamed");
        assert_eq!(task.status(), TaskStatus::Completed);
        assert_eq!(task.completion_duration(), Some(TimeDelta::hours(2)));
    }

    #[test]
    fn remove_clears_matching_selection() {
        let state = seeded(&["1", "2"]).select(Some(id("2")));
        assert_eq!(state.selected().map(|t| t.id().as_str()), Some("2"));

        let next = state.remove_task(&id("2"), t0());
        assert_eq!(next.len(), 1);
        assert!(next.selected_id().is_none());

        let kept = state.remove_task(&id("1"), t0());
        assert_eq!(kept.selected_id(), Some(&id("2")));
    }

    #[test]
    fn remove_absent_is_noop() {
        let state = seeded(&["1"]);
        assert_eq!(state.remove_task(&id("nope"), t0() + TimeDelta::hours(1)), state);
    }

    #[test]
    fn transition_through_container() {
        let state = seeded(&["1"]);
        let at = t0() + TimeDelta::hours(1);

        let next = state
            .transition_task(&id("1"), TaskStatus::InProgress, at)
            .unwrap()
            .transition_task(&id("1"), TaskStatus::Completed, at)
            .unwrap();
        let task = next.get(&id("1")).unwrap();
        assert_eq!(task.status(), TaskStatus::Completed);
        assert_eq!(task.completion_duration(), Some(TimeDelta::hours(1)));

        assert!(matches!(
            next.transition_task(&id("1"), TaskStatus::Pending, at),
            Err(StateError::Validation(ValidationError::IllegalTransition { .. }))
        ));
        assert_eq!(
            state.transition_task(&id("x"), TaskStatus::InProgress, at),
            Err(StateError::NotFound(id("x")))
        );
    }

    #[test]
    fn structural_errors_do_not_touch_loading_state() {
        let (state, _ticket) = seeded(&["1"]).begin_operation("refresh", t0());
        assert!(state.add_task(make_task("1"), t0()).is_err());
        assert_eq!(state.loading_state(), LoadingState::Loading);
    }

    #[test]
    fn operation_lifecycle() {
        let state = StateContainer::initial(t0());

        let (loading, ticket) = state.begin_operation("load", t0());
        assert_eq!(loading.loading_state(), LoadingState::Loading);
        assert_eq!(loading.current_operation(), Some(&ticket));
        assert_eq!(ticket.generation(), 1);
        assert_eq!(ticket.tag(), "load");

        let done = loading
            .succeed(&ticket, Some(vec![make_task("1"), make_task("2")]), t0())
            .unwrap();
        assert_eq!(done.loading_state(), LoadingState::Success);
        assert!(done.current_operation().is_none());
        assert_eq!(done.len(), 2);
    }

    #[test]
    fn succeed_merges_by_id() {
        let state = seeded(&["1", "2"]);
        let (loading, ticket) = state.begin_operation("refresh", t0());

        let changed = make_task("2")
            .apply_patch(TaskPatch::new().title("Fresh"))
            .unwrap();
        let done = loading
            .succeed(&ticket, Some(vec![make_task("3"), changed]), t0())
            .unwrap();

        let view: Vec<_> = done
            .tasks()
            .iter()
            .map(|t| (t.id().as_str(), t.title()))
            .collect();
        assert_eq!(
            view,
            vec![("1", "Task 1"), ("2", "Fresh"), ("3", "Task 3")]
        );
    }

    #[test]
    fn fail_then_clear_error() {
        let (loading, ticket) = StateContainer::initial(t0()).begin_operation("save", t0());

        let failed = loading.fail(&ticket, "disk full", t0()).unwrap();
        assert_eq!(failed.loading_state(), LoadingState::Error);
        assert_eq!(failed.error_message(), Some("disk full"));
        assert!(failed.current_operation().is_none());

        let cleared = failed.clear_error();
        assert_eq!(cleared.loading_state(), LoadingState::Idle);
        assert!(cleared.error_message().is_none());
    }

    #[test]
    fn clear_error_is_noop_outside_error() {
        let state = StateContainer::initial(t0());
        assert_eq!(state.clear_error(), state);

        let (loading, _) = state.begin_operation("load", t0());
        assert_eq!(loading.clear_error(), loading);
    }

    #[test]
    fn begin_clears_previous_error() {
        let (loading, ticket) = StateContainer::initial(t0()).begin_operation("save", t0());
        let failed = loading.fail(&ticket, "boom", t0()).unwrap();

        let (retry, _) = failed.begin_operation("save", t0());
        assert!(retry.error_message().is_none());
        assert_eq!(retry.loading_state(), LoadingState::Loading);
    }

    #[test]
    fn stale_completion_is_rejected() {
        let state = StateContainer::initial(t0());
        let (s1, g1) = state.begin_operation("refresh", t0());
        let (s2, g2) = s1.begin_operation("refresh", t0());

        let stale = s2.succeed(&g1, Some(vec![make_task("old")]), t0()).unwrap_err();
        assert_eq!(
            stale,
            StaleOperation {
                tag: "refresh".to_string(),
                generation: 1,
                latest: 2,
            }
        );
        assert!(s2.fail(&g1, "late", t0()).is_err());

        let done = s2.succeed(&g2, Some(vec![make_task("new")]), t0()).unwrap();
        assert!(done.contains(&id("new")));
        assert!(!done.contains(&id("old")));

        // A finished ticket cannot complete twice
        assert!(done.succeed(&g2, None, t0()).is_err());
        assert!(done.fail(&g1, "late", t0()).is_err());
    }

    #[test]
    fn last_updated_is_monotonic() {
        let later = t0() + TimeDelta::hours(2);
        let state = seeded(&["1"]).add_task(make_task("2"), later).unwrap();

        let next = state.add_task(make_task("3"), t0()).unwrap();
        assert_eq!(next.last_updated(), later);
    }

    #[test]
    fn derived_views_follow_query() {
        let now = t0();
        let state = seeded(&["b", "a", "c"])
            .transition_task(&id("c"), TaskStatus::Cancelled, now)
            .unwrap()
            .set_query(
                Query::new()
                    .status(TaskStatus::Pending)
                    .sort_by(SortField::Title, SortOrder::Desc),
            );
        let ctx = QueryContext::at(now);

        let view: Vec<_> = state
            .filtered_view(&ctx)
            .iter()
            .map(|t| t.id().as_str().to_string())
            .collect();
        assert_eq!(view, vec!["b", "a"]);

        assert_eq!(state.statistics(&ctx).total, 3);
        assert_eq!(state.statistics(&ctx).cancelled, 1);
        assert_eq!(state.filtered_statistics(&ctx).total, 2);
        assert_eq!(state.filtered_statistics(&ctx).cancelled, 0);
    }
}
