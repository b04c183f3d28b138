//! Single owner of the current snapshot
//!
//! A [`Session`] holds the latest [`StateContainer`] and composes the
//! collaborators around it: a clock, a validator, telemetry observers and
//! subscribers that receive every replacement snapshot over a channel.

use std::sync::mpsc;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};

use super::clock::{Clock, SystemClock};
use super::container::{OperationTicket, StateContainer, StateError};
use super::observer::{OperationEvent, OperationObserver, OperationOutcome};
use super::validator::{TaskValidator, TitleLengthValidator};
use crate::domain::{
    NewTask, Query, QueryContext, Statistics, Task, TaskId, TaskPatch, TaskStatus,
    DEFAULT_DUE_SOON_HOURS,
};

/// Tunables for a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// Window used by "due soon" filters and statistics
    pub due_soon_horizon: TimeDelta,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            due_soon_horizon: TimeDelta::hours(i64::from(DEFAULT_DUE_SOON_HOURS)),
        }
    }
}

pub struct Session {
    state: Arc<StateContainer>,
    settings: SessionSettings,
    clock: Box<dyn Clock>,
    validator: Box<dyn TaskValidator>,
    observers: Vec<Box<dyn OperationObserver>>,
    subscribers: Vec<mpsc::Sender<Arc<StateContainer>>>,
    /// Generation and start time of the operation in flight
    in_flight: Option<(u64, DateTime<Utc>)>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Creates an empty session using the system clock
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }

    /// Creates an empty session reading time from `clock`
    pub fn with_clock(clock: impl Clock + 'static) -> Self {
        let now = clock.now();
        Self {
            state: Arc::new(StateContainer::initial(now)),
            settings: SessionSettings::default(),
            clock: Box::new(clock),
            validator: Box::new(TitleLengthValidator::default()),
            observers: Vec::new(),
            subscribers: Vec::new(),
            in_flight: None,
        }
    }

    pub fn settings(mut self, settings: SessionSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn validator(mut self, validator: impl TaskValidator + 'static) -> Self {
        self.validator = Box::new(validator);
        self
    }

    pub fn observer(mut self, observer: impl OperationObserver + 'static) -> Self {
        self.observers.push(Box::new(observer));
        self
    }

    /// The current snapshot
    pub fn state(&self) -> &StateContainer {
        &self.state
    }

    /// A shared handle to the current snapshot
    pub fn snapshot(&self) -> Arc<StateContainer> {
        Arc::clone(&self.state)
    }

    pub fn context(&self) -> QueryContext {
        QueryContext::new(self.clock.now(), self.settings.due_soon_horizon)
    }

    /// Receives every snapshot that replaces the current one
    pub fn subscribe(&mut self) -> mpsc::Receiver<Arc<StateContainer>> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    fn replace(&mut self, next: StateContainer) {
        if *self.state == next {
            return;
        }

        let next = Arc::new(next);
        self.state = Arc::clone(&next);
        tracing::debug!(
            tasks = next.len(),
            loading_state = ?next.loading_state(),
            subscribers = self.subscribers.len(),
            "state replaced"
        );

        // Dropped receivers are pruned
        self.subscribers
            .retain(|tx| tx.send(Arc::clone(&next)).is_ok());
    }

    /// Creates a task and adds it
    pub fn add(&mut self, fields: NewTask) -> Result<Task, StateError> {
        let now = self.clock.now();
        let task = Task::create(fields, now)?;
        self.insert(task.clone())?;
        Ok(task)
    }

    /// Adds an already constructed task
    pub fn insert(&mut self, task: Task) -> Result<(), StateError> {
        self.validator.validate(&task)?;
        let next = self.state.add_task(task, self.clock.now())?;
        self.replace(next);
        Ok(())
    }

    pub fn update(&mut self, task: Task) -> Result<(), StateError> {
        self.validator.validate(&task)?;
        let next = self.state.update_task(task, self.clock.now())?;
        self.replace(next);
        Ok(())
    }

    /// Applies a field-wise patch to an existing task
    pub fn patch(&mut self, id: &TaskId, patch: TaskPatch) -> Result<Task, StateError> {
        let task = self
            .state
            .get(id)
            .ok_or_else(|| StateError::NotFound(id.clone()))?
            .apply_patch(patch)?;
        self.update(task.clone())?;
        Ok(task)
    }

    pub fn transition(&mut self, id: &TaskId, status: TaskStatus) -> Result<Task, StateError> {
        let next = self.state.transition_task(id, status, self.clock.now())?;
        let task = next
            .get(id)
            .cloned()
            .ok_or_else(|| StateError::NotFound(id.clone()))?;
        self.replace(next);
        Ok(task)
    }

    /// Removes a task, returning it if it existed
    pub fn remove(&mut self, id: &TaskId) -> Option<Task> {
        let removed = self.state.get(id).cloned();
        if removed.is_some() {
            let next = self.state.remove_task(id, self.clock.now());
            self.replace(next);
        }
        removed
    }

    pub fn set_query(&mut self, query: Query) {
        let next = self.state.set_query(query);
        self.replace(next);
    }

    pub fn select(&mut self, id: Option<TaskId>) {
        let next = self.state.select(id);
        self.replace(next);
    }

    /// Starts a tracked operation; any earlier one can no longer commit
    pub fn begin(&mut self, tag: impl Into<String>) -> OperationTicket {
        let now = self.clock.now();
        let (next, ticket) = self.state.begin_operation(tag, now);
        self.in_flight = Some((ticket.generation(), now));
        tracing::debug!(
            operation = ticket.tag(),
            generation = ticket.generation(),
            "operation started"
        );
        self.replace(next);
        ticket
    }

    /// Completes an operation; returns false if the ticket was stale
    pub fn succeed(&mut self, ticket: &OperationTicket, tasks: Option<Vec<Task>>) -> bool {
        let now = self.clock.now();
        let result_size = tasks.as_ref().map_or(0, Vec::len);

        match self.state.succeed(ticket, tasks, now) {
            Ok(next) => {
                self.replace(next);
                self.emit(ticket, now, result_size, OperationOutcome::Succeeded);
                true
            }
            Err(stale) => {
                tracing::debug!(%stale, "discarding completion");
                false
            }
        }
    }

    /// Records an operation failure; returns false if the ticket was stale
    pub fn fail(&mut self, ticket: &OperationTicket, message: impl Into<String>) -> bool {
        let now = self.clock.now();
        let message = message.into();

        match self.state.fail(ticket, message.clone(), now) {
            Ok(next) => {
                self.replace(next);
                self.emit(ticket, now, 0, OperationOutcome::Failed { message });
                true
            }
            Err(stale) => {
                tracing::debug!(%stale, "discarding failure");
                false
            }
        }
    }

    pub fn clear_error(&mut self) {
        let next = self.state.clear_error();
        self.replace(next);
    }

    fn emit(
        &mut self,
        ticket: &OperationTicket,
        now: DateTime<Utc>,
        result_size: usize,
        outcome: OperationOutcome,
    ) {
        let started = match self.in_flight.take() {
            Some((generation, started)) if generation == ticket.generation() => started,
            _ => now,
        };
        let duration_ms = u64::try_from((now - started).num_milliseconds()).unwrap_or(0);

        let event = OperationEvent {
            operation: ticket.tag().to_string(),
            generation: ticket.generation(),
            duration_ms,
            result_size,
            outcome,
        };
        for observer in &self.observers {
            observer.on_operation(&event);
        }
    }

    pub fn filtered_view(&self) -> Vec<Task> {
        self.state.filtered_view(&self.context())
    }

    pub fn statistics(&self) -> Statistics {
        self.state.statistics(&self.context())
    }

    pub fn filtered_statistics(&self) -> Statistics {
        self.state.filtered_statistics(&self.context())
    }
}
