//! Summary statistics over a task collection
//!
//! Statistics are derived on demand and never stored. [`Statistics::compute`]
//! is a single pass with no hidden state.

use chrono::TimeDelta;
use serde::Serialize;

use super::query::QueryContext;
use super::task::{Task, TaskStatus};

/// Counts and rates for a collection of tasks
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub cancelled: usize,
    pub overdue_count: usize,
    pub due_soon_count: usize,
    /// Tasks with `high` or `urgent` priority
    pub high_priority_count: usize,
    /// `completed / total`, 0.0 for an empty collection
    pub completion_rate: f64,
    /// Mean over completed tasks that recorded a duration
    #[serde(
        with = "crate::domain::task::duration_millis",
        skip_serializing_if = "Option::is_none"
    )]
    pub average_completion_duration: Option<TimeDelta>,
}

impl Statistics {
    pub fn compute(tasks: &[Task], ctx: &QueryContext) -> Self {
        let mut stats = Statistics::default();
        let mut duration_sum_ms: i128 = 0;
        let mut duration_count: i128 = 0;

        for task in tasks {
            stats.total += 1;
            match task.status() {
                TaskStatus::Pending => stats.pending += 1,
                TaskStatus::InProgress => stats.in_progress += 1,
                TaskStatus::Completed => stats.completed += 1,
                TaskStatus::Cancelled => stats.cancelled += 1,
            }
            if task.is_overdue(ctx.now) {
                stats.overdue_count += 1;
            }
            if task.is_due_soon(ctx.now, ctx.due_soon_horizon) {
                stats.due_soon_count += 1;
            }
            if task.priority().is_high() {
                stats.high_priority_count += 1;
            }
            if task.status() == TaskStatus::Completed {
                if let Some(duration) = task.completion_duration() {
                    duration_sum_ms += i128::from(duration.num_milliseconds());
                    duration_count += 1;
                }
            }
        }

        if stats.total > 0 {
            stats.completion_rate = stats.completed as f64 / stats.total as f64;
        }

        if duration_count > 0 {
            let mean = duration_sum_ms / duration_count;
            // Mean of in-range values stays in range
            stats.average_completion_duration =
                i64::try_from(mean).ok().and_then(TimeDelta::try_milliseconds);
        }

        stats
    }

    /// Tasks still open (pending or in progress)
    pub fn open(&self) -> usize {
        self.pending + self.in_progress
    }
}
