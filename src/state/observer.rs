//! Telemetry hooks for tracked operations
//!
//! A session without observers behaves identically.

use serde::Serialize;

/// How a tracked operation ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum OperationOutcome {
    Succeeded,
    Failed { message: String },
}

/// Emitted after a `succeed`/`fail` that was applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationEvent {
    pub operation: String,
    pub generation: u64,
    pub duration_ms: u64,
    pub result_size: usize,
    pub outcome: OperationOutcome,
}

/// Receives operation events
pub trait OperationObserver {
    fn on_operation(&self, event: &OperationEvent);
}

impl<F> OperationObserver for F
where
    F: Fn(&OperationEvent),
{
    fn on_operation(&self, event: &OperationEvent) {
        self(event)
    }
}

/// Logs operation events through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl OperationObserver for TracingObserver {
    fn on_operation(&self, event: &OperationEvent) {
        match &event.outcome {
            OperationOutcome::Succeeded => tracing::info!(
                operation = %event.operation,
                generation = event.generation,
                duration_ms = event.duration_ms,
                result_size = event.result_size,
                "operation succeeded"
            ),
            OperationOutcome::Failed { message } => tracing::warn!(
                operation = %event.operation,
                generation = event.generation,
                duration_ms = event.duration_ms,
                error = %message,
                "operation failed"
            ),
        }
    }
}
