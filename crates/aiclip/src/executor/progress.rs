//! Progress callback for reporting batch execution.

use crate::model::{BatchId, ExecutionStatus, Operation, PlanId};
use std::sync::{Arc, Mutex, PoisonError};

/// Event emitted while a batch runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Batch has started.
    BatchStarted {
        batch_id: BatchId,
        /// Number of submitted plans.
        total: usize,
        /// Worker threads in use.
        workers: usize,
    },
    /// A plan was handed to a worker.
    PlanStarted {
        /// Submission index (0-based).
        index: usize,
        plan_id: PlanId,
        operation: Operation,
    },
    /// A plan reached a terminal state or was refused.
    PlanFinished {
        index: usize,
        plan_id: PlanId,
        /// `None` when the plan was refused or could not be spawned.
        status: Option<ExecutionStatus>,
        duration_ms: u64,
    },
    /// Every plan has finished.
    BatchFinished {
        batch_id: BatchId,
        succeeded: usize,
        failed: usize,
        duration_ms: u64,
    },
}

/// Receives progress events. Called from worker threads.
pub trait ProgressCallback: Send + Sync {
    fn on_progress(&self, event: &ProgressEvent);
}

impl<T: ProgressCallback + ?Sized> ProgressCallback for Arc<T> {
    fn on_progress(&self, event: &ProgressEvent) {
        (**self).on_progress(event);
    }
}

/// Discards all events.
pub struct NoopProgress;

impl ProgressCallback for NoopProgress {
    fn on_progress(&self, _event: &ProgressEvent) {}
}

/// Records events in order of arrival.
#[derive(Default)]
pub struct CollectingProgress {
    events: Mutex<Vec<ProgressEvent>>,
}

impl CollectingProgress {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ProgressCallback for CollectingProgress {
    fn on_progress(&self, event: &ProgressEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}
