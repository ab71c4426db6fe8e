//! Batch execution on a fixed pool of scoped worker threads.
//!
//! Workers claim the next submission index from a shared counter, so at most
//! `workers` plans run at once. Each worker keeps its results tagged with the
//! index; they are put back in submission order once the scope ends.

use super::{ConfirmedPlan, Executor, ProgressEvent};
use crate::error::{AiclipError, AiclipResult, ErrorCode};
use crate::model::{BatchId, CommandPlan, ExecutionResult, MAX_PARALLELISM};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

type Slot = Option<AiclipResult<ExecutionResult>>;

pub(super) fn run_batch(
    executor: &Executor,
    plans: &[CommandPlan],
    allow_overwrite: bool,
    timeout: Duration,
    max_parallelism: usize,
) -> Vec<AiclipResult<ExecutionResult>> {
    let batch_id = BatchId::new();
    let started = Instant::now();
    let workers = max_parallelism
        .clamp(1, MAX_PARALLELISM)
        .min(plans.len().max(1));
    executor.progress.on_progress(&ProgressEvent::BatchStarted {
        batch_id,
        total: plans.len(),
        workers,
    });
    tracing::info!(%batch_id, total = plans.len(), workers, "batch started");

    let mut slots: Vec<Slot> = Vec::with_capacity(plans.len());
    let mut jobs: Vec<(usize, ConfirmedPlan<'_>)> = Vec::new();
    for (index, plan) in plans.iter().enumerate() {
        match executor.confirm(plan, allow_overwrite) {
            Ok(confirmed) => {
                jobs.push((index, confirmed));
                slots.push(None);
            }
            Err(err) => {
                executor.progress.on_progress(&ProgressEvent::PlanFinished {
                    index,
                    plan_id: plan.id(),
                    status: None,
                    duration_ms: 0,
                });
                slots.push(Some(Err(err)));
            }
        }
    }

    for (index, result) in run_pool(executor, &jobs, timeout, workers) {
        if let Some(slot) = slots.get_mut(index) {
            *slot = Some(result);
        }
    }

    let results: Vec<AiclipResult<ExecutionResult>> = slots
        .into_iter()
        .map(|slot| {
            slot.unwrap_or_else(|| {
                Err(AiclipError::new(
                    ErrorCode::Execution,
                    "batch worker stopped before reporting a result",
                    None,
                ))
            })
        })
        .collect();

    let succeeded = results
        .iter()
        .filter(|result| result.as_ref().is_ok_and(ExecutionResult::succeeded))
        .count();
    let failed = results.len() - succeeded;
    let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    executor.progress.on_progress(&ProgressEvent::BatchFinished {
        batch_id,
        succeeded,
        failed,
        duration_ms,
    });
    tracing::info!(%batch_id, succeeded, failed, duration_ms, "batch finished");
    results
}

fn run_pool(
    executor: &Executor,
    jobs: &[(usize, ConfirmedPlan<'_>)],
    timeout: Duration,
    workers: usize,
) -> Vec<(usize, AiclipResult<ExecutionResult>)> {
    let next = AtomicUsize::new(0);
    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|_| scope.spawn(|| worker(executor, jobs, &next, timeout)))
            .collect();
        handles
            .into_iter()
            .filter_map(|handle| handle.join().ok())
            .flatten()
            .collect()
    })
}

fn worker(
    executor: &Executor,
    jobs: &[(usize, ConfirmedPlan<'_>)],
    next: &AtomicUsize,
    timeout: Duration,
) -> Vec<(usize, AiclipResult<ExecutionResult>)> {
    let mut done = Vec::new();
    while let Some((index, confirmed)) = jobs.get(next.fetch_add(1, Ordering::SeqCst)) {
        let plan = confirmed.plan();
        if executor.cancel.is_cancelled() {
            done.push((*index, Ok(ExecutionResult::cancelled_before_start(plan.id()))));
            continue;
        }
        executor.progress.on_progress(&ProgressEvent::PlanStarted {
            index: *index,
            plan_id: plan.id(),
            operation: plan.operation(),
        });
        let result = executor.run(*confirmed, timeout);
        let (status, duration_ms) = match &result {
            Ok(result) => (Some(result.status), result.duration_ms),
            Err(_) => (None, 0),
        };
        executor.progress.on_progress(&ProgressEvent::PlanFinished {
            index: *index,
            plan_id: plan.id(),
            status,
            duration_ms,
        });
        done.push((*index, result));
    }
    done
}
