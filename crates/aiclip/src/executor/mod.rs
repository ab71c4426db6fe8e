//! Executor: preview, confirm and run command plans.
//!
//! A plan moves `Built -> (PreviewOnly | AwaitingConfirmation) -> Running ->
//! {Succeeded | Failed | TimedOut | Cancelled}`. Only a [`ConfirmedPlan`] can run,
//! and confirming a destructive plan requires an explicit overwrite allowance.
//!
//! Plans run as direct child processes (never through a shell) in their own
//! process group, with stdin closed and stdout/stderr drained into bounded
//! excerpts. A wall-clock timeout or a cancelled [`CancelToken`] terminates the
//! group with SIGTERM, then SIGKILL after a short grace.
//!
//! # Example
//!
//! ```ignore
//! use aiclip::executor::Executor;
//! use std::time::Duration;
//!
//! let executor = Executor::new(&config);
//! println!("{}", executor.preview(&plan));
//! let result = executor.execute(&plan, false, Duration::from_secs(600))?;
//! ```

mod batch;
mod capture;
mod preview;
mod process;
pub mod progress;

pub use preview::Preview;
pub use progress::{CollectingProgress, NoopProgress, ProgressCallback, ProgressEvent};

use crate::error::{AiclipError, AiclipResult};
use crate::model::{CommandPlan, Config, ExecutionResult, MAX_PARALLELISM};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Shared cancellation flag, checked at plan boundaries and in the wait loop.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A plan that has passed the confirmation gate.
#[derive(Clone, Copy, Debug)]
pub struct ConfirmedPlan<'p> {
    plan: &'p CommandPlan,
}

impl<'p> ConfirmedPlan<'p> {
    #[must_use]
    pub fn plan(&self) -> &'p CommandPlan {
        self.plan
    }
}

/// Runs command plans under timeout, capture and cancellation control.
pub struct Executor {
    capture_bytes: usize,
    default_timeout: Duration,
    max_parallelism: usize,
    cancel: CancelToken,
    progress: Box<dyn ProgressCallback>,
}

impl Executor {
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            capture_bytes: config.execution.capture_bytes,
            default_timeout: Duration::from_millis(config.execution.timeout_ms),
            max_parallelism: config.execution.max_parallelism.clamp(1, MAX_PARALLELISM),
            cancel: CancelToken::new(),
            progress: Box::new(NoopProgress),
        }
    }

    /// Share an externally owned cancellation token.
    #[must_use]
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    #[must_use]
    pub fn with_progress(mut self, progress: Box<dyn ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Timeout from configuration.
    #[must_use]
    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Parallelism from configuration.
    #[must_use]
    pub fn default_parallelism(&self) -> usize {
        self.max_parallelism
    }

    /// Render a plan for inspection. Never spawns or touches the filesystem.
    #[must_use]
    #[allow(clippy::unused_self)]
    pub fn preview(&self, plan: &CommandPlan) -> Preview {
        Preview::of(plan)
    }

    /// Pass a plan through the confirmation gate.
    ///
    /// A destructive plan is refused with `ConfirmationRequired` unless
    /// `allow_overwrite` is set.
    pub fn confirm<'p>(
        &self,
        plan: &'p CommandPlan,
        allow_overwrite: bool,
    ) -> AiclipResult<ConfirmedPlan<'p>> {
        if plan.destructive() && !allow_overwrite {
            tracing::warn!(
                plan_id = %plan.id(),
                output = %plan.output().display(),
                "destructive plan refused without overwrite allowance"
            );
            return Err(AiclipError::confirmation_required(
                format!(
                    "plan {} would overwrite {}",
                    plan.id(),
                    plan.output().display()
                ),
                serde_json::json!({
                    "plan_id": plan.id().to_string(),
                    "output": plan.output().display().to_string(),
                    "fix": "Confirm the overwrite (--yes) or choose a different output path",
                }),
            ));
        }
        Ok(ConfirmedPlan { plan })
    }

    /// Run a confirmed plan.
    pub fn run(&self, confirmed: ConfirmedPlan<'_>, timeout: Duration) -> AiclipResult<ExecutionResult> {
        process::run_plan(confirmed.plan(), timeout, self.capture_bytes, &self.cancel)
    }

    /// Confirm, then run.
    pub fn execute(
        &self,
        plan: &CommandPlan,
        allow_overwrite: bool,
        timeout: Duration,
    ) -> AiclipResult<ExecutionResult> {
        let confirmed = self.confirm(plan, allow_overwrite)?;
        self.run(confirmed, timeout)
    }

    /// Run several plans, continuing past failures.
    ///
    /// Each plan is confirmed on its own; a refused plan yields its error in
    /// place. Results come back in submission order. `max_parallelism` is
    /// clamped to `1..=MAX_PARALLELISM`.
    pub fn execute_batch(
        &self,
        plans: &[CommandPlan],
        allow_overwrite: bool,
        timeout: Duration,
        max_parallelism: usize,
    ) -> Vec<AiclipResult<ExecutionResult>> {
        batch::run_batch(self, plans, allow_overwrite, timeout, max_parallelism)
    }
}
