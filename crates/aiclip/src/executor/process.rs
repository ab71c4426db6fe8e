//! Child process supervision: spawn, poll, terminate.

use super::capture;
use super::CancelToken;
use crate::error::{AiclipError, AiclipResult};
use crate::model::{CommandPlan, ExecutionResult, ExecutionStatus, OutputExcerpt};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

#[cfg(unix)]
use nix::sys::signal::{killpg, Signal};
#[cfg(unix)]
use nix::unistd::Pid;

const POLL_INTERVAL: Duration = Duration::from_millis(10);
/// Time the tool gets to finalize its output after SIGTERM.
pub(crate) const TERMINATE_GRACE: Duration = Duration::from_secs(2);

/// Why supervision stopped waiting for the child.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Interrupt {
    TimedOut,
    Cancelled,
}

/// Run one plan to completion, enforcing `timeout` and honouring `cancel`.
pub(crate) fn run_plan(
    plan: &CommandPlan,
    timeout: Duration,
    capture_bytes: usize,
    cancel: &CancelToken,
) -> AiclipResult<ExecutionResult> {
    if cancel.is_cancelled() {
        tracing::warn!(plan_id = %plan.id(), "plan cancelled before start");
        return Ok(ExecutionResult::cancelled_before_start(plan.id()));
    }

    let mut command = Command::new(plan.program());
    command
        .args(plan.args())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }

    let started = Instant::now();
    let mut child = command.spawn().map_err(|err| {
        AiclipError::execution(
            format!("failed to start {}", plan.program().display()),
            err,
        )
    })?;
    tracing::debug!(
        plan_id = %plan.id(),
        pid = child.id(),
        program = %plan.program().display(),
        "spawned tool"
    );

    let stdout = child
        .stdout
        .take()
        .map(|out| capture::drain(out, capture_bytes));
    let stderr = child
        .stderr
        .take()
        .map(|err| capture::drain(err, capture_bytes));

    let (status, interrupt) = supervise(&mut child, started.checked_add(timeout), cancel)?;
    let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    let stdout = collect(stdout);
    let stderr = collect(stderr);

    let result = ExecutionResult {
        plan_id: plan.id(),
        status: classify(status, interrupt),
        exit_code: status.code(),
        signal: exit_signal(status),
        stdout,
        stderr,
        duration_ms,
        timed_out: interrupt == Some(Interrupt::TimedOut),
    };
    match result.status {
        ExecutionStatus::Succeeded => {
            tracing::info!(plan_id = %plan.id(), duration_ms, "plan succeeded");
        }
        ExecutionStatus::Failed => tracing::info!(
            plan_id = %plan.id(),
            exit_code = ?result.exit_code,
            duration_ms,
            "plan failed"
        ),
        ExecutionStatus::TimedOut => {
            tracing::warn!(plan_id = %plan.id(), timeout_ms = %timeout.as_millis(), "plan timed out");
        }
        ExecutionStatus::Cancelled => {
            tracing::warn!(plan_id = %plan.id(), duration_ms, "plan cancelled");
        }
    }
    Ok(result)
}

/// Poll the child until it exits, the deadline passes or the token is cancelled.
///
/// A `None` deadline (timeout too large to represent) never expires.
fn supervise(
    child: &mut Child,
    deadline: Option<Instant>,
    cancel: &CancelToken,
) -> AiclipResult<(ExitStatus, Option<Interrupt>)> {
    loop {
        if let Some(status) = try_wait(child)? {
            return Ok((status, None));
        }
        let interrupt = if cancel.is_cancelled() {
            Some(Interrupt::Cancelled)
        } else if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            Some(Interrupt::TimedOut)
        } else {
            None
        };
        if let Some(interrupt) = interrupt {
            let status = terminate(child, TERMINATE_GRACE)?;
            return Ok((status, Some(interrupt)));
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

fn try_wait(child: &mut Child) -> AiclipResult<Option<ExitStatus>> {
    child
        .try_wait()
        .map_err(|err| AiclipError::execution("failed to wait for tool", err))
}

/// SIGTERM the process group, wait up to `grace`, then SIGKILL and reap.
fn terminate(child: &mut Child, grace: Duration) -> AiclipResult<ExitStatus> {
    #[cfg(unix)]
    if let Ok(raw) = i32::try_from(child.id()) {
        let pgid = Pid::from_raw(raw);
        signal_process_group(pgid, Signal::SIGTERM)?;
        let deadline = Instant::now() + grace;
        while Instant::now() < deadline {
            if let Some(status) = try_wait(child)? {
                return Ok(status);
            }
            std::thread::sleep(POLL_INTERVAL);
        }
        signal_process_group(pgid, Signal::SIGKILL)?;
        return child
            .wait()
            .map_err(|err| AiclipError::execution("failed to reap tool", err));
    }

    child
        .kill()
        .map_err(|err| AiclipError::execution("failed to kill tool", err))?;
    child
        .wait()
        .map_err(|err| AiclipError::execution("failed to reap tool", err))
}

#[cfg(unix)]
fn signal_process_group(pgid: Pid, signal: Signal) -> AiclipResult<()> {
    match killpg(pgid, signal) {
        // ESRCH: the group is already gone.
        Ok(()) | Err(nix::errno::Errno::ESRCH) => Ok(()),
        Err(err) => Err(AiclipError::execution(
            "failed to signal process group",
            err,
        )),
    }
}

fn collect(handle: Option<std::thread::JoinHandle<OutputExcerpt>>) -> OutputExcerpt {
    handle
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}

fn classify(status: ExitStatus, interrupt: Option<Interrupt>) -> ExecutionStatus {
    match interrupt {
        Some(Interrupt::TimedOut) => ExecutionStatus::TimedOut,
        Some(Interrupt::Cancelled) => ExecutionStatus::Cancelled,
        None if status.success() => ExecutionStatus::Succeeded,
        None => ExecutionStatus::Failed,
    }
}

#[cfg(unix)]
fn exit_signal(status: ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: ExitStatus) -> Option<i32> {
    None
}
