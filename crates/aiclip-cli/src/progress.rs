//! Batch progress output using indicatif.

use aiclip::executor::{ProgressCallback, ProgressEvent};
use aiclip::{AiclipResult, CommandPlan, ExecutionResult, ExecutionStatus};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::sync::Mutex;

/// Progress callback that draws a bar on stderr while a batch runs.
#[derive(Default)]
pub struct BatchProgress {
    bar: Mutex<Option<ProgressBar>>,
}

impl BatchProgress {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressCallback for BatchProgress {
    fn on_progress(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::BatchStarted { total, workers, .. } => {
                let pb = ProgressBar::new(u64::try_from(*total).unwrap_or(u64::MAX));
                pb.set_style(
                    ProgressStyle::default_bar()
                        .template("{spinner:.cyan} [{elapsed_precise}] {bar:30} {pos}/{len} {msg}")
                        .unwrap_or_else(|_| ProgressStyle::default_bar()),
                );
                pb.set_message(format!("{workers} worker(s)"));
                pb.enable_steady_tick(std::time::Duration::from_millis(100));
                if let Ok(mut bar) = self.bar.lock() {
                    *bar = Some(pb);
                }
            }
            ProgressEvent::PlanStarted {
                index, operation, ..
            } => {
                if let Ok(bar) = self.bar.lock() {
                    if let Some(pb) = bar.as_ref() {
                        pb.set_message(format!("#{index} {operation}"));
                    }
                }
            }
            ProgressEvent::PlanFinished { .. } => {
                if let Ok(bar) = self.bar.lock() {
                    if let Some(pb) = bar.as_ref() {
                        pb.inc(1);
                    }
                }
            }
            ProgressEvent::BatchFinished {
                succeeded,
                failed,
                duration_ms,
                ..
            } => {
                if let Ok(mut bar) = self.bar.lock() {
                    if let Some(pb) = bar.take() {
                        pb.finish_and_clear();
                    }
                }
                let _ = writeln!(
                    std::io::stderr(),
                    "batch finished: {succeeded} succeeded, {failed} failed ({duration_ms}ms)"
                );
            }
        }
    }
}

/// One line per executed plan for the human-readable report.
pub fn summary_line(plan: &CommandPlan, result: &AiclipResult<ExecutionResult>) -> String {
    let head = format!("{} {} -> {}", plan.id(), plan.operation(), plan.output().display());
    match result {
        Ok(result) if result.succeeded() => format!("✓ {head} ({}ms)", result.duration_ms),
        Ok(result) => {
            let status = match (result.status, result.exit_code) {
                (ExecutionStatus::TimedOut, _) => "timed out".to_string(),
                (ExecutionStatus::Cancelled, _) => "cancelled".to_string(),
                (_, Some(code)) => format!("exit code {code}"),
                (_, None) => match result.signal {
                    Some(signal) => format!("killed by signal {signal}"),
                    None => "failed".to_string(),
                },
            };
            let mut line = format!("✗ {head}: {status} ({}ms)", result.duration_ms);
            if let Some(last) = result.stderr.text.lines().rev().find(|l| !l.trim().is_empty()) {
                line.push_str("\n    ");
                line.push_str(last.trim());
            }
            line
        }
        Err(err) => format!("✗ {head}: {err}"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use aiclip::builder::CommandBuilder;
    use aiclip::intent::Intent;
    use aiclip::{pipeline, AiclipError, ConfigBuilder, ErrorCode, OutputExcerpt};

    fn result(plan: &CommandPlan, status: ExecutionStatus, exit_code: Option<i32>) -> ExecutionResult {
        ExecutionResult {
            plan_id: plan.id(),
            status,
            exit_code,
            signal: None,
            stdout: OutputExcerpt::default(),
            stderr: OutputExcerpt {
                text: "frame=1\nInvalid data found when processing input\n".to_string(),
                truncated_bytes: 0,
            },
            duration_ms: 12,
            timed_out: status == ExecutionStatus::TimedOut,
        }
    }

    fn plan() -> CommandPlan {
        let dir = tempfile::tempdir().unwrap();
        let root = std::fs::canonicalize(dir.path()).unwrap();
        std::fs::write(root.join("clip.mp4"), b"x").unwrap();
        let config = ConfigBuilder::new()
            .allowed_root(root.clone())
            .tool("/usr/bin/ffmpeg".into())
            .build();
        let intent = Intent::from_json(r#"{"action":"remove_audio","inputs":["clip.mp4"]}"#).unwrap();
        let descriptor = pipeline::compile(&intent, &config, &root).unwrap();
        CommandBuilder::new(&config).build_plan(&descriptor).unwrap()
    }

    #[test]
    fn success_line_has_check_and_duration() {
        let plan = plan();
        let line = summary_line(&plan, &Ok(result(&plan, ExecutionStatus::Succeeded, Some(0))));
        assert!(line.starts_with('✓'));
        assert!(line.contains("remove_audio"));
        assert!(line.contains("12ms"));
    }

    #[test]
    fn failure_line_shows_exit_code_and_last_stderr_line() {
        let plan = plan();
        let line = summary_line(&plan, &Ok(result(&plan, ExecutionStatus::Failed, Some(1))));
        assert!(line.starts_with('✗'));
        assert!(line.contains("exit code 1"));
        assert!(line.ends_with("Invalid data found when processing input"));
    }

    #[test]
    fn refused_plan_shows_error() {
        let plan = plan();
        let err = AiclipError::new(ErrorCode::ConfirmationRequired, "would overwrite", None);
        let line = summary_line(&plan, &Err(err));
        assert!(line.contains("would overwrite"));
    }
}
