//! Executor tests using system binaries and small scripts as stand-in tools.
// Test module - relaxed lint rules
#![cfg(unix)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::indexing_slicing)]
#![allow(clippy::panic)]
#![allow(clippy::uninlined_format_args)]
#![allow(missing_docs)]

use aiclip::executor::{CancelToken, CollectingProgress, Executor, ProgressEvent};
use aiclip::{pipeline, CommandPlan, Config, ConfigBuilder, ErrorCode, ExecutionStatus, PlanState};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

const TIMEOUT: Duration = Duration::from_secs(20);

struct Fixture {
    _dir: tempfile::TempDir,
    media: PathBuf,
    tools: PathBuf,
}

impl Fixture {
    fn new(files: &[&str]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let base = std::fs::canonicalize(dir.path()).unwrap();
        let media = base.join("media");
        let tools = base.join("tools");
        std::fs::create_dir(&media).unwrap();
        std::fs::create_dir(&tools).unwrap();
        for file in files {
            std::fs::write(media.join(file), b"data").unwrap();
        }
        Self {
            _dir: dir,
            media,
            tools,
        }
    }

    fn script(&self, name: &str, body: &str) -> PathBuf {
        let path = self.tools.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn config(&self, tool: &Path) -> Config {
        ConfigBuilder::new()
            .allowed_root(self.media.clone())
            .tool(tool.to_path_buf())
            .build()
    }

    fn plans(&self, config: &Config, json: &str) -> Vec<CommandPlan> {
        pipeline::plan_json(json, config, &self.media)
            .unwrap()
            .into_plans()
            .unwrap()
    }

    fn plan(&self, config: &Config, json: &str) -> CommandPlan {
        self.plans(config, json).remove(0)
    }
}

const CONVERT_A: &str = r#"{"action":"convert","inputs":["a.mp4"]}"#;

#[test]
fn successful_tool_run_captures_output() {
    let fx = Fixture::new(&["a.mp4"]);
    let config = fx.config(Path::new("/bin/echo"));
    let plan = fx.plan(&config, CONVERT_A);
    let result = Executor::new(&config).execute(&plan, false, TIMEOUT).unwrap();
    assert_eq!(result.status, ExecutionStatus::Succeeded);
    assert_eq!(result.exit_code, Some(0));
    assert_eq!(result.plan_id, plan.id());
    assert!(result.stdout.text.contains("-hide_banner"));
    assert!(result.stdout.text.contains("a_converted.mp4"));
    assert!(!result.timed_out);
}

#[test]
fn arguments_reach_the_tool_unsplit() {
    let fx = Fixture::new(&["my clip.mp4"]);
    let tool = fx.script("argc", r#"printf '%s\n' "$#""#);
    let config = fx.config(&tool);
    let plan = fx.plan(&config, r#"{"action":"convert","inputs":["my clip.mp4"]}"#);
    let result = Executor::new(&config).execute(&plan, false, TIMEOUT).unwrap();
    assert_eq!(result.stdout.text.trim(), plan.argv().len().to_string());
}

#[test]
fn failing_tool_reports_exit_code() {
    let fx = Fixture::new(&["a.mp4"]);
    let tool = fx.script("fail", "echo 'bad input' >&2\nexit 3");
    let config = fx.config(&tool);
    let plan = fx.plan(&config, CONVERT_A);
    let result = Executor::new(&config).execute(&plan, false, TIMEOUT).unwrap();
    assert_eq!(result.status, ExecutionStatus::Failed);
    assert_eq!(result.exit_code, Some(3));
    assert!(result.stderr.text.contains("bad input"));
}

#[test]
fn missing_tool_is_an_execution_error() {
    let fx = Fixture::new(&["a.mp4"]);
    let config = fx.config(Path::new("/nonexistent/ffmpeg"));
    let plan = fx.plan(&config, CONVERT_A);
    let err = Executor::new(&config).execute(&plan, false, TIMEOUT).unwrap_err();
    assert_eq!(err.code, ErrorCode::Execution);
}

#[test]
fn destructive_plan_needs_overwrite_allowance() {
    let fx = Fixture::new(&["a.mp4", "a_converted.mp4"]);
    let marker = fx.tools.join("ran");
    let tool = fx.script("mark", &format!("touch '{}'", marker.display()));
    let config = fx.config(&tool);
    let plan = fx.plan(&config, CONVERT_A);
    assert!(plan.destructive());

    let executor = Executor::new(&config);
    let err = executor.execute(&plan, false, TIMEOUT).unwrap_err();
    assert_eq!(err.code, ErrorCode::ConfirmationRequired);
    assert!(!marker.exists(), "refused plan must not spawn");

    let result = executor.execute(&plan, true, TIMEOUT).unwrap();
    assert!(result.succeeded());
    assert!(marker.exists());
}

#[test]
fn preview_has_no_side_effects() {
    let fx = Fixture::new(&["a.mp4", "a_converted.mp4"]);
    let marker = fx.tools.join("ran");
    let tool = fx.script("mark", &format!("touch '{}'", marker.display()));
    let config = fx.config(&tool);
    let plan = fx.plan(&config, CONVERT_A);

    let preview = Executor::new(&config).preview(&plan);
    assert_eq!(preview.state, PlanState::AwaitingConfirmation);
    assert_eq!(preview.args.len(), plan.argv().len());
    assert!(preview.to_string().contains("will be replaced"));
    assert!(!preview.explanation.is_empty());
    assert!(!marker.exists());
}

#[test]
fn timeout_terminates_the_process_group() {
    let fx = Fixture::new(&["a.mp4"]);
    let tool = fx.script("slow", "sleep 30");
    let config = fx.config(&tool);
    let plan = fx.plan(&config, CONVERT_A);
    let started = Instant::now();
    let result = Executor::new(&config)
        .execute(&plan, false, Duration::from_millis(200))
        .unwrap();
    assert_eq!(result.status, ExecutionStatus::TimedOut);
    assert!(result.timed_out);
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[test]
fn cancellation_stops_a_running_plan() {
    let fx = Fixture::new(&["a.mp4"]);
    let tool = fx.script("slow", "sleep 30");
    let config = fx.config(&tool);
    let plan = fx.plan(&config, CONVERT_A);
    let cancel = CancelToken::new();
    let executor = Executor::new(&config).with_cancel_token(cancel.clone());

    let trigger = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(200));
        cancel.cancel();
    });
    let started = Instant::now();
    let result = executor.execute(&plan, false, TIMEOUT).unwrap();
    trigger.join().unwrap();
    assert_eq!(result.status, ExecutionStatus::Cancelled);
    assert!(!result.timed_out);
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[test]
fn cancelled_token_skips_plans_before_start() {
    let fx = Fixture::new(&["a.mp4"]);
    let config = fx.config(Path::new("/bin/echo"));
    let plan = fx.plan(&config, CONVERT_A);
    let executor = Executor::new(&config);
    executor.cancel_token().cancel();
    let result = executor.execute(&plan, false, TIMEOUT).unwrap();
    assert_eq!(result.status, ExecutionStatus::Cancelled);
    assert_eq!(result.duration_ms, 0);
}

#[test]
fn capture_is_bounded() {
    let fx = Fixture::new(&["a.mp4"]);
    let tool = fx.script("noisy", "i=0\nwhile [ $i -lt 200 ]; do echo 0123456789; i=$((i+1)); done");
    let config = ConfigBuilder::new()
        .allowed_root(fx.media.clone())
        .tool(tool)
        .capture_bytes(64)
        .build();
    let plan = fx.plan(&config, CONVERT_A);
    let result = Executor::new(&config).execute(&plan, false, TIMEOUT).unwrap();
    assert!(result.stdout.is_truncated());
    assert_eq!(result.stdout.truncated_bytes, 200 * 11 - 64);
    assert!(result.stdout.text.contains("more bytes truncated"));
}

#[test]
fn batch_continues_past_failures_and_keeps_order() {
    let fx = Fixture::new(&["a.mp4", "b.mp4", "c.mp4"]);
    let tool = fx.script("picky", r#"case "$*" in *b.mp4*) exit 4;; esac"#);
    let config = fx.config(&tool);
    let plans = fx.plans(&config, r#"{"action":"convert","glob":"*.mp4"}"#);
    assert_eq!(plans.len(), 3);

    let progress = Arc::new(CollectingProgress::new());
    let executor = Executor::new(&config).with_progress(Box::new(Arc::clone(&progress)));
    let results = executor.execute_batch(&plans, false, TIMEOUT, 2);

    assert_eq!(results.len(), 3);
    let statuses: Vec<ExecutionStatus> = results.iter().map(|r| r.as_ref().unwrap().status).collect();
    assert_eq!(
        statuses,
        vec![ExecutionStatus::Succeeded, ExecutionStatus::Failed, ExecutionStatus::Succeeded]
    );
    for (plan, result) in plans.iter().zip(&results) {
        assert_eq!(result.as_ref().unwrap().plan_id, plan.id());
    }

    let events = progress.events();
    assert!(matches!(events.first(), Some(ProgressEvent::BatchStarted { total: 3, workers: 2, .. })));
    assert!(matches!(
        events.last(),
        Some(ProgressEvent::BatchFinished { succeeded: 2, failed: 1, .. })
    ));
    let finished = events
        .iter()
        .filter(|e| matches!(e, ProgressEvent::PlanFinished { .. }))
        .count();
    assert_eq!(finished, 3);
}

#[test]
fn batch_results_follow_submission_order_not_completion_order() {
    let fx = Fixture::new(&["a.mp4", "b.mp4"]);
    let tool = fx.script(
        "uneven",
        r#"case "$*" in *a.mp4*) sleep 1; echo slow;; *) echo fast;; esac"#,
    );
    let config = fx.config(&tool);
    let plans = fx.plans(&config, r#"{"action":"convert","glob":"*.mp4"}"#);
    assert_eq!(plans.len(), 2);

    let progress = Arc::new(CollectingProgress::new());
    let executor = Executor::new(&config).with_progress(Box::new(Arc::clone(&progress)));
    let results = executor.execute_batch(&plans, false, TIMEOUT, 2);

    let finish_order: Vec<usize> = progress
        .events()
        .iter()
        .filter_map(|e| match e {
            ProgressEvent::PlanFinished { index, .. } => Some(*index),
            _ => None,
        })
        .collect();
    assert_eq!(finish_order, vec![1, 0], "the second plan should finish first");

    let outputs: Vec<&str> = results
        .iter()
        .map(|r| r.as_ref().unwrap().stdout.text.trim())
        .collect();
    assert_eq!(outputs, vec!["slow", "fast"]);
    for (plan, result) in plans.iter().zip(&results) {
        assert_eq!(result.as_ref().unwrap().plan_id, plan.id());
    }
}

#[test]
fn batch_refuses_only_the_destructive_items() {
    let fx = Fixture::new(&["a.mp4", "b.mp4", "b_converted.mp4"]);
    let config = fx.config(Path::new("/bin/echo"));
    let plans = fx.plans(&config, r#"{"action":"convert","glob":"*.mp4"}"#);
    // b_converted.mp4 also matches the glob and gets its own plan.
    assert_eq!(plans.len(), 3);

    let results = Executor::new(&config).execute_batch(&plans, false, TIMEOUT, 4);
    let refused: Vec<usize> = results
        .iter()
        .enumerate()
        .filter(|(_, r)| r.as_ref().is_err_and(|e| e.code == ErrorCode::ConfirmationRequired))
        .map(|(i, _)| i)
        .collect();
    assert_eq!(refused, vec![1]);
    assert!(results[0].as_ref().unwrap().succeeded());
    assert!(results[2].as_ref().unwrap().succeeded());
}

#[test]
fn cancelled_batch_reports_every_plan_as_cancelled() {
    let fx = Fixture::new(&["a.mp4", "b.mp4"]);
    let config = fx.config(Path::new("/bin/echo"));
    let plans = fx.plans(&config, r#"{"action":"convert","glob":"*.mp4"}"#);
    let executor = Executor::new(&config);
    executor.cancel_token().cancel();
    let results = executor.execute_batch(&plans, false, TIMEOUT, 1);
    assert!(results
        .iter()
        .all(|r| r.as_ref().unwrap().status == ExecutionStatus::Cancelled));
}
