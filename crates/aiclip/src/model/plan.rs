use crate::model::{Operation, PlanId};
use crate::security::SafeToken;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A ready-to-run invocation of the external tool.
///
/// The argument vector is a sequence of [`SafeToken`]s, each minted by the
/// security validator. It is handed to the OS as discrete arguments and is
/// never joined into a shell string.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CommandPlan {
    id: PlanId,
    operation: Operation,
    program: PathBuf,
    argv: Vec<SafeToken>,
    overwrite: bool,
    destructive: bool,
    inputs: Vec<PathBuf>,
    output: PathBuf,
}

impl CommandPlan {
    pub(crate) fn new(
        operation: Operation,
        program: PathBuf,
        argv: Vec<SafeToken>,
        overwrite: bool,
        destructive: bool,
        inputs: Vec<PathBuf>,
        output: PathBuf,
    ) -> Self {
        let mut content = Vec::new();
        content.extend_from_slice(program.to_string_lossy().as_bytes());
        for token in &argv {
            content.push(0);
            content.extend_from_slice(token.as_str().as_bytes());
        }
        Self {
            id: PlanId::from_content(&content),
            operation,
            program,
            argv,
            overwrite,
            destructive,
            inputs,
            output,
        }
    }

    #[must_use]
    pub fn id(&self) -> PlanId {
        self.id
    }

    #[must_use]
    pub fn operation(&self) -> Operation {
        self.operation
    }

    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    #[must_use]
    pub fn argv(&self) -> &[SafeToken] {
        &self.argv
    }

    /// Argument tokens as plain strings, in order.
    #[must_use]
    pub fn args(&self) -> Vec<&str> {
        self.argv.iter().map(SafeToken::as_str).collect()
    }

    /// Whether the plan instructs the tool to replace an existing output.
    #[must_use]
    pub fn overwrite(&self) -> bool {
        self.overwrite
    }

    /// Whether running the plan can destroy existing data.
    #[must_use]
    pub fn destructive(&self) -> bool {
        self.destructive
    }

    #[must_use]
    pub fn inputs(&self) -> &[PathBuf] {
        &self.inputs
    }

    #[must_use]
    pub fn output(&self) -> &Path {
        &self.output
    }
}

/// Lifecycle of a submitted plan.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanState {
    Built,
    PreviewOnly,
    AwaitingConfirmation,
    Running,
    Succeeded,
    Failed,
    TimedOut,
    Cancelled,
}

impl PlanState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PlanState::Succeeded | PlanState::Failed | PlanState::TimedOut | PlanState::Cancelled
        )
    }
}

/// Terminal outcome of one executed plan.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Succeeded,
    Failed,
    TimedOut,
    Cancelled,
}

impl From<ExecutionStatus> for PlanState {
    fn from(status: ExecutionStatus) -> Self {
        match status {
            ExecutionStatus::Succeeded => PlanState::Succeeded,
            ExecutionStatus::Failed => PlanState::Failed,
            ExecutionStatus::TimedOut => PlanState::TimedOut,
            ExecutionStatus::Cancelled => PlanState::Cancelled,
        }
    }
}

/// Bounded excerpt of a captured output stream.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputExcerpt {
    pub text: String,
    /// Bytes read from the stream but not kept.
    pub truncated_bytes: u64,
}

impl OutputExcerpt {
    #[must_use]
    pub fn is_truncated(&self) -> bool {
        self.truncated_bytes > 0
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub plan_id: PlanId,
    pub status: ExecutionStatus,
    /// Exit code, absent when the process was killed by a signal or never started.
    pub exit_code: Option<i32>,
    pub signal: Option<i32>,
    pub stdout: OutputExcerpt,
    pub stderr: OutputExcerpt,
    pub duration_ms: u64,
    pub timed_out: bool,
}

impl ExecutionResult {
    /// Result for a plan that was skipped because the batch was cancelled.
    #[must_use]
    pub fn cancelled_before_start(plan_id: PlanId) -> Self {
        Self {
            plan_id,
            status: ExecutionStatus::Cancelled,
            exit_code: None,
            signal: None,
            stdout: OutputExcerpt::default(),
            stderr: OutputExcerpt::default(),
            duration_ms: 0,
            timed_out: false,
        }
    }

    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.status == ExecutionStatus::Succeeded
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
    pub context: Option<serde_json::Value>,
}
