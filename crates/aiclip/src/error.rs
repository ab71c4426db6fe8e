//! Coded errors shared by every stage of the pipeline.
//!
//! Every rejection carries a stable [`ErrorCode`], a human-readable message and an
//! optional JSON context with the offending input (already made safe for display)
//! and a hint on how to fix the request.

use crate::model::ErrorInfo;
use miette::Diagnostic;
use serde_json::Value;
use std::fmt;

pub type AiclipResult<T> = Result<T, AiclipError>;

/// Stable error classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// A path expression matched nothing or could not be resolved.
    PathResolution,
    /// A path resolved outside every allowed root.
    PathTraversal,
    /// A parameter is out of range, mistyped, unknown or contains unsafe characters.
    InvalidParameter,
    /// A required parameter is missing and has no default.
    UnbuildableAction,
    /// A destructive plan was submitted without overwrite allowance.
    ConfirmationRequired,
    /// The external tool could not be spawned or supervised.
    Execution,
    /// Configuration is invalid.
    Config,
    /// Filesystem or stream I/O failed.
    Io,
    /// Invalid command-line arguments.
    CliInvalidArg,
}

impl ErrorCode {
    pub const ALL: [ErrorCode; 9] = [
        ErrorCode::PathResolution,
        ErrorCode::PathTraversal,
        ErrorCode::InvalidParameter,
        ErrorCode::UnbuildableAction,
        ErrorCode::ConfirmationRequired,
        ErrorCode::Execution,
        ErrorCode::Config,
        ErrorCode::Io,
        ErrorCode::CliInvalidArg,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::PathResolution => "E_PATH_RESOLUTION",
            ErrorCode::PathTraversal => "E_PATH_TRAVERSAL",
            ErrorCode::InvalidParameter => "E_INVALID_PARAMETER",
            ErrorCode::UnbuildableAction => "E_UNBUILDABLE_ACTION",
            ErrorCode::ConfirmationRequired => "E_CONFIRMATION_REQUIRED",
            ErrorCode::Execution => "E_EXECUTION",
            ErrorCode::Config => "E_CONFIG",
            ErrorCode::Io => "E_IO",
            ErrorCode::CliInvalidArg => "E_CLI_INVALID_ARG",
        }
    }

    /// Parse a string code back into an [`ErrorCode`].
    #[must_use]
    pub fn parse(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == code)
    }

    /// Process exit code the CLI uses for this error class.
    #[must_use]
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorCode::PathResolution | ErrorCode::PathTraversal => 2,
            ErrorCode::InvalidParameter | ErrorCode::UnbuildableAction => 3,
            ErrorCode::ConfirmationRequired => 4,
            ErrorCode::Execution => 5,
            ErrorCode::Config => 6,
            ErrorCode::Io => 7,
            ErrorCode::CliInvalidArg => 8,
        }
    }

    /// Whether errors of this class are raised before any process is spawned.
    #[must_use]
    pub fn is_validation(self) -> bool {
        matches!(
            self,
            ErrorCode::PathResolution
                | ErrorCode::PathTraversal
                | ErrorCode::InvalidParameter
                | ErrorCode::UnbuildableAction
                | ErrorCode::ConfirmationRequired
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{code}: {message}")]
pub struct AiclipError {
    pub code: ErrorCode,
    pub message: String,
    pub context: Option<Value>,
}

impl AiclipError {
    pub fn new(code: ErrorCode, message: impl Into<String>, context: impl Into<Option<Value>>) -> Self {
        Self {
            code,
            message: message.into(),
            context: context.into(),
        }
    }

    pub fn path_resolution(message: impl Into<String>, context: impl Into<Option<Value>>) -> Self {
        Self::new(ErrorCode::PathResolution, message, context)
    }

    pub fn path_traversal(message: impl Into<String>, context: impl Into<Option<Value>>) -> Self {
        Self::new(ErrorCode::PathTraversal, message, context)
    }

    /// Parameter rejection naming the parameter and the accepted range or format.
    pub fn invalid_parameter(
        param: &str,
        reason: impl Into<String>,
        valid: impl Into<String>,
    ) -> Self {
        let reason = reason.into();
        let valid = valid.into();
        Self::new(
            ErrorCode::InvalidParameter,
            format!("invalid parameter '{param}': {reason} (valid: {valid})"),
            serde_json::json!({ "parameter": param, "valid": valid }),
        )
    }

    pub fn unbuildable(message: impl Into<String>, context: impl Into<Option<Value>>) -> Self {
        Self::new(ErrorCode::UnbuildableAction, message, context)
    }

    pub fn confirmation_required(message: impl Into<String>, context: impl Into<Option<Value>>) -> Self {
        Self::new(ErrorCode::ConfirmationRequired, message, context)
    }

    pub fn execution(message: impl Into<String>, err: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::Execution,
            message,
            serde_json::json!({ "source": crate::security::sanitize_message(&err.to_string()) }),
        )
    }

    pub fn config(message: impl Into<String>, context: impl Into<Option<Value>>) -> Self {
        Self::new(ErrorCode::Config, message, context)
    }

    pub fn io(message: impl Into<String>, err: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::Io,
            message,
            serde_json::json!({ "source": crate::security::sanitize_message(&err.to_string()) }),
        )
    }

    pub fn cli_invalid_arg(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::CliInvalidArg, message, None)
    }

    /// Process exit code for this error.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        self.code.exit_code()
    }

    pub fn to_error_info(&self) -> ErrorInfo {
        ErrorInfo {
            code: self.code.as_str().to_string(),
            message: self.message.clone(),
            context: self.context.clone(),
        }
    }
}

impl Diagnostic for AiclipError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(self.code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let fix = self.context.as_ref()?.get("fix")?.as_str()?;
        Some(Box::new(fix.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip_through_strings() {
        for code in ErrorCode::ALL {
            assert_eq!(ErrorCode::parse(code.as_str()), Some(code));
        }
        assert_eq!(ErrorCode::parse("E_NOPE"), None);
    }

    #[test]
    fn invalid_parameter_names_param_and_range() {
        let err = AiclipError::invalid_parameter("quality", "150 is out of range", "[0,100]");
        assert_eq!(err.code, ErrorCode::InvalidParameter);
        assert!(err.message.contains("quality"));
        assert!(err.message.contains("[0,100]"));
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn validation_codes_are_classified() {
        assert!(ErrorCode::ConfirmationRequired.is_validation());
        assert!(!ErrorCode::Execution.is_validation());
    }
}
