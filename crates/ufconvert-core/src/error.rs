//! Error types and exit codes for ufconvert
//!
//! Exit codes:
//! - 0: Success
//! - 1: Generic failure (conversion could not complete)
//! - 2: Usage error (bad flags/args)
//! - 3: Data error (malformed or unrecognized policy set)

use thiserror::Error;

/// Exit codes reported by the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Success (0)
    Success = 0,
    /// Generic failure (1)
    Failure = 1,
    /// Usage error - bad flags/args (2)
    Usage = 2,
    /// Data error - malformed policy set (3)
    Data = 3,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}

/// Errors that can occur during policy set conversion
#[derive(Error, Debug)]
pub enum ConvertError {
    // Usage errors (exit code 2)
    #[error("{0}")]
    UsageError(String),

    // Data errors (exit code 3)
    #[error("invalid policy set: {reason}")]
    InvalidPolicySet { reason: String },

    #[error("no policies found in the policy set")]
    NoPolicies,

    #[error("{element} is missing required attribute '{attribute}'")]
    MissingAttribute { element: String, attribute: String },

    #[error("unable to determine home tenant id from the leaf policy")]
    NoHomeTenant,

    // Generic failures (exit code 1)
    #[error("unable to move any children from policy '{policy_id}'")]
    NoProgress { policy_id: String },

    #[error("unexpected reference locator '{locator}' in the reference schema")]
    InvalidLocator { locator: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConvertError {
    /// Create a data error for unparseable or unrecognized input
    pub fn invalid_policy_set(reason: impl std::fmt::Display) -> Self {
        ConvertError::InvalidPolicySet {
            reason: reason.to_string(),
        }
    }

    /// Create a data error for a required attribute that is absent
    pub fn missing_attribute(element: &str, attribute: &str) -> Self {
        ConvertError::MissingAttribute {
            element: element.to_string(),
            attribute: attribute.to_string(),
        }
    }

    /// Get the appropriate exit code for this error
    pub fn exit_code(&self) -> ExitCode {
        match self {
            ConvertError::UsageError(_) => ExitCode::Usage,

            ConvertError::InvalidPolicySet { .. }
            | ConvertError::NoPolicies
            | ConvertError::MissingAttribute { .. }
            | ConvertError::NoHomeTenant => ExitCode::Data,

            ConvertError::NoProgress { .. }
            | ConvertError::InvalidLocator { .. }
            | ConvertError::Io(_) => ExitCode::Failure,
        }
    }

    /// Get the error type identifier
    fn error_type(&self) -> &'static str {
        match self {
            ConvertError::UsageError(_) => "usage_error",
            ConvertError::InvalidPolicySet { .. } => "invalid_policy_set",
            ConvertError::NoPolicies => "no_policies",
            ConvertError::MissingAttribute { .. } => "missing_attribute",
            ConvertError::NoHomeTenant => "no_home_tenant",
            ConvertError::NoProgress { .. } => "no_progress",
            ConvertError::InvalidLocator { .. } => "invalid_locator",
            ConvertError::Io(_) => "io_error",
        }
    }

    /// Convert error to JSON representation for structured error output
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "error": {
                "code": self.exit_code() as i32,
                "type": self.error_type(),
                "message": self.to_string(),
            }
        })
    }
}

/// Result type alias for conversion operations
pub type Result<T> = std::result::Result<T, ConvertError>;
