use anyhow::Error;
use thiserror::Error;

/// Application-level error types for s3purge.
///
/// These cover errors that can escape to the CLI boundary: configuration
/// problems caught before any task is submitted, and AWS SDK failures that
/// occur outside a bucket task (bucket-task failures are absorbed by the
/// task itself and never surface here).
///
/// ## Exit Codes
///
/// Each variant maps to an exit code (via `exit_code()`):
/// - 1: General errors (AwsSdk, Runner)
/// - 2: Configuration errors (InvalidConfig)
#[derive(Error, Debug, PartialEq)]
pub enum PurgeError {
    /// AWS SDK error (may be retryable based on error type).
    #[error("AWS SDK error: {0}")]
    AwsSdk(String),

    /// Configuration error (non-retryable, fail fast).
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// General orchestrator error.
    #[error("Runner error: {0}")]
    Runner(String),
}

impl PurgeError {
    /// Get the appropriate process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            PurgeError::InvalidConfig(_) => 2,
            _ => 1,
        }
    }

    /// Check if this error is retryable.
    ///
    /// Only AWS SDK errors are considered retryable; the actual retry
    /// decision is delegated to the AWS SDK's retry policy.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PurgeError::AwsSdk(_))
    }
}

/// Extract the exit code from an anyhow::Error, defaulting to 1.
pub fn exit_code_from_error(e: &Error) -> i32 {
    if let Some(err) = e.downcast_ref::<PurgeError>() {
        return err.exit_code();
    }
    1
}
