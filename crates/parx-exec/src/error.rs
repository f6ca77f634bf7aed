//! Errors raised by individual partition tasks.
//!
//! The scheduler retries `Recoverable` failures; anything else fails the
//! partition and surfaces to the caller as `parx_core::Error::Execution`
//! with the `TaskError` as its source.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("execution error: {0}")]
    Exec(String),

    #[error("schema error: {0}")]
    Schema(String),

    #[error("io error: {0}")]
    Io(String),

    /// Recoverable error that can be retried (e.g., transient I/O failures)
    #[error("recoverable error: {0}")]
    Recoverable(String),

    #[error("task observed cancellation")]
    Cancelled,
}

impl TaskError {
    /// Add context to an error, creating an error chain.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        let ctx = context.into();
        match self {
            TaskError::Exec(msg) => TaskError::Exec(format!("{}: {}", ctx, msg)),
            TaskError::Schema(msg) => TaskError::Schema(format!("{}: {}", ctx, msg)),
            TaskError::Io(msg) => TaskError::Io(format!("{}: {}", ctx, msg)),
            TaskError::Recoverable(msg) => TaskError::Recoverable(format!("{}: {}", ctx, msg)),
            TaskError::Cancelled => TaskError::Cancelled,
        }
    }

    /// Check if this error is recoverable (can be retried).
    pub fn is_recoverable(&self) -> bool {
        matches!(self, TaskError::Recoverable(_))
    }

    /// Get suggestions for common errors.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            TaskError::Schema(msg) => {
                if msg.contains("column") {
                    vec!["Check that the column name is spelled correctly".into(),
                         "Verify the column exists in every input file".into()]
                } else {
                    vec![]
                }
            }
            TaskError::Io(_) => vec![
                "Check the input path and permissions".into(),
                "Verify the file format matches its contents".into(),
            ],
            TaskError::Recoverable(_) => vec![
                "This error may be transient - retrying may help".into(),
                "Raise PARX_MAX_TASK_RETRIES if failures persist".into(),
            ],
            _ => vec![],
        }
    }
}

impl From<parx_io::error::Error> for TaskError {
    fn from(e: parx_io::error::Error) -> Self {
        use std::io::ErrorKind;
        use parx_io::error::Error as IoError;

        match e {
            IoError::Io(ref io)
                if matches!(
                    io.kind(),
                    ErrorKind::Interrupted | ErrorKind::TimedOut | ErrorKind::WouldBlock
                ) =>
            {
                TaskError::Recoverable(e.to_string())
            }
            IoError::Schema(msg) => TaskError::Schema(msg),
            other => TaskError::Io(other.to_string()),
        }
    }
}
