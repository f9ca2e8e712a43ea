//! Run-level error types

/// Errors that abort a run before any job executes
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RunError {
    #[error("no jobs match the specified criteria")]
    NoJobsMatch,
}
