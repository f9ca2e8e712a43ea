//! Job execution engine
//!
//! This module contains:
//! - `assertions` - Pure checks of observed values against declared expectations
//! - `cancel` - Cooperative cancellation token threaded through a run
//! - `error` - Run-level error types
//! - `executor` - Routes a job to its provider
//! - `result` - Job and run result types
//! - `runner` - Job selection, sequential execution and aggregation

pub mod assertions;
pub mod cancel;
pub mod error;
pub mod executor;
pub mod result;
pub mod runner;

pub use cancel::CancelToken;
pub use error::RunError;
pub use executor::Executor;
pub use result::{JobResult, RunResult, Status, Summary};
pub use runner::{select_jobs, ProgressHandler, RunOptions, Runner};
