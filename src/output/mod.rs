//! Progress and result sinks
//!
//! This module provides:
//! - `console`: human-readable progress and summary, optionally colored
//! - `json`: the final `RunResult` as a JSON document
//!
//! `ProgressAdapter` forwards runner progress events into a shared `Writer`.

use std::io;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::warn;

use crate::config::{Job, OutputFormat};
use crate::engine::result::{JobResult, RunResult, Status};
use crate::engine::runner::ProgressHandler;

pub mod console;
pub mod json;

pub use console::ConsoleWriter;
pub use json::JsonWriter;

/// Renders a run as it happens and once it is finished
pub trait Writer: Send {
    fn write_header(&mut self, version: &str) -> io::Result<()>;
    fn write_config_summary(&mut self, environments: usize, jobs: usize) -> io::Result<()>;
    fn write_job_start(&mut self, index: usize, total: usize, job: &Job) -> io::Result<()>;
    fn write_job_progress(&mut self, job_name: &str, status: Status, message: &str)
        -> io::Result<()>;
    fn write_job_complete(&mut self, index: usize, total: usize, result: &JobResult)
        -> io::Result<()>;
    fn write_result(&mut self, result: &RunResult) -> io::Result<()>;
}

pub type SharedWriter = Arc<Mutex<dyn Writer>>;

/// Writer for `format` on standard output
pub fn stdout_writer(format: OutputFormat, colors: bool, verbose: bool, pretty: bool) -> SharedWriter {
    match format {
        OutputFormat::Console => Arc::new(Mutex::new(ConsoleWriter::new(io::stdout(), colors, verbose))),
        OutputFormat::Json => Arc::new(Mutex::new(JsonWriter::new(io::stdout(), pretty))),
    }
}

/// Lock a shared writer, recovering it if a previous holder panicked
pub fn lock(writer: &SharedWriter) -> MutexGuard<'_, dyn Writer + 'static> {
    writer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Bridges a `Writer` to the runner's `ProgressHandler`
#[derive(Clone)]
pub struct ProgressAdapter {
    writer: SharedWriter,
}

impl ProgressAdapter {
    pub fn new(writer: SharedWriter) -> Self {
        Self { writer }
    }

    fn emit(&self, f: impl FnOnce(&mut (dyn Writer + 'static)) -> io::Result<()>) {
        let mut writer = lock(&self.writer);
        if let Err(e) = f(&mut *writer) {
            warn!(error = %e, "Failed to write progress");
        }
    }
}

impl ProgressHandler for ProgressAdapter {
    fn on_job_start(&self, index: usize, total: usize, job: &Job) {
        self.emit(|w| w.write_job_start(index, total, job));
    }

    fn on_job_progress(&self, job_name: &str, status: Status, message: &str) {
        self.emit(|w| w.write_job_progress(job_name, status, message));
    }

    fn on_job_complete(&self, index: usize, total: usize, result: &JobResult) {
        self.emit(|w| w.write_job_complete(index, total, result));
    }
}
