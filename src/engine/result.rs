//! Execution result types

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use crate::config::duration::millis;
use crate::config::Job;

/// Lifecycle status of a single job execution
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Pending,
    Running,
    Succeeded,
    Failed,
    Aborted,
    TimedOut,
}

impl Status {
    /// No further progress happens once a status is terminal
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Status::Succeeded | Status::Failed | Status::Aborted | Status::TimedOut
        )
    }

    pub fn is_success(&self) -> bool {
        *self == Status::Succeeded
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Running => "running",
            Status::Succeeded => "succeeded",
            Status::Failed => "failed",
            Status::Aborted => "aborted",
            Status::TimedOut => "timed_out",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized outcome of one job's execution
#[derive(Debug, Clone, Serialize)]
pub struct JobResult {
    #[serde(rename = "name")]
    pub job_name: String,
    pub environment: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub status: Status,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    #[serde(rename = "duration_ms", serialize_with = "millis::serialize")]
    pub duration: Duration,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub error: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, Value>,
}

impl JobResult {
    /// A pending result for `job`, started now
    pub fn start(job: &Job) -> Self {
        let now = Utc::now();
        Self {
            job_name: job.name.clone(),
            environment: job.environment.clone(),
            kind: job.kind.clone(),
            status: Status::Pending,
            started_at: now,
            finished_at: now,
            duration: Duration::ZERO,
            error: String::new(),
            details: BTreeMap::new(),
        }
    }

    /// A finished `failed` result that never reached a provider
    pub fn failed(job: &Job, error: impl Into<String>) -> Self {
        let mut result = Self::start(job);
        result.fail(error);
        result.finish();
        result
    }

    /// A finished `succeeded` result without execution, used for dry runs
    pub fn planned(job: &Job) -> Self {
        let mut result = Self::start(job);
        result.status = Status::Succeeded;
        result.finish();
        result
    }

    /// True when the job succeeded with no error recorded
    pub fn passed(&self) -> bool {
        self.status.is_success() && self.error.is_empty()
    }

    /// Mark as failed, replacing any earlier error
    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = Status::Failed;
        self.error = error.into();
    }

    /// Append to the error message with `; ` as separator
    pub fn append_error(&mut self, error: impl AsRef<str>) {
        if !self.error.is_empty() {
            self.error.push_str("; ");
        }
        self.error.push_str(error.as_ref());
    }

    pub fn set_detail(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.details.insert(key.into(), value.into());
    }

    pub fn detail(&self, key: &str) -> Option<&Value> {
        self.details.get(key)
    }

    /// Stamp the finish time; duration is measured from the start
    pub fn finish(&mut self) {
        self.finished_at = Utc::now();
        self.duration = (self.finished_at - self.started_at)
            .to_std()
            .unwrap_or_default();
    }
}

/// Pass/fail counters for a run
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct Summary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    /// Jobs never dispatched because the run was cancelled
    pub skipped: usize,
}

/// Aggregate outcome of one run over a selected job set
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub version: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    #[serde(rename = "duration_ms", serialize_with = "millis::serialize")]
    pub duration: Duration,
    pub summary: Summary,
    pub results: Vec<JobResult>,
}

impl RunResult {
    pub fn new(version: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            version: version.into(),
            started_at: now,
            finished_at: now,
            duration: Duration::ZERO,
            summary: Summary::default(),
            results: Vec::new(),
        }
    }

    pub fn add_result(&mut self, result: JobResult) {
        self.summary.total += 1;
        if result.passed() {
            self.summary.passed += 1;
        } else {
            self.summary.failed += 1;
        }
        self.results.push(result);
    }

    pub fn add_skipped(&mut self) {
        self.summary.skipped += 1;
    }

    pub fn finish(&mut self) {
        self.finished_at = Utc::now();
        self.duration = (self.finished_at - self.started_at)
            .to_std()
            .unwrap_or_default();
    }

    /// True when no job failed
    pub fn success(&self) -> bool {
        self.summary.failed == 0
    }

    pub fn failed_results(&self) -> impl Iterator<Item = &JobResult> {
        self.results.iter().filter(|r| !r.passed())
    }
}
