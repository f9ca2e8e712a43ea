//! Async-job provider - trigger a remote job, then poll it to completion
//!
//! This module provides:
//! - `types`: wire types and the `RemoteStatus` vocabulary
//! - `client`: the `JobApi` protocol and its HTTP implementation `RundeckClient`
//! - `poll`: the poll loop shared by every `JobApi`

use async_trait::async_trait;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{info, instrument, warn};

use super::{ProgressCallback, ProgressReporter, Provider, ProviderError};
use crate::config::duration::{format_duration, round_millis};
use crate::config::{Defaults, Environment, Job, ASYNC_JOB};
use crate::engine::assertions::{check_declared_status, check_duration};
use crate::engine::cancel::CancelToken;
use crate::engine::result::{JobResult, Status};

pub mod client;
pub mod poll;
pub mod types;

pub use client::{ExecutionState, JobApi, RundeckClient, Submission};
pub use poll::{poll_until_terminal, PollError, PollSettings};
pub use types::RemoteStatus;

/// Builds the `JobApi` used for an environment
pub type ClientFactory =
    Arc<dyn Fn(&Environment) -> Result<Arc<dyn JobApi>, ProviderError> + Send + Sync>;

pub fn connect_rundeck(env: &Environment) -> Result<Arc<dyn JobApi>, ProviderError> {
    Ok(Arc::new(RundeckClient::new(env)?))
}

pub struct AsyncJobProvider {
    defaults: Defaults,
    connect: ClientFactory,
    progress: ProgressReporter,
}

impl AsyncJobProvider {
    pub fn new(defaults: Defaults) -> Self {
        Self {
            defaults,
            connect: Arc::new(connect_rundeck),
            progress: ProgressReporter::default(),
        }
    }

    pub fn with_client_factory(mut self, connect: ClientFactory) -> Self {
        self.connect = connect;
        self
    }

    fn poll_settings(&self, job: &Job) -> PollSettings {
        PollSettings {
            interval: job.poll_interval_or(&self.defaults),
            timeout: job.timeout_or(&self.defaults),
        }
    }
}

impl std::fmt::Debug for AsyncJobProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncJobProvider")
            .field("defaults", &self.defaults)
            .field("progress", &self.progress)
            .finish()
    }
}

#[async_trait]
impl Provider for AsyncJobProvider {
    fn name(&self) -> &str {
        ASYNC_JOB
    }

    fn set_progress_callback(&mut self, callback: Option<ProgressCallback>) {
        self.progress.set(callback);
    }

    #[instrument(skip_all, fields(job = %job.name, job_id = %job.job_id))]
    async fn execute(
        &self,
        cancel: &CancelToken,
        job: &Job,
        env: &Environment,
    ) -> Result<JobResult, ProviderError> {
        let mut result = JobResult::start(job);
        let api = (self.connect)(env)?;
        let settings = self.poll_settings(job);

        self.progress
            .report(&job.name, Status::Pending, "Triggering job...");

        let triggered_at = Instant::now();
        let submitted = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ProviderError::Cancelled),
            submitted = api.submit(&job.job_id, &job.options) => submitted,
        };
        let submission = match submitted {
            Ok(submission) => submission,
            Err(e) => {
                warn!(error = %e, "Trigger failed");
                result.fail(format!("failed to trigger job: {}", e));
                result.finish();
                return Ok(result);
            }
        };

        let execution_id = submission.execution_id;
        result.set_detail("execution_id", execution_id);
        result.set_detail("permalink", submission.permalink.as_str());
        result.status = Status::Running;
        info!(execution_id, "Execution started");
        self.progress.report(
            &job.name,
            Status::Running,
            &format!("Execution #{} started", execution_id),
        );

        self.progress.report(
            &job.name,
            Status::Running,
            &format!(
                "Polling every {} (timeout {})",
                format_duration(settings.interval),
                format_duration(settings.timeout)
            ),
        );

        let outcome = poll_until_terminal(
            api.as_ref(),
            execution_id,
            settings,
            triggered_at,
            cancel,
            |elapsed, status| {
                self.progress.report(
                    &job.name,
                    Status::Running,
                    &format!(
                        "Polling... ({}) status={}",
                        format_duration(round_millis(elapsed)),
                        status
                    ),
                );
            },
        )
        .await;
        let elapsed = triggered_at.elapsed();

        let state = match outcome {
            Ok(state) => state,
            Err(e) => {
                warn!(execution_id, error = %e, "Polling stopped");
                result.fail(format!("polling failed: {}", e));
                result.finish();
                return Ok(result);
            }
        };

        result.status = state.status.to_status();
        result.set_detail("job_status", state.status.as_str());
        if !state.failed_nodes.is_empty() {
            result.set_detail("failed_nodes", state.failed_nodes.clone());
            result.append_error(format!(
                "failed on nodes: {}",
                state.failed_nodes.join(", ")
            ));
        }

        let violations = check_declared_status(job.assertions.status.as_deref(), state.status.as_str())
            .into_iter()
            .chain(check_duration(job.assertions.max_duration, elapsed));
        for violation in violations {
            result.status = Status::Failed;
            result.append_error(violation);
        }
        result.finish();

        info!(execution_id, status = %result.status, "Execution finished");
        self.progress.report(
            &job.name,
            result.status,
            &format!(
                "Status: {} ({})",
                state.status,
                format_duration(round_millis(elapsed))
            ),
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Assertions;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Scripted remote: each poll returns the next state, the last one repeats
    struct ScriptedApi {
        trigger_error: Option<String>,
        states: Vec<ExecutionState>,
        polls: AtomicUsize,
        submitted: Mutex<Vec<(String, HashMap<String, String>)>>,
    }

    impl ScriptedApi {
        fn new(statuses: &[&str]) -> Self {
            Self {
                trigger_error: None,
                states: statuses
                    .iter()
                    .map(|s| ExecutionState {
                        status: RemoteStatus::from(*s),
                        permalink: "http://rd/execution/show/7".to_string(),
                        failed_nodes: Vec::new(),
                    })
                    .collect(),
                polls: AtomicUsize::new(0),
                submitted: Mutex::new(Vec::new()),
            }
        }

        fn failing_trigger(message: &str) -> Self {
            Self {
                trigger_error: Some(message.to_string()),
                ..Self::new(&["running"])
            }
        }

        fn polls(&self) -> usize {
            self.polls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl JobApi for ScriptedApi {
        async fn submit(
            &self,
            job_id: &str,
            options: &HashMap<String, String>,
        ) -> Result<Submission, ProviderError> {
            self.submitted
                .lock()
                .unwrap()
                .push((job_id.to_string(), options.clone()));
            if let Some(message) = &self.trigger_error {
                return Err(ProviderError::Api {
                    status: 500,
                    body: message.clone(),
                });
            }
            Ok(Submission {
                execution_id: 7,
                permalink: "http://rd/execution/show/7".to_string(),
            })
        }

        async fn execution(&self, _id: u64) -> Result<ExecutionState, ProviderError> {
            let n = self.polls.fetch_add(1, Ordering::SeqCst);
            Ok(self.states[n.min(self.states.len() - 1)].clone())
        }
    }

    fn provider(api: Arc<ScriptedApi>) -> AsyncJobProvider {
        let factory: ClientFactory = Arc::new(move |_env: &Environment| {
            let api: Arc<dyn JobApi> = api.clone();
            Ok(api)
        });
        AsyncJobProvider::new(Defaults::default()).with_client_factory(factory)
    }

    fn job(interval_ms: u64, timeout_ms: u64) -> Job {
        let mut job = Job::async_job("nightly", "rundeck", "job-uuid");
        job.poll_interval = Some(Duration::from_millis(interval_ms));
        job.timeout = Some(Duration::from_millis(timeout_ms));
        job
    }

    fn env() -> Environment {
        Environment::new("async_job", "http://rd")
    }

    #[tokio::test]
    async fn test_successful_execution() {
        let api = Arc::new(ScriptedApi::new(&["running", "running", "succeeded"]));
        let mut provider = provider(api.clone());

        let messages = Arc::new(Mutex::new(Vec::new()));
        let sink = messages.clone();
        provider.set_progress_callback(Some(Arc::new(move |_: &str, _: Status, msg: &str| {
            sink.lock().unwrap().push(msg.to_string());
        })));

        let mut job = job(5, 5_000);
        job.options.insert("env".to_string(), "staging".to_string());
        let result = provider
            .execute(&CancelToken::new(), &job, &env())
            .await
            .unwrap();

        assert_eq!(result.status, Status::Succeeded);
        assert!(result.passed());
        assert_eq!(result.detail("execution_id").unwrap(), 7);
        assert_eq!(
            result.detail("permalink").and_then(|v| v.as_str()),
            Some("http://rd/execution/show/7")
        );
        assert_eq!(
            result.detail("job_status").and_then(|v| v.as_str()),
            Some("succeeded")
        );
        assert_eq!(api.polls(), 3);

        let submitted = api.submitted.lock().unwrap();
        assert_eq!(submitted[0].0, "job-uuid");
        assert_eq!(submitted[0].1["env"], "staging");

        let messages = messages.lock().unwrap();
        assert_eq!(messages[0], "Triggering job...");
        assert_eq!(messages[1], "Execution #7 started");
        assert!(messages.iter().any(|m| m.starts_with("Polling every")));
        assert!(messages.iter().any(|m| m.contains("status=running")));
    }

    #[tokio::test]
    async fn test_trigger_failure_is_terminal() {
        let api = Arc::new(ScriptedApi::failing_trigger("job not found"));
        let result = provider(api.clone())
            .execute(&CancelToken::new(), &job(5, 5_000), &env())
            .await
            .unwrap();

        assert_eq!(result.status, Status::Failed);
        assert!(result.error.starts_with("failed to trigger job:"));
        assert!(result.error.contains("job not found"));
        assert!(result.detail("execution_id").is_none());
        assert_eq!(api.polls(), 0);
    }

    #[tokio::test]
    async fn test_cancel_mid_poll() {
        let api = Arc::new(ScriptedApi::new(&["running"]));
        let provider = provider(api.clone());
        let cancel = CancelToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(120)).await;
            trigger.cancel();
        });

        let start = std::time::Instant::now();
        let result = provider
            .execute(&cancel, &job(50, 60_000), &env())
            .await
            .unwrap();

        assert!(start.elapsed() < Duration::from_millis(600));
        assert_eq!(result.status, Status::Failed);
        assert_eq!(result.error, "polling failed: run cancelled");
        assert_eq!(result.detail("execution_id").unwrap(), 7);
    }

    #[tokio::test]
    async fn test_deadline_yields_failed_timeout() {
        let api = Arc::new(ScriptedApi::new(&["running"]));
        let result = provider(api.clone())
            .execute(&CancelToken::new(), &job(10, 100), &env())
            .await
            .unwrap();

        assert_eq!(result.status, Status::Failed);
        assert_eq!(result.error, "polling failed: timeout after 100ms");
        assert!(api.polls() <= 10);
    }

    #[tokio::test]
    async fn test_failed_nodes_reported() {
        let mut api = ScriptedApi::new(&["failed"]);
        api.states[0].failed_nodes = vec!["web-1".to_string(), "web-2".to_string()];
        let result = provider(Arc::new(api))
            .execute(&CancelToken::new(), &job(5, 5_000), &env())
            .await
            .unwrap();

        assert_eq!(result.status, Status::Failed);
        assert_eq!(result.error, "failed on nodes: web-1, web-2");
        assert_eq!(
            result.detail("failed_nodes").unwrap(),
            &serde_json::json!(["web-1", "web-2"])
        );
        assert_eq!(
            result.detail("job_status").and_then(|v| v.as_str()),
            Some("failed")
        );
    }

    #[tokio::test]
    async fn test_remote_statuses_map_to_local() {
        for (remote, local) in [
            ("aborted", Status::Aborted),
            ("timedout", Status::TimedOut),
            ("failed-with-retry", Status::Failed),
        ] {
            let api = Arc::new(ScriptedApi::new(&[remote]));
            let result = provider(api)
                .execute(&CancelToken::new(), &job(5, 5_000), &env())
                .await
                .unwrap();
            assert_eq!(result.status, local, "remote status {}", remote);
            assert!(!result.passed());
        }
    }

    #[tokio::test]
    async fn test_assertions_append_to_errors() {
        let mut api = ScriptedApi::new(&["failed"]);
        api.states[0].failed_nodes = vec!["db-1".to_string()];
        let job = job(20, 5_000).with_assertions(Assertions {
            status: Some("succeeded".to_string()),
            max_duration: Some(Duration::from_millis(1)),
            ..Default::default()
        });

        let result = provider(Arc::new(api))
            .execute(&CancelToken::new(), &job, &env())
            .await
            .unwrap();

        assert_eq!(result.status, Status::Failed);
        let parts: Vec<&str> = result.error.split("; ").collect();
        assert_eq!(parts[0], "failed on nodes: db-1");
        assert_eq!(parts[1], "expected status 'succeeded', got 'failed'");
        assert!(parts[2].contains("exceeded max 1ms"));
    }

    #[tokio::test]
    async fn test_maximal_timeout_yields_result() {
        let api = Arc::new(ScriptedApi::new(&["succeeded"]));
        let mut job = job(5, 0);
        job.timeout = Some(Duration::from_secs(u64::MAX));

        let result = provider(api)
            .execute(&CancelToken::new(), &job, &env())
            .await
            .unwrap();

        assert_eq!(result.status, Status::Succeeded);
        assert!(result.passed());
    }

    #[tokio::test]
    async fn test_declared_status_forces_failure() {
        let api = Arc::new(ScriptedApi::new(&["succeeded"]));
        let job = job(5, 5_000).with_assertions(Assertions {
            status: Some("aborted".to_string()),
            ..Default::default()
        });

        let result = provider(api)
            .execute(&CancelToken::new(), &job, &env())
            .await
            .unwrap();

        assert_eq!(result.status, Status::Failed);
        assert_eq!(result.error, "expected status 'aborted', got 'succeeded'");
    }
}
