//! Run orchestrator
//!
//! Selects jobs from the configuration, executes them one at a time in
//! declaration order and aggregates their results into a `RunResult`.
//! One job's failure never halts the run; only an empty selection is fatal.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::cancel::CancelToken;
use super::error::RunError;
use super::executor::Executor;
use super::result::{JobResult, RunResult, Status};
use crate::config::{Config, Environment, Job};
use crate::providers::ProviderRegistry;

/// Job selection and execution mode for one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Exact job names; empty selects every name
    pub names: Vec<String>,
    /// A job matches if it carries any of these tags; empty selects every job
    pub tags: Vec<String>,
    pub environment: Option<String>,
    /// Plan only: synthesize results without contacting any environment
    pub dry_run: bool,
}

impl RunOptions {
    pub fn matches(&self, job: &Job) -> bool {
        if !self.names.is_empty() && !self.names.iter().any(|n| *n == job.name) {
            return false;
        }
        if !self.tags.is_empty() && !job.has_any_tag(&self.tags) {
            return false;
        }
        match &self.environment {
            Some(env) if !env.is_empty() => job.environment == *env,
            _ => true,
        }
    }
}

/// Observes a run; indexes are 1-based
pub trait ProgressHandler: Send + Sync {
    fn on_job_start(&self, index: usize, total: usize, job: &Job);
    fn on_job_progress(&self, job_name: &str, status: Status, message: &str);
    fn on_job_complete(&self, index: usize, total: usize, result: &JobResult);
}

/// Jobs matching every active filter, in declaration order
pub fn select_jobs<'a>(jobs: &'a [Job], options: &RunOptions) -> Vec<&'a Job> {
    jobs.iter().filter(|job| options.matches(job)).collect()
}

pub struct Runner {
    config: Config,
    executor: Executor,
    progress_handler: Option<Arc<dyn ProgressHandler>>,
    version: String,
}

impl Runner {
    /// Runner backed by the built-in providers
    pub fn new(config: Config, version: impl Into<String>) -> Self {
        let registry = ProviderRegistry::builtin(&config.defaults);
        Self::with_registry(config, registry, version)
    }

    pub fn with_registry(
        config: Config,
        registry: ProviderRegistry,
        version: impl Into<String>,
    ) -> Self {
        Self {
            config,
            executor: Executor::new(registry),
            progress_handler: None,
            version: version.into(),
        }
    }

    pub fn set_progress_handler(&mut self, handler: Arc<dyn ProgressHandler>) {
        let sink = handler.clone();
        self.executor
            .set_progress_callback(Some(Arc::new(move |name: &str, status: Status, msg: &str| {
                sink.on_job_progress(name, status, msg)
            })));
        self.progress_handler = Some(handler);
    }

    pub fn filter_jobs(&self, options: &RunOptions) -> Vec<&Job> {
        select_jobs(&self.config.jobs, options)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn jobs(&self) -> &[Job] {
        &self.config.jobs
    }

    pub fn environments(&self) -> &HashMap<String, Environment> {
        &self.config.environments
    }

    #[instrument(skip_all, fields(dry_run = options.dry_run))]
    pub async fn run(
        &mut self,
        cancel: &CancelToken,
        options: &RunOptions,
    ) -> Result<RunResult, RunError> {
        let jobs = select_jobs(&self.config.jobs, options);
        if jobs.is_empty() {
            return Err(RunError::NoJobsMatch);
        }

        let total = jobs.len();
        let handler = self.progress_handler.as_deref();
        let mut run = RunResult::new(self.version.as_str());
        info!(total, "Starting run");

        for (i, job) in jobs.iter().copied().enumerate() {
            if cancel.is_cancelled() {
                let remaining = total - i;
                warn!(remaining, "Run cancelled, skipping remaining jobs");
                for _ in 0..remaining {
                    run.add_skipped();
                }
                break;
            }

            let index = i + 1;
            if let Some(handler) = handler {
                handler.on_job_start(index, total, job);
            }

            let result = if options.dry_run {
                debug!(job = %job.name, "Dry run, not executing");
                JobResult::planned(job)
            } else {
                match self.config.environments.get(&job.environment) {
                    Some(env) => self.executor.execute(cancel, job, env).await,
                    None => {
                        warn!(job = %job.name, env = %job.environment, "Environment not found");
                        JobResult::failed(
                            job,
                            format!("environment not found: {}", job.environment),
                        )
                    }
                }
            };

            info!(
                job = %result.job_name,
                status = %result.status,
                duration_ms = result.duration.as_millis() as u64,
                "Job finished"
            );
            if let Some(handler) = handler {
                handler.on_job_complete(index, total, &result);
            }
            run.add_result(result);
        }

        run.finish();
        info!(
            passed = run.summary.passed,
            failed = run.summary.failed,
            skipped = run.summary.skipped,
            "Run finished"
        );
        Ok(run)
    }
}
