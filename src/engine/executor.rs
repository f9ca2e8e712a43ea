//! Executor - routes a job to the provider registered for its type
//!
//! The executor never fails: an unknown type tag or a provider error is
//! turned into a `failed` result so the run can continue with other jobs.

use tracing::{debug, instrument, warn};

use super::cancel::CancelToken;
use super::result::JobResult;
use crate::config::{Environment, Job};
use crate::providers::{ProgressCallback, ProviderRegistry};

pub struct Executor {
    registry: ProviderRegistry,
    on_progress: Option<ProgressCallback>,
}

impl Executor {
    pub fn new(registry: ProviderRegistry) -> Self {
        Self {
            registry,
            on_progress: None,
        }
    }

    /// Progress sink installed into each provider before it runs
    pub fn set_progress_callback(&mut self, callback: Option<ProgressCallback>) {
        self.on_progress = callback;
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    #[instrument(skip_all, fields(job = %job.name, kind = %job.kind))]
    pub async fn execute(&mut self, cancel: &CancelToken, job: &Job, env: &Environment) -> JobResult {
        let provider = match self.registry.get_mut(&job.kind) {
            Ok(provider) => provider,
            Err(e) => {
                warn!(error = %e, "No provider for job");
                return JobResult::failed(job, e.to_string());
            }
        };

        provider.set_progress_callback(self.on_progress.clone());
        debug!(provider = provider.name(), "Dispatching job");

        match provider.execute(cancel, job, env).await {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "Provider error");
                JobResult::failed(job, e.to_string())
            }
        }
    }
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("registry", &self.registry)
            .field("progress", &self.on_progress.is_some())
            .finish()
    }
}
