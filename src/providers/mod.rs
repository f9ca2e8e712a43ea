//! Providers execute one job against a concrete target system
//!
//! This module provides:
//! - `rest`: a single HTTP request checked against status/duration/JSON assertions
//! - `async_job`: trigger a remote job, then poll it until a terminal status
//!
//! Providers are looked up by type tag in a `ProviderRegistry` that is built
//! once before a run and only read while jobs execute.

use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue};
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{Defaults, Environment, Job};
use crate::engine::cancel::CancelToken;
use crate::engine::result::{JobResult, Status};

pub mod async_job;
pub mod rest;

pub use async_job::{
    poll_until_terminal, AsyncJobProvider, ClientFactory, ExecutionState, JobApi, PollError,
    PollSettings, RemoteStatus, RundeckClient, Submission,
};
pub use rest::{RestClient, RestProvider, RestResponse};

/// Receives `(job_name, status, message)` while a job executes
pub type ProgressCallback = Arc<dyn Fn(&str, Status, &str) + Send + Sync>;

/// Errors raised while talking to a target system
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("provider not found: {0}")]
    NotFound(String),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request failed with status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("rundeck error [{code}]: {message}")]
    Rundeck { code: String, message: String },

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("request cancelled")]
    Cancelled,

    #[error("configuration error: {0}")]
    Config(String),
}

fn header_name(name: &str) -> Result<HeaderName, ProviderError> {
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| ProviderError::Config(format!("invalid header name: {}", name)))
}

fn header_value(value: &str) -> Result<HeaderValue, ProviderError> {
    HeaderValue::from_str(value)
        .map_err(|_| ProviderError::Config("invalid header value".to_string()))
}

/// Executable strategy for one job type
#[async_trait]
pub trait Provider: Send + Sync {
    /// Type tag this provider is registered under
    fn name(&self) -> &str;

    /// Install the sink that receives progress messages
    fn set_progress_callback(&mut self, callback: Option<ProgressCallback>);

    /// Execute `job` against `env`.
    ///
    /// Failures of the target are reported in the returned result; an `Err`
    /// means the provider itself could not run.
    async fn execute(
        &self,
        cancel: &CancelToken,
        job: &Job,
        env: &Environment,
    ) -> Result<JobResult, ProviderError>;
}

/// Optional progress sink shared by the built-in providers
#[derive(Clone, Default)]
pub struct ProgressReporter {
    callback: Option<ProgressCallback>,
}

impl ProgressReporter {
    pub fn set(&mut self, callback: Option<ProgressCallback>) {
        self.callback = callback;
    }

    pub fn report(&self, job_name: &str, status: Status, message: &str) {
        if let Some(callback) = &self.callback {
            callback(job_name, status, message);
        }
    }
}

impl std::fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("installed", &self.callback.is_some())
            .finish()
    }
}

/// Type tag -> provider mapping
#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Box<dyn Provider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the `rest` and `async_job` providers
    pub fn builtin(defaults: &Defaults) -> Self {
        let mut registry = Self::new();
        registry.register(RestProvider::new());
        registry.register(AsyncJobProvider::new(*defaults));
        registry
    }

    /// Register a provider under its own name, replacing any previous one
    pub fn register(&mut self, provider: impl Provider + 'static) {
        self.providers
            .insert(provider.name().to_string(), Box::new(provider));
    }

    pub fn get(&self, name: &str) -> Result<&dyn Provider, ProviderError> {
        self.providers
            .get(name)
            .map(|p| p.as_ref())
            .ok_or_else(|| ProviderError::NotFound(name.to_string()))
    }

    pub fn get_mut(&mut self, name: &str) -> Result<&mut (dyn Provider + 'static), ProviderError> {
        self.providers
            .get_mut(name)
            .map(|p| p.as_mut())
            .ok_or_else(|| ProviderError::NotFound(name.to_string()))
    }

    /// Registered type tags, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_builtin_registry() {
        let registry = ProviderRegistry::builtin(&Defaults::default());
        assert_eq!(registry.names(), vec!["async_job", "rest"]);
        assert_eq!(registry.get("rest").unwrap().name(), "rest");
        assert!(matches!(
            registry.get("ftp"),
            Err(ProviderError::NotFound(name)) if name == "ftp"
        ));
    }

    #[test]
    fn test_provider_not_found_message() {
        let err = ProviderRegistry::new().get("soap").err().unwrap();
        assert_eq!(err.to_string(), "provider not found: soap");
    }

    #[test]
    fn test_progress_reporter() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let mut reporter = ProgressReporter::default();
        reporter.report("job", Status::Running, "dropped");

        reporter.set(Some(Arc::new(move |name: &str, status: Status, msg: &str| {
            sink.lock().unwrap().push(format!("{}:{}:{}", name, status, msg));
        })));
        reporter.report("job", Status::Running, "hello");

        assert_eq!(*seen.lock().unwrap(), vec!["job:running:hello".to_string()]);
    }
}
