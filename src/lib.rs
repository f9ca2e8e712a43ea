//! # JobProbe
//!
//! Declarative verification of HTTP endpoints and remote batch jobs.
//!
//! ## Features
//!
//! - **YAML configuration** - Environments, jobs and assertions in one file or a directory
//! - **REST checks** - One request per job, checked against status code, duration and JSON fields
//! - **Async jobs** - Trigger a remote job (Rundeck API) and poll it to a terminal status
//! - **Filtering** - Select jobs by name, tag and environment; preview with a dry run
//! - **Output** - Console progress with a failure digest, or a JSON document
//!
//! ## Job types
//!
//! - **rest**: `environment.url + path`, environment then job headers, optional JSON body
//! - **async_job**: `POST /api/{v}/job/{id}/run`, then `GET /api/{v}/execution/{id}` until done
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use jobprobe::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConfigLoader::load("jobprobe.yaml")?;
//!
//!     let mut runner = Runner::new(config, env!("CARGO_PKG_VERSION"));
//!     let options = RunOptions {
//!         tags: vec!["smoke".to_string()],
//!         ..Default::default()
//!     };
//!     let result = runner.run(&CancelToken::new(), &options).await?;
//!
//!     println!("passed={} failed={}", result.summary.passed, result.summary.failed);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod engine;
pub mod output;
pub mod providers;

// Re-export main types
pub use config::{
    AuthConfig, Config, ConfigLoader, Defaults, Environment, Job, LoadError, OutputFormat,
};
pub use engine::{
    CancelToken, Executor, JobResult, ProgressHandler, RunError, RunOptions, RunResult, Runner,
    Status, Summary,
};
pub use output::{ConsoleWriter, JsonWriter, ProgressAdapter, Writer};
pub use providers::{Provider, ProviderError, ProviderRegistry};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{
        Assertions, AuthConfig, Config, ConfigLoader, Environment, Job, JsonAssertion,
        LoadError, OutputFormat,
    };
    pub use crate::engine::{
        CancelToken, JobResult, ProgressHandler, RunError, RunOptions, RunResult, Runner, Status,
    };
    pub use crate::output::{ConsoleWriter, JsonWriter, ProgressAdapter, SharedWriter, Writer};
    pub use crate::providers::{Provider, ProviderError, ProviderRegistry};
}
