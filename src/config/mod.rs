//! Configuration types and loading
//!
//! This module contains everything a run consumes as input:
//! - `settings` - Top-level `Config`, defaults and output settings
//! - `environment` - Target environments and authentication
//! - `job` - Jobs and their assertions
//! - `duration` - Human-readable durations (`30s`, `1h30m`)
//! - `interpolate` - `${VAR}` substitution
//! - `validate` - Collecting validation of a merged config
//! - `loader` - Load a config file or directory

pub mod duration;
pub mod environment;
pub mod interpolate;
pub mod job;
pub mod loader;
pub mod settings;
pub mod validate;

pub use duration::{format_duration, parse_duration, DurationError};
pub use environment::{AuthConfig, Environment, DEFAULT_API_KEY_HEADER, DEFAULT_API_VERSION};
pub use interpolate::{expand_config, expand_env_vars};
pub use job::{Assertions, Job, JsonAssertion, ASYNC_JOB, REST};
pub use loader::{ConfigLoader, LoadError};
pub use settings::{Config, ConsoleConfig, Defaults, OutputConfig, OutputFormat};
pub use validate::{validate, ValidationError, ValidationErrors};
