//! Top-level configuration

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use super::environment::Environment;
use super::job::Job;

/// Complete, validated configuration for a run
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub defaults: Defaults,
    pub output: OutputConfig,
    pub environments: HashMap<String, Environment>,
    /// Jobs in declaration order
    pub jobs: Vec<Job>,
}

impl Config {
    pub fn with_environment(mut self, name: impl Into<String>, env: Environment) -> Self {
        self.environments.insert(name.into(), env);
        self
    }

    pub fn with_job(mut self, job: Job) -> Self {
        self.jobs.push(job);
        self
    }

    /// Environment names, sorted
    pub fn environment_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.environments.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Fallback timing for jobs that do not declare their own
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Defaults {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10 * 60),
            poll_interval: Duration::from_secs(10),
        }
    }
}

/// Output format for the final report
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Console,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,

    #[serde(default)]
    pub console: ConsoleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConsoleConfig {
    #[serde(default = "default_colors")]
    pub colors: bool,

    #[serde(default)]
    pub verbose: bool,
}

fn default_colors() -> bool {
    true
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            colors: default_colors(),
            verbose: false,
        }
    }
}
