//! Configuration loader
//!
//! Loads a single YAML file, or a directory laid out as:
//!
//! ```text
//! config.yaml          # defaults + output
//! environments.yaml    # environments
//! jobs/*.yaml          # jobs, one or more per file
//! ```
//!
//! Environment placeholders are expanded and the result is validated
//! before it is returned.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use super::duration;
use super::environment::Environment;
use super::interpolate::expand_config;
use super::job::Job;
use super::settings::{Config, OutputConfig};
use super::validate::{validate, ValidationErrors};

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML parse error in {file}: {error}")]
    Yaml {
        file: String,
        error: serde_yaml::Error,
    },

    #[error("config validation failed: {0}")]
    Validation(#[from] ValidationErrors),
}

impl LoadError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        LoadError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct DefaultsFile {
    #[serde(default, with = "duration::option")]
    timeout: Option<Duration>,
    #[serde(default, with = "duration::option")]
    poll_interval: Option<Duration>,
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    defaults: Option<DefaultsFile>,
    #[serde(default)]
    output: Option<OutputConfig>,
    #[serde(default)]
    environments: HashMap<String, Environment>,
    #[serde(default)]
    jobs: Vec<Job>,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load, interpolate and validate configuration from a file or directory
    pub fn load(path: impl AsRef<Path>) -> Result<Config, LoadError> {
        let mut config = Self::load_unvalidated(path)?;
        expand_config(&mut config);
        validate(&config)?;
        Ok(config)
    }

    /// Load and merge without interpolation or validation
    pub fn load_unvalidated(path: impl AsRef<Path>) -> Result<Config, LoadError> {
        let path = path.as_ref();
        let meta = std::fs::metadata(path).map_err(|e| LoadError::io(path, e))?;

        let mut config = Config::default();
        if meta.is_dir() {
            Self::load_directory(&mut config, path)?;
        } else {
            let file = Self::read_file(path)?;
            Self::merge(&mut config, file);
        }

        debug!(
            environments = config.environments.len(),
            jobs = config.jobs.len(),
            "Loaded configuration from {}",
            path.display()
        );
        Ok(config)
    }

    fn load_directory(config: &mut Config, dir: &Path) -> Result<(), LoadError> {
        let config_file = dir.join("config.yaml");
        if config_file.is_file() {
            let file = Self::read_file(&config_file)?;
            Self::merge_settings(config, file.defaults, file.output);
        }

        let env_file = dir.join("environments.yaml");
        if env_file.is_file() {
            let file = Self::read_file(&env_file)?;
            config.environments.extend(file.environments);
        }

        let jobs_dir = dir.join("jobs");
        if jobs_dir.is_dir() {
            for path in Self::yaml_files(&jobs_dir)? {
                let file = Self::read_file(&path)?;
                config.jobs.extend(file.jobs);
            }
        }

        Ok(())
    }

    /// YAML files in a directory, sorted by name
    fn yaml_files(dir: &Path) -> Result<Vec<PathBuf>, LoadError> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(|e| LoadError::io(dir, e))? {
            let path = entry.map_err(|e| LoadError::io(dir, e))?.path();
            let ext = path.extension().and_then(|e| e.to_str());
            if path.is_file() && matches!(ext, Some("yaml") | Some("yml")) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    fn read_file(path: &Path) -> Result<ConfigFile, LoadError> {
        let content = std::fs::read_to_string(path).map_err(|e| LoadError::io(path, e))?;
        if content.trim().is_empty() {
            return Ok(ConfigFile::default());
        }
        serde_yaml::from_str(&content).map_err(|e| LoadError::Yaml {
            file: path.display().to_string(),
            error: e,
        })
    }

    fn merge(config: &mut Config, file: ConfigFile) {
        Self::merge_settings(config, file.defaults, file.output);
        config.environments.extend(file.environments);
        config.jobs.extend(file.jobs);
    }

    fn merge_settings(
        config: &mut Config,
        defaults: Option<DefaultsFile>,
        output: Option<OutputConfig>,
    ) {
        if let Some(defaults) = defaults {
            if let Some(timeout) = defaults.timeout.filter(|d| !d.is_zero()) {
                config.defaults.timeout = timeout;
            }
            if let Some(interval) = defaults.poll_interval.filter(|d| !d.is_zero()) {
                config.defaults.poll_interval = interval;
            }
        }
        if let Some(output) = output {
            config.output = output;
        }
    }
}
