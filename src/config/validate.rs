//! Configuration validation
//!
//! Every violation is collected so a broken config is reported in one pass.

use std::collections::HashSet;
use std::fmt;

use super::job::{Job, ASYNC_JOB, REST};
use super::settings::{Config, Defaults};
use super::Environment;

const VALID_TYPES: [&str; 2] = [REST, ASYNC_JOB];
const VALID_METHODS: [&str; 7] = ["GET", "POST", "PUT", "DELETE", "PATCH", "HEAD", "OPTIONS"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(pub Vec<ValidationError>);

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.0.iter()
    }

    fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(ValidationError::new(field, message));
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "{}", messages.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Validate a fully merged configuration
pub fn validate(config: &Config) -> Result<(), ValidationErrors> {
    let mut errs = ValidationErrors::default();

    validate_defaults(&config.defaults, &mut errs);

    let mut env_names: Vec<&String> = config.environments.keys().collect();
    env_names.sort();
    for name in env_names {
        validate_environment(name, &config.environments[name], &mut errs);
    }

    let mut seen = HashSet::new();
    for (i, job) in config.jobs.iter().enumerate() {
        validate_job(i, job, config, &mut seen, &mut errs);
    }

    if errs.is_empty() {
        Ok(())
    } else {
        Err(errs)
    }
}

fn validate_defaults(defaults: &Defaults, errs: &mut ValidationErrors) {
    if defaults.timeout.is_zero() {
        errs.push("defaults.timeout", "must be greater than 0");
    }
    if defaults.poll_interval.is_zero() {
        errs.push("defaults.poll_interval", "must be greater than 0");
    }
}

fn validate_environment(name: &str, env: &Environment, errs: &mut ValidationErrors) {
    let prefix = format!("environments.{}", name);

    if env.kind.is_empty() {
        errs.push(format!("{}.type", prefix), "is required");
    } else if !VALID_TYPES.contains(&env.kind.as_str()) {
        errs.push(
            format!("{}.type", prefix),
            format!(
                "invalid type '{}', must be one of: {}",
                env.kind,
                VALID_TYPES.join(", ")
            ),
        );
    }

    if env.url.is_empty() {
        errs.push(format!("{}.url", prefix), "is required");
    }
}

fn validate_job<'a>(
    index: usize,
    job: &'a Job,
    config: &Config,
    seen: &mut HashSet<&'a str>,
    errs: &mut ValidationErrors,
) {
    let prefix = format!("jobs[{}]", index);

    if job.name.is_empty() {
        errs.push(format!("{}.name", prefix), "is required");
    } else if !seen.insert(job.name.as_str()) {
        errs.push(
            format!("{}.name", prefix),
            format!("duplicate job name '{}'", job.name),
        );
    }

    if job.environment.is_empty() {
        errs.push(format!("{}.environment", prefix), "is required");
    } else if !config.environments.contains_key(&job.environment) {
        errs.push(
            format!("{}.environment", prefix),
            format!("environment '{}' not found", job.environment),
        );
    }

    if job.kind.is_empty() {
        errs.push(format!("{}.type", prefix), "is required");
    } else if !VALID_TYPES.contains(&job.kind.as_str()) {
        errs.push(
            format!("{}.type", prefix),
            format!(
                "invalid type '{}', must be one of: {}",
                job.kind,
                VALID_TYPES.join(", ")
            ),
        );
    }

    match job.kind.as_str() {
        ASYNC_JOB => {
            if job.job_id.is_empty() {
                errs.push(format!("{}.job_id", prefix), "is required for async_job jobs");
            }
        }
        REST => {
            if job.method.is_empty() {
                errs.push(format!("{}.method", prefix), "is required for rest jobs");
            } else if !VALID_METHODS.contains(&job.method.as_str()) {
                errs.push(
                    format!("{}.method", prefix),
                    format!("invalid method '{}'", job.method),
                );
            }
            if job.path.is_empty() {
                errs.push(format!("{}.path", prefix), "is required for rest jobs");
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn valid_config() -> Config {
        Config::default()
            .with_environment("api", Environment::new("rest", "http://localhost"))
            .with_environment("jobs", Environment::new("async_job", "http://rundeck"))
            .with_job(Job::rest("health", "api", "GET", "/health"))
            .with_job(Job::async_job("backup", "jobs", "abc-123"))
    }

    #[test]
    fn test_valid_config() {
        assert!(validate(&valid_config()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = valid_config();
        config.defaults.poll_interval = Duration::ZERO;
        config.jobs.push(Job::rest("health", "missing", "FETCH", ""));
        config.jobs.push(Job {
            name: "typeless".into(),
            environment: "api".into(),
            ..Default::default()
        });

        let errs = validate(&config).unwrap_err();
        let rendered = errs.to_string();
        assert!(rendered.contains("defaults.poll_interval: must be greater than 0"));
        assert!(rendered.contains("jobs[2].name: duplicate job name 'health'"));
        assert!(rendered.contains("jobs[2].environment: environment 'missing' not found"));
        assert!(rendered.contains("jobs[2].method: invalid method 'FETCH'"));
        assert!(rendered.contains("jobs[2].path: is required for rest jobs"));
        assert!(rendered.contains("jobs[3].type: is required"));
        assert_eq!(errs.len(), 6);
    }

    #[test]
    fn test_environment_errors() {
        let config = Config::default().with_environment("bad", Environment::new("ftp", ""));
        let errs = validate(&config).unwrap_err();
        assert_eq!(errs.len(), 2);
        assert_eq!(
            errs.0[0].to_string(),
            "environments.bad.type: invalid type 'ftp', must be one of: rest, async_job"
        );
        assert_eq!(errs.0[1].to_string(), "environments.bad.url: is required");
    }

    #[test]
    fn test_async_job_requires_job_id() {
        let config = Config::default()
            .with_environment("jobs", Environment::new("async_job", "http://rundeck"))
            .with_job(Job::async_job("backup", "jobs", ""));
        let errs = validate(&config).unwrap_err();
        assert_eq!(errs.to_string(), "jobs[0].job_id: is required for async_job jobs");
    }
}
