//! Job and assertion definitions

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

use super::duration;
use super::settings::Defaults;

/// Type tag of jobs checked with a single HTTP request
pub const REST: &str = "rest";

/// Type tag of jobs triggered remotely and polled until terminal
pub const ASYNC_JOB: &str = "async_job";

/// A declared unit of verification work
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Job {
    /// Unique name within a run
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Name of the environment this job targets
    #[serde(default)]
    pub environment: String,

    /// Provider type tag (`rest` or `async_job`)
    #[serde(rename = "type", default)]
    pub kind: String,

    // -- async_job --
    /// Remote job identifier
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub job_id: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub project: String,

    /// Parameters submitted with the trigger
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub options: HashMap<String, String>,

    /// Overall deadline, falls back to `defaults.timeout`
    #[serde(default, with = "duration::option", skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,

    /// Status poll interval, falls back to `defaults.poll_interval`
    #[serde(default, with = "duration::option", skip_serializing_if = "Option::is_none")]
    pub poll_interval: Option<Duration>,

    #[serde(default)]
    pub assertions: Assertions,

    #[serde(default)]
    pub tags: Vec<String>,

    // -- rest --
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub method: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,

    /// JSON request body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl Job {
    /// A REST job issuing `method path`
    pub fn rest(
        name: impl Into<String>,
        environment: impl Into<String>,
        method: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            environment: environment.into(),
            kind: REST.to_string(),
            method: method.into(),
            path: path.into(),
            ..Default::default()
        }
    }

    /// An async job triggering the remote job `job_id`
    pub fn async_job(
        name: impl Into<String>,
        environment: impl Into<String>,
        job_id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            environment: environment.into(),
            kind: ASYNC_JOB.to_string(),
            job_id: job_id.into(),
            ..Default::default()
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_assertions(mut self, assertions: Assertions) -> Self {
        self.assertions = assertions;
        self
    }

    pub fn timeout_or(&self, defaults: &Defaults) -> Duration {
        self.timeout
            .filter(|d| !d.is_zero())
            .unwrap_or(defaults.timeout)
    }

    pub fn poll_interval_or(&self, defaults: &Defaults) -> Duration {
        self.poll_interval
            .filter(|d| !d.is_zero())
            .unwrap_or(defaults.poll_interval)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    pub fn has_any_tag<S: AsRef<str>>(&self, tags: &[S]) -> bool {
        tags.iter().any(|tag| self.has_tag(tag.as_ref()))
    }
}

/// Declared expectations; an absent field places no constraint
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Assertions {
    /// Expected remote status string (async jobs)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(default, with = "duration::option", skip_serializing_if = "Option::is_none")]
    pub max_duration: Option<Duration>,

    /// Expected HTTP status code (REST jobs)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub json: Vec<JsonAssertion>,
}

impl Assertions {
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.max_duration.is_none()
            && self.status_code.is_none()
            && self.json.is_empty()
    }
}

/// Equality check of a dotted JSON path (`$.a.b`) against a scalar
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonAssertion {
    pub path: String,
    pub equals: Value,
}

impl JsonAssertion {
    pub fn new(path: impl Into<String>, equals: impl Into<Value>) -> Self {
        Self {
            path: path.into(),
            equals: equals.into(),
        }
    }
}
