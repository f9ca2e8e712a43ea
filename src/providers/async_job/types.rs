//! Wire types of the submit-and-poll job-execution API

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::engine::result::Status;

/// Execution status as reported by the remote system
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "String")]
pub enum RemoteStatus {
    Running,
    Succeeded,
    Failed,
    Aborted,
    TimedOut,
    FailedWithRetry,
    Scheduled,
    Pending,
    /// A status this client does not know about, kept verbatim
    Other(String),
}

impl RemoteStatus {
    pub fn as_str(&self) -> &str {
        match self {
            RemoteStatus::Running => "running",
            RemoteStatus::Succeeded => "succeeded",
            RemoteStatus::Failed => "failed",
            RemoteStatus::Aborted => "aborted",
            RemoteStatus::TimedOut => "timedout",
            RemoteStatus::FailedWithRetry => "failed-with-retry",
            RemoteStatus::Scheduled => "scheduled",
            RemoteStatus::Pending => "pending",
            RemoteStatus::Other(raw) => raw,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RemoteStatus::Succeeded
                | RemoteStatus::Failed
                | RemoteStatus::Aborted
                | RemoteStatus::TimedOut
                | RemoteStatus::FailedWithRetry
        )
    }

    /// Map onto the local status; unmapped remote states become `pending`
    pub fn to_status(&self) -> Status {
        match self {
            RemoteStatus::Succeeded => Status::Succeeded,
            RemoteStatus::Failed | RemoteStatus::FailedWithRetry => Status::Failed,
            RemoteStatus::Aborted => Status::Aborted,
            RemoteStatus::TimedOut => Status::TimedOut,
            RemoteStatus::Running => Status::Running,
            RemoteStatus::Scheduled | RemoteStatus::Pending | RemoteStatus::Other(_) => {
                Status::Pending
            }
        }
    }
}

impl From<&str> for RemoteStatus {
    fn from(raw: &str) -> Self {
        match raw {
            "running" => RemoteStatus::Running,
            "succeeded" => RemoteStatus::Succeeded,
            "failed" => RemoteStatus::Failed,
            "aborted" => RemoteStatus::Aborted,
            "timedout" => RemoteStatus::TimedOut,
            "failed-with-retry" => RemoteStatus::FailedWithRetry,
            "scheduled" => RemoteStatus::Scheduled,
            "pending" => RemoteStatus::Pending,
            other => RemoteStatus::Other(other.to_string()),
        }
    }
}

impl From<String> for RemoteStatus {
    fn from(raw: String) -> Self {
        RemoteStatus::from(raw.as_str())
    }
}

impl fmt::Display for RemoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize)]
pub struct RunJobRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<&'a HashMap<String, String>>,
}

impl<'a> RunJobRequest<'a> {
    pub fn new(options: &'a HashMap<String, String>) -> Self {
        Self {
            options: (!options.is_empty()).then_some(options),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunJobResponse {
    pub id: u64,
    #[serde(default)]
    pub href: String,
    #[serde(default)]
    pub permalink: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub project: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionResponse {
    pub id: u64,
    #[serde(default)]
    pub href: String,
    #[serde(default)]
    pub permalink: String,
    pub status: RemoteStatus,
    #[serde(default)]
    pub project: String,
    #[serde(default, rename = "failedNodes")]
    pub failed_nodes: Option<Vec<String>>,
    #[serde(default, rename = "successfulNodes")]
    pub successful_nodes: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub error: bool,
    #[serde(default, rename = "apiversion")]
    pub api_version: u32,
    #[serde(default, rename = "errorCode")]
    pub error_code: String,
    #[serde(default)]
    pub message: String,
}
