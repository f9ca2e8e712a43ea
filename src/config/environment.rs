//! Target environments and their authentication descriptors

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// API version used against the job-execution API when none is configured
pub const DEFAULT_API_VERSION: u32 = 41;

/// Header used for API key authentication when none is configured
pub const DEFAULT_API_KEY_HEADER: &str = "X-API-Key";

/// A named target system that jobs run against
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Environment {
    /// Target type tag (`rest` or `async_job`)
    #[serde(rename = "type", default)]
    pub kind: String,

    /// Base address, e.g. `https://api.example.com`
    #[serde(default)]
    pub url: String,

    /// Job-execution API version (async_job environments only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<u32>,

    #[serde(default)]
    pub auth: AuthConfig,

    /// Headers sent with every request to this environment
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

impl Environment {
    pub fn new(kind: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_auth(mut self, auth: AuthConfig) -> Self {
        self.auth = auth;
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn api_version(&self) -> u32 {
        self.api_version.unwrap_or(DEFAULT_API_VERSION)
    }
}

/// Authentication descriptor
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthConfig {
    #[default]
    None,
    /// `Authorization: Bearer <token>`
    Bearer { token: String },
    /// Standard basic credentials
    Basic { username: String, password: String },
    /// Key sent in a named header (default `X-API-Key`)
    ApiKey {
        api_key: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        header: Option<String>,
    },
}

impl AuthConfig {
    pub fn is_none(&self) -> bool {
        matches!(self, AuthConfig::None)
    }

    /// Short label used when listing environments
    pub fn kind(&self) -> &'static str {
        match self {
            AuthConfig::None => "none",
            AuthConfig::Bearer { .. } => "bearer",
            AuthConfig::Basic { .. } => "basic",
            AuthConfig::ApiKey { .. } => "api_key",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_environment_with_bearer() {
        let yaml = r#"
type: async_job
url: https://jobs.example.com
api_version: 45
auth:
  type: bearer
  token: abc
"#;
        let env: Environment = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(env.kind, "async_job");
        assert_eq!(env.api_version(), 45);
        assert_eq!(
            env.auth,
            AuthConfig::Bearer {
                token: "abc".to_string()
            }
        );
    }

    #[test]
    fn test_auth_defaults_to_none() {
        let env: Environment = serde_yaml::from_str("type: rest\nurl: http://x").unwrap();
        assert!(env.auth.is_none());
        assert_eq!(env.api_version(), DEFAULT_API_VERSION);
        assert!(env.headers.is_empty());
    }

    #[test]
    fn test_api_key_header_is_optional() {
        let yaml = r#"
type: api_key
api_key: k-123
"#;
        let auth: AuthConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            auth,
            AuthConfig::ApiKey {
                api_key: "k-123".to_string(),
                header: None
            }
        );
        assert_eq!(auth.kind(), "api_key");
    }
}
