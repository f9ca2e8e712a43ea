//! Submit-and-poll client for the remote job-execution API

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use std::collections::HashMap;
use tracing::debug;

use super::types::{ErrorResponse, ExecutionResponse, RemoteStatus, RunJobRequest, RunJobResponse};
use crate::config::{AuthConfig, Environment};
use crate::providers::rest::REQUEST_TIMEOUT;
use crate::providers::{header_name, header_value, ProviderError};

/// Header carrying a Rundeck API token
pub const TOKEN_HEADER: &str = "X-Rundeck-Auth-Token";

/// A triggered execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub execution_id: u64,
    pub permalink: String,
}

/// One observation of an execution's progress
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionState {
    pub status: RemoteStatus,
    pub permalink: String,
    pub failed_nodes: Vec<String>,
}

/// The abstract protocol: `submit(job, params) -> id`, `execution(id) -> state`
#[async_trait]
pub trait JobApi: Send + Sync {
    async fn submit(
        &self,
        job_id: &str,
        options: &HashMap<String, String>,
    ) -> Result<Submission, ProviderError>;

    async fn execution(&self, execution_id: u64) -> Result<ExecutionState, ProviderError>;
}

#[derive(Debug, Clone)]
pub struct RundeckClient {
    base_url: String,
    api_version: u32,
    auth: AuthConfig,
    client: reqwest::Client,
}

impl RundeckClient {
    pub fn new(env: &Environment) -> Result<Self, ProviderError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        for (key, value) in &env.headers {
            headers.insert(header_name(key)?, header_value(value)?);
        }

        match &env.auth {
            AuthConfig::None | AuthConfig::Basic { .. } => {}
            AuthConfig::Bearer { token } => {
                headers.insert(TOKEN_HEADER, token_value(token)?);
            }
            AuthConfig::ApiKey { api_key, header } => {
                let name = header.as_deref().unwrap_or(TOKEN_HEADER);
                headers.insert(header_name(name)?, token_value(api_key)?);
            }
        }

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            base_url: env.url.trim_end_matches('/').to_string(),
            api_version: env.api_version(),
            auth: env.auth.clone(),
            client,
        })
    }

    pub fn api_version(&self) -> u32 {
        self.api_version
    }

    pub fn api_url(&self, path: &str) -> String {
        format!("{}/api/{}/{}", self.base_url, self.api_version, path)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth {
            AuthConfig::Basic { username, password } => request.basic_auth(username, Some(password)),
            _ => request,
        }
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ProviderError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            if let Ok(err) = serde_json::from_str::<ErrorResponse>(&body) {
                if err.error {
                    return Err(ProviderError::Rundeck {
                        code: err.error_code,
                        message: err.message,
                    });
                }
            }
            return Err(ProviderError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

fn token_value(token: &str) -> Result<HeaderValue, ProviderError> {
    let mut value = header_value(token)?;
    value.set_sensitive(true);
    Ok(value)
}

#[async_trait]
impl JobApi for RundeckClient {
    async fn submit(
        &self,
        job_id: &str,
        options: &HashMap<String, String>,
    ) -> Result<Submission, ProviderError> {
        let url = self.api_url(&format!("job/{}/run", job_id));
        debug!("Triggering {}", url);

        let mut request = self.authorize(self.client.post(&url));
        if !options.is_empty() {
            request = request.json(&RunJobRequest::new(options));
        }
        let response = request.send().await?;
        let run: RunJobResponse = Self::decode(response).await?;

        Ok(Submission {
            execution_id: run.id,
            permalink: run.permalink,
        })
    }

    async fn execution(&self, execution_id: u64) -> Result<ExecutionState, ProviderError> {
        let url = self.api_url(&format!("execution/{}", execution_id));
        let response = self.authorize(self.client.get(&url)).send().await?;
        let exec: ExecutionResponse = Self::decode(response).await?;

        debug!(execution_id, status = %exec.status, "Execution status");

        Ok(ExecutionState {
            status: exec.status,
            permalink: exec.permalink,
            failed_nodes: exec.failed_nodes.unwrap_or_default(),
        })
    }
}
