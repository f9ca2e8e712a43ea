//! REST provider - one HTTP request per job
//!
//! The request goes to `environment.url + job.path` with environment headers,
//! then job headers (job wins on collision), then the environment's auth.
//! The response is checked against status code, duration and JSON path
//! assertions.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

use super::{
    header_name, header_value, ProgressCallback, ProgressReporter, Provider, ProviderError,
};
use crate::config::duration::{format_duration, round_millis};
use crate::config::{AuthConfig, Environment, Job, DEFAULT_API_KEY_HEADER, REST};
use crate::engine::assertions::{apply_verdict, evaluate_response};
use crate::engine::cancel::CancelToken;
use crate::engine::result::{JobResult, Status};

/// Client-level timeout for a single request
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct RestResponse {
    pub status: u16,
    pub body: Vec<u8>,
    /// Time until response headers arrived
    pub duration: Duration,
}

/// HTTP client bound to one environment
#[derive(Debug)]
pub struct RestClient {
    base_url: String,
    auth: AuthConfig,
    headers: HashMap<String, String>,
    client: reqwest::Client,
}

impl RestClient {
    pub fn new(env: &Environment) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self::with_client(env, client))
    }

    pub fn with_client(env: &Environment, client: reqwest::Client) -> Self {
        Self {
            base_url: env.url.clone(),
            auth: env.auth.clone(),
            headers: env.headers.clone(),
            client,
        }
    }

    pub fn build_url(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        if path.is_empty() {
            base.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", base, path)
        } else {
            format!("{}/{}", base, path)
        }
    }

    /// Environment headers, job headers, auth, then a default content type
    fn build_headers(
        &self,
        extra: &HashMap<String, String>,
        has_body: bool,
    ) -> Result<HeaderMap, ProviderError> {
        let mut headers = HeaderMap::new();
        for (key, value) in self.headers.iter().chain(extra.iter()) {
            headers.insert(header_name(key)?, header_value(value)?);
        }

        match &self.auth {
            AuthConfig::None | AuthConfig::Basic { .. } => {}
            AuthConfig::Bearer { token } => {
                headers.insert(AUTHORIZATION, header_value(&format!("Bearer {}", token))?);
            }
            AuthConfig::ApiKey { api_key, header } => {
                let name = header.as_deref().unwrap_or(DEFAULT_API_KEY_HEADER);
                headers.insert(header_name(name)?, header_value(api_key)?);
            }
        }
        if matches!(self.auth, AuthConfig::Basic { .. }) {
            // set by `basic_auth` on the request builder
            headers.remove(AUTHORIZATION);
        }

        if has_body && !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        Ok(headers)
    }

    /// Issue one request; the duration covers only the network round trip
    pub async fn send(
        &self,
        cancel: &CancelToken,
        method: &str,
        path: &str,
        headers: &HashMap<String, String>,
        body: Option<&Value>,
    ) -> Result<RestResponse, ProviderError> {
        let url = self.build_url(path);
        let method = Method::from_bytes(method.to_uppercase().as_bytes())
            .map_err(|_| ProviderError::Config(format!("invalid HTTP method: {}", method)))?;

        let mut request = self
            .client
            .request(method.clone(), &url)
            .headers(self.build_headers(headers, body.is_some())?);

        if let AuthConfig::Basic { username, password } = &self.auth {
            request = request.basic_auth(username, Some(password));
        }
        if let Some(body) = body {
            request = request.body(serde_json::to_vec(body)?);
        }

        debug!("Executing {} {}", method, url);

        let start = Instant::now();
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ProviderError::Cancelled),
            response = request.send() => response?,
        };
        let duration = start.elapsed();

        let status = response.status().as_u16();

        let body = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ProviderError::Cancelled),
            bytes = response.bytes() => bytes?,
        };

        info!("{} {} -> {} ({}ms)", method, url, status, duration.as_millis());

        Ok(RestResponse {
            status,
            body: body.to_vec(),
            duration,
        })
    }
}

/// Checks an HTTP endpoint with a single request
#[derive(Debug, Default)]
pub struct RestProvider {
    progress: ProgressReporter,
}

impl RestProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Provider for RestProvider {
    fn name(&self) -> &str {
        REST
    }

    fn set_progress_callback(&mut self, callback: Option<ProgressCallback>) {
        self.progress.set(callback);
    }

    #[instrument(skip_all, fields(job = %job.name, env = %job.environment))]
    async fn execute(
        &self,
        cancel: &CancelToken,
        job: &Job,
        env: &Environment,
    ) -> Result<JobResult, ProviderError> {
        let mut result = JobResult::start(job);
        let client = RestClient::new(env)?;

        let url = client.build_url(&job.path);
        result.status = Status::Running;
        result.set_detail("url", url.as_str());
        self.progress
            .report(&job.name, Status::Running, &format!("{} {}", job.method, url));

        let response = match client
            .send(cancel, &job.method, &job.path, &job.headers, job.body.as_ref())
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Request failed");
                result.fail(e.to_string());
                result.finish();
                return Ok(result);
            }
        };

        result.set_detail("status_code", response.status);
        result.set_detail("duration_ms", response.duration.as_millis() as u64);
        result.finish();
        result.duration = response.duration;

        let errors = evaluate_response(
            &job.assertions,
            response.status,
            response.duration,
            &response.body,
        );
        apply_verdict(&mut result, errors);

        self.progress.report(
            &job.name,
            result.status,
            &format!(
                "Status: {} ({})",
                response.status,
                format_duration(round_millis(response.duration))
            ),
        );

        Ok(result)
    }
}
