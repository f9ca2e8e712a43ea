//! `${VAR}` substitution from the process environment
//!
//! Unknown variables are left in place so a missing secret is visible in
//! the failing request instead of silently becoming an empty string.

use regex::{Captures, Regex};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::LazyLock;

use super::environment::AuthConfig;
use super::settings::Config;

static ENV_VAR_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("valid env var pattern"));

/// Expand `${VAR}` references using the process environment
pub fn expand_env_vars(input: &str) -> String {
    expand_with(input, &|name: &str| std::env::var(name).ok())
}

/// Expand `${VAR}` references using an arbitrary lookup
pub fn expand_with(input: &str, lookup: &dyn Fn(&str) -> Option<String>) -> String {
    ENV_VAR_REGEX
        .replace_all(input, |caps: &Captures| {
            lookup(&caps[1]).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Expand every interpolated field of a configuration in place
pub fn expand_config(config: &mut Config) {
    expand_config_with(config, &|name: &str| std::env::var(name).ok());
}

pub fn expand_config_with(config: &mut Config, lookup: &dyn Fn(&str) -> Option<String>) {
    for env in config.environments.values_mut() {
        env.url = expand_with(&env.url, lookup);
        expand_auth(&mut env.auth, lookup);
        expand_map(&mut env.headers, lookup);
    }

    for job in &mut config.jobs {
        expand_map(&mut job.headers, lookup);
        expand_map(&mut job.options, lookup);
        if let Some(body) = job.body.as_mut() {
            expand_value(body, lookup);
        }
    }
}

fn expand_auth(auth: &mut AuthConfig, lookup: &dyn Fn(&str) -> Option<String>) {
    match auth {
        AuthConfig::None => {}
        AuthConfig::Bearer { token } => *token = expand_with(token, lookup),
        AuthConfig::Basic { username, password } => {
            *username = expand_with(username, lookup);
            *password = expand_with(password, lookup);
        }
        AuthConfig::ApiKey { api_key, .. } => *api_key = expand_with(api_key, lookup),
    }
}

fn expand_map(map: &mut HashMap<String, String>, lookup: &dyn Fn(&str) -> Option<String>) {
    for value in map.values_mut() {
        *value = expand_with(value, lookup);
    }
}

fn expand_value(value: &mut Value, lookup: &dyn Fn(&str) -> Option<String>) {
    match value {
        Value::String(s) => *s = expand_with(s, lookup),
        Value::Object(map) => map.values_mut().for_each(|v| expand_value(v, lookup)),
        Value::Array(items) => items.iter_mut().for_each(|v| expand_value(v, lookup)),
        _ => {}
    }
}
