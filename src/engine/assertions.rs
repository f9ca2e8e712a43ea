//! Assertion evaluation
//!
//! Pure functions comparing observed values against declared expectations.
//! Each check yields an optional discrepancy message; callers collect all of
//! them so a result reports every violated assertion at once.

use serde_json::Value;
use std::time::Duration;

use super::result::{JobResult, Status};
use crate::config::duration::format_duration;
use crate::config::{Assertions, JsonAssertion};

/// Errors resolving a dotted JSON path
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JsonPathError {
    #[error("path '{0}' must start with the '$.' prefix")]
    MissingPrefix(String),

    #[error("key '{0}' not found")]
    KeyNotFound(String),

    #[error("array indexing not yet supported for '{0}'")]
    ArrayIndexing(String),

    #[error("cannot traverse '{0}' in non-object type (key not found)")]
    CannotTraverse(String),
}

/// Resolve a `$.a.b.c` path against decoded JSON
pub fn get_json_path<'a>(data: &'a Value, path: &str) -> Result<&'a Value, JsonPathError> {
    let rest = path
        .strip_prefix("$.")
        .ok_or_else(|| JsonPathError::MissingPrefix(path.to_string()))?;

    let mut current = data;
    for part in rest.split('.').filter(|p| !p.is_empty()) {
        current = match current {
            Value::Object(map) => map
                .get(part)
                .ok_or_else(|| JsonPathError::KeyNotFound(part.to_string()))?,
            Value::Array(_) => return Err(JsonPathError::ArrayIndexing(part.to_string())),
            _ => return Err(JsonPathError::CannotTraverse(part.to_string())),
        };
    }

    Ok(current)
}

/// Compare an observed JSON value with a declared scalar
pub fn values_equal(actual: &Value, expected: &Value) -> bool {
    match expected {
        Value::String(e) => {
            if let Value::String(a) = actual {
                return a == e;
            }
        }
        Value::Bool(e) => {
            if let Value::Bool(a) = actual {
                return a == e;
            }
        }
        Value::Number(n) => {
            if let Some(a) = actual.as_f64() {
                if let Some(e) = n.as_i64() {
                    return a as i64 == e;
                }
                if let Some(e) = n.as_u64() {
                    return a as u64 == e;
                }
                if let Some(e) = n.as_f64() {
                    return a == e;
                }
            }
        }
        _ => {}
    }

    display_value(actual) == display_value(expected)
}

/// Render a value the way it appears in messages: strings unquoted
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub fn check_status_code(expected: Option<u16>, actual: u16) -> Option<String> {
    match expected {
        Some(code) if code != actual => {
            Some(format!("expected status code {}, got {}", code, actual))
        }
        _ => None,
    }
}

pub fn check_duration(max: Option<Duration>, actual: Duration) -> Option<String> {
    match max {
        Some(max) if !max.is_zero() && actual > max => Some(format!(
            "duration {} exceeded max {}",
            format_duration(actual),
            format_duration(max)
        )),
        _ => None,
    }
}

/// Verbatim comparison of a remote-reported status string
pub fn check_declared_status(expected: Option<&str>, actual: &str) -> Option<String> {
    match expected {
        Some(status) if !status.is_empty() && status != actual => Some(format!(
            "expected status '{}', got '{}'",
            status, actual
        )),
        _ => None,
    }
}

/// Evaluate JSON path assertions against a raw response body
pub fn check_json(body: &[u8], assertions: &[JsonAssertion]) -> Vec<String> {
    if assertions.is_empty() {
        return Vec::new();
    }

    let data: Value = match serde_json::from_slice(body) {
        Ok(data) => data,
        Err(e) => return vec![format!("failed to parse JSON response: {}", e)],
    };

    check_json_value(&data, assertions)
}

pub fn check_json_value(data: &Value, assertions: &[JsonAssertion]) -> Vec<String> {
    assertions
        .iter()
        .filter_map(|assertion| match get_json_path(data, &assertion.path) {
            Err(e) => Some(format!("JSON path {}: {}", assertion.path, e)),
            Ok(actual) if !values_equal(actual, &assertion.equals) => Some(format!(
                "JSON path {}: expected {}, got {}",
                assertion.path,
                display_value(&assertion.equals),
                display_value(actual)
            )),
            Ok(_) => None,
        })
        .collect()
}

/// Every discrepancy of an HTTP response against the declared assertions
pub fn evaluate_response(
    assertions: &Assertions,
    status_code: u16,
    duration: Duration,
    body: &[u8],
) -> Vec<String> {
    let mut errors = Vec::new();
    errors.extend(check_status_code(assertions.status_code, status_code));
    errors.extend(check_duration(assertions.max_duration, duration));
    errors.extend(check_json(body, &assertions.json));
    errors
}

/// Settle a result: no discrepancies means `succeeded`, otherwise `failed`
/// with every message joined by `; `
pub fn apply_verdict(result: &mut JobResult, errors: Vec<String>) {
    if errors.is_empty() {
        result.status = Status::Succeeded;
    } else {
        result.fail(errors.join("; "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_json_path() {
        let data = json!({"a": {"b": 1}});
        assert_eq!(get_json_path(&data, "$.a.b").unwrap(), &json!(1));
        assert_eq!(get_json_path(&data, "$.a").unwrap(), &json!({"b": 1}));
        assert_eq!(get_json_path(&data, "$.").unwrap(), &data);
    }

    #[test]
    fn test_get_json_path_skips_empty_segments() {
        let data = json!({"a": {"b": "x"}});
        assert_eq!(get_json_path(&data, "$.a..b").unwrap(), &json!("x"));
    }

    #[test]
    fn test_get_json_path_errors() {
        let err = get_json_path(&json!({"a": 1}), "$.a.c").unwrap_err();
        assert!(err.to_string().contains("key not found"));
        assert!(err.to_string().contains("cannot traverse"));

        let err = get_json_path(&json!({"a": {}}), "$.a.c").unwrap_err();
        assert_eq!(err, JsonPathError::KeyNotFound("c".to_string()));

        let err = get_json_path(&json!({"a": [1, 2]}), "$.a.0").unwrap_err();
        assert!(err.to_string().contains("not yet supported"));

        let err = get_json_path(&json!({"b": {"c": 1}}), "b.c").unwrap_err();
        assert!(matches!(err, JsonPathError::MissingPrefix(_)));
        assert!(err.to_string().contains("prefix"));
    }

    #[test]
    fn test_values_equal() {
        assert!(values_equal(&json!("ok"), &json!("ok")));
        assert!(!values_equal(&json!("ok"), &json!("nope")));
        assert!(values_equal(&json!(true), &json!(true)));
        assert!(!values_equal(&json!(false), &json!(true)));
        assert!(values_equal(&json!(3.0), &json!(3)));
        assert!(values_equal(&json!(3.7), &json!(3)));
        assert!(values_equal(&json!(2.5), &json!(2.5)));
        assert!(!values_equal(&json!(2.5), &json!(2.6)));
        // Falls back to string form
        assert!(values_equal(&json!(200), &json!("200")));
        assert!(values_equal(&json!(null), &json!(null)));
    }

    #[test]
    fn test_check_status_and_duration() {
        assert_eq!(check_status_code(None, 503), None);
        assert_eq!(check_status_code(Some(200), 200), None);
        assert_eq!(
            check_status_code(Some(200), 503).as_deref(),
            Some("expected status code 200, got 503")
        );

        assert_eq!(check_duration(None, Duration::from_secs(9)), None);
        assert_eq!(
            check_duration(Some(Duration::from_secs(1)), Duration::from_millis(1500)).as_deref(),
            Some("duration 1.5s exceeded max 1s")
        );
        assert_eq!(
            check_duration(Some(Duration::from_secs(1)), Duration::from_millis(900)),
            None
        );
    }

    #[test]
    fn test_check_declared_status() {
        assert_eq!(check_declared_status(None, "failed"), None);
        assert_eq!(check_declared_status(Some("succeeded"), "succeeded"), None);
        assert_eq!(
            check_declared_status(Some("succeeded"), "failed").as_deref(),
            Some("expected status 'succeeded', got 'failed'")
        );
    }

    #[test]
    fn test_check_json_collects_every_failure() {
        let body = br#"{"status": "degraded", "checks": {"db": true}, "items": []}"#;
        let assertions = vec![
            JsonAssertion::new("$.status", "healthy"),
            JsonAssertion::new("$.checks.db", true),
            JsonAssertion::new("$.checks.cache", true),
            JsonAssertion::new("$.items.0", 1),
        ];

        let errors = check_json(body, &assertions);
        assert_eq!(errors.len(), 3);
        assert_eq!(errors[0], "JSON path $.status: expected healthy, got degraded");
        assert!(errors[1].contains("key 'cache' not found"));
        assert!(errors[2].contains("not yet supported"));
    }

    #[test]
    fn test_check_json_invalid_body() {
        let errors = check_json(b"<html>", &[JsonAssertion::new("$.a", 1)]);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("failed to parse JSON response"));

        assert!(check_json(b"<html>", &[]).is_empty());
    }

    #[test]
    fn test_evaluate_response_reports_all_violations() {
        let assertions = Assertions {
            status_code: Some(200),
            max_duration: Some(Duration::from_millis(100)),
            ..Default::default()
        };
        let errors = evaluate_response(&assertions, 500, Duration::from_millis(250), b"");

        let mut result = JobResult::start(&crate::config::Job::rest("a", "e", "GET", "/"));
        apply_verdict(&mut result, errors);
        assert_eq!(result.status, Status::Failed);
        assert!(result.error.contains("expected status code 200, got 500"));
        assert!(result.error.contains("duration 250ms exceeded max 100ms"));
        assert!(result.error.contains("; "));
    }

    #[test]
    fn test_apply_verdict_success() {
        let mut result = JobResult::start(&crate::config::Job::rest("a", "e", "GET", "/"));
        apply_verdict(&mut result, Vec::new());
        assert_eq!(result.status, Status::Succeeded);
        assert!(result.passed());
    }
}
