//! Human-readable durations
//!
//! Timeouts and poll intervals are written as `500ms`, `30s`, `10m` or
//! compound forms such as `1h30m`. Bare integers are read as seconds.

use serde::{Deserialize, Deserializer, Serializer};
use std::fmt::Write;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid duration '{input}': {reason}")]
pub struct DurationError {
    pub input: String,
    pub reason: String,
}

impl DurationError {
    fn new(input: &str, reason: impl Into<String>) -> Self {
        Self {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

/// Parse a duration string like "1h30m", "45s" or "250ms"
pub fn parse_duration(s: &str) -> Result<Duration, DurationError> {
    let input = s.trim();
    if input.is_empty() {
        return Err(DurationError::new(s, "empty string"));
    }

    let mut total = Duration::ZERO;
    let mut chars = input.chars().peekable();

    while chars.peek().is_some() {
        let mut number = String::new();
        while let Some(&c) = chars.peek() {
            if c.is_ascii_digit() || c == '.' {
                number.push(c);
                chars.next();
            } else {
                break;
            }
        }

        let mut unit = String::new();
        while let Some(&c) = chars.peek() {
            if c.is_ascii_digit() || c == '.' {
                break;
            }
            unit.push(c);
            chars.next();
        }

        if number.is_empty() {
            return Err(DurationError::new(
                s,
                format!("expected number before unit '{}'", unit),
            ));
        }
        let value: f64 = number
            .parse()
            .map_err(|_| DurationError::new(s, format!("invalid number '{}'", number)))?;

        let seconds = match unit.as_str() {
            "h" => value * 3600.0,
            "m" => value * 60.0,
            "s" => value,
            "ms" => value / 1_000.0,
            "us" | "µs" => value / 1_000_000.0,
            "" => return Err(DurationError::new(s, "missing unit")),
            other => return Err(DurationError::new(s, format!("unknown unit '{}'", other))),
        };

        total = Duration::try_from_secs_f64(seconds)
            .ok()
            .and_then(|d| total.checked_add(d))
            .ok_or_else(|| DurationError::new(s, "duration out of range"))?;
    }

    Ok(total)
}

/// Format a duration compactly, e.g. `10m`, `1m30s`, `1.25s`, `340ms`
pub fn format_duration(d: Duration) -> String {
    let total_ms = d.as_millis();
    if total_ms == 0 {
        return if d.is_zero() {
            "0s".to_string()
        } else {
            format!("{}µs", d.as_micros())
        };
    }
    if total_ms < 1_000 {
        return format!("{}ms", total_ms);
    }

    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let rest_ms = total_ms % 60_000;

    let mut out = String::new();
    if hours > 0 {
        let _ = write!(out, "{}h", hours);
    }
    if minutes > 0 {
        let _ = write!(out, "{}m", minutes);
    }
    if rest_ms > 0 {
        let secs = rest_ms / 1_000;
        let frac = rest_ms % 1_000;
        if frac == 0 {
            let _ = write!(out, "{}s", secs);
        } else {
            let fractional = format!("{}.{:03}", secs, frac);
            let _ = write!(out, "{}s", fractional.trim_end_matches('0'));
        }
    }
    out
}

/// Round to whole milliseconds, for display
pub fn round_millis(d: Duration) -> Duration {
    Duration::from_millis((d.as_micros() as f64 / 1_000.0).round() as u64)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDuration {
    Seconds(u64),
    Text(String),
}

impl RawDuration {
    fn into_duration(self) -> Result<Duration, DurationError> {
        match self {
            RawDuration::Seconds(secs) => Ok(Duration::from_secs(secs)),
            RawDuration::Text(text) => parse_duration(&text),
        }
    }
}

/// Serde adapter for `Option<Duration>` fields
pub mod option {
    use super::*;

    pub fn serialize<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(d) => serializer.serialize_some(&format_duration(*d)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<RawDuration>::deserialize(deserializer)?
            .map(RawDuration::into_duration)
            .transpose()
            .map_err(serde::de::Error::custom)
    }
}

/// Serialize a `Duration` as integer milliseconds
pub mod millis {
    use super::*;

    pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(value.as_millis() as u64)
    }
}
