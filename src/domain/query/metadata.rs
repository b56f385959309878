//! Cache metadata annotations embedded in query text
//!
//! A cacheable query carries a SQL line comment holding a small JSON payload:
//!
//! ```text
//! -- {"CacheKey":"blogs:","AbsoluteExpirationRelativeToNow":"00:00:10"}
//! -- [[count]]
//! SELECT COUNT(*) FROM blogs
//! ```
//!
//! The optional `[[...]]` annotation is appended to the key so several
//! materializations of one tagged query get their own entries. Durations use
//! the `[d.]hh:mm:ss[.fffffff]` time-span notation.

use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::parameters::CacheParameters;
use crate::domain::DomainError;

const CACHE_KEY_MARKER: &str = "\"CacheKey\"";

static PAYLOAD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"--[ \t]*(\{\s*"CacheKey".*\})"#).expect("payload pattern is valid")
});

static MODIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"--[ \t]*\[\[(.*)\]\]").expect("modifier pattern is valid"));

#[derive(Debug, Serialize, Deserialize)]
struct AnnotationPayload {
    #[serde(rename = "CacheKey")]
    cache_key: String,
    #[serde(rename = "AbsoluteExpirationRelativeToNow", with = "timespan")]
    ttl: Duration,
}

/// Builds the payload annotation for a cache key and TTL
pub fn encode(cache_key: &str, ttl: Duration) -> String {
    // Field order matters: decoding looks for `{"CacheKey"` first.
    format!(
        r#"-- {{"CacheKey":{},"AbsoluteExpirationRelativeToNow":"{}"}}"#,
        serde_json::Value::String(cache_key.to_string()),
        timespan::format(ttl)
    )
}

/// Builds the modifier annotation. Line breaks would end the comment, so they become spaces.
pub fn encode_modifier(suffix: &str) -> String {
    format!("-- [[{}]]", suffix.replace(['\r', '\n'], " "))
}

/// Extracts cache parameters from query text
///
/// Malformed payloads read as "not cacheable": the query then runs uncached.
pub fn decode(query_text: &str) -> Option<CacheParameters> {
    match try_decode(query_text) {
        Ok(params) => params,
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring malformed cache annotation");
            None
        }
    }
}

/// Strict variant of [`decode`] that reports malformed payloads
pub fn try_decode(query_text: &str) -> Result<Option<CacheParameters>, DomainError> {
    if !query_text.contains(CACHE_KEY_MARKER) {
        return Ok(None);
    }

    let Some(captures) = PAYLOAD_RE.captures(query_text) else {
        return Ok(None);
    };

    let payload: AnnotationPayload = serde_json::from_str(&captures[1])
        .map_err(|e| DomainError::metadata(format!("Invalid cache payload: {}", e)))?;

    let mut params = CacheParameters::new(payload.cache_key, payload.ttl);

    if let Some(modifier) = MODIFIER_RE.captures(query_text) {
        params = params.with_modifier(&modifier[1]);
    }

    Ok(Some(params))
}

/// Removes cache annotation lines, leaving the statement the executor runs
pub fn strip(query_text: &str) -> String {
    query_text
        .lines()
        .filter(|line| {
            let line = line.trim();
            !(line.starts_with("--") && (PAYLOAD_RE.is_match(line) || MODIFIER_RE.is_match(line)))
        })
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Time-span text form: `[d.]hh:mm:ss[.fffffff]`, 100ns resolution
pub mod timespan {
    use std::time::Duration;

    use once_cell::sync::Lazy;
    use regex::Regex;
    use serde::{Deserialize, Deserializer, Serializer};

    const NANOS_PER_TICK: u32 = 100;

    static TIMESPAN_RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^(?:(\d+)\.)?(\d{1,2}):(\d{1,2}):(\d{1,2})(?:\.(\d{1,7}))?$")
            .expect("timespan pattern is valid")
    });

    pub fn format(duration: Duration) -> String {
        let total = duration.as_secs();
        let days = total / 86_400;
        let hours = (total % 86_400) / 3_600;
        let minutes = (total % 3_600) / 60;
        let seconds = total % 60;
        let ticks = duration.subsec_nanos() / NANOS_PER_TICK;

        let mut text = if days > 0 {
            format!("{}.{:02}:{:02}:{:02}", days, hours, minutes, seconds)
        } else {
            format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
        };

        if ticks > 0 {
            text.push_str(&format!(".{:07}", ticks));
        }

        text
    }

    pub fn parse(text: &str) -> Result<Duration, String> {
        let text = text.trim();

        if text.starts_with('-') {
            return Err(format!("negative time span '{}'", text));
        }

        let captures = TIMESPAN_RE
            .captures(text)
            .ok_or_else(|| format!("invalid time span '{}'", text))?;

        let number = |index: usize| -> Result<u64, String> {
            captures
                .get(index)
                .map(|m| m.as_str().parse::<u64>().map_err(|e| e.to_string()))
                .unwrap_or(Ok(0))
        };

        let days = number(1)?;
        let hours = number(2)?;
        let minutes = number(3)?;
        let seconds = number(4)?;

        if hours > 23 || minutes > 59 || seconds > 59 {
            return Err(format!("time span component out of range in '{}'", text));
        }

        let nanos = match captures.get(5) {
            Some(fraction) => {
                let padded = format!("{:0<7}", fraction.as_str());
                padded.parse::<u32>().map_err(|e| e.to_string())? * NANOS_PER_TICK
            }
            None => 0,
        };

        let secs = days
            .checked_mul(86_400)
            .and_then(|d| d.checked_add(hours * 3_600 + minutes * 60 + seconds))
            .ok_or_else(|| format!("time span '{}' overflows", text))?;

        Ok(Duration::new(secs, nanos))
    }

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(*duration))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let text = String::deserialize(deserializer)?;
        parse(&text).map_err(serde::de::Error::custom)
    }
}
