//! Request and response types for the dashboard HTTP endpoints.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::event::{Event, SourceName};
use crate::watcher::SourceRegistry;

/// Default number of events returned by GET /api/events.
pub const DEFAULT_RECENT_COUNT: usize = 100;

/// Default page size for GET /api/events/history.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Response for GET /health.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `ok` while the server is answering.
    pub status: String,
    /// Server time.
    pub timestamp: DateTime<Utc>,
    /// Events currently buffered.
    pub buffered: usize,
    /// Live stream subscribers.
    pub subscribers: usize,
}

impl HealthResponse {
    /// Create a healthy response.
    #[must_use]
    pub fn ok(buffered: usize, subscribers: usize) -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            buffered,
            subscribers,
        }
    }
}

/// Query parameters for GET /api/events.
#[derive(Debug, Clone, Deserialize)]
pub struct RecentQuery {
    /// Number of most recent events to return.
    #[serde(default = "default_count", deserialize_with = "count_or_default")]
    pub count: usize,
}

impl Default for RecentQuery {
    fn default() -> Self {
        Self {
            count: default_count(),
        }
    }
}

const fn default_count() -> usize {
    DEFAULT_RECENT_COUNT
}

/// Query parameters for GET /api/events/history.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryQuery {
    /// Events to skip, counted back from the newest.
    #[serde(default, deserialize_with = "offset_or_default")]
    pub offset: usize,
    /// Page size.
    #[serde(default = "default_limit", deserialize_with = "limit_or_default")]
    pub limit: usize,
}

impl Default for HistoryQuery {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: default_limit(),
        }
    }
}

const fn default_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

/// Leading decimal digits of a query value, if they form a positive number.
///
/// `"25abc"` is 25; empty, zero, negative and non-numeric values are `None`.
fn loose_positive(value: &Value) -> Option<usize> {
    let parsed = match value {
        Value::Number(n) => n.as_u64().and_then(|n| usize::try_from(n).ok()),
        Value::String(s) => {
            let s = s.trim_start();
            let s = s.strip_prefix('+').unwrap_or(s);
            let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
            s[..end].parse().ok()
        }
        _ => None,
    };
    parsed.filter(|n| *n > 0)
}

fn count_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<usize, D::Error> {
    Ok(loose_positive(&Value::deserialize(deserializer)?).unwrap_or(DEFAULT_RECENT_COUNT))
}

fn offset_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<usize, D::Error> {
    Ok(loose_positive(&Value::deserialize(deserializer)?).unwrap_or(0))
}

fn limit_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<usize, D::Error> {
    Ok(loose_positive(&Value::deserialize(deserializer)?).unwrap_or(DEFAULT_HISTORY_LIMIT))
}

/// Response for GET /api/streams/status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamStatusResponse {
    /// Availability per source.
    pub status: BTreeMap<SourceName, bool>,
    /// Watched path per source.
    pub files: BTreeMap<SourceName, PathBuf>,
}

impl From<&SourceRegistry> for StreamStatusResponse {
    fn from(registry: &SourceRegistry) -> Self {
        Self {
            status: registry.status(),
            files: registry.files(),
        }
    }
}

/// Response for GET /api/events/initial, and payload of the first SSE frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitialResponse {
    /// Recent content of every source, sorted by timestamp.
    pub events: Vec<Event>,
}
