//! Telemetry logs: JSON objects when the emitter is structured, otherwise
//! free text with an optional leading `[timestamp]`.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use serde_json::Value;

use crate::event::{Event, EventKind, Metadata, SourceName, TimestampOrigin};

static LEADING_BRACKET: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^\[([^\]]+)\]").ok());

/// Keywords upgrading a plain telemetry line, in priority order.
const KEYWORD_KINDS: [(&str, EventKind); 4] = [
    ("error", EventKind::Error),
    ("warning", EventKind::Warning),
    ("thinking", EventKind::Thinking),
    ("tool", EventKind::ToolUse),
];

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Parse a timestamp written in any of the common log formats.
///
/// Naive values are taken as UTC.
#[must_use]
pub fn parse_loose_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = DateTime::parse_from_rfc2822(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .map(|naive| naive.and_utc())
}

/// Kind of a free-text telemetry line, by case-insensitive keyword.
#[must_use]
pub fn telemetry_kind(content: &str) -> EventKind {
    let lower = content.to_lowercase();
    KEYWORD_KINDS
        .iter()
        .find(|(keyword, _)| lower.contains(keyword))
        .map_or(EventKind::Log, |(_, kind)| *kind)
}

/// Parse one telemetry line into events.
///
/// Produces exactly one event for any non-blank line.
#[must_use]
pub fn parse_telemetry_line(line: &str, source: SourceName, now: DateTime<Utc>) -> Vec<Event> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    let event = match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(record)) => structured_event(record, source, now),
        _ => plain_event(line, source, now),
    };
    vec![event]
}

fn str_field<'a>(record: &'a Metadata, key: &str) -> Option<&'a str> {
    record.get(key).and_then(Value::as_str)
}

fn structured_event(record: Metadata, source: SourceName, now: DateTime<Utc>) -> Event {
    let timestamp = str_field(&record, "timestamp")
        .and_then(parse_loose_timestamp)
        .unwrap_or(now);

    let raw_type = str_field(&record, "type").or_else(|| str_field(&record, "action"));
    let kind = raw_type
        .and_then(EventKind::from_name)
        .unwrap_or(EventKind::Telemetry);

    let content = str_field(&record, "message")
        .or_else(|| str_field(&record, "content"))
        .map_or_else(|| Value::Object(record.clone()).to_string(), str::to_string);

    let mut event = Event::new(source, kind, timestamp, content)
        .with_meta("action", record.get("action").cloned().unwrap_or(Value::Null));

    if kind == EventKind::Telemetry {
        event = event.with_meta("raw_type", raw_type);
    }

    if let Some(Value::Object(extra)) = record.get("metadata") {
        for (key, value) in extra {
            event.metadata.insert(key.clone(), value.clone());
        }
    }

    event
}

fn plain_event(line: &str, source: SourceName, now: DateTime<Utc>) -> Event {
    let bracket = LEADING_BRACKET
        .as_ref()
        .and_then(|regex| regex.captures(line));

    let (timestamp, origin, content) = match bracket {
        Some(caps) => {
            let whole_len = caps.get(0).map_or(0, |m| m.end());
            let explicit = caps.get(1).and_then(|m| parse_loose_timestamp(m.as_str()));
            let (timestamp, origin) = match explicit {
                Some(ts) => (ts, TimestampOrigin::Explicit),
                None => (now, TimestampOrigin::WallClock),
            };
            (timestamp, origin, line[whole_len..].trim())
        }
        None => (now, TimestampOrigin::WallClock, line),
    };

    Event::new(source, telemetry_kind(content), timestamp, content).with_origin(origin)
}
