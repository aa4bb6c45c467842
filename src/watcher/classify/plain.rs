//! Annotated markdown logs (`comms.md`, `ag_log.md`).
//!
//! Timestamps are bracketed inline, e.g. `[2026-01-22 02:00:43]` or
//! `[CC] @AG [2026-01-21 T01:15:00]`, and many lines carry none at all.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use regex::Regex;

use crate::event::{Event, EventKind, SourceName};
use crate::watcher::carrier::TimestampCarrier;

/// Bracketed timestamp patterns, tried in order; the first match wins.
///
/// 1. date and time separated by whitespace
/// 2. date and time separated by `T`
/// 3. lenient: optional `T` with surrounding spaces, time may be absent
const TIMESTAMP_PATTERNS: [&str; 3] = [
    r"\[(\d{4}-\d{2}-\d{2})\s+(\d{2}:\d{2}:\d{2})\]",
    r"\[(\d{4}-\d{2}-\d{2})T(\d{2}:\d{2}:\d{2})\]",
    r"\[(\d{4}-\d{2}-\d{2})\s*T?\s*(\d{2}:\d{2}:\d{2})?\]",
];

static TIMESTAMP_REGEXES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    TIMESTAMP_PATTERNS
        .iter()
        .filter_map(|pattern| Regex::new(pattern).ok())
        .collect()
});

/// Agent tags and the kind they map to, in priority order.
const AGENT_TAGS: [(&str, EventKind); 2] = [
    ("[CC]", EventKind::AgentAMessage),
    ("[AG]", EventKind::AgentBMessage),
];

/// Extract the first bracketed timestamp from `line`.
///
/// A missing time part defaults to midnight. Matches that are not a real
/// calendar date/time are ignored and the next pattern is tried.
#[must_use]
pub fn extract_timestamp(line: &str) -> Option<DateTime<Utc>> {
    TIMESTAMP_REGEXES.iter().find_map(|regex| {
        let caps = regex.captures(line)?;
        let date = NaiveDate::parse_from_str(caps.get(1)?.as_str(), "%Y-%m-%d").ok()?;
        let time = match caps.get(2) {
            Some(m) => NaiveTime::parse_from_str(m.as_str(), "%H:%M:%S").ok()?,
            None => NaiveTime::from_hms_opt(0, 0, 0)?,
        };
        Some(date.and_time(time).and_utc())
    })
}

/// Sniff the kind of an annotated-log line.
#[must_use]
pub fn plain_kind(line: &str) -> EventKind {
    if let Some((_, kind)) = AGENT_TAGS.iter().find(|(tag, _)| line.contains(tag)) {
        return *kind;
    }
    if line.starts_with("---") {
        EventKind::Separator
    } else if line.starts_with('#') {
        EventKind::Heading
    } else {
        EventKind::Message
    }
}

/// Classify one annotated-log line, updating `carrier`.
pub fn classify_plain(
    line: &str,
    source: SourceName,
    carrier: &mut TimestampCarrier,
    now: DateTime<Utc>,
) -> Event {
    let (timestamp, origin) = carrier.stamp(extract_timestamp(line), now);
    Event::new(source, plain_kind(line), timestamp, line).with_origin(origin)
}
