//! Line classification: one raw line in, zero or more events out.
//!
//! Classification is a pure function of the line, the source, its format
//! and the carried timestamp. It performs no I/O.

mod plain;
mod telemetry;
mod transcript;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::carrier::TimestampCarrier;
use crate::event::{Event, SourceName};

pub use plain::{classify_plain, extract_timestamp, plain_kind};
pub use telemetry::{parse_loose_timestamp, parse_telemetry_line, telemetry_kind};
pub use transcript::{parse_transcript_line, ContentBlock, TranscriptRecord, TOOL_RESULT_DISPLAY_LIMIT};

/// On-disk format of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatKind {
    /// Hand-written annotated log without per-line timestamp fields.
    Plain,
    /// JSON-lines transcript, one self-timestamped record per line.
    Transcript,
    /// JSON-lines or free-text telemetry.
    Telemetry,
}

impl FormatKind {
    /// Whether lines of this format inherit timestamps from earlier lines.
    #[must_use]
    pub fn carries_timestamp(self) -> bool {
        matches!(self, Self::Plain)
    }
}

/// Result of classifying one line.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// Events produced by the line, in order.
    pub events: Vec<Event>,
    /// Carried timestamp to use for the next line of the same file.
    pub carried: Option<DateTime<Utc>>,
}

/// Classify one line using the current wall clock as fallback.
#[must_use]
pub fn classify(
    line: &str,
    source: SourceName,
    format: FormatKind,
    carried: Option<DateTime<Utc>>,
) -> Classification {
    classify_at(line, source, format, carried, Utc::now())
}

/// Classify one line with an explicit fallback instant.
#[must_use]
pub fn classify_at(
    line: &str,
    source: SourceName,
    format: FormatKind,
    carried: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Classification {
    match format {
        FormatKind::Plain => {
            let mut carrier = TimestampCarrier::from_last(carried);
            let event = classify_plain(line, source, &mut carrier, now);
            Classification {
                events: vec![event],
                carried: carrier.current(),
            }
        }
        // Self-timestamped formats leave the carrier alone.
        FormatKind::Transcript => Classification {
            events: parse_transcript_line(line, source, now),
            carried,
        },
        FormatKind::Telemetry => Classification {
            events: parse_telemetry_line(line, source, now),
            carried,
        },
    }
}

/// Classify lines of one file in order, threading `carrier` across them.
pub fn classify_lines<I, S>(
    lines: I,
    source: SourceName,
    format: FormatKind,
    carrier: &mut TimestampCarrier,
) -> Vec<Event>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut events = Vec::new();
    for line in lines {
        let line = line.as_ref();
        if line.trim().is_empty() {
            continue;
        }
        let result = classify(line, source, format, carrier.current());
        *carrier = TimestampCarrier::from_last(result.carried);
        events.extend(result.events);
    }
    events
}

/// Truncate `s` to at most `max_chars` characters for diagnostics.
pub(crate) fn preview(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

/// Maximum characters of an offending line shown in diagnostics.
pub(crate) const PREVIEW_CHARS: usize = 120;
