//! Per-file "last known timestamp" for formats without per-line timestamps.

use chrono::{DateTime, Utc};

use crate::event::TimestampOrigin;

/// Remembers the most recent explicit timestamp seen in one file.
///
/// Lines with their own timestamp update the carrier; lines without one
/// inherit the held value. When nothing is held yet the wall clock is used
/// and the carrier stays empty, so un-timestamped leading lines may sort
/// after later lines that carry real timestamps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimestampCarrier {
    last: Option<DateTime<Utc>>,
}

impl TimestampCarrier {
    /// Create an empty carrier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a carrier holding `last`.
    #[must_use]
    pub fn from_last(last: Option<DateTime<Utc>>) -> Self {
        Self { last }
    }

    /// The currently held timestamp.
    #[must_use]
    pub fn current(&self) -> Option<DateTime<Utc>> {
        self.last
    }

    /// Resolve the timestamp of one line.
    ///
    /// `explicit` is the timestamp parsed from the line, if any; `now` is
    /// the last-resort fallback.
    pub fn stamp(
        &mut self,
        explicit: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> (DateTime<Utc>, TimestampOrigin) {
        match (explicit, self.last) {
            (Some(ts), _) => {
                self.last = Some(ts);
                (ts, TimestampOrigin::Explicit)
            }
            (None, Some(ts)) => (ts, TimestampOrigin::Inherited),
            (None, None) => (now, TimestampOrigin::WallClock),
        }
    }

    /// Forget the held timestamp.
    pub fn reset(&mut self) {
        self.last = None;
    }
}
