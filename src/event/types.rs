//! Event types shared by every source format.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Free-form, type-specific extras attached to an event.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Logical origin of a line or record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceName {
    /// Shared annotated comms transcript.
    Comms,
    /// Hand-written log of the GUI-automated agent.
    AgentLog,
    /// Structured JSONL transcript of the CLI agent.
    CcTranscript,
    /// Telemetry log of the GUI-automated agent.
    AgentTelemetry,
    /// Terminal capture of the Codex agent.
    CodexTelemetry,
}

impl SourceName {
    /// Sources that are always watched.
    pub const CORE: [SourceName; 2] = [SourceName::Comms, SourceName::AgentLog];

    /// Sources that are only watched when discovered on disk.
    pub const OPTIONAL: [SourceName; 3] = [
        SourceName::CcTranscript,
        SourceName::AgentTelemetry,
        SourceName::CodexTelemetry,
    ];

    /// Returns the wire name of the source.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Comms => "comms",
            Self::AgentLog => "agent_log",
            Self::CcTranscript => "cc_transcript",
            Self::AgentTelemetry => "agent_telemetry",
            Self::CodexTelemetry => "codex_telemetry",
        }
    }

    /// Whether this source belongs to the fixed core set.
    #[must_use]
    pub fn is_core(self) -> bool {
        Self::CORE.contains(&self)
    }
}

impl fmt::Display for SourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Semantic classification of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Untagged line of an annotated log.
    Message,
    /// Line tagged `[CC]`.
    AgentAMessage,
    /// Line tagged `[AG]`.
    AgentBMessage,
    /// Horizontal rule (`---`).
    Separator,
    /// Markdown heading.
    Heading,
    /// Model reasoning.
    Thinking,
    /// Tool invocation.
    ToolUse,
    /// Tool output.
    ToolResult,
    /// Human turn of a transcript.
    UserMessage,
    /// Assistant text output.
    Text,
    /// Structured telemetry record of an unrecognised kind.
    Telemetry,
    /// Plain telemetry line.
    Log,
    /// Telemetry line mentioning an error.
    Error,
    /// Telemetry line mentioning a warning.
    Warning,
}

impl EventKind {
    /// Every kind, in declaration order.
    pub const ALL: [EventKind; 14] = [
        EventKind::Message,
        EventKind::AgentAMessage,
        EventKind::AgentBMessage,
        EventKind::Separator,
        EventKind::Heading,
        EventKind::Thinking,
        EventKind::ToolUse,
        EventKind::ToolResult,
        EventKind::UserMessage,
        EventKind::Text,
        EventKind::Telemetry,
        EventKind::Log,
        EventKind::Error,
        EventKind::Warning,
    ];

    /// Returns the wire name of the kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::AgentAMessage => "agent_a_message",
            Self::AgentBMessage => "agent_b_message",
            Self::Separator => "separator",
            Self::Heading => "heading",
            Self::Thinking => "thinking",
            Self::ToolUse => "tool_use",
            Self::ToolResult => "tool_result",
            Self::UserMessage => "user_message",
            Self::Text => "text",
            Self::Telemetry => "telemetry",
            Self::Log => "log",
            Self::Error => "error",
            Self::Warning => "warning",
        }
    }

    /// Looks up a kind by its wire name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an event's timestamp came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampOrigin {
    /// Parsed from the line itself.
    Explicit,
    /// Carried forward from an earlier line of the same file.
    Inherited,
    /// No timestamp was available; the wall clock was used.
    WallClock,
}

impl TimestampOrigin {
    /// Returns the wire name of the origin.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Explicit => "explicit",
            Self::Inherited => "inherited",
            Self::WallClock => "wall_clock",
        }
    }
}

/// A normalized, immutable unit of the stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Opaque unique identifier.
    pub id: String,
    /// Explicit or inferred instant of the event.
    pub timestamp: DateTime<Utc>,
    /// Source the event was read from.
    pub source: SourceName,
    /// Semantic classification.
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// Raw or lightly reformatted payload.
    pub content: String,
    /// Type-specific extras. Never assumed to hold any key.
    #[serde(default)]
    pub metadata: Metadata,
}

impl Event {
    /// Create an event with a freshly generated id and empty metadata.
    #[must_use]
    pub fn new(
        source: SourceName,
        kind: EventKind,
        timestamp: DateTime<Utc>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: format!("{source}-{}", Uuid::new_v4().simple()),
            timestamp,
            source,
            kind,
            content: content.into(),
            metadata: Metadata::new(),
        }
    }

    /// Replace the generated id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Attach one metadata entry. `null` values are not stored.
    #[must_use]
    pub fn with_meta(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        let value = value.into();
        if !value.is_null() {
            self.metadata.insert(key.to_string(), value);
        }
        self
    }

    /// Attach the provenance of the timestamp.
    #[must_use]
    pub fn with_origin(self, origin: TimestampOrigin) -> Self {
        self.with_meta("timestamp_origin", origin.as_str())
    }
}
