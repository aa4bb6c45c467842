//! JSONL transcripts of the CLI agent (`~/.claude/projects/<hash>/*.jsonl`).
//!
//! Every record carries its own timestamp. Assistant records fan out into
//! one event per content block, in block order.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use uuid::Uuid;

use super::telemetry::parse_loose_timestamp;
use super::{preview, PREVIEW_CHARS};
use crate::event::{Event, EventKind, SourceName};

/// Tool results longer than this many characters are cut for display.
pub const TOOL_RESULT_DISPLAY_LIMIT: usize = 500;

/// One line of a transcript file.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TranscriptRecord {
    /// Human turn.
    User(UserTurn),
    /// Assistant turn with content blocks.
    Assistant(AssistantTurn),
    /// File backup snapshot; never produces events.
    FileHistorySnapshot,
    /// Any other record type (summary, progress, system, ...).
    #[serde(other)]
    Other,
}

/// Human turn.
///
/// Every field is optional and tolerates an unexpected JSON type.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserTurn {
    #[serde(deserialize_with = "lenient")]
    pub uuid: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub session_id: Option<String>,
    /// RFC 3339 string or epoch milliseconds.
    pub timestamp: Value,
    #[serde(deserialize_with = "lenient")]
    pub cwd: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub git_branch: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub message: Option<UserMessage>,
}

/// Message body of a human turn.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UserMessage {
    /// Plain string or structured blocks; kept as raw JSON.
    pub content: Value,
}

/// Assistant turn.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AssistantTurn {
    #[serde(deserialize_with = "lenient")]
    pub uuid: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub session_id: Option<String>,
    /// RFC 3339 string or epoch milliseconds.
    pub timestamp: Value,
    #[serde(deserialize_with = "lenient")]
    pub message: Option<AssistantMessage>,
}

/// Message body of an assistant turn.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AssistantMessage {
    #[serde(deserialize_with = "lenient")]
    pub model: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub content: AssistantContent,
}

/// Assistant content: usually blocks, occasionally a bare string.
///
/// Blocks stay raw so one malformed block cannot take its siblings down.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AssistantContent {
    /// Structured content blocks.
    Blocks(Vec<Value>),
    /// Plain text content.
    Text(String),
}

impl Default for AssistantContent {
    fn default() -> Self {
        Self::Blocks(Vec::new())
    }
}

/// A content block within an assistant message.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Text content
    Text {
        #[serde(default, deserialize_with = "lenient_text")]
        text: String,
    },
    /// Tool use request
    ToolUse {
        #[serde(default, deserialize_with = "lenient")]
        id: Option<String>,
        #[serde(default, deserialize_with = "lenient_text")]
        name: String,
        #[serde(default)]
        input: Value,
    },
    /// Tool result
    ToolResult {
        #[serde(default, deserialize_with = "lenient")]
        tool_use_id: Option<String>,
        #[serde(default)]
        content: Value,
        #[serde(default, deserialize_with = "lenient")]
        is_error: Option<bool>,
    },
    /// Thinking block
    Thinking {
        #[serde(default, deserialize_with = "lenient_text")]
        thinking: String,
    },
    /// Unknown block type
    #[serde(other)]
    Unknown,
}

/// Deserialize `T`, or its default when the value has another shape.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).unwrap_or_default())
}

/// Deserialize display text: null is empty, other non-strings their JSON.
fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(json_text(&Value::deserialize(deserializer)?))
}

/// Parse one transcript line into events.
///
/// Blank lines, snapshot records and unrecognised record types yield no
/// events. Malformed JSON yields no events and logs a warning.
#[must_use]
pub fn parse_transcript_line(line: &str, source: SourceName, now: DateTime<Utc>) -> Vec<Event> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    let record = match serde_json::from_str::<TranscriptRecord>(trimmed) {
        Ok(record) => record,
        Err(e) => {
            tracing::warn!(
                source = %source,
                line = %preview(trimmed, PREVIEW_CHARS),
                error = %e,
                "Skipping malformed transcript record"
            );
            return Vec::new();
        }
    };

    match record {
        TranscriptRecord::User(turn) => vec![user_event(turn, source, now)],
        TranscriptRecord::Assistant(turn) => assistant_events(turn, source, now),
        TranscriptRecord::FileHistorySnapshot | TranscriptRecord::Other => Vec::new(),
    }
}

fn record_timestamp(raw: &Value, now: DateTime<Utc>) -> DateTime<Utc> {
    let parsed = match raw {
        Value::String(s) => parse_loose_timestamp(s),
        Value::Number(n) => n.as_i64().and_then(DateTime::<Utc>::from_timestamp_millis),
        _ => None,
    };
    parsed.unwrap_or(now)
}

fn json_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn user_event(turn: UserTurn, source: SourceName, now: DateTime<Utc>) -> Event {
    let timestamp = record_timestamp(&turn.timestamp, now);
    let content = turn
        .message
        .map(|m| json_text(&m.content))
        .unwrap_or_default();
    let uuid = turn
        .uuid
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().simple().to_string());

    Event::new(source, EventKind::UserMessage, timestamp, content)
        .with_id(format!("cc-user-{uuid}"))
        .with_meta("session_id", turn.session_id)
        .with_meta("uuid", turn.uuid)
        .with_meta("cwd", turn.cwd)
        .with_meta("git_branch", turn.git_branch)
}

fn assistant_events(turn: AssistantTurn, source: SourceName, now: DateTime<Utc>) -> Vec<Event> {
    let timestamp = record_timestamp(&turn.timestamp, now);
    let uuid = turn
        .uuid
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().simple().to_string());
    let message = turn.message.unwrap_or_default();
    let model = message.model;

    let blocks = match message.content {
        AssistantContent::Blocks(blocks) => blocks,
        AssistantContent::Text(text) => vec![serde_json::json!({ "type": "text", "text": text })],
    };

    blocks
        .into_iter()
        .enumerate()
        .filter_map(|(index, raw)| {
            let block = match ContentBlock::deserialize(raw) {
                Ok(block) => block,
                Err(e) => {
                    tracing::warn!(source = %source, uuid = %uuid, index, error = %e, "Skipping malformed content block");
                    return None;
                }
            };
            let event = block_event(block, source, timestamp, model.as_deref())?;
            Some(
                event
                    .with_id(format!("cc-assistant-{uuid}-{index}"))
                    .with_meta("session_id", turn.session_id.clone()),
            )
        })
        .collect()
}

fn block_event(
    block: ContentBlock,
    source: SourceName,
    timestamp: DateTime<Utc>,
    model: Option<&str>,
) -> Option<Event> {
    let event = match block {
        ContentBlock::Thinking { thinking } => {
            Event::new(source, EventKind::Thinking, timestamp, thinking).with_meta("model", model)
        }
        ContentBlock::Text { text } => {
            Event::new(source, EventKind::Text, timestamp, text).with_meta("model", model)
        }
        ContentBlock::ToolUse { id, name, input } => {
            let pretty = serde_json::to_string_pretty(&input).unwrap_or_else(|_| input.to_string());
            Event::new(
                source,
                EventKind::ToolUse,
                timestamp,
                format!("Tool: {name}\nInput: {pretty}"),
            )
            .with_meta("tool_name", name)
            .with_meta("tool_id", id)
            .with_meta("input", input)
        }
        ContentBlock::ToolResult {
            tool_use_id,
            content,
            is_error,
        } => {
            let result = truncate_for_display(&json_text(&content), TOOL_RESULT_DISPLAY_LIMIT);
            let id = tool_use_id.as_deref().unwrap_or("unknown");
            Event::new(
                source,
                EventKind::ToolResult,
                timestamp,
                format!("Result for {id}:\n{result}"),
            )
            .with_meta("tool_use_id", tool_use_id)
            .with_meta("is_error", is_error)
        }
        ContentBlock::Unknown => return None,
    };
    Some(event)
}

/// Keep the first `limit` characters, appending `...` if anything was cut.
fn truncate_for_display(s: &str, limit: usize) -> String {
    match s.char_indices().nth(limit) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
