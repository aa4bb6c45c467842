//! Colored terminal output for the `tail` command.

use std::io::{self, Write};

use owo_colors::OwoColorize;

use crate::event::{Event, EventKind};
use crate::watcher::SourceRegistry;

/// Maximum characters of content shown per line.
const DEFAULT_MAX_LEN: usize = 160;

/// Truncate a string to `max_len` characters, adding ellipsis if truncated.
#[must_use]
pub fn truncate(s: &str, max_len: usize, raw_mode: bool) -> String {
    if raw_mode || s.chars().count() <= max_len {
        return s.to_string();
    }
    if max_len <= 3 {
        return "...".to_string();
    }
    let cut: String = s.chars().take(max_len - 3).collect();
    format!("{cut}...")
}

/// Flatten multi-line content onto one line.
fn single_line(s: &str) -> String {
    s.split('\n')
        .map(str::trim_end)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ⏎ ")
}

/// Short bracketed tag for a kind.
#[must_use]
pub fn kind_tag(kind: EventKind) -> &'static str {
    match kind {
        EventKind::AgentAMessage => "[CC]",
        EventKind::AgentBMessage => "[AG]",
        EventKind::Message => "[MSG]",
        EventKind::Separator => "[---]",
        EventKind::Heading => "[HEAD]",
        EventKind::Thinking => "[THINK]",
        EventKind::ToolUse => "[TOOL]",
        EventKind::ToolResult => "[RESULT]",
        EventKind::UserMessage => "[USER]",
        EventKind::Text => "[TEXT]",
        EventKind::Telemetry => "[TELEMETRY]",
        EventKind::Log => "[LOG]",
        EventKind::Error => "[ERROR]",
        EventKind::Warning => "[WARN]",
    }
}

/// Uncolored one-line rendering: `<timestamp> <source> <tag> <content>`.
#[must_use]
pub fn format_event_line(event: &Event, raw_mode: bool) -> String {
    format!(
        "{} {} {} {}",
        event.timestamp.format("%Y-%m-%dT%H:%M:%SZ"),
        event.source,
        kind_tag(event.kind),
        truncate(&single_line(&event.content), DEFAULT_MAX_LEN, raw_mode)
    )
}

/// Print one event, colored by kind.
pub fn print_event(event: &Event, raw_mode: bool) {
    let ts = event.timestamp.format("%Y-%m-%dT%H:%M:%SZ").to_string();
    let tag = kind_tag(event.kind);
    let tag = match event.kind {
        EventKind::AgentAMessage | EventKind::UserMessage => tag.cyan().bold().to_string(),
        EventKind::AgentBMessage | EventKind::Text => tag.magenta().bold().to_string(),
        EventKind::ToolUse | EventKind::ToolResult => tag.blue().bold().to_string(),
        EventKind::Error => tag.red().bold().to_string(),
        EventKind::Warning => tag.yellow().bold().to_string(),
        EventKind::Thinking
        | EventKind::Separator
        | EventKind::Heading
        | EventKind::Message
        | EventKind::Telemetry
        | EventKind::Log => tag.dimmed().to_string(),
    };
    let content = truncate(&single_line(&event.content), DEFAULT_MAX_LEN, raw_mode);

    if event.kind == EventKind::Thinking {
        println!("{} {} {} {}", ts.dimmed(), event.source.as_str().green(), tag, content.dimmed());
    } else {
        println!("{} {} {} {}", ts.dimmed(), event.source.as_str().green(), tag, content);
    }
    let _ = io::stdout().flush();
}

/// Print the source table, one line per source.
pub fn print_sources(registry: &SourceRegistry) {
    for desc in registry.descriptors() {
        let state = if desc.exists {
            "available".green().to_string()
        } else {
            "missing".red().to_string()
        };
        println!(
            "{} {} {} {}",
            "[SOURCE]".blue().bold(),
            desc.name,
            state,
            desc.path.display().dimmed()
        );
    }
    let _ = io::stdout().flush();
}

/// Print an error message.
pub fn print_error(message: &str) {
    eprintln!("{} {}", "[ERROR]".red().bold(), message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::SourceName;

    #[test]
    fn test_truncate_short_string() {
        assert_eq!(truncate("hello", 10, false), "hello");
    }

    #[test]
    fn test_truncate_exact_length() {
        assert_eq!(truncate("hello", 5, false), "hello");
    }

    #[test]
    fn test_truncate_long_string() {
        assert_eq!(truncate("hello world", 8, false), "hello...");
    }

    #[test]
    fn test_truncate_multibyte() {
        assert_eq!(truncate("ééééé", 4, false), "é...");
    }

    #[test]
    fn test_truncate_very_short_max() {
        assert_eq!(truncate("hello", 3, false), "...");
        assert_eq!(truncate("hello", 0, false), "...");
    }

    #[test]
    fn test_truncate_raw_mode_no_truncation() {
        let long_string = "a".repeat(200);
        assert_eq!(truncate(&long_string, 10, true), long_string);
    }

    #[test]
    fn test_format_event_line() {
        let ts = "2026-01-01T10:00:00Z".parse().unwrap();
        let event = Event::new(
            SourceName::CcTranscript,
            EventKind::ToolUse,
            ts,
            "Tool: Read\nInput: {}",
        );

        assert_eq!(
            format_event_line(&event, false),
            "2026-01-01T10:00:00Z cc_transcript [TOOL] Tool: Read ⏎ Input: {}"
        );
    }

    #[test]
    fn test_every_kind_has_tag() {
        for kind in EventKind::ALL {
            assert!(kind_tag(kind).starts_with('['));
        }
    }
}
