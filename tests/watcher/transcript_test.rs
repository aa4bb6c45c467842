//! Transcript ingestion through the watcher.

use comms_monitor::event::{EventKind, SourceName};
use comms_monitor::watcher::{ChangeKind, FormatKind, Watcher};

use super::{append, Project};

const ASSISTANT: &str = r#"{"type":"assistant","uuid":"a-1","sessionId":"s","timestamp":"2026-01-29T10:00:01Z","message":{"model":"claude-opus","content":[{"type":"thinking","thinking":"plan"},{"type":"tool_use","id":"toolu_1","name":"Bash","input":{"command":"ls"}},{"type":"text","text":"done"}]}}"#;

#[tokio::test]
async fn test_transcript_is_discovered_and_tailed() {
    let project = Project::new();
    let transcript = project.transcript_dir().join("session.jsonl");
    append(&transcript, "{\"type\":\"summary\"}\n");

    let (mut watcher, _status) = Watcher::new(project.layout());
    watcher.start().await;

    let desc = watcher.registry().get(SourceName::CcTranscript).unwrap();
    assert_eq!(desc.format, FormatKind::Transcript);
    assert_eq!(desc.path, transcript);

    append(
        &transcript,
        &format!(
            "{}\nnot json\n{{\"type\":\"file-history-snapshot\",\"snapshot\":{{}}}}\n{ASSISTANT}\n",
            r#"{"type":"user","uuid":"u-1","message":{"content":"hi"}}"#
        ),
    );
    let events = watcher.dispatch(&transcript, ChangeKind::Modified).await;

    let kinds: Vec<_> = events.iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![
            EventKind::UserMessage,
            EventKind::Thinking,
            EventKind::ToolUse,
            EventKind::Text,
        ]
    );
    assert_eq!(events[0].id, "cc-user-u-1");
    assert_eq!(events[2].metadata["tool_name"], "Bash");
    assert_eq!(events[1].timestamp, events[3].timestamp);
}

#[tokio::test]
async fn test_transcript_lines_do_not_touch_carrier() {
    let project = Project::new();
    let transcript = project.transcript_dir().join("session.jsonl");
    append(&transcript, "");

    let (mut watcher, _status) = Watcher::new(project.layout());
    watcher.start().await;

    append(&transcript, &format!("{ASSISTANT}\n"));
    watcher.dispatch(&transcript, ChangeKind::Modified).await;

    let state = watcher.source_state(SourceName::CcTranscript).unwrap();
    assert!(state.carrier.current().is_none());
}
