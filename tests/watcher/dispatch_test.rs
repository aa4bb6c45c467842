//! Change dispatch: EOF seeding, creation, deletion and ordering.

use std::io::Write;

use chrono::{DateTime, Utc};
use comms_monitor::event::{EventKind, SourceName};
use comms_monitor::watcher::{ChangeKind, Watcher, WatcherState};

use super::{append, Project};

fn ts(s: &str) -> DateTime<Utc> {
    s.parse().unwrap()
}

#[tokio::test]
async fn test_existing_content_is_not_replayed() {
    let project = Project::new();
    let comms = project.dna("comms.md");
    append(&comms, "[2026-01-01 09:00:00] [CC] old line\nmore history\n");

    let (mut watcher, _status) = Watcher::new(project.layout());
    watcher.start().await;

    let seeded = watcher.source_state(SourceName::Comms).unwrap();
    assert_eq!(
        seeded.cursor.offset(),
        std::fs::metadata(&comms).unwrap().len()
    );

    // A spurious notification without growth yields nothing.
    assert!(watcher.dispatch(&comms, ChangeKind::Modified).await.is_empty());

    append(&comms, "[AG] @CC new line\n");
    let events = watcher.dispatch(&comms, ChangeKind::Modified).await;

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].content, "[AG] @CC new line");
    assert_eq!(events[0].kind, EventKind::AgentBMessage);
    assert_eq!(events[0].source, SourceName::Comms);
}

#[tokio::test]
async fn test_missing_source_becomes_available_on_create() {
    let project = Project::new();
    let ag_log = project.dna("ag_log.md");

    let (mut watcher, status) = Watcher::new(project.layout());
    watcher.start().await;
    assert_eq!(watcher.state(), WatcherState::Watching);
    assert!(!status.borrow().status()[&SourceName::AgentLog]);
    assert_eq!(
        watcher.source_state(SourceName::AgentLog).unwrap().cursor.offset(),
        0
    );

    append(&ag_log, "# AG log\n[2026-01-02 08:00:00] started\n");
    let events = watcher.dispatch(&ag_log, ChangeKind::Created).await;

    assert!(status.borrow().status()[&SourceName::AgentLog]);
    let kinds: Vec<_> = events.iter().map(|e| e.kind).collect();
    assert_eq!(kinds, vec![EventKind::Heading, EventKind::Message]);
}

#[tokio::test]
async fn test_delete_marks_unavailable_and_keeps_cursor() {
    let project = Project::new();
    let comms = project.dna("comms.md");
    append(&comms, "existing\n");

    let (mut watcher, status) = Watcher::new(project.layout());
    watcher.start().await;
    append(&comms, "[CC] one\n");
    watcher.dispatch(&comms, ChangeKind::Modified).await;
    let offset = watcher.source_state(SourceName::Comms).unwrap().cursor.offset();

    std::fs::remove_file(&comms).unwrap();
    let events = watcher.dispatch(&comms, ChangeKind::Deleted).await;

    assert!(events.is_empty());
    assert!(!status.borrow().status()[&SourceName::Comms]);
    assert_eq!(
        watcher.source_state(SourceName::Comms).unwrap().cursor.offset(),
        offset
    );
}

#[tokio::test]
async fn test_recreated_file_is_read_from_start() {
    let project = Project::new();
    let comms = project.dna("comms.md");
    append(&comms, "a long line that will be gone after rotation\n");

    let (mut watcher, _status) = Watcher::new(project.layout());
    watcher.start().await;

    std::fs::remove_file(&comms).unwrap();
    watcher.dispatch(&comms, ChangeKind::Deleted).await;
    append(&comms, "fresh\n");
    let events = watcher.dispatch(&comms, ChangeKind::Created).await;

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].content, "fresh");
}

#[tokio::test]
async fn test_carrier_persists_across_dispatches() {
    let project = Project::new();
    let comms = project.dna("comms.md");
    append(&comms, "");

    let (mut watcher, _status) = Watcher::new(project.layout());
    watcher.start().await;

    append(&comms, "[2026-01-01 10:00:00] world\n");
    let first = watcher.dispatch(&comms, ChangeKind::Modified).await;
    append(&comms, "foo\n");
    let second = watcher.dispatch(&comms, ChangeKind::Modified).await;

    assert_eq!(first[0].timestamp, ts("2026-01-01T10:00:00Z"));
    assert_eq!(second[0].timestamp, ts("2026-01-01T10:00:00Z"));
    assert_eq!(second[0].metadata["timestamp_origin"], "inherited");
}

#[tokio::test]
async fn test_events_follow_file_order() {
    let project = Project::new();
    let comms = project.dna("comms.md");
    append(&comms, "");

    let (mut watcher, _status) = Watcher::new(project.layout());
    watcher.start().await;

    let lines: Vec<String> = (0..20).map(|n| format!("[CC] message {n}")).collect();
    append(&comms, &(lines.join("\n") + "\n"));
    let events = watcher.dispatch(&comms, ChangeKind::Modified).await;

    let contents: Vec<_> = events.iter().map(|e| e.content.clone()).collect();
    assert_eq!(contents, lines);
}

#[tokio::test]
async fn test_truncated_file_yields_nothing() {
    let project = Project::new();
    let comms = project.dna("comms.md");
    append(&comms, "a fairly long line of history\n");

    let (mut watcher, _status) = Watcher::new(project.layout());
    watcher.start().await;
    let offset = watcher.source_state(SourceName::Comms).unwrap().cursor.offset();

    std::fs::write(&comms, "tiny\n").unwrap();
    let events = watcher.dispatch(&comms, ChangeKind::Modified).await;

    assert!(events.is_empty());
    assert_eq!(
        watcher.source_state(SourceName::Comms).unwrap().cursor.offset(),
        offset
    );
}

#[tokio::test]
async fn test_unrelated_path_is_ignored() {
    let project = Project::new();
    let notes = project.dna("notes.md");
    append(&notes, "irrelevant\n");

    let (mut watcher, _status) = Watcher::new(project.layout());
    watcher.start().await;

    assert!(watcher.dispatch(&notes, ChangeKind::Modified).await.is_empty());
    assert!(watcher.dispatch(&notes, ChangeKind::Created).await.is_empty());
}

#[tokio::test]
async fn test_telemetry_source_is_classified() {
    let project = Project::new();
    let telemetry = project.root.path().join(".gemini").join("telemetry.log");
    std::fs::create_dir_all(telemetry.parent().unwrap()).unwrap();
    append(&telemetry, "");

    let (mut watcher, _status) = Watcher::new(project.layout());
    watcher.start().await;
    assert!(watcher.registry().get(SourceName::AgentTelemetry).is_some());

    append(
        &telemetry,
        "[2026-01-22T01:00:00Z] ERROR: lost page\n{\"type\":\"thinking\",\"message\":\"hm\"}\n",
    );
    let events = watcher.dispatch(&telemetry, ChangeKind::Modified).await;

    let kinds: Vec<_> = events.iter().map(|e| e.kind).collect();
    assert_eq!(kinds, vec![EventKind::Error, EventKind::Thinking]);
    assert!(events.iter().all(|e| e.source == SourceName::AgentTelemetry));
}

#[tokio::test]
async fn test_line_split_across_writes_is_one_event() {
    let project = Project::new();
    let comms = project.dna("comms.md");
    append(&comms, "");

    let (mut watcher, _status) = Watcher::new(project.layout());
    watcher.start().await;

    let text = "[CC] café ok\n".as_bytes();
    let cut = text.iter().position(|b| *b == 0xC3).unwrap() + 1;

    let mut file = std::fs::OpenOptions::new().append(true).open(&comms).unwrap();
    file.write_all(&text[..cut]).unwrap();
    file.flush().unwrap();
    assert!(watcher.dispatch(&comms, ChangeKind::Modified).await.is_empty());
    assert_eq!(
        watcher.source_state(SourceName::Comms).unwrap().cursor.offset(),
        cut as u64
    );

    file.write_all(&text[cut..]).unwrap();
    file.flush().unwrap();
    let events = watcher.dispatch(&comms, ChangeKind::Modified).await;

    let got: Vec<_> = events.iter().map(|e| (e.kind, e.content.as_str())).collect();
    assert_eq!(got, vec![(EventKind::AgentAMessage, "[CC] café ok")]);
    assert!(watcher.source_state(SourceName::Comms).unwrap().pending.is_empty());
}

#[tokio::test]
async fn test_modified_notification_for_absent_file_keeps_it_unavailable() {
    let project = Project::new();
    let ag_log = project.dna("ag_log.md");

    let (mut watcher, status) = Watcher::new(project.layout());
    watcher.start().await;

    let events = watcher.dispatch(&ag_log, ChangeKind::Modified).await;

    assert!(events.is_empty());
    assert!(!ag_log.exists());
    assert!(!status.borrow().status()[&SourceName::AgentLog]);
    assert!(!watcher.registry().status()[&SourceName::AgentLog]);
}
