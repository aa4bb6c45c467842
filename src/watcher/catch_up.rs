//! Snapshot of recent content for newly connecting clients.

use super::carrier::TimestampCarrier;
use super::classify::classify_lines;
use super::reader::non_blank_lines;
use super::registry::SourceRegistry;
use crate::event::Event;

/// Default number of trailing lines read per source.
pub const DEFAULT_TAIL_LINES: usize = 100;

/// Classify the last `tail_lines` non-blank lines of every existing source.
///
/// Each file gets a fresh carrier threaded in file order; live cursors are
/// not touched. Results are sorted by timestamp, ties keeping source then
/// file order.
pub async fn catch_up(registry: &SourceRegistry, tail_lines: usize) -> Vec<Event> {
    let mut events = Vec::new();

    for desc in registry.descriptors().filter(|d| d.exists) {
        let bytes = match tokio::fs::read(&desc.path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(source = %desc.name, path = %desc.path.display(), error = %e, "Failed to read initial content");
                continue;
            }
        };

        let text = String::from_utf8_lossy(&bytes);
        let lines = non_blank_lines(&text);
        let tail = &lines[lines.len().saturating_sub(tail_lines)..];

        let mut carrier = TimestampCarrier::new();
        let source_events = classify_lines(tail.iter(), desc.name, desc.format, &mut carrier);
        tracing::debug!(source = %desc.name, lines = tail.len(), events = source_events.len(), "Read initial content");
        events.extend(source_events);
    }

    events.sort_by_key(|e| e.timestamp);
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventKind, SourceName};
    use crate::watcher::registry::{SourceLayout, DNA_DIR_NAME};
    use tempfile::TempDir;

    fn setup(comms: &str, ag_log: Option<&str>) -> (TempDir, SourceRegistry) {
        let temp_dir = TempDir::new().unwrap();
        let dna = temp_dir.path().join(DNA_DIR_NAME);
        std::fs::create_dir_all(&dna).unwrap();
        std::fs::write(dna.join("comms.md"), comms).unwrap();
        if let Some(text) = ag_log {
            std::fs::write(dna.join("ag_log.md"), text).unwrap();
        }
        let layout = SourceLayout::for_project(temp_dir.path()).with_claude_projects_dir(None);
        let registry = SourceRegistry::discover(&layout);
        (temp_dir, registry)
    }

    #[tokio::test]
    async fn test_catch_up_takes_tail() {
        let comms: String = (0..10).map(|n| format!("[2026-01-01 10:00:0{n}] line {n}\n")).collect();
        let (_dir, registry) = setup(&comms, None);

        let events = catch_up(&registry, 3).await;

        let contents: Vec<_> = events.iter().map(|e| e.content.as_str()).collect();
        assert_eq!(
            contents,
            vec![
                "[2026-01-01 10:00:07] line 7",
                "[2026-01-01 10:00:08] line 8",
                "[2026-01-01 10:00:09] line 9",
            ]
        );
    }

    #[tokio::test]
    async fn test_catch_up_sorts_across_sources() {
        let (_dir, registry) = setup(
            "[2026-01-01 10:00:05] [CC] later\nfollow-up\n",
            Some("[2026-01-01 10:00:01] [AG] earlier\n\n"),
        );

        let events = catch_up(&registry, 100).await;

        let kinds: Vec<_> = events.iter().map(|e| (e.source, e.kind)).collect();
        assert_eq!(
            kinds,
            vec![
                (SourceName::AgentLog, EventKind::AgentBMessage),
                (SourceName::Comms, EventKind::AgentAMessage),
                (SourceName::Comms, EventKind::Message),
            ]
        );
        assert_eq!(events[1].timestamp, events[2].timestamp);
    }

    #[tokio::test]
    async fn test_catch_up_skips_missing_sources() {
        let (_dir, registry) = setup("", None);
        assert!(catch_up(&registry, DEFAULT_TAIL_LINES).await.is_empty());
    }
}
