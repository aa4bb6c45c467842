//! Bounded in-memory event buffer with a durable JSONL mirror.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use super::types::Event;

/// Default number of events kept in memory.
pub const DEFAULT_BUFFER_CAPACITY: usize = 1000;

/// Errors that can occur while opening the durable log.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// Failed to create the log directory.
    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to open the log file for appending.
    #[error("Failed to open event log {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One page of older events for backward pagination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPage {
    /// Events in the page, oldest first.
    pub events: Vec<Event>,
    /// Whether even older events remain in the buffer.
    pub has_more: bool,
    /// Number of events currently buffered.
    pub total: usize,
}

/// Shape of one line in the durable log.
#[derive(Serialize)]
struct PersistedEvent<'a> {
    #[serde(flatten)]
    event: &'a Event,
    persisted_at: DateTime<Utc>,
}

/// Append-only durable mirror of the stream.
#[derive(Debug)]
struct DurableLog {
    path: PathBuf,
    file: Mutex<Option<File>>,
}

/// Append-only event store.
///
/// The in-memory buffer records arrival order and evicts the oldest event
/// once `capacity` is exceeded. Every appended event is also written to the
/// durable log, if one is configured; a failed write is logged and leaves
/// the buffer untouched.
#[derive(Debug)]
pub struct EventStore {
    buffer: RwLock<VecDeque<Event>>,
    capacity: usize,
    log: Option<DurableLog>,
}

impl EventStore {
    /// Create a store without a durable log.
    #[must_use]
    pub fn in_memory(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buffer: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity,
            log: None,
        }
    }

    /// Create a store mirrored to the JSONL file at `path`.
    ///
    /// Creates parent directories if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the file
    /// cannot be opened for appending.
    pub async fn open(path: impl AsRef<Path>, capacity: usize) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|source| StoreError::CreateDir {
                        path: parent.to_path_buf(),
                        source,
                    })?;
            }
        }

        let file = open_append(&path).await?;
        tracing::info!(path = %path.display(), "Event log opened");

        let mut store = Self::in_memory(capacity);
        store.log = Some(DurableLog {
            path,
            file: Mutex::new(Some(file)),
        });
        Ok(store)
    }

    /// Path of the durable log, if any.
    #[must_use]
    pub fn log_path(&self) -> Option<&Path> {
        self.log.as_ref().map(|log| log.path.as_path())
    }

    /// Maximum number of buffered events.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of buffered events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read_buffer(VecDeque::len)
    }

    /// Whether the buffer is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append an event to the buffer and the durable log.
    pub async fn append(&self, event: Event) {
        let line = persisted_line(&event, Utc::now());

        {
            let mut buffer = self.buffer.write().unwrap_or_else(PoisonError::into_inner);
            buffer.push_back(event);
            while buffer.len() > self.capacity {
                buffer.pop_front();
            }
        }

        if let Some(log) = &self.log {
            log.write_line(&line).await;
        }
    }

    /// Return the last `count` events, oldest first.
    #[must_use]
    pub fn recent(&self, count: usize) -> Vec<Event> {
        self.read_buffer(|buffer| {
            let start = buffer.len().saturating_sub(count);
            buffer.iter().skip(start).cloned().collect()
        })
    }

    /// Return every buffered event, oldest first.
    #[must_use]
    pub fn all(&self) -> Vec<Event> {
        self.read_buffer(|buffer| buffer.iter().cloned().collect())
    }

    /// Return a page of older events.
    ///
    /// `offset_from_end` counts events back from the newest; the page holds
    /// up to `limit` events immediately older than that point.
    #[must_use]
    pub fn history(&self, offset_from_end: usize, limit: usize) -> HistoryPage {
        self.read_buffer(|buffer| {
            let total = buffer.len();
            let end = total.saturating_sub(offset_from_end);
            let start = end.saturating_sub(limit);
            HistoryPage {
                events: buffer.range(start..end).cloned().collect(),
                has_more: total > offset_from_end.saturating_add(limit),
                total,
            }
        })
    }

    /// Drop every buffered event. The durable log is not touched.
    pub fn clear(&self) {
        self.buffer
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Re-open the durable log, e.g. after external rotation.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened. Subsequent appends
    /// skip persistence until a reopen succeeds.
    pub async fn reopen(&self) -> Result<(), StoreError> {
        let Some(log) = &self.log else {
            return Ok(());
        };

        let mut guard = log.file.lock().await;
        if let Some(mut old) = guard.take() {
            if let Err(e) = old.flush().await {
                tracing::warn!(path = %log.path.display(), error = %e, "Failed to flush event log");
            }
        }
        *guard = Some(open_append(&log.path).await?);
        tracing::info!(path = %log.path.display(), "Event log reopened");
        Ok(())
    }

    fn read_buffer<T>(&self, f: impl FnOnce(&VecDeque<Event>) -> T) -> T {
        let buffer = self.buffer.read().unwrap_or_else(PoisonError::into_inner);
        f(&buffer)
    }
}

impl DurableLog {
    async fn write_line(&self, line: &str) {
        let mut guard = self.file.lock().await;
        let Some(file) = guard.as_mut() else {
            tracing::debug!(path = %self.path.display(), "Event log closed, skipping write");
            return;
        };

        let result = async {
            file.write_all(line.as_bytes()).await?;
            file.flush().await
        }
        .await;

        if let Err(e) = result {
            tracing::error!(path = %self.path.display(), error = %e, "Failed to persist event");
        }
    }
}

async fn open_append(path: &Path) -> Result<File, StoreError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(|source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        })
}

/// Serialize an event as one durable log line.
///
/// Falls back to a placeholder record when the event cannot be serialized.
fn persisted_line(event: &Event, persisted_at: DateTime<Utc>) -> String {
    let record = PersistedEvent {
        event,
        persisted_at,
    };
    let mut line = match serde_json::to_string(&record) {
        Ok(json) => json,
        Err(e) => {
            tracing::warn!(id = %event.id, error = %e, "Event not serializable, persisting placeholder");
            serde_json::json!({
                "id": event.id,
                "timestamp": event.timestamp,
                "source": event.source,
                "type": event.kind,
                "content": "[Unserializable]",
                "metadata": {},
                "persisted_at": persisted_at,
            })
            .to_string()
        }
    };
    line.push('\n');
    line
}
