//! Source watcher with notify integration.
//!
//! Drives `Idle → Discovering → Initializing → Watching`. Each change
//! notification is routed through a single dispatch function that reads the
//! file delta, classifies it line by line and hands events to a sink.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify_debouncer_full::{
    new_debouncer,
    notify::{
        self,
        event::{ModifyKind, RenameMode},
        RecursiveMode,
    },
    DebounceEventResult,
};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use super::carrier::TimestampCarrier;
use super::classify::classify_lines;
use super::error::WatcherError;
use super::reader::{read_delta, PartialLine, ReadCursor};
use super::registry::{SourceLayout, SourceRegistry};
use crate::event::{Event, EventSink, SourceName};

/// Default debounce window for filesystem notifications.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);

/// Lifecycle of the watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    /// Constructed, nothing probed yet.
    Idle,
    /// Probing the filesystem for optional sources.
    Discovering,
    /// Seeding cursors.
    Initializing,
    /// Processing change notifications.
    Watching,
}

impl WatcherState {
    /// Returns the state name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Discovering => "discovering",
            Self::Initializing => "initializing",
            Self::Watching => "watching",
        }
    }
}

/// Kind of filesystem change, after debouncing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// The file appeared.
    Created,
    /// The file was written to.
    Modified,
    /// The file disappeared.
    Deleted,
}

/// Parsing state of one source, owned by the watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceState {
    /// How far the file has been read.
    pub cursor: ReadCursor,
    /// Last explicit timestamp seen in the file.
    pub carrier: TimestampCarrier,
    /// Unterminated bytes at the end of what has been read.
    pub pending: PartialLine,
}

impl SourceState {
    fn new(cursor: ReadCursor) -> Self {
        Self {
            cursor,
            carrier: TimestampCarrier::new(),
            pending: PartialLine::new(),
        }
    }
}

/// Watches every registered source and turns appended lines into events.
pub struct Watcher {
    layout: SourceLayout,
    registry: SourceRegistry,
    sources: HashMap<SourceName, SourceState>,
    state: WatcherState,
    status_tx: watch::Sender<SourceRegistry>,
}

impl Watcher {
    /// Create an idle watcher for `layout`.
    ///
    /// The returned receiver always holds the latest registry, including
    /// per-source availability.
    #[must_use]
    pub fn new(layout: SourceLayout) -> (Self, watch::Receiver<SourceRegistry>) {
        let (status_tx, status_rx) = watch::channel(SourceRegistry::new());
        (
            Self {
                layout,
                registry: SourceRegistry::new(),
                sources: HashMap::new(),
                state: WatcherState::Idle,
                status_tx,
            },
            status_rx,
        )
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> WatcherState {
        self.state
    }

    /// Current source table.
    #[must_use]
    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// Parsing state of one source.
    #[must_use]
    pub fn source_state(&self, name: SourceName) -> Option<&SourceState> {
        self.sources.get(&name)
    }

    /// Probe the filesystem for sources.
    pub fn discover(&mut self) {
        self.state = WatcherState::Discovering;
        self.registry = SourceRegistry::discover(&self.layout);
        tracing::info!(sources = self.registry.len(), "Source discovery complete");
        self.publish_status();
    }

    /// Seed one cursor per source at end-of-file, or at 0 if the file does
    /// not exist yet.
    pub async fn initialize(&mut self) {
        self.state = WatcherState::Initializing;
        self.sources.clear();

        for desc in self.registry.descriptors() {
            let cursor = if desc.exists {
                ReadCursor::at_end(desc.path.clone()).await
            } else {
                tracing::info!(source = %desc.name, path = %desc.path.display(), "Source not present yet");
                ReadCursor::new(desc.path.clone())
            };
            tracing::debug!(source = %desc.name, offset = cursor.offset(), "Seeded cursor");
            self.sources.insert(desc.name, SourceState::new(cursor));
        }
    }

    /// Discover and initialize, leaving the watcher ready to dispatch.
    pub async fn start(&mut self) {
        self.discover();
        self.initialize().await;
        self.state = WatcherState::Watching;
    }

    /// Handle one change notification for `path`.
    ///
    /// Returns the events produced, in file order. Paths that do not
    /// belong to a registered source are ignored.
    pub async fn dispatch(&mut self, path: &Path, change: ChangeKind) -> Vec<Event> {
        let Some(name) = self.registry.resolve(path) else {
            tracing::trace!(path = %path.display(), "Ignoring change to unwatched path");
            return Vec::new();
        };

        let events = match change {
            ChangeKind::Created => {
                tracing::info!(source = %name, "Source created");
                self.registry.set_available(name, true);
                if let Some(state) = self.sources.get_mut(&name) {
                    state.cursor.reset();
                    state.carrier.reset();
                    state.pending.clear();
                }
                self.ingest(name).await
            }
            ChangeKind::Modified => {
                self.registry.set_available(name, path.exists());
                self.ingest(name).await
            }
            ChangeKind::Deleted => {
                // A rename-over may report removal of a path that exists again.
                if !path.exists() {
                    tracing::info!(source = %name, "Source deleted");
                    self.registry.set_available(name, false);
                }
                Vec::new()
            }
        };

        self.publish_status();
        events
    }

    async fn ingest(&mut self, name: SourceName) -> Vec<Event> {
        let Some(format) = self.registry.get(name).map(|d| d.format) else {
            return Vec::new();
        };
        let Some(state) = self.sources.get_mut(&name) else {
            return Vec::new();
        };

        let delta = read_delta(&state.cursor).await;
        state.cursor = delta.cursor.clone();
        if delta.is_empty() {
            return Vec::new();
        }

        let lines = state.pending.complete_lines(&delta.bytes);
        let events = classify_lines(lines, name, format, &mut state.carrier);
        tracing::debug!(
            source = %name,
            offset = state.cursor.offset(),
            bytes = delta.bytes.len(),
            pending = state.pending.len(),
            events = events.len(),
            "Ingested delta"
        );
        events
    }

    fn publish_status(&self) {
        self.status_tx.send_replace(self.registry.clone());
    }

    /// Directories to watch that are not watched yet.
    fn unwatched_dirs(&self, watched: &BTreeSet<PathBuf>) -> Vec<PathBuf> {
        self.registry
            .watch_dirs()
            .into_iter()
            .filter(|dir| !watched.contains(dir))
            .collect()
    }

    /// Read sources that already exist under a directory that just started
    /// being watched. Their creation may have raced the watch.
    async fn adopt_dir(&mut self, dir: &Path) -> Vec<Event> {
        let appeared: Vec<PathBuf> = self
            .registry
            .descriptors()
            .filter(|d| !d.exists && d.path.parent() == Some(dir) && d.path.exists())
            .map(|d| d.path.clone())
            .collect();

        let mut events = Vec::new();
        for path in appeared {
            events.extend(self.dispatch(&path, ChangeKind::Created).await);
        }
        events
    }

    /// Watch every source directory until `cancel` fires, emitting events
    /// into `sink`.
    ///
    /// Starts the watcher first if it is still idle. A source directory
    /// that does not exist yet is covered by watching its nearest existing
    /// ancestor, and is watched itself once it appears.
    ///
    /// # Errors
    ///
    /// Returns an error if no directory on any source path exists, the
    /// notification backend cannot be created, or a directory cannot be
    /// watched at startup.
    pub async fn run<S>(
        mut self,
        sink: &S,
        debounce: Duration,
        cancel: CancellationToken,
    ) -> Result<(), WatcherError>
    where
        S: EventSink + ?Sized,
    {
        if self.state == WatcherState::Idle {
            self.start().await;
        }

        let mut watched = BTreeSet::new();
        let dirs = self.unwatched_dirs(&watched);
        if dirs.is_empty() {
            return Err(WatcherError::PathMissing(self.layout.dna_dir.clone()));
        }

        let (notify_tx, mut notify_rx) = mpsc::unbounded_channel();
        let mut debouncer = new_debouncer(debounce, None, move |result: DebounceEventResult| {
            let _ = notify_tx.send(result);
        })?;
        for dir in dirs {
            debouncer.watch(&dir, RecursiveMode::NonRecursive)?;
            tracing::info!(dir = %dir.display(), "Watching directory");
            watched.insert(dir);
        }

        self.state = WatcherState::Watching;

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    tracing::info!("Watcher cancelled");
                    break;
                }
                result = notify_rx.recv() => {
                    let Some(result) = result else {
                        return Err(WatcherError::ChannelClosed);
                    };
                    match result {
                        Ok(events) => {
                            for event in &events {
                                for (path, change) in changes(&event.event) {
                                    for emitted in self.dispatch(&path, change).await {
                                        sink.emit(emitted).await;
                                    }
                                }
                            }
                        }
                        Err(errors) => {
                            for error in errors {
                                tracing::warn!(error = %error, "Notification error");
                            }
                        }
                    }

                    // Watches on removed directories die with them.
                    watched.retain(|dir| dir.is_dir());
                    for dir in self.unwatched_dirs(&watched) {
                        if let Err(e) = debouncer.watch(&dir, RecursiveMode::NonRecursive) {
                            tracing::warn!(dir = %dir.display(), error = %e, "Failed to watch directory");
                            continue;
                        }
                        tracing::info!(dir = %dir.display(), "Watching directory");
                        for emitted in self.adopt_dir(&dir).await {
                            sink.emit(emitted).await;
                        }
                        watched.insert(dir);
                    }
                }
            }
        }

        drop(debouncer);
        Ok(())
    }
}

/// Map a notify event to per-path changes.
#[must_use]
pub fn changes(event: &notify::Event) -> Vec<(PathBuf, ChangeKind)> {
    use notify::EventKind;

    match event.kind {
        EventKind::Create(_) => with_kind(&event.paths, ChangeKind::Created),
        EventKind::Remove(_) => with_kind(&event.paths, ChangeKind::Deleted),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            with_kind(&event.paths, ChangeKind::Deleted)
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            with_kind(&event.paths, ChangeKind::Created)
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            let mut out = Vec::new();
            if let Some(from) = event.paths.first() {
                out.push((from.clone(), ChangeKind::Deleted));
            }
            if let Some(to) = event.paths.get(1) {
                out.push((to.clone(), ChangeKind::Created));
            }
            out
        }
        EventKind::Modify(ModifyKind::Name(_)) => event
            .paths
            .iter()
            .map(|p| {
                let change = if p.exists() {
                    ChangeKind::Created
                } else {
                    ChangeKind::Deleted
                };
                (p.clone(), change)
            })
            .collect(),
        EventKind::Modify(_) => with_kind(&event.paths, ChangeKind::Modified),
        _ => Vec::new(),
    }
}

fn with_kind(paths: &[PathBuf], change: ChangeKind) -> Vec<(PathBuf, ChangeKind)> {
    paths.iter().map(|p| (p.clone(), change)).collect()
}
