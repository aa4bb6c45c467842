//! Shared state handed to every dashboard handler.

use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::event::EventHub;
use crate::watcher::{SourceRegistry, DEFAULT_TAIL_LINES};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Store plus live fan-out.
    pub hub: Arc<EventHub>,
    /// Latest source table published by the watcher.
    pub sources: watch::Receiver<SourceRegistry>,
    /// Cancellation token for graceful shutdown.
    pub cancel: CancellationToken,
    /// Trailing lines per source for the initial snapshot.
    pub initial_tail_lines: usize,
}

impl AppState {
    /// Create app state over a hub and the watcher's status channel.
    #[must_use]
    pub fn new(hub: Arc<EventHub>, sources: watch::Receiver<SourceRegistry>) -> Self {
        Self {
            hub,
            sources,
            cancel: CancellationToken::new(),
            initial_tail_lines: DEFAULT_TAIL_LINES,
        }
    }

    /// Use an externally owned cancellation token.
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Set the snapshot depth.
    #[must_use]
    pub fn with_initial_tail_lines(mut self, lines: usize) -> Self {
        self.initial_tail_lines = lines;
        self
    }

    /// Snapshot of the current source table.
    #[must_use]
    pub fn registry(&self) -> SourceRegistry {
        self.sources.borrow().clone()
    }
}
