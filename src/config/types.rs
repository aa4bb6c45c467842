//! Configuration types.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::event::DEFAULT_BUFFER_CAPACITY;
use crate::watcher::{SourceLayout, DEFAULT_TAIL_LINES, DNA_DIR_NAME};

/// Default port for the dashboard server.
pub const DEFAULT_PORT: u16 = 3001;

/// Default debounce window in milliseconds.
pub const DEFAULT_DEBOUNCE_MS: u64 = 100;

/// Configuration for the dashboard server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Port to listen on.
    pub port: u16,
    /// Host address to bind to.
    pub host: String,
    /// Whether to enable permissive CORS.
    pub cors_permissive: bool,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            host: "127.0.0.1".to_string(),
            cors_permissive: true,
        }
    }
}

impl DashboardConfig {
    /// Address to bind, as `host:port`.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Monitor configuration loaded from TOML.
///
/// Relative paths are resolved against `project_root`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Root of the monitored project.
    pub project_root: PathBuf,
    /// Shared log directory. Defaults to `<project_root>/interlateral_dna`.
    pub dna_dir: Option<PathBuf>,
    /// CLI-agent transcript base. Defaults to `~/.claude/projects`.
    pub claude_projects_dir: Option<PathBuf>,
    /// Durable event log. Defaults to `<project_root>/.observability/events.jsonl`.
    pub event_log: Option<PathBuf>,
    /// In-memory event buffer size.
    pub buffer_capacity: usize,
    /// Trailing lines per source returned to newly connecting clients.
    pub initial_tail_lines: usize,
    /// Notification debounce window.
    pub debounce_ms: u64,
    /// HTTP surface.
    pub dashboard: DashboardConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            project_root: PathBuf::from("."),
            dna_dir: None,
            claude_projects_dir: None,
            event_log: None,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            initial_tail_lines: DEFAULT_TAIL_LINES,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            dashboard: DashboardConfig::default(),
        }
    }
}

impl MonitorConfig {
    /// Override the project root (builder pattern).
    #[must_use]
    pub fn with_project_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.project_root = root.into();
        self
    }

    fn under_root(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        }
    }

    /// Resolved shared log directory.
    #[must_use]
    pub fn dna_dir(&self) -> PathBuf {
        self.dna_dir
            .as_deref()
            .map_or_else(|| self.project_root.join(DNA_DIR_NAME), |p| self.under_root(p))
    }

    /// Resolved durable event log path.
    #[must_use]
    pub fn event_log_path(&self) -> PathBuf {
        self.event_log.as_deref().map_or_else(
            || self.project_root.join(".observability").join("events.jsonl"),
            |p| self.under_root(p),
        )
    }

    /// Notification debounce window.
    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Source locations for discovery.
    #[must_use]
    pub fn layout(&self) -> SourceLayout {
        let mut layout = SourceLayout::for_project(self.project_root.clone());
        layout.dna_dir = self.dna_dir();
        if let Some(dir) = &self.claude_projects_dir {
            layout.claude_projects_dir = Some(dir.clone());
        }
        layout
    }
}
