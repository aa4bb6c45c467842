//! Source discovery and the name ↔ path table.
//!
//! Core sources are always registered, whether or not their files exist yet.
//! Optional sources are registered only when discovery finds them on disk.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::classify::FormatKind;
use crate::event::SourceName;

/// Directory under the project root holding the shared agent logs.
pub const DNA_DIR_NAME: &str = "interlateral_dna";

/// Convert a project path to the directory name the CLI agent uses under
/// its projects directory.
///
/// Both `/` and `_` become `-`, so the leading slash of an absolute path
/// yields a leading `-`.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use comms_monitor::watcher::project_path_hash;
///
/// let hash = project_path_hash(Path::new("/home/user/my_project"));
/// assert_eq!(hash, "-home-user-my-project");
/// ```
#[must_use]
pub fn project_path_hash(project_path: &Path) -> String {
    project_path.to_string_lossy().replace(['/', '_'], "-")
}

/// Find the most recently modified `.jsonl` file in a directory.
///
/// Returns `None` if the directory is missing, unreadable or holds no
/// transcripts.
#[must_use]
pub fn find_latest_transcript(dir: &Path) -> Option<PathBuf> {
    let entries = std::fs::read_dir(dir).ok()?;

    entries
        .filter_map(Result::ok)
        .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "jsonl"))
        .filter_map(|entry| {
            let metadata = entry.metadata().ok()?;
            let modified = metadata.modified().ok()?;
            Some((entry.path(), modified))
        })
        .max_by_key(|(_, modified)| *modified)
        .map(|(path, _)| path)
}

/// Filesystem locations used to discover sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLayout {
    /// Root of the monitored project.
    pub project_root: PathBuf,
    /// Directory holding `comms.md`, `ag_log.md` and the Codex capture.
    pub dna_dir: PathBuf,
    /// Base directory of CLI-agent transcripts (`~/.claude/projects`).
    pub claude_projects_dir: Option<PathBuf>,
}

impl SourceLayout {
    /// Layout with the conventional directories under `project_root`.
    #[must_use]
    pub fn for_project(project_root: impl Into<PathBuf>) -> Self {
        let project_root = project_root.into();
        Self {
            dna_dir: project_root.join(DNA_DIR_NAME),
            claude_projects_dir: dirs::home_dir().map(|home| home.join(".claude").join("projects")),
            project_root,
        }
    }

    /// Override the transcript base directory.
    #[must_use]
    pub fn with_claude_projects_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.claude_projects_dir = dir;
        self
    }

    /// Transcript directory for this project, if it exists.
    #[must_use]
    pub fn transcript_dir(&self) -> Option<PathBuf> {
        let base = self.claude_projects_dir.as_ref()?;
        let root = std::path::absolute(&self.project_root).unwrap_or_else(|_| self.project_root.clone());
        let dir = base.join(project_path_hash(&root));
        dir.is_dir().then_some(dir)
    }

    fn core_path(&self, name: SourceName) -> Option<PathBuf> {
        match name {
            SourceName::Comms => Some(self.dna_dir.join("comms.md")),
            SourceName::AgentLog => Some(self.dna_dir.join("ag_log.md")),
            _ => None,
        }
    }

    fn optional_path(&self, name: SourceName) -> Option<PathBuf> {
        let path = match name {
            SourceName::CcTranscript => return find_latest_transcript(&self.transcript_dir()?),
            SourceName::AgentTelemetry => self.project_root.join(".gemini").join("telemetry.log"),
            SourceName::CodexTelemetry => self.dna_dir.join("codex_telemetry.log"),
            SourceName::Comms | SourceName::AgentLog => return None,
        };
        path.is_file().then_some(path)
    }
}

/// Format each source is parsed with.
#[must_use]
pub fn format_for(name: SourceName) -> FormatKind {
    match name {
        SourceName::Comms | SourceName::AgentLog | SourceName::CodexTelemetry => FormatKind::Plain,
        SourceName::CcTranscript => FormatKind::Transcript,
        SourceName::AgentTelemetry => FormatKind::Telemetry,
    }
}

/// One registered source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceDescriptor {
    /// Logical name.
    pub name: SourceName,
    /// File the source is read from.
    pub path: PathBuf,
    /// Whether the file currently exists.
    pub exists: bool,
    /// On-disk format.
    pub format: FormatKind,
}

/// Table of known sources, keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SourceRegistry {
    sources: BTreeMap<SourceName, SourceDescriptor>,
}

impl SourceRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Probe `layout` for core and optional sources.
    ///
    /// Never fails: missing directories simply mean the optional source is
    /// not registered.
    #[must_use]
    pub fn discover(layout: &SourceLayout) -> Self {
        let mut registry = Self::new();

        for name in SourceName::CORE {
            if let Some(path) = layout.core_path(name) {
                registry.register(name, path);
            }
        }

        for name in SourceName::OPTIONAL {
            match layout.optional_path(name) {
                Some(path) => {
                    tracing::info!(source = %name, path = %path.display(), "Discovered optional source");
                    registry.register(name, path);
                }
                None => tracing::debug!(source = %name, "Optional source not found"),
            }
        }

        registry
    }

    /// Register (or replace) a source at `path`.
    pub fn register(&mut self, name: SourceName, path: PathBuf) {
        let exists = path.is_file();
        self.sources.insert(
            name,
            SourceDescriptor {
                name,
                path,
                exists,
                format: format_for(name),
            },
        );
    }

    /// Look up a source by name.
    #[must_use]
    pub fn get(&self, name: SourceName) -> Option<&SourceDescriptor> {
        self.sources.get(&name)
    }

    /// Resolve a notified path back to its source name.
    ///
    /// Falls back to comparing canonical parents, since notification
    /// backends may report paths through symlinked directories.
    #[must_use]
    pub fn resolve(&self, path: &Path) -> Option<SourceName> {
        if let Some(desc) = self.sources.values().find(|d| d.path == path) {
            return Some(desc.name);
        }

        let file_name = path.file_name()?;
        let parent = path.parent().and_then(|p| p.canonicalize().ok())?;
        self.sources
            .values()
            .find(|d| {
                d.path.file_name() == Some(file_name)
                    && d.path.parent().and_then(|p| p.canonicalize().ok()).as_ref() == Some(&parent)
            })
            .map(|d| d.name)
    }

    /// Update availability. Returns whether anything changed.
    pub fn set_available(&mut self, name: SourceName, exists: bool) -> bool {
        match self.sources.get_mut(&name) {
            Some(desc) if desc.exists != exists => {
                desc.exists = exists;
                true
            }
            _ => false,
        }
    }

    /// All registered sources, ordered by name.
    pub fn descriptors(&self) -> impl Iterator<Item = &SourceDescriptor> {
        self.sources.values()
    }

    /// Number of registered sources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Whether no source is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Availability of every registered source.
    #[must_use]
    pub fn status(&self) -> BTreeMap<SourceName, bool> {
        self.sources.iter().map(|(name, d)| (*name, d.exists)).collect()
    }

    /// Path of every registered source.
    #[must_use]
    pub fn files(&self) -> BTreeMap<SourceName, PathBuf> {
        self.sources.iter().map(|(name, d)| (*name, d.path.clone())).collect()
    }

    /// Distinct directories to watch: each source's parent, or its nearest
    /// existing ancestor while the parent does not exist.
    #[must_use]
    pub fn watch_dirs(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = self
            .sources
            .values()
            .filter_map(|d| d.path.parent())
            .filter_map(nearest_existing_dir)
            .collect();
        dirs.sort();
        dirs.dedup();
        dirs
    }
}

fn nearest_existing_dir(path: &Path) -> Option<PathBuf> {
    path.ancestors()
        .map(|p| if p.as_os_str().is_empty() { Path::new(".") } else { p })
        .find(|p| p.is_dir())
        .map(Path::to_path_buf)
}
