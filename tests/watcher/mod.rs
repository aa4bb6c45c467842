//! Watcher pipeline tests.

mod dispatch_test;
mod live_test;
mod transcript_test;

use std::io::Write;
use std::path::{Path, PathBuf};

use comms_monitor::watcher::{SourceLayout, DNA_DIR_NAME};
use tempfile::TempDir;

/// Scratch project with an `interlateral_dna/` directory and an isolated
/// transcript base.
pub struct Project {
    pub root: TempDir,
    pub projects: TempDir,
}

impl Project {
    pub fn new() -> Self {
        let root = TempDir::new().unwrap();
        std::fs::create_dir_all(root.path().join(DNA_DIR_NAME)).unwrap();
        Self {
            root,
            projects: TempDir::new().unwrap(),
        }
    }

    /// Project whose `interlateral_dna/` directory does not exist yet.
    pub fn without_dna() -> Self {
        let project = Self::new();
        std::fs::remove_dir(project.root.path().join(DNA_DIR_NAME)).unwrap();
        project
    }

    pub fn dna_dir(&self) -> PathBuf {
        self.root.path().join(DNA_DIR_NAME)
    }

    pub fn layout(&self) -> SourceLayout {
        SourceLayout::for_project(self.root.path())
            .with_claude_projects_dir(Some(self.projects.path().to_path_buf()))
    }

    pub fn dna(&self, name: &str) -> PathBuf {
        self.root.path().join(DNA_DIR_NAME).join(name)
    }

    /// Directory the transcript of this project is discovered in.
    pub fn transcript_dir(&self) -> PathBuf {
        let abs = std::path::absolute(self.root.path()).unwrap();
        let dir = self
            .projects
            .path()
            .join(comms_monitor::watcher::project_path_hash(&abs));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }
}

pub fn append(path: &Path, text: &str) {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .unwrap();
    file.write_all(text.as_bytes()).unwrap();
    file.flush().unwrap();
}
