//! Projects handed to the engine by the acquisition step

use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};

/// A checked-out source tree. Read-only input to one build attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Project {
    pub name: String,
    pub root: PathBuf,
}

impl Project {
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
        }
    }

    /// Project named after the last component of `root`
    pub fn from_path(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| root.display().to_string());
        Self { name, root }
    }

    /// Every immediate subdirectory of `repos_dir`, sorted by name.
    ///
    /// Hidden directories are skipped.
    pub fn discover(repos_dir: &Path) -> io::Result<Vec<Project>> {
        let mut projects = Vec::new();
        for entry in std::fs::read_dir(repos_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            projects.push(Project::new(name, entry.path()));
        }
        projects.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(projects)
    }
}
