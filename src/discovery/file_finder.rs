use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use tracing::{debug, trace};

/// Kind of analyzable artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// Compiled `.class` file
    ClassFile,
    /// Java `.java` source unit
    JavaSource,
}

impl ArtifactKind {
    /// Determine artifact kind from path
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "class" => Some(ArtifactKind::ClassFile),
            "java" => Some(ArtifactKind::JavaSource),
            _ => None,
        }
    }
}

/// A discovered artifact within the analysis root
#[derive(Debug, Clone)]
pub struct Artifact {
    pub path: PathBuf,
    pub kind: ArtifactKind,
}

/// Finds class and source artifacts under an analysis root
pub struct ArtifactFinder;

impl ArtifactFinder {
    pub fn new() -> Self {
        Self
    }

    /// Walk the root and collect every class and source artifact.
    pub fn find(&self, root: &Path) -> Vec<Artifact> {
        debug!("Scanning for artifacts in: {}", root.display());

        // Compiled output directories are routinely gitignored, so the
        // usual ignore-file handling would hide exactly the files this
        // tool exists to read. Only hidden entries are skipped.
        let walker = WalkBuilder::new(root)
            .hidden(true)
            .git_ignore(false)
            .git_global(false)
            .git_exclude(false)
            .ignore(false)
            .parents(false)
            .follow_links(false)
            .build();

        let artifacts: Vec<Artifact> = walker
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter_map(|entry| {
                let path = entry.path();
                let kind = ArtifactKind::from_path(path)?;
                trace!("Found {:?}: {}", kind, path.display());
                Some(Artifact {
                    path: path.to_path_buf(),
                    kind,
                })
            })
            .collect();

        debug!("Found {} artifacts", artifacts.len());
        artifacts
    }
}

impl Default for ArtifactFinder {
    fn default() -> Self {
        Self::new()
    }
}
