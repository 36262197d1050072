mod file_finder;

pub use file_finder::{Artifact, ArtifactFinder, ArtifactKind};
