use std::collections::HashSet;
use std::path::{Path, PathBuf};

use miette::{miette, Result};
use rayon::prelude::*;
use tracing::{info, warn};

use crate::analysis::{SourceScanner, StructuralScanner, UseConsumer};
use crate::classfile::ClassFile;
use crate::discovery::{ArtifactFinder, ArtifactKind};
use crate::filter::FilterPolicy;

/// Outcome of one analysis run. The report always carries both counts so a
/// caller can tell "nothing analyzed" apart from "nothing dead".
#[derive(Debug)]
pub struct AnalysisReport {
    /// Candidates discovered before any reference was applied.
    pub candidate_count: usize,
    /// Classes with no detected reference, unordered.
    pub unused: HashSet<String>,
}

impl AnalysisReport {
    /// Unused class names sorted for display.
    pub fn sorted_unused(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.unused.iter().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Orchestrates one full dead-class analysis: discover the candidate pool,
/// remove everything the byte code references, then — only if candidates
/// remain — remove everything the source text references.
pub struct DeadClassAnalyzer {
    policy: FilterPolicy,
    trace_class: Option<String>,
}

impl DeadClassAnalyzer {
    pub fn new(policy: FilterPolicy, trace_class: Option<String>) -> Self {
        Self {
            policy,
            trace_class,
        }
    }

    pub fn find_dead_classes(&self, root: &Path) -> Result<AnalysisReport> {
        if !root.is_dir() {
            return Err(miette!("{} is not a directory", root.display()));
        }

        info!("Analyzing {} for dead classes", root.display());

        let artifacts = ArtifactFinder::new().find(root);

        let class_files: Vec<PathBuf> = artifacts
            .iter()
            .filter(|artifact| {
                artifact.kind == ArtifactKind::ClassFile && self.policy.in_scope(&artifact.path)
            })
            .map(|artifact| artifact.path.clone())
            .collect();
        let source_files: Vec<PathBuf> = artifacts
            .iter()
            .filter(|artifact| {
                artifact.kind == ArtifactKind::JavaSource && self.policy.in_scope(&artifact.path)
            })
            .map(|artifact| artifact.path.clone())
            .collect();

        // Candidates additionally pass exclusion and the external-API
        // exemption; the full in-scope set still acts as reference sources.
        let candidates = discover_candidates(
            class_files
                .iter()
                .filter(|path| self.policy.is_candidate(path)),
        );
        let candidate_count = candidates.len();

        info!("Found {} classes to analyze", candidate_count);

        let consumer = UseConsumer::new(candidates, self.trace_class.clone());

        StructuralScanner::new(&consumer).scan(&class_files);

        if !consumer.is_empty() {
            info!(
                "{} classes are not referenced in ways detectable in byte code - checking source",
                consumer.remaining_count()
            );
            SourceScanner::new(&consumer).scan(&source_files);
        }

        let unused = consumer.into_unused();

        info!("{} unused classes found", unused.len());

        Ok(AnalysisReport {
            candidate_count,
            unused,
        })
    }
}

/// Enumerate the analyzable class symbols of the candidate pool. Anonymous
/// classes are never candidates: with no declared simple name there is
/// nothing actionable to report dead.
fn discover_candidates<'a, I>(paths: I) -> HashSet<String>
where
    I: Iterator<Item = &'a PathBuf>,
{
    let paths: Vec<&PathBuf> = paths.collect();

    paths
        .par_iter()
        .filter_map(|path| {
            let bytes = match std::fs::read(path) {
                Ok(bytes) => bytes,
                Err(err) => {
                    warn!("Skipping unreadable file {} ({})", path.display(), err);
                    return None;
                }
            };
            let class = match ClassFile::parse(&bytes) {
                Ok(class) => class,
                Err(err) => {
                    warn!("Skipping unreadable file {} ({})", path.display(), err);
                    return None;
                }
            };
            if class.anonymous {
                None
            } else {
                Some(class.external_name())
            }
        })
        .collect()
}
