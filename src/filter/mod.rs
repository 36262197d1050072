//! Inclusion, exclusion and external-API exemption predicates over
//! artifact paths.
//!
//! Patterns are written in class-name style (`com.example.Foo`,
//! `com.example.api.*`) or path style (`**/generated/**`). Dots are
//! normalized to path separators, bare patterns are anchored with `**/`,
//! and a trailing `/*` matches whole sub-trees. Matching is
//! case-insensitive against the artifact path with its extension stripped,
//! so one pattern set governs both `.class` and `.java` artifacts.

// The unfiltered constructor is library API; the CLI always builds from patterns
#![allow(dead_code)]

use std::path::Path;

use glob::{MatchOptions, Pattern};
use thiserror::Error;

/// A filter pattern that cannot be compiled. Fatal at setup: it indicates
/// misconfiguration, not a data problem.
#[derive(Debug, Error)]
#[error("invalid filter pattern '{pattern}': {source}")]
pub struct PatternError {
    pub pattern: String,
    #[source]
    source: glob::PatternError,
}

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// The three independent predicates of one analysis run.
///
/// Inclusion defaults to "all" (an empty pattern list matches everything);
/// exclusion and exemption default to "none". Exemption keeps a class out
/// of the candidate pool but never out of the set of reference sources.
pub struct FilterPolicy {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
    external: Vec<Pattern>,
}

impl FilterPolicy {
    pub fn new(
        include: &[String],
        exclude: &[String],
        external: &[String],
    ) -> Result<Self, PatternError> {
        Ok(Self {
            include: compile(include)?,
            exclude: compile(exclude)?,
            external: compile(external)?,
        })
    }

    /// Policy with no filtering at all: everything analyzed, nothing
    /// exempt.
    pub fn allow_all() -> Self {
        Self {
            include: Vec::new(),
            exclude: Vec::new(),
            external: Vec::new(),
        }
    }

    /// Whether the artifact participates in analysis at all. Excluded and
    /// exempted artifacts stay in scope: both still act as *sources* of
    /// references to the remaining candidates.
    pub fn in_scope(&self, path: &Path) -> bool {
        let subject = match_subject(path);
        self.include.is_empty() || matches_any(&self.include, &subject)
    }

    /// Whether the artifact is excluded from the candidate pool.
    pub fn is_excluded(&self, path: &Path) -> bool {
        matches_any(&self.exclude, &match_subject(path))
    }

    /// Whether the artifact is exempt from dead-class reporting as
    /// intentional external API.
    pub fn is_exempt(&self, path: &Path) -> bool {
        matches_any(&self.external, &match_subject(path))
    }

    /// Whether the artifact's class may enter the candidate pool.
    pub fn is_candidate(&self, path: &Path) -> bool {
        self.in_scope(path) && !self.is_excluded(path) && !self.is_exempt(path)
    }
}

fn compile(patterns: &[String]) -> Result<Vec<Pattern>, PatternError> {
    patterns
        .iter()
        .map(|pattern| {
            let normalized = normalize(pattern);
            Pattern::new(&normalized).map_err(|source| PatternError {
                pattern: pattern.clone(),
                source,
            })
        })
        .collect()
}

/// Class-name patterns become path globs: dots turn into separators, bare
/// patterns are anchored anywhere in the tree, and a trailing `/*` matches
/// everything below a package.
fn normalize(pattern: &str) -> String {
    let mut normalized = pattern.trim().replace('.', "/");

    if let Some(anchored) = normalized.strip_prefix('/') {
        // Already absolute: anchor at the root, minus the leading slash the
        // match subject also drops.
        return maybe_widen(anchored.to_string());
    }
    if !normalized.starts_with("**/") {
        normalized = format!("**/{}", normalized);
    }
    maybe_widen(normalized)
}

fn maybe_widen(mut pattern: String) -> String {
    if pattern.ends_with("/*") {
        pattern.push('*');
    }
    pattern
}

fn matches_any(patterns: &[Pattern], subject: &str) -> bool {
    patterns
        .iter()
        .any(|pattern| pattern.matches_with(subject, MATCH_OPTIONS))
}

/// Path as matched by the patterns: separators normalized, leading slash
/// and extension stripped so class and source artifacts of the same type
/// agree.
fn match_subject(path: &Path) -> String {
    let text = path.to_string_lossy().replace('\\', "/");
    let text = text.trim_start_matches('/');
    text.strip_suffix(".class")
        .or_else(|| text.strip_suffix(".java"))
        .unwrap_or(text)
        .to_string()
}
