use std::path::PathBuf;

use rayon::prelude::*;
use tracing::debug;

use crate::analysis::UseConsumer;
use crate::source::{JavaUnitReader, SourceUnit};

/// Resolves source-level references to the candidates that survived the
/// structural scan. These are references the compiler erases from bytecode,
/// chiefly reads of `static final` constants, which are inlined at the use
/// site.
pub struct SourceScanner<'a> {
    consumer: &'a UseConsumer,
}

impl<'a> SourceScanner<'a> {
    pub fn new(consumer: &'a UseConsumer) -> Self {
        Self { consumer }
    }

    /// Scan every source unit, isolating per-file read and parse failures.
    pub fn scan(&self, sources: &[PathBuf]) {
        // Eligibility rules below compare against the full pre-phase pool;
        // one snapshot up front keeps the per-unit work lock-free.
        let candidates: Vec<String> = self.consumer.remaining().into_iter().collect();
        if candidates.is_empty() {
            return;
        }

        let reader = JavaUnitReader::new();

        sources
            .par_iter()
            .for_each(|path| self.scan_unit(&reader, path, &candidates));
    }

    fn scan_unit(&self, reader: &JavaUnitReader, path: &PathBuf, candidates: &[String]) {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) => {
                self.consumer.record_invalid_file(path, &err.to_string());
                return;
            }
        };

        let unit = match reader.parse(path, &contents) {
            Ok(unit) => unit,
            Err(err) => {
                self.consumer.record_invalid_file(path, &err.to_string());
                return;
            }
        };

        // A unit with no declared type has no compiled counterpart and
        // cannot be the source of a reference we missed.
        let current = match unit.primary_type() {
            Some(current) => current,
            None => return,
        };

        debug!("Scanning source of {}", current);

        for candidate in candidates {
            if candidate == &current {
                continue;
            }
            if let Some(rule) = reference_rule(&unit, candidate) {
                self.consumer.record_used_class(
                    candidate,
                    &current,
                    &format!("{} {}", current, rule),
                );
            }
        }
    }
}

/// Which rule, if any, makes `unit` a user of `candidate`.
fn reference_rule(unit: &SourceUnit, candidate: &str) -> Option<&'static str> {
    // Direct imports of the class
    if unit
        .imports
        .iter()
        .any(|import| !import.is_static && !import.is_wildcard && import.path == *candidate)
    {
        return Some("import");
    }

    // Static imports of a member (or all members) of the class
    if unit.imports.iter().any(|import| {
        import.is_static
            && (import.path == *candidate
                || import.path.starts_with(&format!("{}.", candidate)))
    }) {
        return Some("static import");
    }

    // Fully qualified references in expressions
    if unit.access_chains.contains(candidate) {
        return Some("fully qualified reference");
    }

    // Simple-name references, valid only where the name actually resolves
    // to the candidate
    if let Some(simple) = eligible_simple_name(unit, candidate) {
        let terminal = format!(".{}", simple);
        if unit
            .access_chains
            .iter()
            .any(|chain| chain == &simple || chain.ends_with(&terminal))
        {
            return Some("simple name reference");
        }
    }

    None
}

/// A candidate may be referenced by simple name only when it is not
/// declared in this unit and the unit's package (or a wildcard import)
/// covers the candidate's package.
fn eligible_simple_name(unit: &SourceUnit, candidate: &str) -> Option<String> {
    if unit.declares(candidate) {
        return None;
    }

    let simple = simple_name(candidate);

    let same_package = match &unit.package {
        Some(package) => *candidate == format!("{}.{}", package, simple),
        None => *candidate == simple,
    };

    let wildcard_covered = unit.imports.iter().any(|import| {
        import.is_wildcard
            && !import.is_static
            && *candidate == format!("{}.{}", import.path, simple)
    });

    if same_package || wildcard_covered {
        Some(simple)
    } else {
        None
    }
}

fn simple_name(qualified: &str) -> String {
    qualified
        .rsplit('.')
        .next()
        .unwrap_or(qualified)
        .to_string()
}
