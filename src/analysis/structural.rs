use std::path::PathBuf;

use rayon::prelude::*;
use tracing::debug;

use crate::analysis::UseConsumer;
use crate::classfile::{class_references, ClassFile};

/// Drives the class-file reader over every in-scope binary artifact and
/// folds the discovered reference events into the shared consumer.
///
/// Exempted (external API) classes are deliberately still fed through here:
/// exemption only keeps a class out of the candidate pool, not out of the
/// set of reference *sources*.
pub struct StructuralScanner<'a> {
    consumer: &'a UseConsumer,
}

impl<'a> StructuralScanner<'a> {
    pub fn new(consumer: &'a UseConsumer) -> Self {
        Self { consumer }
    }

    /// Scan every artifact, isolating per-file read and decode failures.
    pub fn scan(&self, artifacts: &[PathBuf]) {
        artifacts.par_iter().for_each(|path| self.scan_artifact(path));
    }

    fn scan_artifact(&self, path: &PathBuf) {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) => {
                self.consumer.record_invalid_file(path, &err.to_string());
                return;
            }
        };

        let class = match ClassFile::parse(&bytes) {
            Ok(class) => class,
            Err(err) => {
                self.consumer.record_invalid_file(path, &err.to_string());
                return;
            }
        };

        let owner = class.external_name();
        debug!("Scanning byte code of {}", owner);

        self.consumer
            .record_class_tracing(&owner, || class.structural_summary());

        let references = match class_references(&class) {
            Ok(references) => references,
            Err(err) => {
                self.consumer.record_invalid_file(path, &err.to_string());
                return;
            }
        };

        for reference in references {
            // Referencing yourself doesn't count as a use
            if reference.used() != owner {
                self.consumer
                    .record_used_class(reference.used(), &owner, reference.context());
            }
        }
    }
}
