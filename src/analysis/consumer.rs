use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;

use tracing::{info, warn};

/// Shared record of the remaining "unused" candidates. Both scan phases
/// report uses here; removal is idempotent and commutative, so the phases
/// may process artifacts in parallel with only the lock for exclusion.
///
/// Optionally one class can be singled out for tracing: every use event
/// touching it, and any structural summary attached to it, is surfaced as
/// diagnostic output.
pub struct UseConsumer {
    candidates: Mutex<HashSet<String>>,
    trace_class: Option<String>,
}

impl UseConsumer {
    pub fn new(candidates: HashSet<String>, trace_class: Option<String>) -> Self {
        Self {
            candidates: Mutex::new(candidates),
            trace_class,
        }
    }

    /// Record that `using` references `used`; removes `used` from the
    /// candidate set if still present.
    pub fn record_used_class(&self, used: &str, using: &str, context: &str) {
        self.candidates.lock().unwrap().remove(used);

        if let Some(trace) = &self.trace_class {
            if trace == used {
                info!("{} used in: {} ({})", used, using, context);
            }
            if trace == using {
                info!("{} uses: {} ({})", using, used, context);
            }
        }
    }

    /// Attach a structural summary to the trace output. The summary closure
    /// only runs when `class_name` is the traced class, since building it
    /// is expensive.
    pub fn record_class_tracing<F>(&self, class_name: &str, summary: F)
    where
        F: FnOnce() -> String,
    {
        if self.trace_class.as_deref() == Some(class_name) {
            info!("Tracing for {}: {}", class_name, summary());
        }
    }

    /// Surface a per-artifact decode/parse failure. The artifact is skipped
    /// and the batch continues.
    pub fn record_invalid_file(&self, file: &Path, reason: &str) {
        warn!("Skipping unreadable file {} ({})", file.display(), reason);
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.lock().unwrap().is_empty()
    }

    pub fn remaining_count(&self) -> usize {
        self.candidates.lock().unwrap().len()
    }

    /// Snapshot of the remaining candidates, for the source phase's
    /// per-unit eligibility checks.
    pub fn remaining(&self) -> HashSet<String> {
        self.candidates.lock().unwrap().clone()
    }

    /// Consume the record, yielding the classes never seen in use.
    pub fn into_unused(self) -> HashSet<String> {
        self.candidates.into_inner().unwrap()
    }
}
