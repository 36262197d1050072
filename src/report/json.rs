use crate::analysis::AnalysisReport;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::path::PathBuf;

/// JSON reporter for programmatic output
pub struct JsonReporter {
    output_path: Option<PathBuf>,
}

impl JsonReporter {
    pub fn new(output_path: Option<PathBuf>) -> Self {
        Self { output_path }
    }

    pub fn report(&self, analysis: &AnalysisReport) -> Result<()> {
        let report = JsonReport {
            version: env!("CARGO_PKG_VERSION"),
            candidate_count: analysis.candidate_count,
            unused_count: analysis.unused.len(),
            unused: analysis
                .sorted_unused()
                .into_iter()
                .map(str::to_string)
                .collect(),
        };
        let json = serde_json::to_string_pretty(&report).into_diagnostic()?;

        if let Some(path) = &self.output_path {
            std::fs::write(path, &json).into_diagnostic()?;
            println!("Report written to: {}", path.display());
        } else {
            println!("{}", json);
        }

        Ok(())
    }
}

#[derive(Serialize)]
struct JsonReport {
    version: &'static str,
    candidate_count: usize,
    unused_count: usize,
    unused: Vec<String>,
}
