use crate::analysis::AnalysisReport;
use colored::Colorize;
use miette::Result;

/// Terminal reporter with colored output
pub struct TerminalReporter;

impl TerminalReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn report(&self, analysis: &AnalysisReport) -> Result<()> {
        println!();
        println!(
            "Analyzed {} candidate classes",
            analysis.candidate_count.to_string().bold()
        );

        if analysis.unused.is_empty() {
            println!("{}", "No dead classes detected".green().bold());
            return Ok(());
        }

        println!(
            "{}",
            format!("Found {} classes with no detected references:", analysis.unused.len())
                .yellow()
                .bold()
        );
        println!();

        for name in analysis.sorted_unused() {
            println!("  {}", name);
        }

        Ok(())
    }
}

impl Default for TerminalReporter {
    fn default() -> Self {
        Self::new()
    }
}
