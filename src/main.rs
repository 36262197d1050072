use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;
use tracing::info;

mod analysis;
mod classfile;
mod config;
mod discovery;
mod filter;
mod report;
mod source;

use analysis::DeadClassAnalyzer;
use config::Config;
use filter::FilterPolicy;
use report::Reporter;

/// classreaper - Find classes with no remaining references in compiled JVM projects
#[derive(Parser, Debug)]
#[command(name = "classreaper")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory containing the compiled classes and sources to evaluate
    #[arg(short, long, default_value = ".")]
    directory: PathBuf,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Class names to limit analysis to (can be specified multiple times)
    #[arg(short, long)]
    include: Vec<String>,

    /// Classes to ignore completely for analysis (can be specified multiple times)
    #[arg(short, long)]
    exclude: Vec<String>,

    /// Classes intended for use outside the current context, never marked
    /// as dead (can be specified multiple times)
    #[arg(short = 'x', long)]
    external: Vec<String>,

    /// Class name to output dead/alive tracing information for
    #[arg(short, long)]
    trace: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "terminal")]
    format: OutputFormat,

    /// Output file (for json format)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode - only output results
    #[arg(short, long)]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug, Default)]
enum OutputFormat {
    #[default]
    Terminal,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.quiet);

    info!("classreaper v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&cli)?;

    let policy = FilterPolicy::new(&config.include, &config.exclude, &config.external)
        .into_diagnostic()?;

    let analyzer = DeadClassAnalyzer::new(policy, config.trace_class.clone());
    let analysis = analyzer.find_dead_classes(&cli.directory)?;

    let format = match config.report.format.as_str() {
        "json" => report::ReportFormat::Json,
        _ => report::ReportFormat::Terminal,
    };
    let reporter = Reporter::new(format, cli.output.clone());
    reporter.report(&analysis)?;

    Ok(())
}

fn init_logging(verbose: bool, quiet: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = if let Some(config_path) = &cli.config {
        Config::from_file(config_path)?
    } else {
        // Try to load from default locations
        Config::from_default_locations(&cli.directory)?
    };

    // Override with CLI arguments
    if !cli.include.is_empty() {
        config.include.extend(cli.include.clone());
    }
    if !cli.exclude.is_empty() {
        config.exclude.extend(cli.exclude.clone());
    }
    if !cli.external.is_empty() {
        config.external.extend(cli.external.clone());
    }
    if cli.trace.is_some() {
        config.trace_class = cli.trace.clone();
    }
    if matches!(cli.format, OutputFormat::Json) {
        config.report.format = "json".to_string();
    }

    Ok(config)
}
