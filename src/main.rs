// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use std::path::PathBuf;
use std::sync::Arc;

use promolint::analyzer::{AnalyzerOptions, HttpAnalyzer, RobustAnalyzer};
use promolint::app_config::{Config, LogLevel};
use promolint::document::{Document, MetadataOverrides};
use promolint::engine::{Engine, ViolationFilter};
use promolint::file_utils::FileManager;
use promolint::reference::ReferenceStore;

/// CLI wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => LogLevel::Error,
            CliLogLevel::Warn => LogLevel::Warn,
            CliLogLevel::Info => LogLevel::Info,
            CliLogLevel::Debug => LogLevel::Debug,
            CliLogLevel::Trace => LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Evaluate a marketing document against the rule corpus (default command)
    #[command(alias = "lint")]
    Check(CheckArgs),

    /// Generate shell completions for promolint
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct CheckArgs {
    /// Structured document JSON to evaluate
    #[arg(value_name = "DOCUMENT")]
    document: PathBuf,

    /// Metadata override file with human-readable keys
    #[arg(short, long)]
    metadata: Option<PathBuf>,

    /// Directory holding one rule file per module
    #[arg(short, long, default_value = "rules")]
    rules: PathBuf,

    /// Directory holding the reference datasets
    #[arg(short = 'R', long)]
    references: Option<PathBuf>,

    /// Write the report here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Emit the flat violation list instead of the full report
    #[arg(long)]
    flat: bool,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: PathBuf,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

#[derive(Parser, Debug)]
#[command(
    name = "promolint",
    about = "Automated compliance screening for fund marketing documents",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check(args) => run_check(args).await,
        Commands::Completions { shell } => {
            generate(shell, &mut Cli::command(), "promolint", &mut std::io::stdout());
            Ok(())
        }
    }
}

async fn run_check(args: CheckArgs) -> Result<()> {
    let config = Config::from_file_or_default(&args.config_path)?;

    let level = args
        .log_level
        .map(LogLevel::from)
        .unwrap_or_else(|| config.log_level.clone());
    env_logger::Builder::new().filter_level(level.to_level_filter()).try_init().ok();

    let document_json = FileManager::read_to_string(&args.document)?;
    let document = Document::from_json(&document_json)
        .with_context(|| format!("Failed to load document {}", args.document.display()))?;

    let overrides: Option<MetadataOverrides> = match &args.metadata {
        Some(path) => FileManager::read_json_optional(path)?,
        None => None,
    };

    let references = ReferenceStore::load(&args.rules, args.references.as_deref());

    let transport = HttpAnalyzer::with_config(
        config.analyzer.endpoint.clone(),
        config.analyzer.model.clone(),
        config.analyzer.api_key.clone(),
        config.analyzer.retry_count,
        config.analyzer.retry_backoff_ms,
        config.analyzer.timeout_secs,
    );
    let analyzer = Arc::new(RobustAnalyzer::with_options(
        transport,
        AnalyzerOptions {
            timeout_secs: config.analyzer.timeout_secs,
            max_retries: config.analyzer.retry_count,
            backoff_base_ms: config.analyzer.retry_backoff_ms,
        },
    ));

    let mut filter =
        ViolationFilter::new().with_default_threshold(config.filter.confidence_threshold);
    if let Some(patterns_file) = &config.filter.patterns_file {
        filter = filter.with_patterns_file(patterns_file);
    }

    let engine = Engine::new(analyzer).with_options(config.checks.clone()).with_filter(filter);

    let progress = ProgressBar::new(8);
    progress.set_style(
        ProgressStyle::with_template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} modules")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    let progress_clone = progress.clone();

    let report = engine
        .run_with_progress(&document, overrides.as_ref(), &references, move |done, _| {
            progress_clone.set_position(done as u64);
        })
        .await?;
    progress.finish_and_clear();

    info!("Report {}: {}", report.run_id, report.summary());

    let json = if args.flat {
        serde_json::to_string_pretty(&report.violations)?
    } else {
        serde_json::to_string_pretty(&report)?
    };

    match &args.output {
        Some(path) => {
            FileManager::write_to_file(path, &json)?;
            println!("{}", report.summary());
        }
        None => println!("{}", json),
    }

    Ok(())
}
