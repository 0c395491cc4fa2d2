//! Deco-Sweep main entry point
//!
//! This is the command-line interface for the Deco-Sweep crawl harness.

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use deco_sweep::config::{load_config_with_hash, validate, Config};
use deco_sweep::crawler::{run_dataset, run_single_site, run_survey_list, RunResult};
use deco_sweep::output::print_summary;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Deco-Sweep: a retrying harness for link-decoration crawls
///
/// Deco-Sweep runs an external crawl tool against a list of sites, checks
/// whether decoration-stripping rules took effect, and gathers control crawls
/// once a signal appears.
#[derive(Parser, Debug)]
#[command(name = "deco-sweep")]
#[command(version = "1.0.0")]
#[command(about = "A retrying harness for link-decoration crawls", long_about = None)]
struct Cli {
    /// Which sites to crawl
    #[arg(short, long, value_enum)]
    target: Target,

    /// Site URL (alone with --rules, or as a filter with --csv)
    #[arg(short, long)]
    site: Option<String>,

    /// Comma-separated decoration rules for --site
    #[arg(short, long)]
    rules: Option<String>,

    /// Rule dataset (site_url, decoration_name, rank)
    #[arg(short, long, value_name = "FILE")]
    csv: Option<PathBuf>,

    /// Path to TOML configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Target {
    /// Survey the test site list
    Test,
    /// Survey the full site list
    All,
    /// Run rule-specific crawls from a dataset or a single site
    Specific,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = load_configuration(cli.config.as_deref())?;

    let result = match cli.target {
        Target::Test => {
            tracing::info!("Surveying test targets");
            run_survey_list(config.clone(), &config.targets.test).await?
        }
        Target::All => {
            tracing::info!("Surveying all targets");
            run_survey_list(config.clone(), &config.targets.all).await?
        }
        Target::Specific => handle_specific(&cli, config).await?,
    };

    report(&result, cli.quiet);
    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("deco_sweep=info,warn"),
            1 => EnvFilter::new("deco_sweep=debug,info"),
            2 => EnvFilter::new("deco_sweep=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads the config file when given, otherwise the built-in defaults
fn load_configuration(path: Option<&std::path::Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        tracing::debug!("No configuration file given, using defaults");
        let config = Config::default();
        validate(&config)?;
        return Ok(config);
    };

    tracing::info!("Loading configuration from: {}", path.display());
    let (config, hash) = load_config_with_hash(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    Ok(config)
}

/// Handles `--target specific`: a dataset (optionally site-filtered) or one site
async fn handle_specific(cli: &Cli, config: Config) -> anyhow::Result<RunResult> {
    match (&cli.csv, &cli.site, &cli.rules) {
        (Some(csv), site, _) => {
            if cli.rules.is_some() {
                tracing::warn!("--rules is ignored when --csv is given");
            }
            tracing::info!("Crawling rules from {}", csv.display());
            Ok(run_dataset(config, csv, site.as_deref()).await?)
        }
        (None, Some(site), Some(rules)) => {
            tracing::info!("Crawling {} with rules: {}", site, rules);
            Ok(run_single_site(config, site, rules).await?)
        }
        _ => bail!("--target specific requires --csv, or --site together with --rules"),
    }
}

/// Prints the run summary and logs worker failures
fn report(result: &RunResult, quiet: bool) {
    for failure in &result.failures {
        tracing::error!("{}", failure);
    }

    if !quiet {
        print_summary(&result.summary);
    }
}
