//! Sweep coordinator - top-level run orchestration
//!
//! This module ties the pieces of a run together:
//! - Preparing the base directory and the shared error ledger
//! - Building jobs from a dataset, a single site, or a survey list
//! - Dispatching jobs through the worker pool
//! - Collecting reports into a run summary

use crate::config::Config;
use crate::crawler::controller::{JobReport, RetryController};
use crate::crawler::invoker::{CommandInvoker, CrawlInvoker};
use crate::crawler::pool::WorkerPool;
use crate::jobs::{base_dir_for, load_dataset, load_site_list, RuleSet, SiteJob};
use crate::output::{ErrorLedger, RunSummary};
use crate::SweepError;
use chrono::Utc;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Everything a finished run produced
#[derive(Debug)]
pub struct RunResult {
    pub summary: RunSummary,
    pub reports: Vec<JobReport>,
    pub failures: Vec<SweepError>,
}

/// Main sweep coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    base_dir: PathBuf,
    controller: Arc<RetryController>,
    pool: WorkerPool,
}

impl Coordinator {
    /// Creates a coordinator that runs the configured crawl command
    ///
    /// # Arguments
    ///
    /// * `config` - The sweep configuration
    /// * `base_dir` - Directory holding per-site folders and the error ledger
    pub fn new(config: Config, base_dir: PathBuf) -> Self {
        let invoker = Arc::new(CommandInvoker::new(&config.crawler));
        Self::with_invoker(config, base_dir, invoker)
    }

    /// Creates a coordinator around any crawl invoker
    pub fn with_invoker(config: Config, base_dir: PathBuf, invoker: Arc<dyn CrawlInvoker>) -> Self {
        let ledger = Arc::new(ErrorLedger::in_base_dir(&base_dir));
        let controller = Arc::new(RetryController::new(
            invoker,
            config.retry.clone(),
            config.pacing.clone(),
            ledger,
        ));
        let pool = WorkerPool::new(config.pool.parallelism);

        Self {
            config: Arc::new(config),
            base_dir,
            controller,
            pool,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn ledger(&self) -> &ErrorLedger {
        self.controller.ledger()
    }

    /// Runs the rule-driven flow over every job
    ///
    /// `dropped_rows` is carried into the summary as-is.
    pub async fn run_jobs(&self, jobs: Vec<SiteJob>, dropped_rows: usize) -> RunResult {
        let started_at = Utc::now();
        let controller = Arc::clone(&self.controller);

        let outcome = self
            .pool
            .run(jobs, move |job| {
                let controller = Arc::clone(&controller);
                async move { controller.run(&job).await }
            })
            .await;

        self.finish(started_at, outcome.reports, outcome.failures, dropped_rows)
    }

    /// Runs the survey flow over every job
    pub async fn run_survey(&self, jobs: Vec<SiteJob>) -> RunResult {
        let started_at = Utc::now();
        let controller = Arc::clone(&self.controller);

        let outcome = self
            .pool
            .run(jobs, move |job| {
                let controller = Arc::clone(&controller);
                async move { controller.run_survey(&job).await }
            })
            .await;

        self.finish(started_at, outcome.reports, outcome.failures, 0)
    }

    fn finish(
        &self,
        started_at: chrono::DateTime<Utc>,
        reports: Vec<JobReport>,
        failures: Vec<SweepError>,
        dropped_rows: usize,
    ) -> RunResult {
        let summary = RunSummary::from_reports(
            started_at,
            &reports,
            failures.len(),
            self.ledger().appended(),
            dropped_rows,
        );

        tracing::info!(
            "Run finished: {} succeeded, {} abandoned, {} failed",
            summary.succeeded,
            summary.abandoned_total(),
            summary.worker_failures
        );

        RunResult {
            summary,
            reports,
            failures,
        }
    }
}

/// Creates the base directory if needed and returns its absolute path
pub async fn prepare_base_dir(path: &Path) -> Result<PathBuf, SweepError> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|source| SweepError::Workspace {
            path: path.to_path_buf(),
            source,
        })?;

    tokio::fs::canonicalize(path)
        .await
        .map_err(|source| SweepError::Workspace {
            path: path.to_path_buf(),
            source,
        })
}

/// Runs every site of a rule dataset, optionally filtered by a site substring
pub async fn run_dataset(
    config: Config,
    dataset_path: &Path,
    site_filter: Option<&str>,
) -> Result<RunResult, SweepError> {
    let dataset = load_dataset(dataset_path, site_filter)?;
    tracing::info!(
        "Loaded {} rows for {} sites from {}",
        dataset.rows(),
        dataset.sites(),
        dataset_path.display()
    );
    if dataset.dropped_rows() > 0 {
        tracing::info!("Site filter dropped {} rows", dataset.dropped_rows());
    }

    let base_dir = prepare_base_dir(&base_dir_for(dataset_path)).await?;
    let dropped_rows = dataset.dropped_rows();
    let jobs = dataset.into_jobs(&base_dir);

    let coordinator = Coordinator::new(config, base_dir);
    Ok(coordinator.run_jobs(jobs, dropped_rows).await)
}

/// Runs a single site with a comma-separated rule string
///
/// Per-site folders and the ledger land in the current directory.
pub async fn run_single_site(
    config: Config,
    site: &str,
    rules: &str,
) -> Result<RunResult, SweepError> {
    let base_dir = prepare_base_dir(&std::env::current_dir()?).await?;
    let job = SiteJob::new(site, RuleSet::from_rule_string(rules), &base_dir)?;

    let coordinator = Coordinator::new(config, base_dir);
    Ok(coordinator.run_jobs(vec![job], 0).await)
}

/// Runs the survey flow over a newline-delimited site list
pub async fn run_survey_list(config: Config, list_path: &Path) -> Result<RunResult, SweepError> {
    let sites = load_site_list(list_path)?;
    tracing::info!("Loaded {} survey sites from {}", sites.len(), list_path.display());

    let base_dir = prepare_base_dir(&base_dir_for(list_path)).await?;
    let jobs = survey_jobs(sites, &base_dir);

    let coordinator = Coordinator::new(config, base_dir);
    Ok(coordinator.run_survey(jobs).await)
}

/// Builds one survey job per registrable domain
///
/// Unparseable sites and later sites whose domain is already taken are
/// logged and skipped; they would share a working directory otherwise.
pub fn survey_jobs(sites: Vec<String>, base_dir: &Path) -> Vec<SiteJob> {
    let mut jobs: Vec<SiteJob> = Vec::with_capacity(sites.len());
    let mut domains = HashSet::new();

    for site in sites {
        let job = match SiteJob::new(site.as_str(), RuleSet::new(), base_dir) {
            Ok(job) => job,
            Err(e) => {
                tracing::warn!("Skipping survey site {}: {}", site, e);
                continue;
            }
        };

        if domains.insert(job.domain().to_string()) {
            jobs.push(job);
        } else {
            tracing::warn!(
                "Skipping survey site {}: domain {} is already listed",
                site,
                job.domain()
            );
        }
    }

    jobs
}
