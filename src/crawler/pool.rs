//! Bounded worker pool for site jobs
//!
//! Each job runs on its own task and is handed to exactly one worker. A
//! semaphore caps how many jobs run at once; with one permit the pool is
//! strictly sequential in input order. The pool never retries a job, that is
//! the controller's business.
//!
//! Workers are tokio tasks rather than OS processes. A worker's real work
//! runs in the crawl subprocess it awaits, so a task spends its time parked
//! on that subprocess or on a courtesy pause, never blocking the runtime.

use crate::crawler::controller::JobReport;
use crate::jobs::SiteJob;
use crate::SweepError;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Collected results of a pool run
#[derive(Debug, Default)]
pub struct PoolOutcome {
    /// Reports of jobs that reached a terminal state
    pub reports: Vec<JobReport>,

    /// Jobs that errored out or whose worker panicked
    pub failures: Vec<SweepError>,
}

/// Dispatches jobs under a concurrency bound
pub struct WorkerPool {
    parallelism: usize,
    semaphore: Arc<Semaphore>,
}

impl WorkerPool {
    /// Creates a pool running at most `parallelism` jobs at once (minimum 1)
    pub fn new(parallelism: u32) -> Self {
        let parallelism = parallelism.max(1) as usize;
        Self {
            parallelism,
            semaphore: Arc::new(Semaphore::new(parallelism)),
        }
    }

    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    /// Runs `work` on every job and waits for all of them
    ///
    /// A failing or panicking job is logged and recorded; it never stops its
    /// siblings.
    pub async fn run<F, Fut>(&self, jobs: Vec<SiteJob>, work: F) -> PoolOutcome
    where
        F: Fn(SiteJob) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<JobReport, SweepError>> + Send + 'static,
    {
        let work = Arc::new(work);
        let mut outcome = PoolOutcome::default();
        let mut handles = Vec::with_capacity(jobs.len());

        tracing::info!(
            "Dispatching {} jobs over {} workers",
            jobs.len(),
            self.parallelism
        );

        for job in jobs {
            let site = job.site().to_string();

            let permit = match Arc::clone(&self.semaphore).acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    outcome.failures.push(SweepError::Worker {
                        site,
                        message: e.to_string(),
                    });
                    continue;
                }
            };

            let work = Arc::clone(&work);
            let handle = tokio::spawn(async move {
                let _permit = permit;
                work(job).await
            });
            handles.push((site, handle));
        }

        for (site, handle) in handles {
            match handle.await {
                Ok(Ok(report)) => outcome.reports.push(report),
                Ok(Err(e)) => {
                    tracing::error!("Job for {} failed: {}", site, e);
                    outcome.failures.push(e);
                }
                Err(e) => {
                    tracing::error!("Worker for {} stopped: {}", site, e);
                    outcome.failures.push(SweepError::Worker {
                        site,
                        message: e.to_string(),
                    });
                }
            }
        }

        outcome
    }
}
