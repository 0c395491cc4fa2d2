//! Crawler module driving the external crawl tool
//!
//! This module contains the core sweep logic, including:
//! - Launching the crawl tool and capturing its exit status
//! - Reading attempt outcomes from output folders and logs
//! - The per-site retry state machine
//! - Bounded dispatch of site jobs and overall run coordination

mod controller;
mod coordinator;
mod detector;
mod invoker;
mod pool;

pub use controller::{JobReport, RetryController, StageReport, StageResult};
pub use coordinator::{
    prepare_base_dir, run_dataset, run_single_site, run_survey_list, survey_jobs, Coordinator,
    RunResult,
};
pub use detector::{attempt_succeeded, inspect, AttemptEvidence, SENTINEL};
pub use invoker::{CommandInvoker, CrawlInvoker, CrawlRequest, InvocationRecord};
pub use pool::{PoolOutcome, WorkerPool};
