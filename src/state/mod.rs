//! State module for tracking job progress
//!
//! # Components
//!
//! - `Stage` / `CrawlVariant`: what an attempt is for and how the tool runs it
//! - `ControllerState`: where a job is in the retry controller
//! - `JobOutcome` / `AbandonReason`: how a job ended
//! - `RetryBudget`: per-stage attempt, success and failure-streak counters

mod budget;
mod job_state;
mod stage;

pub use budget::RetryBudget;
pub use job_state::{AbandonReason, ControllerState, JobOutcome};
pub use stage::{CrawlVariant, Stage};
