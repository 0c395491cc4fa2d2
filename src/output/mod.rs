//! Output module for run records and summaries
//!
//! This module handles:
//! - The append-only error ledger of failed rule-specific crawls
//! - Aggregating and printing run statistics

mod ledger;
pub mod stats;

pub use ledger::{ErrorLedger, ErrorRecord, LEDGER_FILE_NAME};
pub use stats::{print_summary, RunSummary};
