//! Append-only record of sites whose rule-specific crawl could not be obtained

use crate::SweepError;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// File name of the ledger inside the base directory
pub const LEDGER_FILE_NAME: &str = "specific-crawl-errors.txt";

/// One irrecoverable rule-specific failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorRecord {
    pub site: String,
    pub folder: PathBuf,
}

impl ErrorRecord {
    /// Tab separated line, newline included
    pub fn to_line(&self) -> String {
        format!("{}\t{}\n", self.site, self.folder.display())
    }

    /// Parses a line written by [`ErrorRecord::to_line`]
    pub fn from_line(line: &str) -> Option<Self> {
        let (site, folder) = line.trim_end_matches('\n').split_once('\t')?;
        Some(Self {
            site: site.to_string(),
            folder: PathBuf::from(folder),
        })
    }
}

/// Shared handle to the ledger file
///
/// Appends go through one async mutex so lines from concurrent workers never
/// interleave, and each line is written with a single call.
#[derive(Debug)]
pub struct ErrorLedger {
    path: PathBuf,
    lock: Mutex<()>,
    appended: AtomicU64,
}

impl ErrorLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
            appended: AtomicU64::new(0),
        }
    }

    /// Ledger at its usual place in a run's base directory
    pub fn in_base_dir(base_dir: &Path) -> Self {
        Self::new(base_dir.join(LEDGER_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lines appended through this handle
    pub fn appended(&self) -> u64 {
        self.appended.load(Ordering::Relaxed)
    }

    pub async fn append(&self, record: &ErrorRecord) -> Result<(), SweepError> {
        let _guard = self.lock.lock().await;

        let ledger_error = |source: std::io::Error| SweepError::Ledger {
            path: self.path.clone(),
            source,
        };

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(ledger_error)?;
        file.write_all(record.to_line().as_bytes())
            .await
            .map_err(ledger_error)?;
        file.flush().await.map_err(ledger_error)?;

        self.appended.fetch_add(1, Ordering::Relaxed);
        tracing::warn!(
            "Recorded specific crawl failure for {} in {}",
            record.site,
            self.path.display()
        );
        Ok(())
    }

    /// Reads back every record; a ledger that was never written is empty
    pub async fn read_records(&self) -> Result<Vec<ErrorRecord>, SweepError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => Ok(content.lines().filter_map(ErrorRecord::from_line).collect()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }
}
