//! Attempt outcome detection
//!
//! An attempt succeeded when its output folder holds a file whose name
//! contains the site's registrable domain. Rule-specific attempts also need
//! the crawl tool's unblocked-run marker somewhere in the site log. Checks
//! only read the filesystem, so they double as resume checks before an
//! attempt is spent.

use crate::crawler::invoker::InvocationRecord;
use crate::state::Stage;
use std::io::ErrorKind;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Marker line the crawl tool prints after an unblocked run
pub const SENTINEL: &str = "---------------------------------------------------";

/// Bytes of the log read per scan step
const SCAN_CHUNK: usize = 8 * 1024;

/// What the filesystem says about one attempt
#[derive(Debug, Clone, Default)]
pub struct AttemptEvidence {
    /// The output folder exists
    pub folder_present: bool,

    /// First file name in the folder containing the domain
    pub artifact: Option<String>,

    /// The log contains the sentinel (only read for stages that need it)
    pub sentinel: bool,

    /// Subprocess details, when an invocation produced this evidence
    pub invocation: Option<InvocationRecord>,
}

impl AttemptEvidence {
    /// Applies the success rule for `stage`
    pub fn succeeded(&self, stage: Stage) -> bool {
        self.artifact.is_some() && (!stage.requires_sentinel() || self.sentinel)
    }

    /// Attaches subprocess details as secondary evidence
    ///
    /// Artifacts stay authoritative; a disagreement with the exit status is
    /// only logged.
    pub fn with_invocation(mut self, stage: Stage, record: InvocationRecord) -> Self {
        let clean = record.exited_cleanly();
        let succeeded = self.succeeded(stage);
        if clean != succeeded {
            tracing::debug!(
                "{} attempt classified {} but crawler exited with {:?}",
                stage,
                if succeeded { "successful" } else { "failed" },
                record.exit_code
            );
        }
        self.invocation = Some(record);
        self
    }
}

/// Gathers evidence for an attempt without changing anything on disk
pub async fn inspect(
    stage: Stage,
    domain: &str,
    output_folder: &Path,
    log_path: &Path,
) -> AttemptEvidence {
    let (folder_present, artifact) = find_artifact(domain, output_folder).await;

    let sentinel = if stage.requires_sentinel() {
        log_contains_sentinel(log_path).await
    } else {
        false
    };

    let evidence = AttemptEvidence {
        folder_present,
        artifact,
        sentinel,
        invocation: None,
    };

    tracing::trace!(
        "{} {} evidence in {}: folder={} artifact={:?} sentinel={}",
        domain,
        stage,
        output_folder.display(),
        evidence.folder_present,
        evidence.artifact,
        evidence.sentinel
    );

    evidence
}

/// Returns true if the attempt recorded in `output_folder` counts as a success
///
/// # Examples
///
/// ```no_run
/// use deco_sweep::crawler::attempt_succeeded;
/// use deco_sweep::state::Stage;
/// use std::path::Path;
///
/// # async fn example() {
/// let done = attempt_succeeded(
///     Stage::Control,
///     "example.com",
///     Path::new("runs/example.com/control-data-0"),
///     Path::new("runs/example.com/example.com-log"),
/// )
/// .await;
/// # }
/// ```
pub async fn attempt_succeeded(
    stage: Stage,
    domain: &str,
    output_folder: &Path,
    log_path: &Path,
) -> bool {
    inspect(stage, domain, output_folder, log_path)
        .await
        .succeeded(stage)
}

/// Looks for a file named after the domain; a missing folder is not an error
async fn find_artifact(domain: &str, folder: &Path) -> (bool, Option<String>) {
    let mut entries = match tokio::fs::read_dir(folder).await {
        Ok(entries) => entries,
        Err(e) => {
            if e.kind() != ErrorKind::NotFound {
                tracing::debug!("Cannot list {}: {}", folder.display(), e);
            }
            return (false, None);
        }
    };

    loop {
        match entries.next_entry().await {
            Ok(Some(entry)) => {
                let name = entry.file_name().to_string_lossy().into_owned();
                if name.contains(domain) {
                    return (true, Some(name));
                }
            }
            Ok(None) => return (true, None),
            Err(e) => {
                tracing::debug!("Error while listing {}: {}", folder.display(), e);
                return (true, None);
            }
        }
    }
}

/// Scans the log for the sentinel in fixed-size chunks; a missing log has none
///
/// The last `SENTINEL.len() - 1` bytes of each chunk are carried over so a
/// marker split across a chunk boundary is still found.
async fn log_contains_sentinel(log_path: &Path) -> bool {
    let file = match tokio::fs::File::open(log_path).await {
        Ok(file) => file,
        Err(_) => return false,
    };

    let needle = SENTINEL.as_bytes();
    let overlap = needle.len() - 1;
    let mut reader = BufReader::with_capacity(SCAN_CHUNK, file);
    let mut window: Vec<u8> = Vec::with_capacity(SCAN_CHUNK + overlap);

    loop {
        let chunk = match reader.fill_buf().await {
            Ok(chunk) => chunk,
            Err(e) => {
                tracing::debug!("Error while reading {}: {}", log_path.display(), e);
                return false;
            }
        };
        if chunk.is_empty() {
            return false;
        }

        window.extend_from_slice(chunk);
        let read = chunk.len();
        reader.consume(read);

        if window.windows(needle.len()).any(|w| w == needle) {
            return true;
        }

        let keep_from = window.len().saturating_sub(overlap);
        window.drain(..keep_from);
    }
}
