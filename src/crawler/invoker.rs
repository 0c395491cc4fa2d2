//! Launching the external crawl tool
//!
//! Each attempt is one subprocess run:
//!
//! ```text
//! <program> <args...> -u <site> -o <output dir> -v -f -q <variant> [-s <rules>]
//! ```
//!
//! with stdout and stderr appended to the site log. The exit status is kept
//! as secondary evidence only; success is read from the output folder and
//! the log.

use crate::config::CrawlerConfig;
use crate::state::CrawlVariant;
use crate::SweepError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;

/// One crawl attempt to run
#[derive(Debug, Clone)]
pub struct CrawlRequest {
    /// Site handed to the tool verbatim
    pub site: String,

    /// Registrable domain of the site
    pub domain: String,

    pub variant: CrawlVariant,

    /// Comma joined rule string, only for the specific variant
    pub rules: Option<String>,

    /// Folder the tool writes its output into
    pub output_dir: PathBuf,

    /// Log receiving the tool's stdout and stderr
    pub log_path: PathBuf,

    /// 1-based attempt number within the stage
    pub attempt: u32,
}

impl CrawlRequest {
    /// The per-attempt flags appended after the configured arguments
    pub fn arguments(&self) -> Vec<String> {
        let mut args = vec![
            "-u".to_string(),
            self.site.clone(),
            "-o".to_string(),
            self.output_dir.to_string_lossy().into_owned(),
            "-v".to_string(),
            "-f".to_string(),
            "-q".to_string(),
            self.variant.as_arg().to_string(),
        ];

        if let Some(rules) = &self.rules {
            args.push("-s".to_string());
            args.push(rules.clone());
        }

        args
    }
}

/// What the subprocess did, independent of what it produced
#[derive(Debug, Clone)]
pub struct InvocationRecord {
    pub started_at: DateTime<Utc>,
    pub duration: Duration,

    /// Exit code, or None when the process was killed by a signal
    pub exit_code: Option<i32>,
}

impl InvocationRecord {
    pub fn exited_cleanly(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs crawl attempts
///
/// The controller only talks to this trait, so tests can stand in a
/// scripted crawler for the real subprocess.
#[async_trait]
pub trait CrawlInvoker: Send + Sync {
    /// Runs one attempt to completion
    ///
    /// An `Err` means the tool could not be run at all.
    async fn invoke(&self, request: &CrawlRequest) -> Result<InvocationRecord, SweepError>;
}

/// Runs the crawl tool as a subprocess
#[derive(Debug, Clone)]
pub struct CommandInvoker {
    program: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
}

impl CommandInvoker {
    pub fn new(config: &CrawlerConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            working_dir: config.working_dir.clone(),
        }
    }

    /// Renders the full command line for logging
    pub fn command_line(&self, request: &CrawlRequest) -> String {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().cloned())
            .chain(request.arguments())
            .collect::<Vec<_>>()
            .join(" ")
    }

    async fn open_log(&self, request: &CrawlRequest) -> Result<(Stdio, Stdio), SweepError> {
        let log = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&request.log_path)
            .await?
            .into_std()
            .await;
        let stderr = log.try_clone()?;
        Ok((Stdio::from(log), Stdio::from(stderr)))
    }
}

#[async_trait]
impl CrawlInvoker for CommandInvoker {
    async fn invoke(&self, request: &CrawlRequest) -> Result<InvocationRecord, SweepError> {
        let (stdout, stderr) = self.open_log(request).await?;

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .args(request.arguments())
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr);

        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        tracing::debug!("Running: {}", self.command_line(request));

        let started_at = Utc::now();
        let started = Instant::now();
        let status = command.status().await.map_err(|source| SweepError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        let record = InvocationRecord {
            started_at,
            duration: started.elapsed(),
            exit_code: status.code(),
        };

        tracing::debug!(
            "{} {} attempt {} exited with {:?} after {:.1}s",
            request.domain,
            request.variant,
            request.attempt,
            record.exit_code,
            record.duration.as_secs_f64()
        );

        Ok(record)
    }
}
