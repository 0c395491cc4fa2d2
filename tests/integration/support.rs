//! Shared fixtures: a scripted crawl invoker and on-disk layout helpers

use async_trait::async_trait;
use deco_sweep::config::{PacingConfig, RetryConfig};
use deco_sweep::crawler::{CrawlInvoker, CrawlRequest, InvocationRecord, RetryController, SENTINEL};
use deco_sweep::output::ErrorLedger;
use deco_sweep::state::CrawlVariant;
use deco_sweep::SweepError;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What the fake crawl tool leaves behind for one invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Output folder with a domain-matching artifact
    Artifact,
    /// Artifact plus the sentinel line in the log
    ArtifactAndSentinel,
    /// Sentinel in the log, output folder present but empty
    SentinelOnly,
    /// Output folder present but empty
    EmptyFolder,
    /// No output folder at all
    Nothing,
}

type Script = dyn Fn(&CrawlRequest) -> Effect + Send + Sync;

/// Crawl invoker whose behavior is decided per request
pub struct ScriptedInvoker {
    script: Box<Script>,
    requests: Mutex<Vec<CrawlRequest>>,
}

impl ScriptedInvoker {
    pub fn new(script: impl Fn(&CrawlRequest) -> Effect + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            script: Box::new(script),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Same effect for every request
    pub fn always(effect: Effect) -> Arc<Self> {
        Self::new(move |_| effect)
    }

    /// `specific` for rule-specific requests, `other` for everything else
    pub fn by_variant(specific: Effect, other: Effect) -> Arc<Self> {
        Self::new(move |request| {
            if request.variant == CrawlVariant::Specific {
                specific
            } else {
                other
            }
        })
    }

    pub fn requests(&self) -> Vec<CrawlRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl CrawlInvoker for ScriptedInvoker {
    async fn invoke(&self, request: &CrawlRequest) -> Result<InvocationRecord, SweepError> {
        self.requests.lock().unwrap().push(request.clone());

        let effect = (self.script)(request);
        match effect {
            Effect::Nothing => {}
            Effect::EmptyFolder | Effect::SentinelOnly => {
                std::fs::create_dir_all(&request.output_dir)?;
            }
            Effect::Artifact | Effect::ArtifactAndSentinel => {
                write_artifact(&request.output_dir, &request.domain);
            }
        }

        if matches!(effect, Effect::ArtifactAndSentinel | Effect::SentinelOnly) {
            append_log(&request.log_path, &format!("{}\n", SENTINEL));
        } else {
            append_log(&request.log_path, "crawl finished\n");
        }

        Ok(InvocationRecord {
            started_at: chrono::Utc::now(),
            duration: Duration::from_millis(1),
            exit_code: Some(0),
        })
    }
}

/// Writes a folder holding one artifact named after the domain
pub fn write_artifact(folder: &Path, domain: &str) {
    std::fs::create_dir_all(folder).unwrap();
    std::fs::write(folder.join(format!("{}_links.json", domain)), "[]").unwrap();
}

pub fn append_log(log_path: &Path, text: &str) {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .unwrap();
    file.write_all(text.as_bytes()).unwrap();
}

/// Controller with reference budgets and no courtesy pauses
pub fn controller(invoker: Arc<dyn CrawlInvoker>, base: &Path) -> RetryController {
    RetryController::new(
        invoker,
        RetryConfig::default(),
        PacingConfig::none(),
        Arc::new(ErrorLedger::in_base_dir(base)),
    )
}

/// Lines currently in the base directory's error ledger
pub fn ledger_lines(base: &Path) -> Vec<String> {
    match std::fs::read_to_string(base.join(deco_sweep::output::LEDGER_FILE_NAME)) {
        Ok(text) => text.lines().map(str::to_string).collect(),
        Err(_) => Vec::new(),
    }
}
