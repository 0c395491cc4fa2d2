use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for Deco-Sweep
///
/// Every section is optional; a missing file or section falls back to the
/// reference values the harness was tuned with.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub retry: RetryConfig,
    pub pacing: PacingConfig,
    pub pool: PoolConfig,
    pub targets: TargetConfig,
}

/// How to launch the external crawl tool
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Executable to run
    pub program: String,

    /// Arguments placed before the per-attempt flags
    pub args: Vec<String>,

    /// Directory the tool is launched from (defaults to the current one)
    #[serde(rename = "working-dir")]
    pub working_dir: Option<PathBuf>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            program: "npm".to_string(),
            args: vec!["run".to_string(), "crawl".to_string(), "--".to_string()],
            working_dir: None,
        }
    }
}

/// Per-stage attempt budgets
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Attempts for the no-rules probe of a site
    #[serde(rename = "blank-attempts")]
    pub blank_attempts: u32,

    /// Attempts for the rule-specific crawl
    #[serde(rename = "specific-attempts")]
    pub specific_attempts: u32,

    /// Number of successful control folders wanted per site
    #[serde(rename = "control-target")]
    pub control_target: u32,

    /// Attempt ceiling for the control stage
    #[serde(rename = "control-attempts")]
    pub control_attempts: u32,

    /// Consecutive failed attempts after which a stage gives up
    #[serde(rename = "max-consecutive-failures")]
    pub max_consecutive_failures: u32,

    /// Attempts per variant during a survey sweep
    #[serde(rename = "survey-attempts")]
    pub survey_attempts: u32,

    /// Attempt ceiling for the control stage of a survey sweep
    #[serde(rename = "survey-control-attempts")]
    pub survey_control_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            blank_attempts: 1,
            specific_attempts: 1,
            control_target: 5,
            control_attempts: 12,
            max_consecutive_failures: 5,
            survey_attempts: 2,
            survey_control_attempts: 25,
        }
    }
}

/// Courtesy pauses between crawls (milliseconds)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    /// Pause before every rule-specific invocation
    #[serde(rename = "before-specific-ms")]
    pub before_specific_ms: u64,

    /// Pause after a site is finished
    #[serde(rename = "after-job-ms")]
    pub after_job_ms: u64,
}

impl PacingConfig {
    pub fn before_specific(&self) -> Duration {
        Duration::from_millis(self.before_specific_ms)
    }

    pub fn after_job(&self) -> Duration {
        Duration::from_millis(self.after_job_ms)
    }

    /// Pacing with every pause disabled
    pub fn none() -> Self {
        Self {
            before_specific_ms: 0,
            after_job_ms: 0,
        }
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            before_specific_ms: 20_000,
            after_job_ms: 2_000,
        }
    }
}

/// Worker pool sizing
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Number of sites processed at once
    pub parallelism: u32,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self { parallelism: 1 }
    }
}

/// Site lists used by the survey targets
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Site list for `--target test`
    pub test: PathBuf,

    /// Site list for `--target all`
    pub all: PathBuf,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            test: PathBuf::from("test_crawl/output_1.csv"),
            all: PathBuf::from("to_crawl/to-crawl_10k.csv"),
        }
    }
}
