//! Retry controller - per-site crawl state machine
//!
//! A job walks through these states:
//!
//! ```text
//! Idle -> BlankProbe -----\
//!      -> RuleSpecific ----+-> ControlReplicate -> Done(Success | Abandoned)
//!      -> Survey ---------/
//! ```
//!
//! Every stage first checks whether its output already exists, so a job
//! that is run again resumes from what earlier runs left on disk. All paths
//! are explicit; the process working directory is never touched.

use crate::config::{PacingConfig, RetryConfig};
use crate::crawler::detector::{attempt_succeeded, inspect};
use crate::crawler::invoker::{CrawlInvoker, CrawlRequest};
use crate::jobs::{control_folder, survey_folder, SiteJob, SPECIFIC_FOLDER};
use crate::output::{ErrorLedger, ErrorRecord};
use crate::state::{AbandonReason, ControllerState, CrawlVariant, JobOutcome, RetryBudget, Stage};
use crate::SweepError;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// How a stage loop ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageResult {
    /// The stage reached its success target
    Succeeded,
    /// Every allowed attempt was spent
    Exhausted,
    /// Too many attempts failed in a row
    CircuitBroken,
    /// The crawl tool could not be run or left no output folder
    Environment(String),
}

/// Accounting for one stage of a job
#[derive(Debug, Clone)]
pub struct StageReport {
    pub stage: Stage,
    pub result: StageResult,
    pub budget: RetryBudget,

    /// Crawl tool runs actually started
    pub invocations: u32,

    /// Successes that were already on disk
    pub resumed: u32,

    /// Folders holding successful output
    pub folders: Vec<PathBuf>,
}

impl StageReport {
    fn new(stage: Stage, max_attempts: u32) -> Self {
        Self {
            stage,
            result: StageResult::Exhausted,
            budget: RetryBudget::new(max_attempts),
            invocations: 0,
            resumed: 0,
            folders: Vec::new(),
        }
    }

    fn succeed(&mut self, folder: PathBuf) {
        self.budget.record_success();
        self.folders.push(folder);
    }
}

/// Everything that happened to one job
#[derive(Debug, Clone)]
pub struct JobReport {
    pub site: String,
    pub domain: String,
    pub outcome: JobOutcome,

    /// States entered after `Idle`, in order
    pub path: Vec<ControllerState>,

    pub stages: Vec<StageReport>,
}

impl JobReport {
    fn new(job: &SiteJob) -> Self {
        Self {
            site: job.site().to_string(),
            domain: job.domain().to_string(),
            outcome: JobOutcome::Abandoned(AbandonReason::Environment {
                stage: Stage::Blank,
                detail: "job did not run".to_string(),
            }),
            path: Vec::new(),
            stages: Vec::new(),
        }
    }

    /// Crawl tool runs across every stage
    pub fn invocations(&self) -> u32 {
        self.stages.iter().map(|s| s.invocations).sum()
    }

    pub fn stage(&self, stage: Stage) -> Option<&StageReport> {
        self.stages.iter().find(|s| s.stage == stage)
    }

    /// Returns true if the job entered `state` at some point
    pub fn visited(&self, state: &ControllerState) -> bool {
        self.path.iter().any(|s| s == state)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunMode {
    Rules,
    Survey,
}

/// Drives a single site job to a terminal state
pub struct RetryController {
    invoker: Arc<dyn CrawlInvoker>,
    retry: RetryConfig,
    pacing: PacingConfig,
    ledger: Arc<ErrorLedger>,
}

impl RetryController {
    pub fn new(
        invoker: Arc<dyn CrawlInvoker>,
        retry: RetryConfig,
        pacing: PacingConfig,
        ledger: Arc<ErrorLedger>,
    ) -> Self {
        Self {
            invoker,
            retry,
            pacing,
            ledger,
        }
    }

    pub fn ledger(&self) -> &ErrorLedger {
        &self.ledger
    }

    /// Runs the rule-driven flow: blank probe or rule-specific crawl, then controls
    ///
    /// # Returns
    ///
    /// * `Ok(JobReport)` - The job reached a terminal state (success or abandoned)
    /// * `Err(SweepError)` - The working directory or the ledger could not be written
    pub async fn run(&self, job: &SiteJob) -> Result<JobReport, SweepError> {
        self.run_mode(job, RunMode::Rules).await
    }

    /// Runs the survey flow: every survey variant, then controls
    pub async fn run_survey(&self, job: &SiteJob) -> Result<JobReport, SweepError> {
        self.run_mode(job, RunMode::Survey).await
    }

    async fn run_mode(&self, job: &SiteJob, mode: RunMode) -> Result<JobReport, SweepError> {
        let result = self.drive(job, mode).await;

        match &result {
            Ok(report) => tracing::info!("{} - finished: {}", job.domain(), report.outcome),
            Err(e) => tracing::error!("{} - job failed: {}", job.domain(), e),
        }

        pause(self.pacing.after_job()).await;
        result
    }

    async fn drive(&self, job: &SiteJob, mode: RunMode) -> Result<JobReport, SweepError> {
        job.ensure_work_dir().await?;

        let mut report = JobReport::new(job);
        let mut state = ControllerState::Idle;

        while !state.is_terminal() {
            let next = self.step(&state, job, mode, &mut report).await?;

            if !state.can_transition_to(&next) {
                return Err(SweepError::InvalidTransition {
                    from: state,
                    to: next,
                });
            }

            tracing::debug!("{} - {} -> {}", job.domain(), state, next);
            report.path.push(next.clone());
            state = next;
        }

        if let ControllerState::Done(outcome) = state {
            report.outcome = outcome;
        }

        Ok(report)
    }

    async fn step(
        &self,
        state: &ControllerState,
        job: &SiteJob,
        mode: RunMode,
        report: &mut JobReport,
    ) -> Result<ControllerState, SweepError> {
        let next = match state {
            ControllerState::Idle => match mode {
                RunMode::Survey => ControllerState::Survey,
                RunMode::Rules if job.rules().is_blank() => ControllerState::BlankProbe,
                RunMode::Rules => ControllerState::RuleSpecific,
            },

            ControllerState::BlankProbe => {
                let stage = self
                    .probe(
                        job,
                        Stage::Blank,
                        SPECIFIC_FOLDER,
                        self.retry.blank_attempts,
                        None,
                        Duration::ZERO,
                    )
                    .await;
                let result = stage.result.clone();
                report.stages.push(stage);

                match result {
                    StageResult::Succeeded => ControllerState::ControlReplicate,
                    StageResult::Environment(detail) => abandon(AbandonReason::Environment {
                        stage: Stage::Blank,
                        detail,
                    }),
                    _ => abandon(AbandonReason::BlankProbeExhausted),
                }
            }

            ControllerState::RuleSpecific => {
                let rules = job.rules().joined();
                let stage = self
                    .probe(
                        job,
                        Stage::Specific,
                        SPECIFIC_FOLDER,
                        self.retry.specific_attempts,
                        Some(rules),
                        self.pacing.before_specific(),
                    )
                    .await;
                let result = stage.result.clone();
                report.stages.push(stage);

                if result == StageResult::Succeeded {
                    ControllerState::ControlReplicate
                } else {
                    self.ledger
                        .append(&ErrorRecord {
                            site: job.site().to_string(),
                            folder: job.folder(SPECIFIC_FOLDER),
                        })
                        .await?;

                    match result {
                        StageResult::Environment(detail) => {
                            abandon(AbandonReason::Environment {
                                stage: Stage::Specific,
                                detail,
                            })
                        }
                        _ => abandon(AbandonReason::RuleSpecificExhausted),
                    }
                }
            }

            ControllerState::Survey => {
                let mut signal = false;

                for variant in CrawlVariant::survey_variants() {
                    let stage = self
                        .probe(
                            job,
                            Stage::Survey(variant),
                            &survey_folder(variant),
                            self.retry.survey_attempts,
                            None,
                            Duration::ZERO,
                        )
                        .await;
                    let result = stage.result.clone();
                    report.stages.push(stage);

                    match result {
                        StageResult::Succeeded => signal = true,
                        StageResult::Environment(detail) => {
                            return Ok(abandon(AbandonReason::Environment {
                                stage: Stage::Survey(variant),
                                detail,
                            }));
                        }
                        _ => {}
                    }
                }

                if signal {
                    ControllerState::ControlReplicate
                } else {
                    abandon(AbandonReason::NoSurveySignal)
                }
            }

            ControllerState::ControlReplicate => {
                let max_attempts = match mode {
                    RunMode::Rules => self.retry.control_attempts,
                    RunMode::Survey => self.retry.survey_control_attempts,
                };
                let stage = self.replicate(job, max_attempts).await;
                let result = stage.result.clone();
                let folders = stage.budget.successes();
                report.stages.push(stage);

                match result {
                    StageResult::Succeeded => ControllerState::Done(JobOutcome::Success {
                        control_folders: folders,
                    }),
                    StageResult::Environment(detail) => abandon(AbandonReason::Environment {
                        stage: Stage::Control,
                        detail,
                    }),
                    _ => abandon(AbandonReason::ControlShortfall { folders }),
                }
            }

            ControllerState::Done(_) => state.clone(),
        };

        Ok(next)
    }

    /// Single-folder stage: succeed once into `folder_name` within the budget
    async fn probe(
        &self,
        job: &SiteJob,
        stage: Stage,
        folder_name: &str,
        max_attempts: u32,
        rules: Option<String>,
        before_attempt: Duration,
    ) -> StageReport {
        let folder = job.folder(folder_name);
        let log_path = job.log_path();
        let mut report = StageReport::new(stage, max_attempts);

        if attempt_succeeded(stage, job.domain(), &folder, &log_path).await {
            tracing::info!(
                "{} - found pre-existing {} output in {}",
                job.domain(),
                stage,
                folder.display()
            );
            report.resumed += 1;
            report.succeed(folder);
            report.result = StageResult::Succeeded;
            return report;
        }

        while !report.budget.is_tripped(self.retry.max_consecutive_failures)
            && report.budget.begin_attempt()
        {
            let attempt = report.budget.attempts();
            tracing::info!(
                "{} - {} attempt {} / {} - on folder {}",
                job.domain(),
                stage,
                attempt,
                max_attempts,
                folder_name
            );

            pause(before_attempt).await;

            let request = CrawlRequest {
                site: job.site().to_string(),
                domain: job.domain().to_string(),
                variant: stage.variant(),
                rules: rules.clone(),
                output_dir: folder.clone(),
                log_path: log_path.clone(),
                attempt,
            };

            let record = match self.invoker.invoke(&request).await {
                Ok(record) => {
                    report.invocations += 1;
                    record
                }
                Err(e) => {
                    tracing::warn!("{} - {} crawl could not run: {}", job.domain(), stage, e);
                    report.result = StageResult::Environment(e.to_string());
                    return report;
                }
            };

            let evidence = inspect(stage, job.domain(), &folder, &log_path)
                .await
                .with_invocation(stage, record);

            if !evidence.folder_present {
                tracing::warn!(
                    "{} - {} crawl left no output folder at {}",
                    job.domain(),
                    stage,
                    folder.display()
                );
                report.result = StageResult::Environment(format!(
                    "output folder {} missing after crawl",
                    folder.display()
                ));
                return report;
            }

            if evidence.succeeded(stage) {
                report.succeed(folder);
                report.result = StageResult::Succeeded;
                return report;
            }

            report.budget.record_failure();
        }

        report.result = if report.budget.is_tripped(self.retry.max_consecutive_failures) {
            StageResult::CircuitBroken
        } else {
            StageResult::Exhausted
        };

        tracing::warn!(
            "{} - {} stage gave up after {} attempts",
            job.domain(),
            stage,
            report.budget.attempts()
        );
        report
    }

    /// Control stage: fill `control-data-0..target` within the budget
    ///
    /// Each loop iteration counts as an attempt, including one that finds its
    /// folder already complete.
    async fn replicate(&self, job: &SiteJob, max_attempts: u32) -> StageReport {
        let stage = Stage::Control;
        let target = self.retry.control_target;
        let breaker = self.retry.max_consecutive_failures;
        let log_path = job.log_path();
        let mut report = StageReport::new(stage, max_attempts);

        while report.budget.successes() < target {
            if report.budget.is_tripped(breaker) {
                tracing::warn!(
                    "{} - {} control attempts failed in a row, stopping with {} / {} folders",
                    job.domain(),
                    breaker,
                    report.budget.successes(),
                    target
                );
                report.result = StageResult::CircuitBroken;
                return report;
            }

            if !report.budget.begin_attempt() {
                break;
            }

            let index = report.budget.successes();
            let folder_name = control_folder(index);
            let folder = job.folder(&folder_name);

            tracing::info!(
                "{} - control attempt {} / {} - on folder {}",
                job.domain(),
                report.budget.attempts(),
                max_attempts,
                index
            );

            if attempt_succeeded(stage, job.domain(), &folder, &log_path).await {
                tracing::info!("{} - found pre-existing {}", job.domain(), folder_name);
                report.resumed += 1;
                report.succeed(folder);
                continue;
            }

            let request = CrawlRequest {
                site: job.site().to_string(),
                domain: job.domain().to_string(),
                variant: stage.variant(),
                rules: None,
                output_dir: folder.clone(),
                log_path: log_path.clone(),
                attempt: report.budget.attempts(),
            };

            let record = match self.invoker.invoke(&request).await {
                Ok(record) => {
                    report.invocations += 1;
                    record
                }
                Err(e) => {
                    tracing::warn!("{} - control crawl could not run: {}", job.domain(), e);
                    report.result = StageResult::Environment(e.to_string());
                    return report;
                }
            };

            let evidence = inspect(stage, job.domain(), &folder, &log_path)
                .await
                .with_invocation(stage, record);

            if !evidence.folder_present {
                tracing::warn!(
                    "{} - control crawl left no output folder at {}",
                    job.domain(),
                    folder.display()
                );
                report.result = StageResult::Environment(format!(
                    "output folder {} missing after crawl",
                    folder.display()
                ));
                return report;
            }

            if evidence.succeeded(stage) {
                report.succeed(folder);
            } else {
                report.budget.record_failure();
            }
        }

        report.result = if report.budget.successes() >= target {
            StageResult::Succeeded
        } else {
            StageResult::Exhausted
        };
        report
    }
}

fn abandon(reason: AbandonReason) -> ControllerState {
    ControllerState::Done(JobOutcome::Abandoned(reason))
}

async fn pause(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}
