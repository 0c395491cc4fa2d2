/// Controller state definitions for a site job
///
/// A job moves through the probing stages into control replication and ends
/// in exactly one terminal [`JobOutcome`].
use crate::state::Stage;
use std::fmt;

/// Why a job ended without its success target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbandonReason {
    /// The no-rules probe never produced a matching artifact
    BlankProbeExhausted,

    /// The rule-specific crawl never produced an artifact plus sentinel
    RuleSpecificExhausted,

    /// No survey variant produced a matching artifact
    NoSurveySignal,

    /// The control stage stopped short of its target
    ControlShortfall { folders: u32 },

    /// The crawl tool left no output folder behind, or could not be launched
    Environment { stage: Stage, detail: String },
}

impl AbandonReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BlankProbeExhausted => "blank_probe_exhausted",
            Self::RuleSpecificExhausted => "rule_specific_exhausted",
            Self::NoSurveySignal => "no_survey_signal",
            Self::ControlShortfall { .. } => "control_shortfall",
            Self::Environment { .. } => "environment_failure",
        }
    }
}

impl fmt::Display for AbandonReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ControlShortfall { folders } => {
                write!(f, "{} ({} control folders)", self.as_str(), folders)
            }
            Self::Environment { stage, detail } => {
                write!(f, "{} during {} stage: {}", self.as_str(), stage, detail)
            }
            _ => write!(f, "{}", self.as_str()),
        }
    }
}

/// Terminal result of a job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// The control target was reached
    Success { control_folders: u32 },

    /// The job was given up
    Abandoned(AbandonReason),
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

impl fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success { control_folders } => {
                write!(f, "success ({} control folders)", control_folders)
            }
            Self::Abandoned(reason) => write!(f, "abandoned: {}", reason),
        }
    }
}

/// Represents where a job is in the retry controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerState {
    /// Job accepted, no stage chosen yet
    Idle,

    /// Probing a site that has no rules
    BlankProbe,

    /// Crawling with the site's rules applied
    RuleSpecific,

    /// Sweeping the survey variants
    Survey,

    /// Gathering replicate control folders
    ControlReplicate,

    /// Finished
    Done(JobOutcome),
}

impl ControllerState {
    /// Returns true if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done(_))
    }

    /// Returns true if moving from `self` to `next` is a legal step
    pub fn can_transition_to(&self, next: &ControllerState) -> bool {
        use ControllerState::*;
        matches!(
            (self, next),
            (Idle, BlankProbe)
                | (Idle, RuleSpecific)
                | (Idle, Survey)
                | (BlankProbe, ControlReplicate)
                | (BlankProbe, Done(_))
                | (RuleSpecific, ControlReplicate)
                | (RuleSpecific, Done(_))
                | (Survey, ControlReplicate)
                | (Survey, Done(_))
                | (ControlReplicate, Done(_))
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::BlankProbe => "blank_probe",
            Self::RuleSpecific => "rule_specific",
            Self::Survey => "survey",
            Self::ControlReplicate => "control_replicate",
            Self::Done(_) => "done",
        }
    }
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Done(outcome) => write!(f, "done ({})", outcome),
            other => write!(f, "{}", other.as_str()),
        }
    }
}
