//! Retry controller behavior against a scripted crawl tool

use crate::support::{
    append_log, controller, ledger_lines, write_artifact, Effect, ScriptedInvoker,
};
use deco_sweep::crawler::{StageResult, SENTINEL};
use deco_sweep::jobs::{control_folder, RuleSet, SiteJob, SPECIFIC_FOLDER};
use deco_sweep::state::{AbandonReason, ControllerState, CrawlVariant, JobOutcome, Stage};
use std::path::Path;

const SITE: &str = "https://example.com";
const DOMAIN: &str = "example.com";

fn job(rules: &[&str], base: &Path) -> SiteJob {
    let rules: RuleSet = rules.iter().map(|r| r.to_string()).collect();
    SiteJob::new(SITE, rules, base).expect("Failed to create job")
}

#[tokio::test]
async fn test_blank_rules_never_run_rule_specific() {
    let base = tempfile::tempdir().unwrap();
    let invoker = ScriptedInvoker::always(Effect::Artifact);
    let job = job(&[""], base.path());

    let report = controller(invoker.clone(), base.path())
        .run(&job)
        .await
        .expect("Job failed");

    assert!(report.outcome.is_success());
    assert!(report.visited(&ControllerState::BlankProbe));
    assert!(!report.visited(&ControllerState::RuleSpecific));

    // Nothing was ever crawled with rules
    let requests = invoker.requests();
    assert!(requests
        .iter()
        .all(|r| r.variant != CrawlVariant::Specific && r.rules.is_none()));
    assert!(requests[0].output_dir.ends_with(SPECIFIC_FOLDER));
}

#[tokio::test]
async fn test_blank_probe_exhaustion_abandons_without_ledger() {
    let base = tempfile::tempdir().unwrap();
    let invoker = ScriptedInvoker::always(Effect::EmptyFolder);
    let job = job(&[""], base.path());

    let report = controller(invoker.clone(), base.path())
        .run(&job)
        .await
        .expect("Job failed");

    assert_eq!(
        report.outcome,
        JobOutcome::Abandoned(AbandonReason::BlankProbeExhausted)
    );
    assert_eq!(invoker.count(), 1);
    assert!(ledger_lines(base.path()).is_empty());
}

#[tokio::test]
async fn test_empty_marker_is_stripped_from_real_rules() {
    let base = tempfile::tempdir().unwrap();
    let invoker = ScriptedInvoker::by_variant(Effect::ArtifactAndSentinel, Effect::Artifact);
    let job = job(&["", "utm_source||example.com"], base.path());

    let report = controller(invoker.clone(), base.path())
        .run(&job)
        .await
        .expect("Job failed");

    assert!(report.visited(&ControllerState::RuleSpecific));
    assert!(!report.visited(&ControllerState::BlankProbe));

    let requests = invoker.requests();
    assert_eq!(requests[0].variant, CrawlVariant::Specific);
    assert_eq!(requests[0].rules.as_deref(), Some("utm_source||example.com"));
}

#[tokio::test]
async fn test_working_directory_is_never_changed() {
    let before = std::env::current_dir().unwrap();

    // Success path
    let base = tempfile::tempdir().unwrap();
    let invoker = ScriptedInvoker::by_variant(Effect::ArtifactAndSentinel, Effect::Artifact);
    let report = controller(invoker, base.path())
        .run(&job(&["fbclid"], base.path()))
        .await
        .expect("Job failed");
    assert!(report.outcome.is_success());
    assert_eq!(std::env::current_dir().unwrap(), before);

    // Failure path
    let base = tempfile::tempdir().unwrap();
    let invoker = ScriptedInvoker::always(Effect::Nothing);
    let report = controller(invoker, base.path())
        .run(&job(&["fbclid"], base.path()))
        .await
        .expect("Job failed");
    assert!(!report.outcome.is_success());
    assert_eq!(std::env::current_dir().unwrap(), before);
}

#[tokio::test]
async fn test_resume_with_complete_output_invokes_nothing() {
    let base = tempfile::tempdir().unwrap();
    let job = job(&["fbclid"], base.path());

    // Output of an earlier, interrupted-after-completion run
    write_artifact(&job.folder(SPECIFIC_FOLDER), DOMAIN);
    append_log(&job.log_path(), &format!("{}\n", SENTINEL));
    for i in 0..5 {
        write_artifact(&job.folder(&control_folder(i)), DOMAIN);
    }

    let invoker = ScriptedInvoker::always(Effect::Nothing);
    let report = controller(invoker.clone(), base.path())
        .run(&job)
        .await
        .expect("Job failed");

    assert_eq!(invoker.count(), 0);
    assert_eq!(report.invocations(), 0);
    assert_eq!(report.outcome, JobOutcome::Success { control_folders: 5 });

    let control = report.stage(Stage::Control).expect("Control stage missing");
    assert_eq!(control.resumed, 5);
    assert_eq!(control.budget.attempts(), 5);
}

#[tokio::test]
async fn test_partial_resume_fills_remaining_controls() {
    let base = tempfile::tempdir().unwrap();
    let job = job(&["fbclid"], base.path());

    write_artifact(&job.folder(SPECIFIC_FOLDER), DOMAIN);
    append_log(&job.log_path(), &format!("{}\n", SENTINEL));
    for i in 0..3 {
        write_artifact(&job.folder(&control_folder(i)), DOMAIN);
    }

    let invoker = ScriptedInvoker::always(Effect::Artifact);
    let report = controller(invoker.clone(), base.path())
        .run(&job)
        .await
        .expect("Job failed");

    assert!(report.outcome.is_success());
    let requests = invoker.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].output_dir.ends_with("control-data-3"));
    assert!(requests[1].output_dir.ends_with("control-data-4"));
}

#[tokio::test]
async fn test_circuit_breaker_stops_after_five_failures() {
    let base = tempfile::tempdir().unwrap();
    // Specific succeeds, every control run leaves an empty folder
    let invoker = ScriptedInvoker::by_variant(Effect::ArtifactAndSentinel, Effect::EmptyFolder);
    let job = job(&["fbclid"], base.path());

    let report = controller(invoker.clone(), base.path())
        .run(&job)
        .await
        .expect("Job failed");

    let control_runs = invoker
        .requests()
        .iter()
        .filter(|r| r.variant == CrawlVariant::None)
        .count();
    assert_eq!(control_runs, 5);

    let control = report.stage(Stage::Control).expect("Control stage missing");
    assert_eq!(control.result, StageResult::CircuitBroken);
    assert_eq!(control.invocations, 5);
    assert_eq!(
        report.outcome,
        JobOutcome::Abandoned(AbandonReason::ControlShortfall { folders: 0 })
    );

    // A control shortfall is not a rule-specific failure
    assert!(ledger_lines(base.path()).is_empty());
}

#[tokio::test]
async fn test_rule_specific_requires_artifact_and_sentinel() {
    let cases = [
        (Effect::Artifact, false),
        (Effect::SentinelOnly, false),
        (Effect::EmptyFolder, false),
        (Effect::ArtifactAndSentinel, true),
    ];

    for (effect, expect_success) in cases {
        let base = tempfile::tempdir().unwrap();
        let invoker = ScriptedInvoker::by_variant(effect, Effect::Artifact);
        let job = job(&["gclid"], base.path());

        let report = controller(invoker, base.path())
            .run(&job)
            .await
            .expect("Job failed");

        let specific = report.stage(Stage::Specific).expect("Specific stage missing");
        assert_eq!(
            specific.result == StageResult::Succeeded,
            expect_success,
            "unexpected specific result for {:?}",
            effect
        );
        assert_eq!(report.outcome.is_success(), expect_success);

        if !expect_success {
            assert_eq!(
                report.outcome,
                JobOutcome::Abandoned(AbandonReason::RuleSpecificExhausted)
            );
            assert!(report.stage(Stage::Control).is_none());
        }
    }
}

#[tokio::test]
async fn test_one_ledger_line_per_failure_and_none_on_later_success() {
    let base = tempfile::tempdir().unwrap();
    let job = job(&["fbclid"], base.path());

    // First run: artifact but no sentinel
    let failing = ScriptedInvoker::by_variant(Effect::Artifact, Effect::Artifact);
    let report = controller(failing, base.path())
        .run(&job)
        .await
        .expect("Job failed");
    assert!(!report.outcome.is_success());

    let lines = ledger_lines(base.path());
    assert_eq!(lines.len(), 1);
    let folder = job.folder(SPECIFIC_FOLDER);
    assert_eq!(lines[0], format!("{}\t{}", SITE, folder.display()));

    // Second run succeeds and must not touch the ledger
    let working = ScriptedInvoker::by_variant(Effect::ArtifactAndSentinel, Effect::Artifact);
    let report = controller(working, base.path())
        .run(&job)
        .await
        .expect("Job failed");
    assert!(report.outcome.is_success());
    assert_eq!(ledger_lines(base.path()).len(), 1);
}

#[tokio::test]
async fn test_resumed_success_after_failure_adds_no_ledger_line() {
    let base = tempfile::tempdir().unwrap();
    let job = job(&["fbclid"], base.path());

    // First run fails: artifact but no sentinel
    let failing = ScriptedInvoker::by_variant(Effect::Artifact, Effect::Artifact);
    let report = controller(failing, base.path())
        .run(&job)
        .await
        .expect("Job failed");
    assert!(!report.outcome.is_success());
    assert_eq!(ledger_lines(base.path()).len(), 1);

    // Complete output shows up on disk, e.g. from a manual rerun of the tool
    write_artifact(&job.folder(SPECIFIC_FOLDER), DOMAIN);
    append_log(&job.log_path(), &format!("{}\n", SENTINEL));
    for i in 0..5 {
        write_artifact(&job.folder(&control_folder(i)), DOMAIN);
    }

    let idle = ScriptedInvoker::always(Effect::Nothing);
    let report = controller(idle.clone(), base.path())
        .run(&job)
        .await
        .expect("Job failed");

    assert_eq!(idle.count(), 0);
    assert_eq!(report.outcome, JobOutcome::Success { control_folders: 5 });
    assert_eq!(
        report.stage(Stage::Specific).map(|s| s.resumed),
        Some(1)
    );
    assert_eq!(ledger_lines(base.path()).len(), 1);
}

#[tokio::test]
async fn test_missing_output_folder_aborts_job() {
    let base = tempfile::tempdir().unwrap();
    let invoker = ScriptedInvoker::always(Effect::Nothing);
    let job = job(&["fbclid"], base.path());

    let report = controller(invoker.clone(), base.path())
        .run(&job)
        .await
        .expect("Job failed");

    assert_eq!(invoker.count(), 1);
    assert!(matches!(
        report.outcome,
        JobOutcome::Abandoned(AbandonReason::Environment {
            stage: Stage::Specific,
            ..
        })
    ));
    assert!(!report.visited(&ControllerState::ControlReplicate));

    // Still an irrecoverable rule-specific failure
    assert_eq!(ledger_lines(base.path()).len(), 1);
}

#[tokio::test]
async fn test_control_environment_failure_aborts_job() {
    let base = tempfile::tempdir().unwrap();
    let invoker = ScriptedInvoker::by_variant(Effect::ArtifactAndSentinel, Effect::Nothing);
    let job = job(&["fbclid"], base.path());

    let report = controller(invoker.clone(), base.path())
        .run(&job)
        .await
        .expect("Job failed");

    // One specific run, then a single control run that left nothing behind
    assert_eq!(invoker.count(), 2);
    assert!(matches!(
        report.outcome,
        JobOutcome::Abandoned(AbandonReason::Environment {
            stage: Stage::Control,
            ..
        })
    ));
    assert!(ledger_lines(base.path()).is_empty());
}

#[tokio::test]
async fn test_survey_needs_one_variant_signal() {
    let base = tempfile::tempdir().unwrap();
    // Only the "third" variant ever produces output; controls succeed
    let invoker = ScriptedInvoker::new(|request| match request.variant {
        CrawlVariant::Third | CrawlVariant::None => Effect::Artifact,
        _ => Effect::EmptyFolder,
    });
    let job = job(&[], base.path());

    let report = controller(invoker.clone(), base.path())
        .run_survey(&job)
        .await
        .expect("Job failed");

    assert!(report.outcome.is_success());
    let all = report
        .stage(Stage::Survey(CrawlVariant::All))
        .expect("Survey stage missing");
    assert_eq!(all.result, StageResult::Exhausted);
    assert_eq!(all.invocations, 2);

    // all x2, third x1, replace x2, then five controls
    assert_eq!(invoker.count(), 10);
}

#[tokio::test]
async fn test_survey_without_signal_is_abandoned() {
    let base = tempfile::tempdir().unwrap();
    let invoker = ScriptedInvoker::always(Effect::EmptyFolder);
    let job = job(&[], base.path());

    let report = controller(invoker.clone(), base.path())
        .run_survey(&job)
        .await
        .expect("Job failed");

    assert_eq!(
        report.outcome,
        JobOutcome::Abandoned(AbandonReason::NoSurveySignal)
    );
    assert_eq!(invoker.count(), 6);
    assert!(invoker
        .requests()
        .iter()
        .all(|r| r.variant != CrawlVariant::None));
}
