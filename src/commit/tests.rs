use super::*;
use crate::subprocess::{MockProcessRunner, ProcessCommand};
use std::fs;
use tempfile::TempDir;

fn dataset() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join(".git")).unwrap();
    fs::create_dir(dir.path().join(".datalad")).unwrap();
    dir
}

fn committer() -> (ChangeSetCommitter, MockProcessRunner) {
    let (gateway, mock) = CommandGateway::mock();
    (ChangeSetCommitter::new(gateway, Tools::default()), mock)
}

fn is_write(cmd: &ProcessCommand) -> bool {
    matches!(
        cmd.args.first().map(String::as_str),
        Some("save") | Some("add") | Some("commit")
    )
}

fn expect_status(mock: &mut MockProcessRunner, report: &str) {
    mock.expect_command("datalad")
        .with_exact_args(&["status"])
        .returns_stdout(report)
        .finish();
}

#[tokio::test]
async fn test_clean_tree_issues_no_write() {
    let dir = dataset();
    let (committer, mut mock) = committer();
    expect_status(&mut mock, "");

    let outcome = committer.commit_all(dir.path(), None).await.unwrap();

    assert!(outcome.committed);
    assert!(!outcome.degraded);
    assert_eq!(outcome.message, NO_CHANGES_MESSAGE);
    assert!(outcome.attempts.is_empty());
    assert_eq!(mock.count_calls(is_write), 0);
    assert_eq!(mock.get_call_history().len(), 1);
}

#[tokio::test]
async fn test_invalid_dataset_runs_nothing() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join(".git")).unwrap();
    let (committer, mock) = committer();

    let err = committer.commit_all(dir.path(), None).await.unwrap_err();

    assert!(matches!(err, EngineError::DatasetInvalid { .. }));
    assert!(mock.get_call_history().is_empty());
}

#[tokio::test]
async fn test_recursive_failure_then_flat_success() {
    let dir = dataset();
    let (committer, mut mock) = committer();
    expect_status(&mut mock, "modified: scripts/clean.py (file)\n");
    mock.expect_command("datalad")
        .with_exact_args(&["save", "-r", "-m", "Add cleaning step"])
        .returns_exit_code(1)
        .returns_stderr("recursion into subdataset failed")
        .finish();
    mock.expect_command("datalad")
        .with_exact_args(&["save", "-m", "Add cleaning step"])
        .returns_stdout("save(ok): . (dataset)\n")
        .finish();

    let outcome = committer
        .commit_all(dir.path(), Some("Add cleaning step"))
        .await
        .unwrap();

    assert!(outcome.committed);
    assert!(!outcome.degraded);
    assert_eq!(outcome.strategy, Some(SaveStrategy::Flat));
    assert_eq!(
        outcome.attempts,
        vec![
            "Recursive save: FAILED - recursion into subdataset failed".to_string(),
            "Flat save: SUCCESS".to_string(),
        ]
    );
    assert_eq!(outcome.final_output, "save(ok): . (dataset)\n");
    assert_eq!(
        outcome.status_report.as_deref(),
        Some("modified: scripts/clean.py (file)\n")
    );
}

#[tokio::test]
async fn test_per_subunit_save_with_parent_fallback() {
    let dir = dataset();
    fs::create_dir(dir.path().join("analysis")).unwrap();
    let (committer, mut mock) = committer();
    expect_status(&mut mock, "modified: analysis (dataset)\n");
    mock.expect_command("datalad")
        .with_args_prefix(&["save", "-r"])
        .returns_exit_code(1)
        .returns_stderr("recursive failed")
        .finish();
    mock.expect_command("datalad")
        .with_exact_args(&["save", "-m", "msg"])
        .returns_exit_code(1)
        .returns_stderr("flat failed")
        .times(2)
        .finish();
    mock.expect_command("datalad")
        .with_exact_args(&["save", "-m", "msg", "analysis"])
        .returns_success()
        .finish();
    mock.expect_command("datalad")
        .with_exact_args(&["save", "-m", "msg"])
        .returns_stdout("retried\n")
        .finish();

    let outcome = committer.commit_all(dir.path(), Some("msg")).await.unwrap();

    assert_eq!(outcome.strategy, Some(SaveStrategy::PerSubunit));
    assert_eq!(
        outcome.attempts,
        vec![
            "Recursive save: FAILED - recursive failed".to_string(),
            "Flat save: FAILED - flat failed".to_string(),
            "Subdataset save (analysis): FAILED - flat failed".to_string(),
            "Subdataset save from parent (analysis): SUCCESS".to_string(),
            "Flat save retry: SUCCESS".to_string(),
        ]
    );
    assert_eq!(outcome.final_output, "retried\n");

    let history = mock.get_call_history();
    assert_eq!(
        history[3].working_dir.as_deref(),
        Some(dir.path().join("analysis").as_path())
    );
    assert_eq!(history[4].working_dir.as_deref(), Some(dir.path()));
}

#[tokio::test]
async fn test_forced_commit_of_subdataset_reference() {
    let dir = dataset();
    let (committer, mut mock) = committer();
    expect_status(&mut mock, "modified: analysis (dataset)\n");
    mock.expect_command("datalad")
        .with_args_prefix(&["save"])
        .returns_exit_code(1)
        .returns_stderr("save refused")
        .finish();
    mock.expect_command("git")
        .with_exact_args(&["add", "--", ":(literal)analysis"])
        .returns_success()
        .finish();
    mock.expect_command("git")
        .with_exact_args(&["commit", "-m", "Force save subdataset reference: msg"])
        .returns_stdout("[main 1a2b3c4] Force save subdataset reference: msg\n")
        .finish();

    let outcome = committer.commit_all(dir.path(), Some("msg")).await.unwrap();

    assert!(outcome.committed);
    assert!(!outcome.degraded);
    assert_eq!(outcome.strategy, Some(SaveStrategy::Forced));
    assert!(outcome
        .attempts
        .contains(&"Subdataset save (analysis): FAILED - directory missing".to_string()));
    assert_eq!(
        outcome.attempts.last().map(String::as_str),
        Some("Forced commit (analysis): SUCCESS")
    );
    assert!(outcome.final_output.contains("Force save subdataset reference"));
}

#[tokio::test]
async fn test_all_strategies_fail_degrades() {
    let dir = dataset();
    let (committer, mut mock) = committer();
    expect_status(&mut mock, "modified: scripts/clean.py (file)\n");
    mock.expect_command("datalad")
        .with_args_prefix(&["save"])
        .returns_exit_code(1)
        .returns_stderr("annex locked")
        .finish();

    let outcome = committer.commit_all(dir.path(), None).await.unwrap();

    assert!(outcome.committed);
    assert!(outcome.degraded);
    assert!(outcome.warning.is_some());
    assert_eq!(outcome.strategy, None);
    assert_eq!(
        outcome.attempts,
        vec![
            "Recursive save: FAILED - annex locked".to_string(),
            "Flat save: FAILED - annex locked".to_string(),
            "Per-subunit save: FAILED - no modified subdatasets in status report".to_string(),
            "Forced commit: FAILED - no subdataset references to force".to_string(),
        ]
    );
    let saves = mock.count_calls(|c| c.args.first().map(String::as_str) == Some("save"));
    assert_eq!(saves, 2);
    assert_eq!(mock.count_calls(|c| c.program == "git"), 0);
}

#[tokio::test]
async fn test_status_failure_is_logged_and_cascade_continues() {
    let dir = dataset();
    let (committer, mut mock) = committer();
    mock.expect_command("datalad")
        .with_exact_args(&["status"])
        .returns_exit_code(1)
        .returns_stderr("status exploded")
        .finish();
    mock.expect_command("datalad")
        .with_args_prefix(&["save", "-r"])
        .returns_success()
        .finish();

    let outcome = committer.commit_all(dir.path(), None).await.unwrap();

    assert_eq!(outcome.strategy, Some(SaveStrategy::Recursive));
    assert_eq!(
        outcome.attempts,
        vec![
            "Status query: FAILED - status exploded".to_string(),
            "Recursive save: SUCCESS".to_string(),
        ]
    );
    assert!(outcome.status_report.is_none());
}

#[tokio::test]
async fn test_timed_out_strategy_counts_as_failed() {
    let dir = dataset();
    let (committer, mut mock) = committer();
    expect_status(&mut mock, "untracked: plots/fig.png (file)\n");
    mock.expect_command("datalad")
        .with_args_prefix(&["save", "-r"])
        .returns_timeout()
        .finish();
    mock.expect_command("datalad")
        .with_args_prefix(&["save", "-m"])
        .returns_success()
        .finish();

    let outcome = committer.commit_all(dir.path(), None).await.unwrap();

    assert_eq!(outcome.strategy, Some(SaveStrategy::Flat));
    assert!(outcome.attempts[0].starts_with("Recursive save: FAILED - timed out"));
}

#[tokio::test]
async fn test_default_message_for_blank_input() {
    let dir = dataset();
    let (committer, mut mock) = committer();
    expect_status(&mut mock, "modified: a (file)\n");
    mock.expect_command("datalad")
        .with_args_prefix(&["save"])
        .returns_success()
        .finish();

    committer.commit_all(dir.path(), Some("   ")).await.unwrap();

    let argv = &mock.recorded_argv()[1];
    assert_eq!(argv, &vec!["datalad", "save", "-r", "-m", DEFAULT_COMMIT_MESSAGE]);
}

#[tokio::test]
async fn test_save_stage() {
    let dir = dataset();
    fs::create_dir(dir.path().join("results")).unwrap();
    let (committer, mut mock) = committer();
    mock.expect_command("datalad")
        .with_exact_args(&["save", "-m", "Save stage changes: results", "results"])
        .returns_stdout("save(ok): results\n")
        .finish();

    let saved = committer
        .save_stage(dir.path(), "./results/", None)
        .await
        .unwrap();

    assert_eq!(saved.stage, "results");
    assert_eq!(saved.message, "Save stage changes: results");
    assert_eq!(saved.output, "save(ok): results\n");
}

#[tokio::test]
async fn test_save_stage_missing_directory() {
    let dir = dataset();
    let (committer, mock) = committer();

    let err = committer
        .save_stage(dir.path(), "plots", Some("Add figures"))
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::StageNotFound { .. }));
    assert_eq!(mock.count_calls(is_write), 0);
}

#[tokio::test]
async fn test_save_stage_failure_propagates() {
    let dir = dataset();
    fs::create_dir(dir.path().join("plots")).unwrap();
    let (committer, mut mock) = committer();
    mock.expect_command("datalad")
        .returns_exit_code(1)
        .returns_stderr("nothing to save")
        .finish();

    let err = committer.save_stage(dir.path(), "plots", None).await.unwrap_err();
    match err {
        EngineError::CommandFailed { exit_code, detail, .. } => {
            assert_eq!(exit_code, Some(1));
            assert_eq!(detail, "nothing to save");
        }
        other => panic!("Expected CommandFailed, got {other:?}"),
    }
}
