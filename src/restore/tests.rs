use super::*;
use crate::subprocess::{MockProcessRunner, ProcessCommand};
use std::fs;
use tempfile::TempDir;

fn dataset(with_datalad: bool) -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join(".git")).unwrap();
    if with_datalad {
        fs::create_dir(dir.path().join(".datalad")).unwrap();
    }
    dir
}

fn restorer() -> (FileRestorer, MockProcessRunner) {
    let (gateway, mock) = CommandGateway::mock();
    (FileRestorer::new(gateway, Tools::default()), mock)
}

fn is_write(cmd: &ProcessCommand) -> bool {
    matches!(
        cmd.args.first().map(String::as_str),
        Some("checkout") | Some("add") | Some("commit") | Some("save")
    )
}

fn expect_revision(mock: &mut MockProcessRunner, exists: bool) {
    mock.expect_command("git")
        .with_exact_args(&["cat-file", "-e", "a1b2c3d^{commit}"])
        .returns_exit_code(if exists { 0 } else { 128 })
        .finish();
}

fn expect_blob(mock: &mut MockProcessRunner, path: &str, exists: bool) {
    let object = format!("a1b2c3d:{path}");
    mock.expect_command("git")
        .with_args(move |args| args.len() == 3 && args[0] == "cat-file" && args[2] == object)
        .returns_exit_code(if exists { 0 } else { 128 })
        .finish();
}

fn expect_writes(mock: &mut MockProcessRunner, staged: bool) {
    mock.expect_command("git")
        .with_args_prefix(&["checkout"])
        .returns_success()
        .finish();
    mock.expect_command("git")
        .with_args_prefix(&["add"])
        .returns_success()
        .finish();
    mock.expect_command("git")
        .with_args_prefix(&["diff", "--cached", "--quiet"])
        .returns_exit_code(if staged { 1 } else { 0 })
        .finish();
    mock.expect_command("git")
        .with_args_prefix(&["commit"])
        .returns_success()
        .finish();
}

#[tokio::test]
async fn test_restore_commits_both_layers() {
    let dir = dataset(true);
    fs::create_dir(dir.path().join("results")).unwrap();
    fs::write(dir.path().join("results/summary.csv"), "old").unwrap();

    let (restorer, mut mock) = restorer();
    expect_revision(&mut mock, true);
    expect_blob(&mut mock, "results/summary.csv", true);
    expect_writes(&mut mock, true);
    mock.expect_command("datalad")
        .with_exact_args(&[
            "save",
            "-m",
            "Restore results/summary.csv from commit a1b2c3d",
        ])
        .returns_success()
        .finish();

    let result = restorer
        .restore(dir.path(), "results/summary.csv", "a1b2c3d", None)
        .await
        .unwrap();

    assert_eq!(result.vcs, LayerOutcome::Committed);
    assert_eq!(result.content_tracking, LayerOutcome::Committed);
    assert!(result.fully_persisted());

    let argv = mock.recorded_argv();
    assert_eq!(
        argv[2],
        vec!["git", "checkout", "a1b2c3d", "--", ":(literal)results/summary.csv"]
    );
    assert_eq!(argv[3], vec!["git", "add", "--", ":(literal)results/summary.csv"]);
    assert_eq!(
        argv[4],
        vec!["git", "diff", "--cached", "--quiet", "--", ":(literal)results/summary.csv"]
    );
    assert_eq!(
        argv[5],
        vec![
            "git",
            "commit",
            "-m",
            "Restore results/summary.csv from commit a1b2c3d",
            "--",
            ":(literal)results/summary.csv"
        ]
    );
}

#[tokio::test]
async fn test_missing_revision_writes_nothing() {
    let dir = dataset(true);
    let (restorer, mut mock) = restorer();
    expect_revision(&mut mock, false);

    let err = restorer
        .restore(dir.path(), "a.txt", "a1b2c3d", None)
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::RevisionNotFound { ref revision } if revision == "a1b2c3d"));
    assert_eq!(mock.count_calls(is_write), 0);
}

#[tokio::test]
async fn test_file_not_in_revision_writes_nothing() {
    let dir = dataset(true);
    let (restorer, mut mock) = restorer();
    expect_revision(&mut mock, true);
    expect_blob(&mut mock, "plots/missing.png", false);

    let err = restorer
        .restore(dir.path(), "./plots/missing.png", "a1b2c3d", None)
        .await
        .unwrap_err();

    match err {
        EngineError::FileNotInRevision { path, revision } => {
            assert_eq!(path, "plots/missing.png");
            assert_eq!(revision, "a1b2c3d");
        }
        other => panic!("Expected FileNotInRevision, got {other:?}"),
    }
    assert_eq!(mock.count_calls(is_write), 0);
    assert_eq!(mock.get_call_history().len(), 2);
}

#[tokio::test]
async fn test_unchanged_file_skips_commit() {
    let dir = dataset(false);
    fs::write(dir.path().join("notes.md"), "same").unwrap();

    let (restorer, mut mock) = restorer();
    expect_revision(&mut mock, true);
    expect_blob(&mut mock, "notes.md", true);
    expect_writes(&mut mock, false);

    let result = restorer
        .restore(dir.path(), "notes.md", "a1b2c3d", Some("Bring notes back"))
        .await
        .unwrap();

    assert!(matches!(result.vcs, LayerOutcome::Skipped { .. }));
    assert_eq!(result.content_tracking, LayerOutcome::NotApplicable);
    assert_eq!(result.message, "Bring notes back");
    assert_eq!(
        mock.count_calls(|c| c.args.first().map(String::as_str) == Some("commit")),
        0
    );
    assert!(mock.verify_called("datalad", 0));
}

#[tokio::test]
async fn test_content_tracking_failure_is_reported_not_raised() {
    let dir = dataset(true);
    fs::write(dir.path().join("data.csv"), "x").unwrap();

    let (restorer, mut mock) = restorer();
    expect_revision(&mut mock, true);
    expect_blob(&mut mock, "data.csv", true);
    expect_writes(&mut mock, true);
    mock.expect_command("datalad")
        .returns_exit_code(1)
        .returns_stderr("annex unavailable")
        .finish();

    let result = restorer
        .restore(dir.path(), "data.csv", "a1b2c3d", None)
        .await
        .unwrap();

    assert_eq!(result.vcs, LayerOutcome::Committed);
    assert_eq!(
        result.content_tracking,
        LayerOutcome::Failed {
            error: "annex unavailable".to_string()
        }
    );
    assert!(!result.fully_persisted());
}

#[tokio::test]
async fn test_missing_file_after_checkout_fails_verification() {
    let dir = dataset(false);
    let (restorer, mut mock) = restorer();
    expect_revision(&mut mock, true);
    expect_blob(&mut mock, "ghost.txt", true);
    mock.expect_command("git")
        .with_args_prefix(&["checkout"])
        .returns_success()
        .finish();

    let err = restorer
        .restore(dir.path(), "ghost.txt", "a1b2c3d", None)
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::RestoreVerificationFailed { .. }));
    assert_eq!(
        mock.count_calls(|c| c.args.first().map(String::as_str) == Some("add")),
        0
    );
}

#[tokio::test]
async fn test_checkout_failure_propagates() {
    let dir = dataset(false);
    let (restorer, mut mock) = restorer();
    expect_revision(&mut mock, true);
    expect_blob(&mut mock, "a.txt", true);
    mock.expect_command("git")
        .with_args_prefix(&["checkout"])
        .returns_exit_code(1)
        .returns_stderr("error: pathspec did not match")
        .finish();

    let err = restorer
        .restore(dir.path(), "a.txt", "a1b2c3d", None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::CommandFailed { .. }));
}

#[tokio::test]
async fn test_failed_staged_check_propagates_without_commit() {
    let dir = dataset(false);
    fs::write(dir.path().join("a.txt"), "x").unwrap();

    let (restorer, mut mock) = restorer();
    expect_revision(&mut mock, true);
    expect_blob(&mut mock, "a.txt", true);
    mock.expect_command("git")
        .with_args_prefix(&["checkout"])
        .returns_success()
        .finish();
    mock.expect_command("git")
        .with_args_prefix(&["add"])
        .returns_success()
        .finish();
    mock.expect_command("git")
        .with_args_prefix(&["diff", "--cached"])
        .returns_exit_code(128)
        .returns_stderr("fatal: bad index file")
        .finish();

    let err = restorer
        .restore(dir.path(), "a.txt", "a1b2c3d", None)
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::CommandFailed { ref detail, .. } if detail.contains("bad index")));
    assert_eq!(
        mock.count_calls(|c| c.args.first().map(String::as_str) == Some("commit")),
        0
    );
}

#[test]
fn test_layer_outcome_serialization() {
    let json = serde_json::to_value(LayerOutcome::Skipped {
        reason: "clean".to_string(),
    })
    .unwrap();
    assert_eq!(json["status"], "skipped");
    assert_eq!(json["reason"], "clean");
}
