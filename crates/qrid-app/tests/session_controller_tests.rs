//! Integration tests for the identify, encode, display and cleanup sequence.

mod common;

use std::fs;
use std::time::Duration;

use common::{Script, ScriptedPresenter, fast_config};
use qrid_app::{AppError, SessionController};
use qrid_identity::{FixedSource, IdentityError};
use qrid_ui::TerminationCause;

#[test]
fn session_controller_tests_expiry_shows_every_label_and_removes_artifact() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let config = fast_config(
        dir.path(),
        Duration::from_millis(50),
        Duration::from_millis(10),
    );
    let artifact_path = config.artifact_path();

    let mut controller = SessionController::new(
        config,
        Box::new(FixedSource::new("DEVICE-1234")),
        ScriptedPresenter::new(Script::RunToExpiry),
    );
    let outcome = controller.run().expect("session should complete");

    assert_eq!(outcome.cause, TerminationCause::Expired);
    assert!(!outcome.stale_artifact_removed);

    let presenter = controller.presenter();
    assert_eq!(presenter.calls, 1);
    assert!(presenter.artifact_seen);
    assert_eq!(presenter.labels.len(), 6);
    assert_eq!(
        presenter.labels.last().map(String::as_str),
        Some("Time remaining: 00:00")
    );

    assert!(!artifact_path.exists());
    assert!(controller.artifact().is_finalized());
    assert!(controller.finished_token().is_cancelled());
}

#[test]
fn session_controller_tests_missing_identifier_never_displays() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let config = fast_config(
        dir.path(),
        Duration::from_millis(50),
        Duration::from_millis(10),
    );
    let artifact_path = config.artifact_path();

    let mut controller = SessionController::new(
        config,
        Box::new(FixedSource::missing()),
        ScriptedPresenter::new(Script::RunToExpiry),
    );
    let error = controller.run().expect_err("missing identifier should fail");

    assert!(matches!(
        error,
        AppError::ConfigurationAccess(IdentityError::NotFound { .. })
    ));
    assert_eq!(controller.presenter().calls, 0);
    assert!(!artifact_path.exists());
    assert!(controller.finished_token().is_cancelled());
}

#[test]
fn session_controller_tests_blank_identifier_is_configuration_error() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let config = fast_config(
        dir.path(),
        Duration::from_millis(50),
        Duration::from_millis(10),
    );

    let mut controller = SessionController::new(
        config,
        Box::new(FixedSource::new("   ")),
        ScriptedPresenter::new(Script::RunToExpiry),
    );
    let error = controller.run().expect_err("blank identifier should fail");

    assert!(matches!(
        error,
        AppError::ConfigurationAccess(IdentityError::Empty { .. })
    ));
    assert_eq!(controller.presenter().calls, 0);
}

#[test]
fn session_controller_tests_removes_stale_artifact_before_encoding() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let config = fast_config(
        dir.path(),
        Duration::from_millis(20),
        Duration::from_millis(10),
    );
    let artifact_path = config.artifact_path();
    fs::write(&artifact_path, b"left over from a crashed run").expect("stale file should write");

    let mut controller = SessionController::new(
        config,
        Box::new(FixedSource::new("DEVICE-1234")),
        ScriptedPresenter::new(Script::RunToExpiry),
    );
    let outcome = controller.run().expect("session should complete");

    assert!(outcome.stale_artifact_removed);
    assert!(controller.presenter().artifact_seen);
    assert!(!artifact_path.exists());
}

#[test]
fn session_controller_tests_oversized_identifier_is_encoding_error() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let config = fast_config(
        dir.path(),
        Duration::from_millis(20),
        Duration::from_millis(10),
    );

    let mut controller = SessionController::new(
        config,
        Box::new(FixedSource::new("x".repeat(3_000))),
        ScriptedPresenter::new(Script::RunToExpiry),
    );
    let error = controller.run().expect_err("oversized identifier should fail");

    assert!(matches!(error, AppError::Encoding(_)));
    assert_eq!(controller.presenter().calls, 0);
    let leftovers = fs::read_dir(dir.path())
        .expect("tempdir should be readable")
        .count();
    assert_eq!(leftovers, 0);
}

#[test]
fn session_controller_tests_zero_tick_fails_before_artifact_is_written() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let config = fast_config(dir.path(), Duration::from_millis(20), Duration::ZERO);
    let artifact_path = config.artifact_path();

    let mut controller = SessionController::new(
        config,
        Box::new(FixedSource::new("DEVICE-1234")),
        ScriptedPresenter::new(Script::RunToExpiry),
    );
    let error = controller.run().expect_err("zero tick should fail");

    assert!(matches!(error, AppError::Countdown(_)));
    assert!(!artifact_path.exists());
}
