//! Integration tests for closing the display before expiry.

mod common;

use std::time::Duration;

use common::{Script, ScriptedPresenter, fast_config};
use qrid_app::SessionController;
use qrid_identity::FixedSource;
use qrid_ui::TerminationCause;

#[test]
fn user_close_tests_close_stops_labels_and_removes_artifact() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let config = fast_config(dir.path(), Duration::from_secs(1), Duration::from_millis(10));
    let artifact_path = config.artifact_path();

    let mut controller = SessionController::new(
        config,
        Box::new(FixedSource::new("DEVICE-1234")),
        ScriptedPresenter::new(Script::CloseAfter(2)),
    );
    let outcome = controller.run().expect("closed session should succeed");

    assert_eq!(outcome.cause, TerminationCause::UserClosed);
    assert_eq!(controller.presenter().labels.len(), 2);
    assert_eq!(controller.presenter().labels_after_close, 0);
    assert!(!controller.interrupt_token().is_cancelled());
    assert!(!artifact_path.exists());
}
