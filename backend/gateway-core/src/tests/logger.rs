use crate::logger::{LOG_FILE_NAME, default_log_dir, initialize};

use serial_test::serial;
use tempfile::TempDir;

/// **VALUE**: Verifies initialization creates the log directory and file, and
/// that a second call is a harmless no-op.
///
/// **WHY THIS MATTERS**: Host apps call `initialize` from several entry points.
/// A second call must not fail startup because a global logger already exists.
#[test]
#[serial]
fn given_fresh_directory_when_initialized_twice_then_file_created_and_second_call_ok() {
    // GIVEN: A log directory that does not exist yet
    let temp_dir = TempDir::new().unwrap();
    let log_dir = temp_dir.path().join("nested").join("logs");

    // WHEN
    let first = initialize(&log_dir);
    let second = initialize(&log_dir);

    // THEN
    assert!(first.is_ok(), "first initialize failed: {first:?}");
    assert!(second.is_ok());
    assert!(log_dir.join(LOG_FILE_NAME).exists());
}

#[test]
fn given_platform_data_dir_when_resolving_default_then_ends_with_app_logs() {
    if let Some(dir) = default_log_dir() {
        assert!(dir.ends_with("gateway-client/logs"));
    }
}
