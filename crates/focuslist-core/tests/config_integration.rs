//! Integration tests for loading and saving configuration files.

use focuslist_core::storage::Config;
use focuslist_core::ConfigError;

#[test]
fn test_missing_file_writes_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");

    let cfg = Config::load_from(&path).unwrap();
    assert_eq!(cfg.timer.work_minutes, 25);
    assert!(path.exists());

    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.contains("[timer]"));
}

#[test]
fn test_save_and_reload_preserves_changes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");

    let mut cfg = Config::default();
    cfg.set("timer.work_minutes", "50").unwrap();
    cfg.set("companion.enabled", "true").unwrap();
    cfg.set("companion.url", "https://example.com/planner").unwrap();
    cfg.save_to(&path).unwrap();

    let reloaded = Config::load_from(&path).unwrap();
    assert_eq!(reloaded.timer.work_minutes, 50);
    assert_eq!(reloaded.cycle_config().work_ms, 50 * 60 * 1000);
    assert_eq!(reloaded.companion_url(), Some("https://example.com/planner"));
}

#[test]
fn test_malformed_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[timer\nwork_minutes = ").unwrap();

    assert!(matches!(Config::load_from(&path), Err(ConfigError::ParseFailed(_))));
}

#[test]
fn test_zero_duration_in_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[timer]\nrest_minutes = 0\n").unwrap();

    assert!(matches!(
        Config::load_from(&path),
        Err(ConfigError::InvalidValue { key, .. }) if key == "timer.rest_minutes"
    ));
}
