//! Configuration resolution tests
//!
//! Tests touching FPT_ROOT_FOLDER are marked #[serial] so they never race
//! on the process environment.

use std::env;
use std::path::{Path, PathBuf};

use fpt_common::config::{
    load_toml_config, parse_toml_config, resolve_root_folder, CompiledDefaults, Settings,
    SettingsOverrides, TomlConfig, ROOT_FOLDER_ENV,
};
use serial_test::serial;
use tempfile::TempDir;

#[test]
fn test_compiled_defaults() {
    let defaults = CompiledDefaults::for_current_platform();
    assert!(!defaults.root_folder.as_os_str().is_empty());
    assert_eq!(defaults.bind, "127.0.0.1:5740");
    assert_eq!(defaults.admin_password, "matrix-admin");
    assert_eq!(defaults.remote_timeout_ms, 3000);
    assert_eq!(defaults.log_level, "info");
}

#[test]
#[serial]
fn test_root_folder_cli_beats_env() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/fpt-from-env");
    let folder = resolve_root_folder(Some(Path::new("/tmp/fpt-from-cli")), &TomlConfig::default());
    env::remove_var(ROOT_FOLDER_ENV);

    assert_eq!(folder, PathBuf::from("/tmp/fpt-from-cli"));
}

#[test]
#[serial]
fn test_root_folder_env_beats_toml() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/fpt-from-env");
    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/fpt-from-toml")),
        ..Default::default()
    };
    let folder = resolve_root_folder(None, &toml);
    env::remove_var(ROOT_FOLDER_ENV);

    assert_eq!(folder, PathBuf::from("/tmp/fpt-from-env"));
}

#[test]
#[serial]
fn test_root_folder_toml_then_default() {
    env::remove_var(ROOT_FOLDER_ENV);

    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/fpt-from-toml")),
        ..Default::default()
    };
    assert_eq!(resolve_root_folder(None, &toml), PathBuf::from("/tmp/fpt-from-toml"));

    assert_eq!(
        resolve_root_folder(None, &TomlConfig::default()),
        CompiledDefaults::for_current_platform().root_folder
    );
}

#[test]
#[serial]
fn test_settings_from_toml_file() {
    env::remove_var(ROOT_FOLDER_ENV);
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
root_folder = "/srv/fpt"
bind = "0.0.0.0:8080"
admin_password = ""
remote_timeout_ms = 750
"#,
    )
    .unwrap();

    let (toml, error) = load_toml_config(Some(&path));
    assert!(error.is_none());
    let settings = Settings::resolve(SettingsOverrides::default(), &toml);

    assert_eq!(settings.root_folder, PathBuf::from("/srv/fpt"));
    assert_eq!(settings.bind, "0.0.0.0:8080");
    assert_eq!(settings.admin_password, "");
    assert_eq!(settings.remote_timeout.as_millis(), 750);
    assert_eq!(
        settings.database_url.as_deref(),
        Some("sqlite:///srv/fpt/fpt.db?mode=rwc")
    );
}

#[test]
fn test_broken_toml_is_not_fatal() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(&path, "bind = [unterminated").unwrap();

    assert!(parse_toml_config(&path).is_err());
    let (config, error) = load_toml_config(Some(&path));
    assert!(config.bind.is_none());
    assert!(matches!(error, Some(fpt_common::Error::Config(_))));
}

#[test]
fn test_missing_toml_is_not_fatal() {
    let temp_dir = TempDir::new().unwrap();
    let (config, error) = load_toml_config(Some(&temp_dir.path().join("absent.toml")));
    assert!(config.root_folder.is_none());
    assert!(error.is_some());
}
