//! Configuration loading and root folder resolution
//!
//! Every setting is resolved in the same priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing or unreadable TOML file is never fatal; it only means the
//! compiled defaults apply.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::{Error, Result};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "FPT_ROOT_FOLDER";

/// Value of `database_url` that turns the remote store off
pub const DATABASE_DISABLED: &str = "none";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// SQLx URL of the remote store, or `none`
    #[serde(default)]
    pub database_url: Option<String>,

    /// Listen address, e.g. `127.0.0.1:5740`
    #[serde(default)]
    pub bind: Option<String>,

    /// Password for admin routes; empty disables the check
    #[serde(default)]
    pub admin_password: Option<String>,

    #[serde(default)]
    pub remote_timeout_ms: Option<u64>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default)]
    pub level: Option<String>,
}

/// Built-in defaults used when nothing else sets a value
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub bind: String,
    pub admin_password: String,
    pub remote_timeout_ms: u64,
    pub log_level: String,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        Self {
            root_folder: default_root_folder(),
            bind: "127.0.0.1:5740".to_string(),
            admin_password: "matrix-admin".to_string(),
            remote_timeout_ms: 3000,
            log_level: "info".to_string(),
        }
    }
}

/// OS-dependent default root folder
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("fpt"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\fpt"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("fpt"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/fpt"))
    } else {
        // ~/.local/share/fpt (or /var/lib/fpt without a home directory)
        dirs::data_local_dir()
            .map(|d| d.join("fpt"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/fpt"))
    }
}

/// First existing config file: `~/.config/fpt/config.toml`, then
/// `/etc/fpt/config.toml` (Linux only)
pub fn default_config_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("fpt").join("config.toml"));
    if let Some(path) = user_config.filter(|p| p.exists()) {
        return Some(path);
    }

    let system_config = PathBuf::from("/etc/fpt/config.toml");
    if cfg!(target_os = "linux") && system_config.exists() {
        return Some(system_config);
    }

    None
}

/// Parse a TOML config file
pub fn parse_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Invalid config file {}: {}", path.display(), e)))
}

/// Load the config file if there is one.
///
/// A missing or broken file yields the empty config plus the error, so the
/// caller can report it once logging is up.
pub fn load_toml_config(explicit: Option<&Path>) -> (TomlConfig, Option<Error>) {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match default_config_path() {
            Some(path) => path,
            None => return (TomlConfig::default(), None),
        },
    };

    match parse_toml_config(&path) {
        Ok(config) => (config, None),
        Err(e) => (TomlConfig::default(), Some(e)),
    }
}

/// Root folder: CLI argument, then `FPT_ROOT_FOLDER`, then TOML, then the
/// compiled default
pub fn resolve_root_folder(cli_arg: Option<&Path>, toml: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &toml.root_folder {
        return path.clone();
    }

    default_root_folder()
}

/// Values taken from the command line or environment (clap merges the two)
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub root_folder: Option<PathBuf>,
    pub database_url: Option<String>,
    pub bind: Option<String>,
    pub admin_password: Option<String>,
    pub remote_timeout_ms: Option<u64>,
}

/// Fully resolved runtime settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub root_folder: PathBuf,
    /// `None` when the remote store is disabled
    pub database_url: Option<String>,
    pub bind: String,
    pub admin_password: String,
    pub remote_timeout: Duration,
    pub log_level: String,
}

impl Settings {
    pub fn resolve(overrides: SettingsOverrides, toml: &TomlConfig) -> Self {
        let defaults = CompiledDefaults::for_current_platform();
        let root_folder = resolve_root_folder(overrides.root_folder.as_deref(), toml);

        let database_url = match overrides.database_url.or_else(|| toml.database_url.clone()) {
            Some(url) if url.trim().eq_ignore_ascii_case(DATABASE_DISABLED) => None,
            Some(url) => Some(url),
            None => Some(default_database_url(&root_folder)),
        };

        Self {
            database_url,
            bind: overrides
                .bind
                .or_else(|| toml.bind.clone())
                .unwrap_or(defaults.bind),
            admin_password: overrides
                .admin_password
                .or_else(|| toml.admin_password.clone())
                .unwrap_or(defaults.admin_password),
            remote_timeout: Duration::from_millis(
                overrides
                    .remote_timeout_ms
                    .or(toml.remote_timeout_ms)
                    .unwrap_or(defaults.remote_timeout_ms),
            ),
            log_level: toml.logging.level.clone().unwrap_or(defaults.log_level),
            root_folder,
        }
    }

    /// Directory holding the local cache files
    pub fn cache_dir(&self) -> PathBuf {
        self.root_folder.join("cache")
    }
}

/// `sqlite://<root>/fpt.db?mode=rwc`
pub fn default_database_url(root_folder: &Path) -> String {
    format!("sqlite://{}?mode=rwc", root_folder.join("fpt.db").display())
}
