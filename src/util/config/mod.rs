//! bufrepl configuration
//!
//! Settings are read from a TOML file; every key is optional and falls
//! back to its default.
//!
//! # Configuration hierarchy
//!
//! ```text
//! Priority (high → low):
//! 1. CLI arguments
//! 2. File given with --config
//! 3. User-level (~/.config/bufrepl/config.toml)
//! 4. Default values
//! ```
//!
//! # Example file
//!
//! ```toml
//! [repl]
//! lang = "vim"
//! indent = 2
//! inspect = true
//! history_size = 500
//!
//! [log]
//! level = "debug"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::repl::backend_trait::Language;
use crate::repl::commands::DEFAULT_PREFIX;
use crate::repl::continuation::DEFAULT_MARKER;
use crate::repl::history::DEFAULT_HISTORY_SIZE;
use crate::util::logger::LogLevel;

/// Widest accepted output indentation
pub const MAX_INDENT: usize = 32;

/// User-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct UserConfig {
    /// REPL settings
    #[serde(default)]
    pub repl: ReplConfig,
    /// Logging settings
    #[serde(default)]
    pub log: LogConfig,
}

/// Session settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReplConfig {
    /// Language plain input is evaluated in
    #[serde(default)]
    pub lang: Language,
    /// Evaluation buffer override (0 = none)
    #[serde(default)]
    pub buffer: u32,
    /// Evaluation window override (0 = none)
    #[serde(default)]
    pub window: u32,
    /// Output left-padding, 0 to 32
    #[serde(default)]
    pub indent: usize,
    /// Re-render after each evaluation
    #[serde(default = "default_true")]
    pub redraw: bool,
    /// Show intermediate values
    #[serde(default)]
    pub inspect: bool,
    /// History ring capacity
    #[serde(default = "default_history_size")]
    pub history_size: usize,
    /// Skip the default key bindings
    #[serde(default)]
    pub no_defaults: bool,
    /// Continuation marker
    #[serde(default = "default_marker")]
    pub marker: char,
    /// Meta-command prefix
    #[serde(default = "default_prefix")]
    pub prefix: char,
}

fn default_true() -> bool {
    true
}

fn default_history_size() -> usize {
    DEFAULT_HISTORY_SIZE
}

fn default_marker() -> char {
    DEFAULT_MARKER
}

fn default_prefix() -> char {
    DEFAULT_PREFIX
}

impl Default for ReplConfig {
    fn default() -> Self {
        Self {
            lang: Language::Lua,
            buffer: 0,
            window: 0,
            indent: 0,
            redraw: true,
            inspect: false,
            history_size: DEFAULT_HISTORY_SIZE,
            no_defaults: false,
            marker: DEFAULT_MARKER,
            prefix: DEFAULT_PREFIX,
        }
    }
}

impl ReplConfig {
    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &'static str, reason: String| Err(ConfigError::Invalid { key, reason });

        if self.indent > MAX_INDENT {
            return invalid("indent", format!("{} exceeds {}", self.indent, MAX_INDENT));
        }
        if self.history_size == 0 {
            return invalid("history_size", "must be at least 1".to_string());
        }
        if self.marker.is_whitespace() || self.marker.is_alphanumeric() {
            return invalid("marker", format!("{:?} cannot start a line", self.marker));
        }
        if self.prefix.is_whitespace() || self.prefix.is_alphanumeric() {
            return invalid("prefix", format!("{:?} cannot start a line", self.prefix));
        }
        if self.marker == self.prefix {
            return invalid("prefix", "must differ from the continuation marker".to_string());
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Minimum level printed
    #[serde(default = "default_log_level")]
    pub level: LogLevel,
}

fn default_log_level() -> LogLevel {
    LogLevel::Warn
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Get the user config directory
pub fn get_config_dir() -> Option<PathBuf> {
    // Try XDG config directory on Unix
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg_config).join("bufrepl"));
    }

    if let Ok(home) = std::env::var("HOME") {
        return Some(PathBuf::from(home).join(".config").join("bufrepl"));
    }

    // On Windows, try %APPDATA%
    if let Ok(appdata) = std::env::var("APPDATA") {
        return Some(PathBuf::from(appdata).join("bufrepl"));
    }

    None
}

/// Get the user config file path (~/.config/bufrepl/config.toml)
pub fn get_config_path() -> Option<PathBuf> {
    get_config_dir().map(|dir| dir.join("config.toml"))
}

/// Parse configuration text
pub fn parse_config(content: &str) -> Result<UserConfig, ConfigError> {
    let config: UserConfig = toml::from_str(content)?;
    config.repl.validate()?;
    Ok(config)
}

/// Load configuration from `path`
pub fn load_from_path(path: &Path) -> Result<UserConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Load user-level configuration
/// Returns default config if file doesn't exist
pub fn load_user_config() -> Result<UserConfig, ConfigError> {
    match get_config_path() {
        Some(path) if path.exists() => load_from_path(&path),
        _ => Ok(UserConfig::default()),
    }
}

/// Write `config` to `path`, creating parent directories
pub fn save_config(
    config: &UserConfig,
    path: &Path,
) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let content = toml::to_string_pretty(config)?;
    fs::write(path, content)?;
    Ok(())
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Config serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}
