//! Persistent converter settings.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::workbook::HyperlinkStyle;

/// Settings file used when no `--config` path is given.
pub const DEFAULT_CONFIG_FILE: &str = "sheet_linker_config.json";

#[allow(clippy::unwrap_used)] // Compile-time constant regex pattern
static HEX_COLOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9A-Fa-f]{6}$").unwrap());

/// Errors raised when editing a setting.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// The key is not a known setting.
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// The value does not fit the setting.
    #[error("Invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        /// Setting name.
        key: String,
        /// Rejected input.
        value: String,
        /// What was expected instead.
        reason: String,
    },
}

fn invalid(key: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Log verbosity as stored in the settings file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    /// Everything, including per-file details.
    Debug,
    /// Progress and results.
    #[default]
    Info,
    /// Recoverable problems only.
    Warning,
    /// Failures only.
    Error,
}

impl LogLevel {
    /// Every level, most verbose first.
    pub const ALL: [LogLevel; 4] = [
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warning,
        LogLevel::Error,
    ];

    /// Name as written in the settings file.
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
        }
    }

    /// Directive understood by `tracing_subscriber::EnvFilter`.
    pub fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        LogLevel::ALL
            .into_iter()
            .find(|level| level.as_str() == upper)
            .ok_or_else(|| invalid("log_level", s, "expected DEBUG, INFO, WARNING or ERROR"))
    }
}

/// User-tunable settings.
///
/// Keys missing from the settings file take their default value.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct BotConfig {
    /// Six hex digit RGB colour of converted cells.
    pub hyperlink_color: String,
    /// Whether a backup copy is taken before each file is processed.
    pub backup_files: bool,
    /// Whether detected column types are reported at info level rather than
    /// debug level.
    pub auto_detect: bool,
    /// Upper bound on the rows converted per column.
    pub max_rows_to_process: u32,
    /// File extensions eligible for processing, with the leading dot.
    pub supported_extensions: Vec<String>,
    /// Platform names kept for reference; only professional-network profiles
    /// are classified separately.
    pub social_media_platforms: Vec<String>,
    /// Log verbosity.
    pub log_level: LogLevel,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            hyperlink_color: "0000FF".to_string(),
            backup_files: true,
            auto_detect: true,
            max_rows_to_process: 100_000,
            supported_extensions: [".xlsx", ".xlsm", ".xltx", ".xltm"]
                .map(String::from)
                .to_vec(),
            social_media_platforms: ["linkedin", "twitter", "facebook", "instagram", "youtube"]
                .map(String::from)
                .to_vec(),
            log_level: LogLevel::Info,
        }
    }
}

impl BotConfig {
    /// Setting names in display order.
    pub const KEYS: [&'static str; 7] = [
        "hyperlink_color",
        "backup_files",
        "auto_detect",
        "max_rows_to_process",
        "supported_extensions",
        "social_media_platforms",
        "log_level",
    ];

    /// Font override derived from `hyperlink_color`.
    pub fn hyperlink_style(&self) -> HyperlinkStyle {
        HyperlinkStyle::new(&self.hyperlink_color)
    }

    /// Current value of a setting rendered for display.
    pub fn get(&self, key: &str) -> std::result::Result<String, ConfigError> {
        Ok(match key {
            "hyperlink_color" => self.hyperlink_color.clone(),
            "backup_files" => self.backup_files.to_string(),
            "auto_detect" => self.auto_detect.to_string(),
            "max_rows_to_process" => self.max_rows_to_process.to_string(),
            "supported_extensions" => self.supported_extensions.join(", "),
            "social_media_platforms" => self.social_media_platforms.join(", "),
            "log_level" => self.log_level.to_string(),
            other => return Err(ConfigError::UnknownKey(other.to_string())),
        })
    }

    /// All settings as (key, display value) pairs.
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        Self::KEYS
            .iter()
            .filter_map(|key| self.get(key).ok().map(|value| (*key, value)))
            .collect()
    }

    /// Parses and applies a setting given as text.
    pub fn set(&mut self, key: &str, value: &str) -> std::result::Result<(), ConfigError> {
        let trimmed = value.trim();
        match key {
            "hyperlink_color" => self.hyperlink_color = check_color(trimmed)?.to_uppercase(),
            "backup_files" => self.backup_files = parse_bool(key, value)?,
            "auto_detect" => self.auto_detect = parse_bool(key, value)?,
            "max_rows_to_process" => {
                self.max_rows_to_process = match trimmed.parse::<u32>() {
                    Ok(rows) => check_rows(rows)?,
                    Err(_) => return Err(invalid(key, value, ROWS_EXPECTED)),
                };
            }
            "supported_extensions" => {
                let extensions = parse_list(trimmed);
                check_extensions(&extensions, value)?;
                self.supported_extensions = extensions;
            }
            "social_media_platforms" => self.social_media_platforms = parse_list(trimmed),
            "log_level" => self.log_level = trimmed.parse()?,
            other => return Err(ConfigError::UnknownKey(other.to_string())),
        }
        Ok(())
    }

    /// Checks values that bypassed [`BotConfig::set`], e.g. read from a file.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        check_color(&self.hyperlink_color)?;
        check_rows(self.max_rows_to_process)?;
        check_extensions(
            &self.supported_extensions,
            &self.supported_extensions.join(","),
        )
    }
}

const ROWS_EXPECTED: &str = "expected a positive number";

fn check_color(value: &str) -> std::result::Result<&str, ConfigError> {
    if HEX_COLOR.is_match(value) {
        Ok(value)
    } else {
        Err(invalid(
            "hyperlink_color",
            value,
            "expected 6 hex characters, e.g. 0000FF",
        ))
    }
}

fn check_rows(rows: u32) -> std::result::Result<u32, ConfigError> {
    if rows > 0 {
        Ok(rows)
    } else {
        Err(invalid("max_rows_to_process", &rows.to_string(), ROWS_EXPECTED))
    }
}

fn check_extensions(extensions: &[String], raw: &str) -> std::result::Result<(), ConfigError> {
    if extensions.is_empty() || extensions.iter().any(|e| !e.starts_with('.')) {
        return Err(invalid(
            "supported_extensions",
            raw,
            "expected a comma separated list like .xlsx,.xlsm",
        ));
    }
    Ok(())
}

fn parse_bool(key: &str, value: &str) -> std::result::Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(invalid(key, value, "expected true or false")),
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// How [`ConfigManager::load_or_create`] obtained the settings.
#[derive(Debug)]
pub enum LoadOutcome {
    /// No file existed; defaults were written.
    Created,
    /// The file was read.
    Loaded,
    /// The file was unusable; defaults are in effect.
    Fallback(anyhow::Error),
}

impl LoadOutcome {
    /// Logs the outcome for the settings file at `path`.
    pub fn log(&self, path: &Path) {
        match self {
            LoadOutcome::Created => {
                info!(path = %path.display(), "Default configuration created");
            }
            LoadOutcome::Loaded => {
                info!(path = %path.display(), "Configuration loaded from file");
            }
            LoadOutcome::Fallback(e) => {
                warn!(
                    path = %path.display(),
                    error = %format!("{e:#}"),
                    "Could not load config, using defaults"
                );
            }
        }
    }
}

/// Loads and stores [`BotConfig`] as pretty-printed JSON.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_path: PathBuf,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::with_path(PathBuf::from(DEFAULT_CONFIG_FILE))
    }
}

impl ConfigManager {
    /// Creates a manager for a custom settings path.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
        }
    }

    /// Location of the settings file.
    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Reads the settings file, failing when it is absent or unreadable.
    pub fn load(&self) -> Result<BotConfig> {
        let content = std::fs::read_to_string(&self.config_path)
            .with_context(|| format!("Failed to read config file: {:?}", self.config_path))?;

        let config: BotConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", self.config_path))?;
        config
            .validate()
            .with_context(|| format!("Invalid setting in config file: {:?}", self.config_path))?;
        Ok(config)
    }

    /// Loads the settings, writing defaults on first run.
    ///
    /// A file that exists but cannot be parsed or holds invalid values is
    /// left untouched and the defaults are used for this run. Nothing is
    /// logged here since this usually runs before logging is set up; report
    /// the returned [`LoadOutcome`] once it is.
    pub fn load_or_create(&self) -> Result<(BotConfig, LoadOutcome)> {
        if !self.config_path.exists() {
            let config = BotConfig::default();
            self.write(&config)?;
            return Ok((config, LoadOutcome::Created));
        }

        match self.load() {
            Ok(config) => Ok((config, LoadOutcome::Loaded)),
            Err(e) => Ok((BotConfig::default(), LoadOutcome::Fallback(e))),
        }
    }

    /// Writes the settings file.
    pub fn save(&self, config: &BotConfig) -> Result<()> {
        self.write(config)?;
        info!(path = %self.config_path.display(), "Configuration saved");
        Ok(())
    }

    fn write(&self, config: &BotConfig) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create config directory: {parent:?}"))?;
            }
        }

        let content = serde_json::to_string_pretty(config).context("Failed to serialize config")?;

        std::fs::write(&self.config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", self.config_path))
    }

    /// Applies one setting and persists the result.
    pub fn update(&self, config: &mut BotConfig, key: &str, value: &str) -> Result<()> {
        config.set(key, value)?;
        self.save(config)
    }

    /// Overwrites the settings file with defaults.
    pub fn reset(&self) -> Result<BotConfig> {
        let config = BotConfig::default();
        self.save(&config)?;
        Ok(config)
    }
}
