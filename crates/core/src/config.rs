//! Configuration model.
//!
//! `Config` is an immutable value built once (from TOML, environment
//! overrides, or code) and passed by reference to every component. Nothing
//! caches it globally.
//!
//! ```ignore
//! let config = Config::load("perfgate.toml")?.with_env_overrides()?;
//! config.validate()?;
//! ```

use crate::error::{ConfigError, ConfigResult};
use crate::filter::FilterSet;
use crate::sampling::SampleRate;
use crate::types::SubjectKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Global switch; when false nothing is captured
    #[serde(default)]
    pub enabled: bool,

    /// Fraction of eligible units of work to capture
    #[serde(default)]
    pub sample_rate: SampleRate,

    /// Propagate capture-path delivery errors instead of logging them
    #[serde(default)]
    pub debug: bool,

    /// Log capture-path delivery errors
    #[serde(default = "default_true")]
    pub log_errors: bool,

    /// Deployment environment, attached to every trace
    #[serde(default)]
    pub environment: String,

    /// Application version, attached to every trace
    #[serde(default)]
    pub app_version: String,

    /// Delivery settings
    #[serde(default)]
    pub sending: SendingConfig,

    /// Include lists, keyed by subject kind
    #[serde(default = "SubjectFilters::include_all")]
    pub include: SubjectFilters,

    /// Exclude lists, keyed by subject kind
    #[serde(default = "SubjectFilters::default_excludes")]
    pub exclude: SubjectFilters,
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enabled: false,
            sample_rate: SampleRate::default(),
            debug: false,
            log_errors: true,
            environment: String::new(),
            app_version: String::new(),
            sending: SendingConfig::default(),
            include: SubjectFilters::include_all(),
            exclude: SubjectFilters::default_excludes(),
        }
    }
}

impl Config {
    /// Parse a TOML document. Does not validate mode-specific settings.
    pub fn from_toml_str(s: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    /// Apply `PERFGATE_*` overrides from the process environment.
    pub fn with_env_overrides(self) -> ConfigResult<Self> {
        self.apply_env(|name| std::env::var(name).ok())
    }

    /// Apply `PERFGATE_*` overrides from an arbitrary lookup.
    ///
    /// Recognized: `PERFGATE_ENABLED`, `PERFGATE_SAMPLE_RATE`,
    /// `PERFGATE_SENDING_MODE`, `PERFGATE_API_KEY`, `PERFGATE_ENDPOINT`.
    pub fn apply_env<F>(mut self, lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("PERFGATE_ENABLED") {
            self.enabled = parse_bool(&raw).ok_or(ConfigError::InvalidOverride {
                variable: "PERFGATE_ENABLED",
                value: raw,
            })?;
        }
        if let Some(raw) = lookup("PERFGATE_SAMPLE_RATE") {
            let rate: f64 = raw.trim().parse().map_err(|_| ConfigError::InvalidOverride {
                variable: "PERFGATE_SAMPLE_RATE",
                value: raw.clone(),
            })?;
            self.sample_rate = SampleRate::new(rate)?;
        }
        if let Some(raw) = lookup("PERFGATE_SENDING_MODE") {
            self.sending.mode = raw.parse()?;
        }
        if let Some(raw) = lookup("PERFGATE_API_KEY") {
            self.sending.api_key = Some(raw);
        }
        if let Some(raw) = lookup("PERFGATE_ENDPOINT") {
            self.sending.endpoint = Some(raw);
        }
        Ok(self)
    }

    /// Check everything the selected sending mode needs, and compile every
    /// filter list so a bad regex is reported now rather than mid-request.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.sending.timeout == 0 {
            return Err(ConfigError::InvalidTimeout);
        }
        match self.sending.mode {
            SendingMode::Sync => {}
            SendingMode::File => {
                let path = self
                    .sending
                    .file
                    .path
                    .as_deref()
                    .ok_or(ConfigError::MissingSetting("sending.file.path"))?;
                validate_path("sending.file.path", path)?;
                validate_suffix(&self.sending.file.suffix)?;
            }
            SendingMode::Database => {
                let path = self
                    .sending
                    .database
                    .path
                    .as_deref()
                    .ok_or(ConfigError::MissingSetting("sending.database.path"))?;
                validate_path("sending.database.path", path)?;
                validate_table_name(&self.sending.database.table)?;
            }
        }

        for kind in SubjectKind::ALL {
            FilterSet::compile(self.include.get(kind))?;
            FilterSet::compile(self.exclude.get(kind))?;
        }
        Ok(())
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

/// Reject empty paths.
pub fn validate_path(setting: &'static str, path: &Path) -> ConfigResult<()> {
    if path.as_os_str().is_empty() {
        return Err(ConfigError::InvalidPath {
            setting,
            reason: "path is empty".to_string(),
        });
    }
    Ok(())
}

/// Table names are interpolated into SQL, so only plain identifiers pass.
pub fn validate_table_name(table: &str) -> ConfigResult<()> {
    let mut chars = table.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if !valid {
        return Err(ConfigError::InvalidTableName(table.to_string()));
    }
    Ok(())
}

/// Suffixes must be non-empty single path components.
pub fn validate_suffix(suffix: &str) -> ConfigResult<()> {
    if suffix.is_empty() || suffix.contains('/') || suffix.contains('\\') || suffix.contains('\0') {
        return Err(ConfigError::InvalidSuffix(suffix.to_string()));
    }
    Ok(())
}

/// Where captured traces go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SendingMode {
    /// Submit immediately on the capturing thread
    #[default]
    Sync,
    /// Buffer one file per trace in a directory
    File,
    /// Buffer one row per trace in a SQLite table
    Database,
}

impl SendingMode {
    /// Whether traces are buffered for a later drain.
    pub fn is_buffered(&self) -> bool {
        !matches!(self, SendingMode::Sync)
    }

    /// Lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            SendingMode::Sync => "sync",
            SendingMode::File => "file",
            SendingMode::Database => "database",
        }
    }
}

impl fmt::Display for SendingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SendingMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> ConfigResult<Self> {
        match s.trim() {
            "sync" => Ok(SendingMode::Sync),
            "file" => Ok(SendingMode::File),
            "database" => Ok(SendingMode::Database),
            other => Err(ConfigError::Parse(format!(
                "unknown sending mode {:?}, expected sync, file or database",
                other
            ))),
        }
    }
}

/// `[sending]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendingConfig {
    /// Sending mode
    #[serde(default)]
    pub mode: SendingMode,

    /// Per-submission timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Collector endpoint URL
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Collector API key
    #[serde(default)]
    pub api_key: Option<String>,

    /// File backend settings
    #[serde(default)]
    pub file: FileSettings,

    /// Table backend settings
    #[serde(default)]
    pub database: DatabaseSettings,
}

fn default_timeout() -> u64 {
    10
}

impl Default for SendingConfig {
    fn default() -> Self {
        Self {
            mode: SendingMode::Sync,
            timeout: default_timeout(),
            endpoint: None,
            api_key: None,
            file: FileSettings::default(),
            database: DatabaseSettings::default(),
        }
    }
}

/// `[sending.file]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileSettings {
    /// Spool directory
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Filename suffix identifying trace files
    #[serde(default = "default_suffix")]
    pub suffix: String,
}

fn default_suffix() -> String {
    ".trace".to_string()
}

impl Default for FileSettings {
    fn default() -> Self {
        Self {
            path: None,
            suffix: default_suffix(),
        }
    }
}

/// `[sending.database]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite database file
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Table holding buffered traces
    #[serde(default = "default_table")]
    pub table: String,
    /// How long a writer waits on a locked database
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u64,
}

fn default_table() -> String {
    "perfgate_traces".to_string()
}

fn default_busy_timeout() -> u64 {
    5000
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: None,
            table: default_table(),
            busy_timeout_ms: default_busy_timeout(),
        }
    }
}

/// Pattern lists keyed by subject kind. A missing key is an empty list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectFilters {
    /// HTTP requests
    #[serde(default)]
    pub http: Vec<String>,
    /// Console commands
    #[serde(default)]
    pub console: Vec<String>,
    /// Queued jobs
    #[serde(default)]
    pub queue: Vec<String>,
    /// Scheduled tasks
    #[serde(default)]
    pub schedule: Vec<String>,
    /// Exception reports
    #[serde(default)]
    pub exception: Vec<String>,
}

impl SubjectFilters {
    /// `["*"]` for every kind.
    pub fn include_all() -> Self {
        let all = vec!["*".to_string()];
        Self {
            http: all.clone(),
            console: all.clone(),
            queue: all.clone(),
            schedule: all.clone(),
            exception: all,
        }
    }

    /// Default exclusions: the queue worker command itself.
    pub fn default_excludes() -> Self {
        Self {
            console: vec!["queue:work".to_string()],
            ..Self::default()
        }
    }

    /// Patterns for one subject kind.
    pub fn get(&self, kind: SubjectKind) -> &[String] {
        match kind {
            SubjectKind::Http => &self.http,
            SubjectKind::Console => &self.console,
            SubjectKind::Queue => &self.queue,
            SubjectKind::Schedule => &self.schedule,
            SubjectKind::Exception => &self.exception,
        }
    }
}
