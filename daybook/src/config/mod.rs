//! Configuration system for Daybook.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/daybook/config.toml`)
//! 4. Compiled defaults
//!
//! Missing config file is not an error (defaults are used). An explicit
//! `--config` path that doesn't exist is an error.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use daybook_model::MAX_TASK_TITLE_LENGTH;

/// File name of the task database inside the data directory.
pub const TASKS_DB_FILE: &str = "tasks.db";

/// File name of the notes database inside the data directory.
pub const NOTES_DB_FILE: &str = "notes.db";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),

    /// Neither the CLI, the file, nor the platform gave a data directory.
    #[error("could not determine data directory (pass --data-dir or set DAYBOOK_DATA_DIR)")]
    NoDataDir,

    /// A configured value is out of range.
    #[error("invalid value for {key}: {reason}")]
    Invalid {
        /// Dotted config key.
        key: &'static str,
        /// What was wrong with it.
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

/// Top-level TOML config file structure.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    storage: StorageFileConfig,
    tasks: TasksFileConfig,
}

/// `[storage]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct StorageFileConfig {
    data_dir: Option<PathBuf>,
    busy_timeout_ms: Option<u64>,
}

/// `[tasks]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct TasksFileConfig {
    max_title_len: Option<usize>,
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

/// Fully resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaybookConfig {
    /// Directory holding the database files.
    pub data_dir: PathBuf,
    /// How long SQLite waits on a locked database before failing.
    pub busy_timeout: Duration,
    /// Maximum task title length in characters.
    pub max_title_len: usize,
}

impl DaybookConfig {
    const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

    /// Defaults rooted at the given data directory.
    #[must_use]
    pub const fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            busy_timeout: Self::DEFAULT_BUSY_TIMEOUT,
            max_title_len: MAX_TASK_TITLE_LENGTH,
        }
    }

    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// If `--config` is given and the file does not exist, returns an
    /// error. Otherwise the default path is tried and silently ignored if
    /// missing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the config file cannot be read or parsed,
    /// if a value is out of range, or if no data directory can be found.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Self::resolve(cli, &file, dirs::data_dir().map(|d| d.join("daybook")))
    }

    /// Resolve from CLI args, a parsed config file, and the platform data
    /// directory. Priority: CLI > file > default.
    fn resolve(
        cli: &CliArgs,
        file: &ConfigFile,
        platform_data_dir: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let data_dir = cli
            .data_dir
            .clone()
            .or_else(|| file.storage.data_dir.clone())
            .or(platform_data_dir)
            .ok_or(ConfigError::NoDataDir)?;
        let defaults = Self::with_data_dir(data_dir);

        let max_title_len = file
            .tasks
            .max_title_len
            .unwrap_or(defaults.max_title_len);
        if max_title_len == 0 {
            return Err(ConfigError::Invalid {
                key: "tasks.max_title_len",
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            busy_timeout: file
                .storage
                .busy_timeout_ms
                .map_or(defaults.busy_timeout, Duration::from_millis),
            max_title_len,
            ..defaults
        })
    }

    /// Path of the task database.
    #[must_use]
    pub fn tasks_db_path(&self) -> PathBuf {
        self.data_dir.join(TASKS_DB_FILE)
    }

    /// Path of the notes database.
    #[must_use]
    pub fn notes_db_path(&self) -> PathBuf {
        self.data_dir.join(NOTES_DB_FILE)
    }
}

/// CLI arguments parsed by clap.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Show the day's tasks and notes")]
pub struct CliArgs {
    /// Directory holding `tasks.db` and `notes.db`.
    #[arg(long, env = "DAYBOOK_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Path to config file (default: `~/.config/daybook/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "DAYBOOK_LOG")]
    pub log_level: String,

    /// Write logs to this file instead of stderr.
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Day to show, as `YYYY-MM-DD` (default: today, UTC).
    #[arg(long)]
    pub date: Option<NaiveDate>,
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Load and parse a TOML config file.
///
/// If `explicit_path` is `Some`, the file must exist (error if not).
/// If `explicit_path` is `None`, the default path is tried and missing file
/// is treated as empty config.
fn load_config_file(explicit_path: Option<&Path>) -> Result<ConfigFile, ConfigError> {
    let path = if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    } else {
        let Some(config_dir) = dirs::config_dir() else {
            return Ok(ConfigFile::default());
        };
        config_dir.join("daybook").join("config.toml")
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
