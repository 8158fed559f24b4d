//! Application configuration.
//!
//! # Responsibility
//! - Load settings from an optional TOML file.
//! - Apply `CHECKIN_*` environment overrides on top.
//!
//! # Invariants
//! - A returned `AppConfig` has passed `validate()`.
//! - Missing keys fall back to defaults; unknown keys are rejected.

use crate::logging::normalize_level;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_DATABASE_PATH: &str = "CHECKIN_DATABASE_PATH";
pub const ENV_LOG_DIR: &str = "CHECKIN_LOG_DIR";
pub const ENV_LOG_LEVEL: &str = "CHECKIN_LOG_LEVEL";
pub const ENV_SENDER_EMAIL: &str = "CHECKIN_SENDER_EMAIL";
pub const ENV_OUTBOX_DIR: &str = "CHECKIN_OUTBOX_DIR";
pub const ENV_DISPATCH_TIMEOUT_SECS: &str = "CHECKIN_DISPATCH_TIMEOUT_SECS";

#[derive(Debug)]
pub enum ConfigError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    InvalidValue {
        key: &'static str,
        message: String,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "failed to parse config `{}`: {source}", path.display())
            }
            Self::InvalidValue { key, message } => write!(f, "invalid `{key}`: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::InvalidValue { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// SQLite database file.
    pub database_path: PathBuf,
    /// Rolling log directory; stderr only when unset.
    pub log_dir: Option<PathBuf>,
    pub log_level: String,
    /// `From` address of reminder emails.
    pub sender_email: String,
    /// Directory the outbox transport writes messages to.
    pub outbox_dir: PathBuf,
    pub dispatch_timeout_secs: u64,
    /// HTML template override; the built-in template is used when unset.
    pub email_template_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("checkin.sqlite3"),
            log_dir: None,
            log_level: crate::logging::default_log_level().to_string(),
            sender_email: "reminders@localhost".to_string(),
            outbox_dir: PathBuf::from("outbox"),
            dispatch_timeout_secs: 30,
            email_template_path: None,
        }
    }
}

impl AppConfig {
    /// Loads `path` (when given), applies process environment overrides and
    /// validates the result.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Overrides fields from `lookup(ENV_*)`; blank values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(value) = get(ENV_DATABASE_PATH) {
            self.database_path = PathBuf::from(value);
        }
        if let Some(value) = get(ENV_LOG_DIR) {
            self.log_dir = Some(PathBuf::from(value));
        }
        if let Some(value) = get(ENV_LOG_LEVEL) {
            self.log_level = value;
        }
        if let Some(value) = get(ENV_SENDER_EMAIL) {
            self.sender_email = value;
        }
        if let Some(value) = get(ENV_OUTBOX_DIR) {
            self.outbox_dir = PathBuf::from(value);
        }
        if let Some(value) = get(ENV_DISPATCH_TIMEOUT_SECS) {
            self.dispatch_timeout_secs =
                value
                    .parse::<u64>()
                    .map_err(|err| ConfigError::InvalidValue {
                        key: "dispatch_timeout_secs",
                        message: format!("`{value}` is not a whole number of seconds: {err}"),
                    })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dispatch_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "dispatch_timeout_secs",
                message: "must be greater than zero".to_string(),
            });
        }
        if self.sender_email.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "sender_email",
                message: "must not be blank".to_string(),
            });
        }
        if self.database_path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "database_path",
                message: "must not be empty".to_string(),
            });
        }
        normalize_level(&self.log_level).map_err(|err| ConfigError::InvalidValue {
            key: "log_level",
            message: err.to_string(),
        })?;
        Ok(())
    }

    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_secs(self.dispatch_timeout_secs)
    }
}
