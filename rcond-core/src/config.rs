//! Session options.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Invalid option: {0}")]
    Invalid(String),
}

/// What happens to a warning nobody handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarnMode {
    /// Dropped
    Ignore,
    /// Buffered until the next checkpoint
    #[default]
    Deferred,
    /// Printed as soon as it is signaled
    Immediate,
    /// Re-signaled as an error
    Error,
}

impl FromStr for WarnMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ignore" => Ok(WarnMode::Ignore),
            "deferred" => Ok(WarnMode::Deferred),
            "immediate" => Ok(WarnMode::Immediate),
            "error" => Ok(WarnMode::Error),
            other => Err(ConfigError::Invalid(format!("unknown warn mode '{}'", other))),
        }
    }
}

impl fmt::Display for WarnMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WarnMode::Ignore => write!(f, "ignore"),
            WarnMode::Deferred => write!(f, "deferred"),
            WarnMode::Immediate => write!(f, "immediate"),
            WarnMode::Error => write!(f, "error"),
        }
    }
}

/// Options owned by a single session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionOptions {
    #[serde(default)]
    pub warn: WarnMode,

    #[serde(default = "default_max_warnings")]
    pub max_warnings: usize,

    #[serde(default = "default_message_length")]
    pub message_length: usize,

    #[serde(default = "default_true")]
    pub show_error_calls: bool,
}

fn default_max_warnings() -> usize {
    50
}

fn default_message_length() -> usize {
    1000
}

fn default_true() -> bool {
    true
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            warn: WarnMode::default(),
            max_warnings: default_max_warnings(),
            message_length: default_message_length(),
            show_error_calls: default_true(),
        }
    }
}

impl SessionOptions {
    /// Load options from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&contents)
    }

    /// Parse options from YAML text
    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        // An empty document is a valid "all defaults" file
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        let options: SessionOptions = serde_yaml::from_str(contents)?;
        options.validate()?;
        Ok(options)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.message_length == 0 {
            return Err(ConfigError::Invalid(
                "message_length must be positive".to_string(),
            ));
        }
        if self.max_warnings == 0 {
            return Err(ConfigError::Invalid(
                "max_warnings must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_warn(mut self, warn: WarnMode) -> Self {
        self.warn = warn;
        self
    }

    /// Set the deferred warning cap; at least one warning is always kept
    pub fn with_max_warnings(mut self, max_warnings: usize) -> Self {
        self.max_warnings = max_warnings.max(1);
        self
    }
}
