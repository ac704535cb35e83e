//! Error types for the library surfaces.
//!
//! The Gmail and database glue use `anyhow` with context; the pieces callers
//! match on get a dedicated enum here.

use std::path::PathBuf;
use thiserror::Error;

/// Settings file and settings-key errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read settings file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse settings file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to write settings file {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Unknown setting '{0}'")]
    UnknownKey(String),

    #[error("Invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("Could not determine the home directory")]
    NoHomeDir,
}

impl ConfigError {
    pub fn invalid_value(key: &str, value: &str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Raised by the readiness poller
#[derive(Debug, Error)]
pub enum ReadinessError {
    #[error("Resource not ready after {attempts} attempts: {last_reason}")]
    Exhausted { attempts: u32, last_reason: String },

    #[error("Readiness probe failed: {0}")]
    Fatal(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum UnsubscribeError {
    #[error("Mismatch between number of unsubscribe links ({links}) and senders ({senders})")]
    LengthMismatch { links: usize, senders: usize },

    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}
