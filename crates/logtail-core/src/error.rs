//! Error types for the tailing core

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failure to open a log file for tailing
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("log source unavailable: {path}: {source}")]
    Unavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl SourceError {
    pub fn unavailable(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Unavailable {
            path: path.into(),
            source,
        }
    }
}

/// Invalid text filter
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("invalid filter pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Configuration file errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid severity marker table: {0}")]
    Markers(#[from] regex::Error),

    #[error("invalid tailer setting: {message}")]
    Tailer { message: String },
}

/// Preferences store errors
#[derive(Debug, Error)]
pub enum PreferencesError {
    #[error("preferences I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("preferences encoding error: {0}")]
    Json(#[from] serde_json::Error),
}
