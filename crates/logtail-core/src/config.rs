//! Configuration file support
//!
//! Loaded from `~/.logtail/config.toml` unless a path is given. Every
//! section is optional:
//!
//! ```toml
//! [tailer]
//! slice_ms = 200
//! idle_ms = 200
//! inactive_divisor = 4
//!
//! [classifier]
//! prefix_len = 80
//! case_sensitive = true
//!
//! [classifier.markers]
//! "E/" = "error"
//!
//! [display]
//! enabled = ["info", "warning", "error", "fatal"]
//! ```

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use logtail_types::{Severity, SeverityMapping};

use crate::classifier::{DEFAULT_PREFIX_LEN, SeverityClassifier, default_markers};
use crate::error::ConfigError;
use crate::tailer::TailerConfig;

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub tailer: TailerSection,
    pub classifier: ClassifierSection,
    pub display: DisplaySection,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct TailerSection {
    pub slice_ms: u64,
    pub idle_ms: u64,
    pub inactive_divisor: u32,
}

impl Default for TailerSection {
    fn default() -> Self {
        let defaults = TailerConfig::default();
        Self {
            slice_ms: defaults.slice.as_millis() as u64,
            idle_ms: defaults.idle_timeout.as_millis() as u64,
            inactive_divisor: defaults.inactive_divisor,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ClassifierSection {
    pub prefix_len: usize,
    pub case_sensitive: bool,

    /// Replaces the built-in marker table when present
    pub markers: Option<BTreeMap<String, Severity>>,
}

impl Default for ClassifierSection {
    fn default() -> Self {
        Self {
            prefix_len: DEFAULT_PREFIX_LEN,
            case_sensitive: true,
            markers: None,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct DisplaySection {
    /// Severities shown when no preferences are stored; all when absent
    pub enabled: Option<Vec<Severity>>,
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Option<PathBuf> {
        let home = dirs::home_dir()?;
        Some(home.join(".logtail").join("config.toml"))
    }

    /// Load the default config file; a missing file yields defaults
    pub fn load_default() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) => Self::load_optional(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load a config file that must exist
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    fn load_optional(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn tailer_config(&self) -> Result<TailerConfig, ConfigError> {
        let section = &self.tailer;
        if section.slice_ms == 0 || section.idle_ms == 0 {
            return Err(ConfigError::Tailer {
                message: "slice_ms and idle_ms must be positive".to_string(),
            });
        }
        if section.inactive_divisor == 0 {
            return Err(ConfigError::Tailer {
                message: "inactive_divisor must be at least 1".to_string(),
            });
        }
        Ok(TailerConfig {
            slice: Duration::from_millis(section.slice_ms),
            idle_timeout: Duration::from_millis(section.idle_ms),
            inactive_divisor: section.inactive_divisor,
        })
    }

    pub fn classifier(&self) -> Result<SeverityClassifier, ConfigError> {
        let section = &self.classifier;
        let markers = match &section.markers {
            Some(markers) => markers.iter().map(|(m, s)| (m.clone(), *s)).collect(),
            None => default_markers(),
        };
        Ok(SeverityClassifier::new(
            markers,
            section.prefix_len,
            section.case_sensitive,
        )?)
    }

    pub fn severity_mapping(&self) -> SeverityMapping {
        match &self.display.enabled {
            Some(enabled) => SeverityMapping::with_enabled(enabled.iter().copied()),
            None => SeverityMapping::default(),
        }
    }
}
