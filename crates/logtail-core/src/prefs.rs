//! Filter preference persistence
//!
//! Stores the enabled severities and the last text filter per console,
//! keyed by a caller-supplied identifier (usually the tailed file path).
//! The JSON store lives in `~/.logtail/preferences.json`.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::io;
use std::path::PathBuf;
use tracing::warn;

use logtail_types::Severity;

use crate::error::PreferencesError;

/// Persisted filter settings for one console
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterPreferences {
    pub enabled: BTreeSet<Severity>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_filter: Option<String>,

    /// Whether `text_filter` is a regular expression
    #[serde(default)]
    pub pattern: bool,
}

/// Backing store for filter preferences
pub trait PreferencesStore: Send {
    fn load(&self, key: &str) -> Option<FilterPreferences>;

    fn save(&mut self, key: &str, prefs: &FilterPreferences) -> Result<(), PreferencesError>;
}

/// In-process store, nothing survives a restart
#[derive(Debug, Default)]
pub struct MemoryPreferences {
    entries: HashMap<String, FilterPreferences>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferencesStore for MemoryPreferences {
    fn load(&self, key: &str) -> Option<FilterPreferences> {
        self.entries.get(key).cloned()
    }

    fn save(&mut self, key: &str, prefs: &FilterPreferences) -> Result<(), PreferencesError> {
        self.entries.insert(key.to_string(), prefs.clone());
        Ok(())
    }
}

/// On-disk layout of the preferences file
#[derive(Debug, Default, Serialize, Deserialize)]
struct PreferencesFile {
    #[serde(default)]
    consoles: BTreeMap<String, FilterPreferences>,
}

/// JSON file store
#[derive(Debug, Clone)]
pub struct JsonPreferences {
    path: PathBuf,
}

impl JsonPreferences {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the default preferences file path
    pub fn default_path() -> Option<PathBuf> {
        let home = dirs::home_dir()?;
        Some(home.join(".logtail").join("preferences.json"))
    }

    /// A missing file reads as empty
    fn read_file(&self) -> Result<PreferencesFile, PreferencesError> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(PreferencesFile::default()),
            Err(e) => Err(e.into()),
        }
    }
}

impl PreferencesStore for JsonPreferences {
    fn load(&self, key: &str) -> Option<FilterPreferences> {
        match self.read_file() {
            Ok(mut file) => file.consoles.remove(key),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Ignoring unreadable preferences");
                None
            }
        }
    }

    /// Fails rather than overwrite a file that could not be read, so other
    /// consoles' entries survive
    fn save(&mut self, key: &str, prefs: &FilterPreferences) -> Result<(), PreferencesError> {
        let mut file = self.read_file()?;
        file.consoles.insert(key.to_string(), prefs.clone());

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&file)?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FilterPreferences {
        FilterPreferences {
            enabled: [Severity::Warning, Severity::Error].into_iter().collect(),
            text_filter: Some("timeout".to_string()),
            pattern: false,
        }
    }

    #[test]
    fn test_memory_store() {
        let mut store = MemoryPreferences::new();
        assert!(store.load("a").is_none());
        store.save("a", &sample()).unwrap();
        assert_eq!(store.load("a"), Some(sample()));
        assert!(store.load("b").is_none());
    }

    #[test]
    fn test_json_store_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("prefs.json");
        let mut store = JsonPreferences::new(&path);

        store.save("/var/log/app.log", &sample()).unwrap();
        assert!(path.exists());

        let reopened = JsonPreferences::new(&path);
        assert_eq!(reopened.load("/var/log/app.log"), Some(sample()));
    }

    #[test]
    fn test_json_store_keeps_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonPreferences::new(dir.path().join("prefs.json"));

        store.save("one", &sample()).unwrap();
        store.save("two", &FilterPreferences::default()).unwrap();

        assert_eq!(store.load("one"), Some(sample()));
        assert_eq!(store.load("two"), Some(FilterPreferences::default()));
    }

    #[test]
    fn test_corrupt_file_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        fs::write(&path, "{ not json").unwrap();
        let mut store = JsonPreferences::new(&path);
        assert!(store.load("anything").is_none());

        assert!(matches!(
            store.save("anything", &sample()),
            Err(PreferencesError::Json(_))
        ));
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json");
    }
}
