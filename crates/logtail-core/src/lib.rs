//! Log tailing for logtail
//!
//! This crate provides the file tailer, severity classification, filtering,
//! preferences and the console that ties them together.

mod buffer;
mod classifier;
pub mod config;
mod console;
mod error;
mod filter;
pub mod lifecycle;
mod prefs;
mod source;
mod tailer;

pub use buffer::{FilteredView, LevelCounts, OriginalBuffer};
pub use classifier::{DEFAULT_PREFIX_LEN, SeverityClassifier, default_markers};
pub use config::Config;
pub use console::{ConsoleOptions, DisplaySurface, LogConsole, LogConsoleCore};
pub use error::{ConfigError, FilterError, PreferencesError, SourceError};
pub use filter::{ClassificationState, FilterPolicy, TextFilter};
pub use lifecycle::{TerminationNotifier, TerminationSource};
pub use prefs::{FilterPreferences, JsonPreferences, MemoryPreferences, PreferencesStore};
pub use source::{FileLineSource, LineSource};
pub use tailer::{ActivityGate, LineSink, LogTailer, TailerConfig, TailerState, always_active};

// Re-export types used in our public API
pub use logtail_types::{LogLine, Severity, SeverityInfo, SeverityMapping};
