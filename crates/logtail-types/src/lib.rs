//! Shared types for logtail
//!
//! This crate contains data structures used across multiple logtail crates.

use ratatui::style::Color;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// ============================================================================
// Severity
// ============================================================================

/// Log line severity, ordered by increasing priority
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Trace,
    Debug,
    Info,
    Warning,
    Error,
    Fatal,
}

impl Severity {
    /// All severities, lowest priority first
    pub const ALL: [Severity; 6] = [
        Self::Trace,
        Self::Debug,
        Self::Info,
        Self::Warning,
        Self::Error,
        Self::Fatal,
    ];

    /// Parse a severity name from common spellings
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "trace" | "trc" => Some(Self::Trace),
            "debug" | "dbg" | "fine" => Some(Self::Debug),
            "info" | "inf" | "information" => Some(Self::Info),
            "warn" | "warning" | "wrn" => Some(Self::Warning),
            "error" | "err" | "severe" => Some(Self::Error),
            "fatal" | "critical" | "crit" | "panic" | "ftl" => Some(Self::Fatal),
            _ => None,
        }
    }

    /// Get display color for this severity
    pub fn color(&self) -> Color {
        match self {
            Self::Trace => Color::DarkGray,
            Self::Debug => Color::Cyan,
            Self::Info => Color::Green,
            Self::Warning => Color::Yellow,
            Self::Error => Color::Red,
            Self::Fatal => Color::Magenta,
        }
    }

    /// Short display string (3 chars)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "TRC",
            Self::Debug => "DBG",
            Self::Info => "INF",
            Self::Warning => "WRN",
            Self::Error => "ERR",
            Self::Fatal => "FTL",
        }
    }

    /// Human readable label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Trace => "Trace",
            Self::Debug => "Debug",
            Self::Info => "Info",
            Self::Warning => "Warning",
            Self::Error => "Error",
            Self::Fatal => "Fatal",
        }
    }

    /// Whether continuation lines after this severity render as error output
    pub fn is_error(&self) -> bool {
        *self >= Self::Error
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-severity presentation settings supplied by the host
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeverityInfo {
    pub severity: Severity,
    pub enabled_by_default: bool,
    pub label: &'static str,
    pub color: Color,
}

/// Severity to {enabled-by-default, label, color} mapping
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeverityMapping {
    entries: Vec<SeverityInfo>,
}

impl SeverityMapping {
    /// Mapping with only the given severities enabled by default
    pub fn with_enabled<I>(enabled: I) -> Self
    where
        I: IntoIterator<Item = Severity>,
    {
        let enabled: BTreeSet<Severity> = enabled.into_iter().collect();
        let mut mapping = Self::default();
        for entry in &mut mapping.entries {
            entry.enabled_by_default = enabled.contains(&entry.severity);
        }
        mapping
    }

    /// Look up the settings for a severity
    pub fn info(&self, severity: Severity) -> &SeverityInfo {
        // entries always holds one item per severity, in `Severity::ALL` order
        &self.entries[severity as usize]
    }

    /// Severities that start out enabled
    pub fn default_enabled(&self) -> BTreeSet<Severity> {
        self.entries
            .iter()
            .filter(|e| e.enabled_by_default)
            .map(|e| e.severity)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SeverityInfo> {
        self.entries.iter()
    }
}

impl Default for SeverityMapping {
    fn default() -> Self {
        Self {
            entries: Severity::ALL
                .iter()
                .map(|&severity| SeverityInfo {
                    severity,
                    enabled_by_default: true,
                    label: severity.label(),
                    color: severity.color(),
                })
                .collect(),
        }
    }
}

// ============================================================================
// Log Lines
// ============================================================================

/// A single classified log line
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogLine {
    /// Original raw text, without line terminator
    pub text: String,

    /// Severity detected on this line itself
    pub severity: Option<Severity>,

    /// Display kind: the line's own severity, or `Error` for continuation
    /// lines that follow an error; `None` renders as normal output
    pub style: Option<Severity>,
}

impl LogLine {
    pub fn new(text: String, severity: Option<Severity>, style: Option<Severity>) -> Self {
        Self {
            text,
            severity,
            style,
        }
    }

    /// A line with no severity information
    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text.into(), None, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Trace < Severity::Info);
        assert!(Severity::Warning < Severity::Error);
        assert!(Severity::Error < Severity::Fatal);
        assert!(Severity::Fatal.is_error());
        assert!(!Severity::Warning.is_error());
    }

    #[test]
    fn test_severity_parse() {
        assert_eq!(Severity::parse("WARN"), Some(Severity::Warning));
        assert_eq!(Severity::parse(" severe "), Some(Severity::Error));
        assert_eq!(Severity::parse("verbose"), None);
    }

    #[test]
    fn test_severity_serde_names() {
        let json = serde_json::to_string(&Severity::Warning).unwrap();
        assert_eq!(json, "\"warning\"");
        let parsed: Severity = serde_json::from_str("\"fatal\"").unwrap();
        assert_eq!(parsed, Severity::Fatal);
    }

    #[test]
    fn test_mapping_lookup_matches_severity() {
        let mapping = SeverityMapping::default();
        for severity in Severity::ALL {
            assert_eq!(mapping.info(severity).severity, severity);
        }
        assert_eq!(mapping.default_enabled().len(), Severity::ALL.len());
    }

    #[test]
    fn test_mapping_with_enabled() {
        let mapping = SeverityMapping::with_enabled([Severity::Error, Severity::Fatal]);
        let enabled = mapping.default_enabled();
        assert!(enabled.contains(&Severity::Error));
        assert!(!enabled.contains(&Severity::Info));
        assert!(!mapping.info(Severity::Debug).enabled_by_default);
    }
}
