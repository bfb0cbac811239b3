use regex::{Regex, RegexBuilder};
use std::collections::HashMap;

use logtail_types::Severity;

/// Bytes at the start of a line searched for a severity marker
pub const DEFAULT_PREFIX_LEN: usize = 80;

/// Built-in marker table
pub fn default_markers() -> Vec<(String, Severity)> {
    [
        ("TRACE", Severity::Trace),
        ("DEBUG", Severity::Debug),
        ("FINE", Severity::Debug),
        ("INFO", Severity::Info),
        ("WARN", Severity::Warning),
        ("WARNING", Severity::Warning),
        ("ERROR", Severity::Error),
        ("SEVERE", Severity::Error),
        ("FATAL", Severity::Fatal),
        ("CRITICAL", Severity::Fatal),
        ("PANIC", Severity::Fatal),
    ]
    .into_iter()
    .map(|(marker, severity)| (marker.to_string(), severity))
    .collect()
}

/// Detects the severity marker of a raw log line
///
/// A marker is a whole word (`ERROR`, `[WARN]`, `INFO:`) found within the
/// first `prefix_len` bytes of the line. The leftmost marker wins. Lines
/// without a marker are continuation lines and classify as `None`.
#[derive(Clone, Debug)]
pub struct SeverityClassifier {
    /// Alternation of all markers, `None` when the table is empty
    pattern: Option<Regex>,

    /// Marker to severity; keys are uppercased when matching ignores case
    markers: HashMap<String, Severity>,

    prefix_len: usize,
    case_sensitive: bool,
}

impl SeverityClassifier {
    /// Build a classifier from a marker table
    pub fn new<I, S>(markers: I, prefix_len: usize, case_sensitive: bool) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = (S, Severity)>,
        S: AsRef<str>,
    {
        let markers: HashMap<String, Severity> = markers
            .into_iter()
            .map(|(marker, severity)| (marker_key(marker.as_ref().trim(), case_sensitive), severity))
            .filter(|(marker, _)| !marker.is_empty())
            .collect();

        let pattern = if markers.is_empty() {
            None
        } else {
            // Longest first so that the alternation prefers WARNING over WARN
            let mut alternatives: Vec<&String> = markers.keys().collect();
            alternatives.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
            let body = alternatives
                .iter()
                .map(|m| bounded(m))
                .collect::<Vec<_>>()
                .join("|");
            Some(
                RegexBuilder::new(&format!("(?:{})", body))
                    .case_insensitive(!case_sensitive)
                    .build()?,
            )
        };

        Ok(Self {
            pattern,
            markers,
            prefix_len,
            case_sensitive,
        })
    }

    /// A classifier that never detects a severity
    pub fn without_markers() -> Self {
        Self {
            pattern: None,
            markers: HashMap::new(),
            prefix_len: DEFAULT_PREFIX_LEN,
            case_sensitive: true,
        }
    }

    /// Detect the severity marker of a line, if any
    pub fn classify(&self, line: &str) -> Option<Severity> {
        let pattern = self.pattern.as_ref()?;
        let prefix = &line[..floor_char_boundary(line, self.prefix_len)];
        let found = pattern.find(prefix)?;
        self.markers
            .get(&marker_key(found.as_str(), self.case_sensitive))
            .copied()
    }
}

fn marker_key(marker: &str, case_sensitive: bool) -> String {
    if case_sensitive {
        marker.to_string()
    } else {
        marker.to_uppercase()
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Escape a marker, requiring a word boundary only on the sides that end in
/// a word character, so `[E]` and `E/` still match before a space
fn bounded(marker: &str) -> String {
    let mut out = String::new();
    if marker.chars().next().is_some_and(is_word_char) {
        out.push_str(r"\b");
    }
    out.push_str(&regex::escape(marker));
    if marker.chars().last().is_some_and(is_word_char) {
        out.push_str(r"\b");
    }
    out
}

impl Default for SeverityClassifier {
    fn default() -> Self {
        Self::new(default_markers(), DEFAULT_PREFIX_LEN, true)
            .unwrap_or_else(|_| Self::without_markers())
    }
}

/// Find the largest valid char boundary <= the given byte index
fn floor_char_boundary(s: &str, mut idx: usize) -> usize {
    if idx >= s.len() {
        return s.len();
    }
    // Walk backwards to find a valid char boundary
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_at_line_start() {
        let classifier = SeverityClassifier::default();
        assert_eq!(classifier.classify("ERROR boom"), Some(Severity::Error));
        assert_eq!(classifier.classify("INFO ok"), Some(Severity::Info));
        assert_eq!(classifier.classify("WARNING: disk low"), Some(Severity::Warning));
    }

    #[test]
    fn test_marker_after_timestamp() {
        let classifier = SeverityClassifier::default();
        let line = "2024-01-15 10:30:00,123 [main] WARN  com.example.Service - slow";
        assert_eq!(classifier.classify(line), Some(Severity::Warning));
        assert_eq!(classifier.classify("[ERROR] something went wrong"), Some(Severity::Error));
    }

    #[test]
    fn test_continuation_lines_have_no_marker() {
        let classifier = SeverityClassifier::default();
        assert_eq!(classifier.classify("  at foo()"), None);
        assert_eq!(classifier.classify(""), None);
        // Markers must be whole words
        assert_eq!(classifier.classify("ERRORS_TOTAL=3"), None);
        assert_eq!(classifier.classify("INFORMATIONAL text"), None);
    }

    #[test]
    fn test_case_sensitivity() {
        let classifier = SeverityClassifier::default();
        assert_eq!(classifier.classify("error: lowercase"), None);

        let insensitive = SeverityClassifier::new(default_markers(), DEFAULT_PREFIX_LEN, false).unwrap();
        assert_eq!(insensitive.classify("error: lowercase"), Some(Severity::Error));
    }

    #[test]
    fn test_marker_outside_prefix_is_ignored() {
        let classifier = SeverityClassifier::new(default_markers(), 10, true).unwrap();
        assert_eq!(classifier.classify("0123456789 ERROR late"), None);
        assert_eq!(classifier.classify("ERROR early"), Some(Severity::Error));
    }

    #[test]
    fn test_leftmost_marker_wins() {
        let classifier = SeverityClassifier::default();
        assert_eq!(classifier.classify("INFO retrying after ERROR"), Some(Severity::Info));
    }

    #[test]
    fn test_custom_markers() {
        let classifier = SeverityClassifier::new([("E", Severity::Error), ("W", Severity::Warning)], 4, true).unwrap();
        assert_eq!(classifier.classify("E/net: down"), Some(Severity::Error));
        assert_eq!(classifier.classify("W/ui: jank"), Some(Severity::Warning));
        assert_eq!(classifier.classify("ERROR"), None);
    }

    #[test]
    fn test_custom_markers_keep_their_spelling() {
        let classifier = SeverityClassifier::new([("warn", Severity::Warning)], 80, true).unwrap();
        assert_eq!(classifier.classify("warn: low disk"), Some(Severity::Warning));
        assert_eq!(classifier.classify("WARN: low disk"), None);

        let insensitive = SeverityClassifier::new([("warn", Severity::Warning)], 80, false).unwrap();
        assert_eq!(insensitive.classify("WARN: low disk"), Some(Severity::Warning));
        assert_eq!(insensitive.classify("Warn: low disk"), Some(Severity::Warning));
    }

    #[test]
    fn test_punctuated_markers() {
        let classifier = SeverityClassifier::new(
            [("[E]", Severity::Error), ("E/", Severity::Error), ("<W>", Severity::Warning)],
            80,
            true,
        )
        .unwrap();
        assert_eq!(classifier.classify("[E] boom"), Some(Severity::Error));
        assert_eq!(classifier.classify("E/ boom"), Some(Severity::Error));
        assert_eq!(classifier.classify("10:30 <W> slow"), Some(Severity::Warning));
        assert_eq!(classifier.classify("SOME/ path"), None);
    }

    #[test]
    fn test_empty_marker_table() {
        let classifier = SeverityClassifier::new(Vec::<(String, Severity)>::new(), 80, true).unwrap();
        assert_eq!(classifier.classify("ERROR boom"), None);
    }

    #[test]
    fn test_multibyte_prefix_no_panic() {
        let classifier = SeverityClassifier::new(default_markers(), 5, true).unwrap();
        // Box-drawing characters are 3 bytes each, the cut lands mid-char
        assert_eq!(classifier.classify("──────── ERROR"), None);
    }
}
