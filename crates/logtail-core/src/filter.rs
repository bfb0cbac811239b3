use regex::{Regex, RegexBuilder};
use std::collections::BTreeSet;
use tracing::warn;

use logtail_types::{LogLine, Severity, SeverityMapping};

use crate::error::FilterError;
use crate::prefs::FilterPreferences;

/// Severity carried across lines so continuation lines inherit the last
/// explicitly tagged severity
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClassificationState {
    previous: Option<Severity>,
}

impl ClassificationState {
    pub fn previous(&self) -> Option<Severity> {
        self.previous
    }

    /// Record the severity of a line; untagged lines leave the state as is
    pub fn observe(&mut self, severity: Option<Severity>) {
        if severity.is_some() {
            self.previous = severity;
        }
    }

    pub fn reset(&mut self) {
        self.previous = None;
    }
}

/// Compiled case-insensitive text predicate
#[derive(Clone)]
pub struct TextFilter {
    /// Original text as typed by the user
    source: String,

    /// Whether `source` is a regular expression rather than a literal
    is_pattern: bool,

    regex: Regex,
}

impl TextFilter {
    /// Literal substring, matched case-insensitively
    pub fn substring(text: &str) -> Result<Self, FilterError> {
        let regex = RegexBuilder::new(&regex::escape(text))
            .case_insensitive(true)
            .build()?;
        Ok(Self {
            source: text.to_string(),
            is_pattern: false,
            regex,
        })
    }

    /// Regular expression, matched case-insensitively
    pub fn pattern(pattern: &str) -> Result<Self, FilterError> {
        let regex = RegexBuilder::new(pattern).case_insensitive(true).build()?;
        Ok(Self {
            source: pattern.to_string(),
            is_pattern: true,
            regex,
        })
    }

    pub fn matches(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// Find all match positions in a string (for highlighting)
    pub fn find_matches(&self, text: &str) -> Vec<(usize, usize)> {
        self.regex
            .find_iter(text)
            .filter(|m| !m.is_empty())
            .map(|m| (m.start(), m.end()))
            .collect()
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_pattern(&self) -> bool {
        self.is_pattern
    }
}

impl std::fmt::Debug for TextFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextFilter")
            .field("source", &self.source)
            .field("is_pattern", &self.is_pattern)
            .finish()
    }
}

/// Decides which classified lines are shown
///
/// A line is admitted when its effective severity (its own, or the one
/// carried forward from the last tagged line) is enabled and the optional
/// text filter matches. Lines seen before any severity was established pass
/// the severity test unconditionally.
#[derive(Clone, Debug)]
pub struct FilterPolicy {
    enabled: BTreeSet<Severity>,
    text: Option<TextFilter>,
}

impl FilterPolicy {
    /// Create a policy enabling the given severities
    pub fn new<I>(enabled: I) -> Self
    where
        I: IntoIterator<Item = Severity>,
    {
        Self {
            enabled: enabled.into_iter().collect(),
            text: None,
        }
    }

    /// Policy with every severity enabled
    pub fn all() -> Self {
        Self::new(Severity::ALL)
    }

    /// Policy using the host's enabled-by-default settings
    pub fn from_mapping(mapping: &SeverityMapping) -> Self {
        Self::new(mapping.default_enabled())
    }

    /// Restore a persisted policy
    pub fn from_preferences(prefs: &FilterPreferences) -> Self {
        let mut policy = Self::new(prefs.enabled.iter().copied());
        match (&prefs.text_filter, prefs.pattern) {
            (Some(text), true) => {
                if let Err(e) = policy.set_pattern(text) {
                    warn!(pattern = %text, error = %e, "Dropping stored filter pattern");
                }
            }
            (Some(text), false) => {
                if let Err(e) = policy.set_text_filter(text) {
                    warn!(filter = %text, error = %e, "Dropping stored text filter");
                }
            }
            (None, _) => {}
        }
        policy
    }

    /// Snapshot for the preferences store
    pub fn preferences(&self) -> FilterPreferences {
        FilterPreferences {
            enabled: self.enabled.clone(),
            text_filter: self.text.as_ref().map(|t| t.as_str().to_string()),
            pattern: self.text.as_ref().is_some_and(TextFilter::is_pattern),
        }
    }

    pub fn is_enabled(&self, severity: Severity) -> bool {
        self.enabled.contains(&severity)
    }

    pub fn enabled(&self) -> &BTreeSet<Severity> {
        &self.enabled
    }

    pub fn set_severity_enabled(&mut self, severity: Severity, enabled: bool) {
        if enabled {
            self.enabled.insert(severity);
        } else {
            self.enabled.remove(&severity);
        }
    }

    /// Flip a severity, returning its new state
    pub fn toggle_severity(&mut self, severity: Severity) -> bool {
        let enabled = !self.is_enabled(severity);
        self.set_severity_enabled(severity, enabled);
        enabled
    }

    /// Enable `min` and everything above it, disable the rest
    pub fn enable_at_least(&mut self, min: Severity) {
        self.enabled = Severity::ALL.into_iter().filter(|s| *s >= min).collect();
    }

    /// Set a literal substring filter; an empty string clears the filter
    pub fn set_text_filter(&mut self, text: &str) -> Result<(), FilterError> {
        self.text = if text.is_empty() {
            None
        } else {
            Some(TextFilter::substring(text)?)
        };
        Ok(())
    }

    /// Set a regex filter; on error the current filter is kept
    pub fn set_pattern(&mut self, pattern: &str) -> Result<(), FilterError> {
        self.text = if pattern.is_empty() {
            None
        } else {
            Some(TextFilter::pattern(pattern)?)
        };
        Ok(())
    }

    pub fn clear_text_filter(&mut self) {
        self.text = None;
    }

    pub fn text_filter(&self) -> Option<&TextFilter> {
        self.text.as_ref()
    }

    /// Severity a line is judged by: its own, else the carried-forward one
    pub fn effective_severity(line: &LogLine, state: &ClassificationState) -> Option<Severity> {
        line.severity.or(state.previous())
    }

    /// Decide whether a line is shown, advancing the running state
    pub fn admit(&self, line: &LogLine, state: &mut ClassificationState) -> bool {
        let severity_ok = match Self::effective_severity(line, state) {
            Some(severity) => self.is_enabled(severity),
            // No severity established yet: never drop leading lines
            None => true,
        };
        state.observe(line.severity);

        if !severity_ok {
            return false;
        }
        match &self.text {
            Some(filter) => filter.matches(&line.text),
            None => true,
        }
    }

    /// Check if the policy shows everything
    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.enabled.len() == Severity::ALL.len()
    }
}

impl Default for FilterPolicy {
    fn default() -> Self {
        Self::all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(text: &str, severity: Option<Severity>) -> LogLine {
        LogLine::new(text.to_string(), severity, severity)
    }

    fn run(policy: &FilterPolicy, lines: &[LogLine]) -> Vec<String> {
        let mut state = ClassificationState::default();
        lines
            .iter()
            .filter(|l| policy.admit(l, &mut state))
            .map(|l| l.text.clone())
            .collect()
    }

    #[test]
    fn test_carry_forward() {
        let policy = FilterPolicy::new([Severity::Error]);
        let lines = [
            line("ERROR boom", Some(Severity::Error)),
            line("  at foo()", None),
            line("INFO ok", Some(Severity::Info)),
        ];
        assert_eq!(run(&policy, &lines), vec!["ERROR boom", "  at foo()"]);
    }

    #[test]
    fn test_default_admit_before_any_severity() {
        let policy = FilterPolicy::new([Severity::Error]);
        let lines = [
            line("no marker line 1", None),
            line("INFO hello", Some(Severity::Info)),
        ];
        assert_eq!(run(&policy, &lines), vec!["no marker line 1"]);
    }

    #[test]
    fn test_state_updates_even_when_rejected() {
        let policy = FilterPolicy::new([Severity::Error]);
        let mut state = ClassificationState::default();
        assert!(!policy.admit(&line("INFO hi", Some(Severity::Info)), &mut state));
        assert_eq!(state.previous(), Some(Severity::Info));
        // continuation inherits INFO and is rejected too
        assert!(!policy.admit(&line("  detail", None), &mut state));
        assert_eq!(state.previous(), Some(Severity::Info));
    }

    #[test]
    fn test_text_filter_is_conjunctive() {
        let mut policy = FilterPolicy::new([Severity::Error]);
        policy.set_text_filter("disk").unwrap();
        let lines = [
            line("ERROR network down", Some(Severity::Error)),
            line("ERROR Disk full", Some(Severity::Error)),
            line("INFO disk ok", Some(Severity::Info)),
        ];
        assert_eq!(run(&policy, &lines), vec!["ERROR Disk full"]);
    }

    #[test]
    fn test_text_filter_applies_to_leading_lines() {
        let mut policy = FilterPolicy::new([Severity::Error]);
        policy.set_text_filter("needle").unwrap();
        let lines = [line("haystack", None), line("a needle here", None)];
        assert_eq!(run(&policy, &lines), vec!["a needle here"]);
    }

    #[test]
    fn test_empty_text_clears_filter() {
        let mut policy = FilterPolicy::all();
        policy.set_text_filter("x").unwrap();
        assert!(policy.text_filter().is_some());
        policy.set_text_filter("").unwrap();
        assert!(policy.text_filter().is_none());
        assert!(policy.is_empty());
    }

    #[test]
    fn test_substring_escapes_regex_syntax() {
        let mut policy = FilterPolicy::all();
        policy.set_text_filter("a.b(").unwrap();
        let lines = [line("xa.b(y", None), line("axb(", None)];
        assert_eq!(run(&policy, &lines), vec!["xa.b(y"]);
    }

    #[test]
    fn test_pattern_filter() {
        let mut policy = FilterPolicy::all();
        policy.set_pattern(r"took \d+ms").unwrap();
        let lines = [line("INFO TOOK 15ms", Some(Severity::Info)), line("INFO took long", Some(Severity::Info))];
        assert_eq!(run(&policy, &lines), vec!["INFO TOOK 15ms"]);
    }

    #[test]
    fn test_invalid_pattern_keeps_previous_filter() {
        let mut policy = FilterPolicy::all();
        policy.set_text_filter("keep").unwrap();
        assert!(policy.set_pattern("(unclosed").is_err());
        assert_eq!(policy.text_filter().map(TextFilter::as_str), Some("keep"));
    }

    #[test]
    fn test_enable_at_least() {
        let mut policy = FilterPolicy::all();
        policy.enable_at_least(Severity::Warning);
        assert!(!policy.is_enabled(Severity::Info));
        assert!(policy.is_enabled(Severity::Warning));
        assert!(policy.is_enabled(Severity::Fatal));
    }

    #[test]
    fn test_toggle_severity() {
        let mut policy = FilterPolicy::all();
        assert!(!policy.toggle_severity(Severity::Debug));
        assert!(!policy.is_enabled(Severity::Debug));
        assert!(policy.toggle_severity(Severity::Debug));
    }

    #[test]
    fn test_preferences_round_trip_keeps_pattern_mode() {
        let mut policy = FilterPolicy::new([Severity::Warning, Severity::Error]);
        policy.set_pattern("^x+$").unwrap();
        let restored = FilterPolicy::from_preferences(&policy.preferences());
        assert_eq!(restored.enabled(), policy.enabled());
        let text = restored.text_filter().unwrap();
        assert!(text.is_pattern());
        assert_eq!(text.as_str(), "^x+$");
    }

    #[test]
    fn test_find_matches() {
        let filter = TextFilter::substring("error").unwrap();
        let matches = filter.find_matches("an ERROR occurred, another error here");
        assert_eq!(matches, vec![(3, 8), (27, 32)]);
    }
}
