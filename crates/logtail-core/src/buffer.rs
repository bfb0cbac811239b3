use logtail_types::{LogLine, Severity};

/// Every line read from the source, in arrival order
///
/// Append-only; this is what the filtered view is rebuilt from.
#[derive(Clone, Debug, Default)]
pub struct OriginalBuffer {
    lines: Vec<String>,
}

impl OriginalBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, line: String) {
        self.lines.push(line);
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Export all lines as raw text
    pub fn export_raw(&self) -> String {
        self.lines.join("\n")
    }
}

/// Lines admitted under the current filter policy
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilteredView {
    lines: Vec<LogLine>,
}

impl FilteredView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, line: LogLine) {
        self.lines.push(line);
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn lines(&self) -> &[LogLine] {
        &self.lines
    }

    /// Text of each admitted line
    pub fn texts(&self) -> Vec<&str> {
        self.lines.iter().map(|l| l.text.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Counts per explicit severity marker
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LevelCounts {
    pub trace: usize,
    pub debug: usize,
    pub info: usize,
    pub warning: usize,
    pub error: usize,
    pub fatal: usize,
    /// Lines without a marker of their own
    pub unmarked: usize,
}

impl LevelCounts {
    pub fn record(&mut self, severity: Option<Severity>) {
        match severity {
            Some(Severity::Trace) => self.trace += 1,
            Some(Severity::Debug) => self.debug += 1,
            Some(Severity::Info) => self.info += 1,
            Some(Severity::Warning) => self.warning += 1,
            Some(Severity::Error) => self.error += 1,
            Some(Severity::Fatal) => self.fatal += 1,
            None => self.unmarked += 1,
        }
    }

    pub fn get(&self, severity: Severity) -> usize {
        match severity {
            Severity::Trace => self.trace,
            Severity::Debug => self.debug,
            Severity::Info => self.info,
            Severity::Warning => self.warning,
            Severity::Error => self.error,
            Severity::Fatal => self.fatal,
        }
    }

    pub fn total(&self) -> usize {
        self.trace + self.debug + self.info + self.warning + self.error + self.fatal + self.unmarked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_original_buffer_export() {
        let mut buffer = OriginalBuffer::new();
        for line in ["a", "b", "c"] {
            buffer.push(line.to_string());
        }
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.export_raw(), "a\nb\nc");
    }

    #[test]
    fn test_level_counts() {
        let mut counts = LevelCounts::default();
        counts.record(Some(Severity::Error));
        counts.record(Some(Severity::Error));
        counts.record(None);
        counts.record(Some(Severity::Info));
        assert_eq!(counts.get(Severity::Error), 2);
        assert_eq!(counts.unmarked, 1);
        assert_eq!(counts.total(), 4);
    }
}
