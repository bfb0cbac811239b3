use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use logtail_types::{LogLine, Severity, SeverityMapping};

use crate::buffer::{FilteredView, LevelCounts, OriginalBuffer};
use crate::classifier::SeverityClassifier;
use crate::error::FilterError;
use crate::filter::{ClassificationState, FilterPolicy};
use crate::lifecycle::{TerminationSource, subscribe_once};
use crate::prefs::PreferencesStore;
use crate::source::LineSource;
use crate::tailer::{ActivityGate, LogTailer, TailerConfig, TailerState};

/// Receives the filtered view
pub trait DisplaySurface: Send {
    fn append_line(&mut self, line: &LogLine);

    fn clear(&mut self);

    /// Swap the whole view after a filter change
    fn replace(&mut self, lines: &[LogLine]) {
        self.clear();
        for line in lines {
            self.append_line(line);
        }
    }
}

/// Classify a raw line and decide whether it is shown
fn evaluate(
    classifier: &SeverityClassifier,
    policy: &FilterPolicy,
    state: &mut ClassificationState,
    text: &str,
) -> (LogLine, bool) {
    let severity = classifier.classify(text);
    let style = severity.or_else(|| {
        state
            .previous()
            .filter(Severity::is_error)
            .map(|_| Severity::Error)
    });
    let line = LogLine::new(text.to_string(), severity, style);
    let admitted = policy.admit(&line, state);
    (line, admitted)
}

/// Line pipeline: keeps every line read and the view of the admitted ones
pub struct LogConsoleCore {
    classifier: SeverityClassifier,
    policy: FilterPolicy,
    state: ClassificationState,
    original: OriginalBuffer,
    filtered: FilteredView,
    counts: LevelCounts,
    surfaces: Vec<Box<dyn DisplaySurface>>,
}

impl LogConsoleCore {
    pub fn new(classifier: SeverityClassifier, policy: FilterPolicy) -> Self {
        Self {
            classifier,
            policy,
            state: ClassificationState::default(),
            original: OriginalBuffer::new(),
            filtered: FilteredView::new(),
            counts: LevelCounts::default(),
            surfaces: Vec::new(),
        }
    }

    /// Attach a surface, bringing it up to date with the current view
    pub fn add_surface(&mut self, mut surface: Box<dyn DisplaySurface>) {
        surface.replace(self.filtered.lines());
        self.surfaces.push(surface);
    }

    /// Process one line read from the source. Returns whether it was shown.
    pub fn on_line(&mut self, text: String) -> bool {
        let (line, admitted) =
            evaluate(&self.classifier, &self.policy, &mut self.state, &text);
        self.original.push(text);
        self.counts.record(line.severity);

        if admitted {
            for surface in &mut self.surfaces {
                surface.append_line(&line);
            }
            self.filtered.push(line);
        }
        admitted
    }

    /// Rebuild the view from every line read so far
    pub fn on_filter_changed(&mut self) {
        self.state.reset();
        self.filtered.clear();
        for text in self.original.iter() {
            let (line, admitted) =
                evaluate(&self.classifier, &self.policy, &mut self.state, text);
            if admitted {
                self.filtered.push(line);
            }
        }
        debug!(
            shown = self.filtered.len(),
            total = self.original.len(),
            "Refiltered log view"
        );

        for surface in &mut self.surfaces {
            surface.replace(self.filtered.lines());
        }
    }

    pub fn policy(&self) -> &FilterPolicy {
        &self.policy
    }

    /// Callers must follow changes with [`Self::on_filter_changed`]
    pub fn policy_mut(&mut self) -> &mut FilterPolicy {
        &mut self.policy
    }

    pub fn classifier(&self) -> &SeverityClassifier {
        &self.classifier
    }

    pub fn original(&self) -> &OriginalBuffer {
        &self.original
    }

    pub fn filtered(&self) -> &FilteredView {
        &self.filtered
    }

    pub fn counts(&self) -> &LevelCounts {
        &self.counts
    }
}

/// How a console opens its file
#[derive(Clone, Debug)]
pub struct ConsoleOptions {
    pub path: PathBuf,
    pub skip_existing: bool,
    pub tailer: TailerConfig,

    /// Preferences key; the file path when unset
    pub preferences_key: Option<String>,
}

impl ConsoleOptions {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            skip_existing: false,
            tailer: TailerConfig::default(),
            preferences_key: None,
        }
    }

    fn key(&self) -> String {
        self.preferences_key
            .clone()
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// A tailed log with its filter state, preferences and display surfaces
///
/// Lines arrive from the tailer thread over a channel and are processed on
/// whichever task calls [`LogConsole::pump`] or [`LogConsole::recv_line`].
pub struct LogConsole {
    core: LogConsoleCore,
    tailer: Arc<LogTailer>,
    lines: mpsc::UnboundedReceiver<String>,
    preferences: Box<dyn PreferencesStore>,
    key: String,
    gate: ActivityGate,

    /// Unsubscribe hooks for termination sources
    detach: Vec<Box<dyn FnOnce() + Send>>,
    disposed: bool,
}

impl LogConsole {
    /// Open a file and start tailing it
    ///
    /// A file that cannot be opened leaves the console usable but with a
    /// stopped tailer.
    pub fn open(
        options: ConsoleOptions,
        classifier: SeverityClassifier,
        mapping: &SeverityMapping,
        preferences: Box<dyn PreferencesStore>,
        gate: ActivityGate,
    ) -> Self {
        let key = options.key();
        let (tx, rx) = mpsc::unbounded_channel();
        let tailer = LogTailer::open(
            &options.path,
            options.skip_existing,
            options.tailer,
            Arc::clone(&gate),
            tx,
        );
        Self::assemble(key, tailer, rx, classifier, mapping, preferences, gate)
    }

    /// Tail an arbitrary line source
    pub fn from_source<S: LineSource + 'static>(
        source: S,
        key: impl Into<String>,
        config: TailerConfig,
        classifier: SeverityClassifier,
        mapping: &SeverityMapping,
        preferences: Box<dyn PreferencesStore>,
        gate: ActivityGate,
    ) -> std::io::Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        let tailer = LogTailer::spawn(source, config, Arc::clone(&gate), tx)?;
        Ok(Self::assemble(
            key.into(),
            tailer,
            rx,
            classifier,
            mapping,
            preferences,
            gate,
        ))
    }

    fn assemble(
        key: String,
        tailer: LogTailer,
        lines: mpsc::UnboundedReceiver<String>,
        classifier: SeverityClassifier,
        mapping: &SeverityMapping,
        preferences: Box<dyn PreferencesStore>,
        gate: ActivityGate,
    ) -> Self {
        let policy = match preferences.load(&key) {
            Some(prefs) => {
                debug!(key = %key, "Restored filter preferences");
                FilterPolicy::from_preferences(&prefs)
            }
            None => FilterPolicy::from_mapping(mapping),
        };

        Self {
            core: LogConsoleCore::new(classifier, policy),
            tailer: Arc::new(tailer),
            lines,
            preferences,
            key,
            gate,
            detach: Vec::new(),
            disposed: false,
        }
    }

    pub fn add_surface(&mut self, surface: Box<dyn DisplaySurface>) {
        self.core.add_surface(surface);
    }

    /// Process every line the tailer has delivered so far
    pub fn pump(&mut self) -> usize {
        let mut count = 0;
        while let Ok(line) = self.lines.try_recv() {
            self.core.on_line(line);
            count += 1;
        }
        count
    }

    /// Wait for the next line; `None` once the tailer has stopped and
    /// every line was received
    pub async fn recv_line(&mut self) -> Option<String> {
        self.lines.recv().await
    }

    pub fn on_line(&mut self, line: String) -> bool {
        self.core.on_line(line)
    }

    pub fn set_severity_enabled(&mut self, severity: Severity, enabled: bool) {
        self.core.policy_mut().set_severity_enabled(severity, enabled);
        self.filter_changed();
    }

    pub fn toggle_severity(&mut self, severity: Severity) -> bool {
        let enabled = self.core.policy_mut().toggle_severity(severity);
        self.filter_changed();
        enabled
    }

    pub fn enable_at_least(&mut self, min: Severity) {
        self.core.policy_mut().enable_at_least(min);
        self.filter_changed();
    }

    pub fn set_text_filter(&mut self, text: &str) -> Result<(), FilterError> {
        self.core.policy_mut().set_text_filter(text)?;
        self.filter_changed();
        Ok(())
    }

    /// Set a regex filter; an invalid pattern changes nothing
    pub fn set_pattern(&mut self, pattern: &str) -> Result<(), FilterError> {
        self.core.policy_mut().set_pattern(pattern)?;
        self.filter_changed();
        Ok(())
    }

    pub fn clear_text_filter(&mut self) {
        self.core.policy_mut().clear_text_filter();
        self.filter_changed();
    }

    fn filter_changed(&mut self) {
        let prefs = self.core.policy().preferences();
        if let Err(e) = self.preferences.save(&self.key, &prefs) {
            warn!(key = %self.key, error = %e, "Failed to save filter preferences");
        }
        self.core.on_filter_changed();
    }

    /// Flush and stop the tailer the first time `source` reports that the
    /// process terminated
    pub fn attach_lifecycle_tracking<S>(&mut self, source: &Arc<S>)
    where
        S: TerminationSource + ?Sized + 'static,
    {
        let tailer = Arc::clone(&self.tailer);
        let id = subscribe_once(source, move || {
            debug!("Process terminated, flushing tailer");
            tailer.stop(true);
        });

        let source = Arc::downgrade(source);
        self.detach.push(Box::new(move || {
            if let Some(source) = source.upgrade() {
                source.unsubscribe(id);
            }
        }));
    }

    /// Stop tailing after forwarding what is left in the file
    ///
    /// Call [`Self::pump`] afterwards to process the flushed lines.
    pub fn stop_running(&self) {
        self.tailer.stop(true);
    }

    /// Stop the tailer without flushing and drop termination subscriptions
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.tailer.stop(false);
        for detach in self.detach.drain(..) {
            detach();
        }
        debug!(key = %self.key, "Disposed log console");
    }

    /// Whether the console is live and its view is visible to the host
    pub fn is_active(&self) -> bool {
        !self.disposed && (self.gate)()
    }

    pub fn is_running(&self) -> bool {
        self.tailer.is_running()
    }

    pub fn tailer_state(&self) -> TailerState {
        self.tailer.state()
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn core(&self) -> &LogConsoleCore {
        &self.core
    }

    pub fn policy(&self) -> &FilterPolicy {
        self.core.policy()
    }
}

impl Drop for LogConsole {
    fn drop(&mut self) {
        self.dispose();
    }
}
