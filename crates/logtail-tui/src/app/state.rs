use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use logtail_core::{ActivityGate, SeverityMapping};

/// Host visibility flags shared with the tailer thread
///
/// The tailer only polls at full rate while the terminal has focus and
/// the user has not paused the view.
#[derive(Clone, Debug)]
pub struct ActivityFlags {
    focused: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
}

impl ActivityFlags {
    pub fn new() -> Self {
        Self {
            focused: Arc::new(AtomicBool::new(true)),
            paused: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn set_focused(&self, focused: bool) {
        self.focused.store(focused, Ordering::Relaxed);
    }

    pub fn is_focused(&self) -> bool {
        self.focused.load(Ordering::Relaxed)
    }

    /// Flip the pause flag, returning the new value
    pub fn toggle_paused(&self) -> bool {
        !self.paused.fetch_xor(true, Ordering::Relaxed)
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Relaxed)
    }

    pub fn is_active(&self) -> bool {
        self.is_focused() && !self.is_paused()
    }

    /// Gate handed to the tailer
    pub fn gate(&self) -> ActivityGate {
        let flags = self.clone();
        Arc::new(move || flags.is_active())
    }
}

impl Default for ActivityFlags {
    fn default() -> Self {
        Self::new()
    }
}

/// UI-specific transient state
pub struct UiState {
    /// Is search/filter bar active?
    pub search_active: bool,

    /// Current search input text
    pub search_input: String,

    /// Interpret the filter input as a regular expression
    pub pattern_mode: bool,

    /// Is help overlay visible?
    pub help_visible: bool,

    /// Error message to display (if any)
    pub error_message: Option<String>,

    /// Transient notice such as an export result
    pub notice: Option<String>,

    /// Filter input error message (e.g., invalid regex)
    pub filter_error: Option<String>,

    /// Scroll position in log viewer
    pub log_scroll: usize,

    /// Auto-scroll enabled (follow mode)?
    pub auto_scroll: bool,

    /// Show the per-severity stats bar?
    pub stats_visible: bool,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            search_active: false,
            search_input: String::new(),
            pattern_mode: false,
            help_visible: false,
            error_message: None,
            notice: None,
            filter_error: None,
            log_scroll: 0,
            auto_scroll: true,
            stats_visible: true,
        }
    }
}

/// Global application state
pub struct AppState {
    /// File being tailed
    pub path: PathBuf,

    /// Colors and labels per severity
    pub mapping: SeverityMapping,

    /// Focus and pause flags behind the tailer's activity gate
    pub activity: ActivityFlags,

    /// Exit code of the `--exec` child once it finished
    pub process_exit: Option<Option<i32>>,

    /// UI state
    pub ui_state: UiState,

    /// Whether app should quit
    pub should_quit: bool,

    /// Dirty flag for rendering - only render when true
    pub render_dirty: bool,
}

impl AppState {
    pub fn new(path: PathBuf, mapping: SeverityMapping, activity: ActivityFlags) -> Self {
        Self {
            path,
            mapping,
            activity,
            process_exit: None,
            ui_state: UiState::default(),
            should_quit: false,
            render_dirty: true, // Start dirty to ensure initial render
        }
    }

    /// Show an error message
    pub fn show_error(&mut self, msg: String) {
        self.ui_state.error_message = Some(msg);
        self.render_dirty = true;
    }

    /// Dismiss the error message and any notice
    pub fn dismiss_error(&mut self) {
        self.ui_state.error_message = None;
        self.ui_state.notice = None;
    }

    /// Start filter input, seeded with the active filter text
    pub fn start_search(&mut self, current: Option<(&str, bool)>) {
        self.ui_state.search_active = true;
        self.ui_state.filter_error = None;
        match current {
            Some((text, is_pattern)) => {
                self.ui_state.search_input = text.to_string();
                self.ui_state.pattern_mode = is_pattern;
            }
            None => self.ui_state.search_input.clear(),
        }
    }

    /// Leave filter input without changing the filter
    pub fn cancel_search(&mut self) {
        self.ui_state.search_active = false;
        self.ui_state.search_input.clear();
        self.ui_state.filter_error = None;
    }

    /// Add a character to search input
    pub fn search_input_char(&mut self, c: char) {
        self.ui_state.search_input.push(c);
    }

    /// Remove last character from search input
    pub fn search_input_backspace(&mut self) {
        self.ui_state.search_input.pop();
    }

    /// Record the outcome of applying the search input
    ///
    /// On error the input stays open so it can be fixed.
    pub fn finish_search(&mut self, result: Result<(), String>) {
        match result {
            Ok(()) => {
                self.ui_state.search_active = false;
                self.ui_state.filter_error = None;
                self.jump_to_bottom();
            }
            Err(e) => {
                self.ui_state.filter_error = Some(e);
            }
        }
    }

    /// Re-enable follow mode after the view was rebuilt
    pub fn jump_to_bottom(&mut self) {
        self.ui_state.auto_scroll = true;
        self.ui_state.log_scroll = usize::MAX;
    }

    pub fn scroll_up(&mut self, n: usize) {
        self.ui_state.auto_scroll = false;
        self.ui_state.log_scroll = self.ui_state.log_scroll.saturating_sub(n);
    }

    pub fn scroll_down(&mut self, n: usize) {
        self.ui_state.auto_scroll = false;
        // Don't cap here - the renderer clamps to the line count
        self.ui_state.log_scroll = self.ui_state.log_scroll.saturating_add(n);
    }

    /// Short description of the exec child's state, if there is one
    pub fn process_label(&self) -> Option<String> {
        self.process_exit.map(|code| match code {
            Some(code) => format!("exited ({})", code),
            None => "terminated".to_string(),
        })
    }
}
