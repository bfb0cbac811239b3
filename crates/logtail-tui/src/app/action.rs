use logtail_core::Severity;

/// All possible actions in the application (command pattern)
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    Quit,
    ToggleHelp,

    // Severity filter
    ToggleSeverity(Severity),
    ShowAtLeast(Severity),
    ShowAll,

    // Text filter input
    OpenSearch,
    CloseSearch,
    SearchInput(char),
    SearchBackspace,
    SearchClear,
    ApplyFilter,
    ClearFilter,
    TogglePatternMode,

    // Log viewer
    ScrollUp(usize),
    ScrollDown(usize),
    ScrollToTop,
    ScrollToBottom,
    PageUp,
    PageDown,
    ToggleAutoScroll,
    TogglePause,
    ToggleStats,
    ExportLogs,

    // Tailing
    StopTailing,
    ProcessExited(Option<i32>),

    // Error handling
    ShowError(String),
    DismissError,

    // Render request
    Render,
}
