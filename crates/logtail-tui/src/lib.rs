//! TUI components for logtail
//!
//! This crate provides the terminal user interface for logtail,
//! including state management, keybindings, event handling, the display
//! surface the console writes into, and UI components.

pub mod app;
pub mod config;
mod surface;
pub mod tui;
pub mod ui;

pub use app::{Action, ActivityFlags, AppState, UiState};
pub use config::{KeyBinding, KeyBindings, KeyContext};
pub use surface::{ViewBuffer, ViewLine};
pub use tui::{Event, EventHandler, Tui};
pub use ui::components::{HelpOverlay, StatusBar, log_viewer_hints};
pub use ui::screens::LogViewerScreen;
pub use ui::{Layout, Theme};
