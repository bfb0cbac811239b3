use ratatui::style::{Color, Modifier, Style};

use logtail_core::{Severity, SeverityMapping};

/// Color theme for the application
pub struct Theme;

impl Theme {
    // Base colors
    pub const BG: Color = Color::Reset;
    pub const FG: Color = Color::White;
    pub const FG_DIM: Color = Color::DarkGray;

    // Accent colors
    pub const PRIMARY: Color = Color::Cyan;
    pub const HIGHLIGHT: Color = Color::Yellow;

    // Status colors
    pub const SUCCESS: Color = Color::Green;
    pub const WARNING: Color = Color::Yellow;
    pub const ERROR: Color = Color::Red;

    // Border styles
    pub fn border() -> Style {
        Style::default().fg(Self::FG_DIM)
    }

    pub fn border_focused() -> Style {
        Style::default().fg(Self::HIGHLIGHT)
    }

    // Text styles
    pub fn title() -> Style {
        Style::default()
            .fg(Self::PRIMARY)
            .add_modifier(Modifier::BOLD)
    }

    pub fn text() -> Style {
        Style::default().fg(Self::FG)
    }

    pub fn text_dim() -> Style {
        Style::default().fg(Self::FG_DIM)
    }

    pub fn text_highlight() -> Style {
        Style::default()
            .fg(Self::HIGHLIGHT)
            .add_modifier(Modifier::BOLD)
    }

    /// Filter match inside a log message
    pub fn match_highlight() -> Style {
        Style::default()
            .fg(Color::Black)
            .bg(Self::HIGHLIGHT)
            .add_modifier(Modifier::BOLD)
    }

    // Log lines
    /// Severity tag column
    pub fn severity_tag(mapping: &SeverityMapping, severity: Severity) -> Style {
        Style::default()
            .fg(mapping.info(severity).color)
            .add_modifier(Modifier::BOLD)
    }

    /// Message text for a line's display style
    pub fn message(style: Option<Severity>) -> Style {
        match style {
            Some(Severity::Error | Severity::Fatal) => Style::default().fg(Self::ERROR),
            Some(Severity::Warning) => Style::default().fg(Self::WARNING),
            Some(Severity::Trace) => Self::text_dim(),
            _ => Self::text(),
        }
    }

    /// Severity toggle in the stats bar
    pub fn severity_toggle(mapping: &SeverityMapping, severity: Severity, enabled: bool) -> Style {
        if enabled {
            Self::severity_tag(mapping, severity)
        } else {
            Self::text_dim().add_modifier(Modifier::CROSSED_OUT)
        }
    }

    // Status bar
    pub fn status_bar() -> Style {
        Style::default().fg(Self::FG_DIM).bg(Color::DarkGray)
    }

    pub fn status_bar_key() -> Style {
        Style::default()
            .fg(Self::HIGHLIGHT)
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD)
    }

    pub fn status_ok() -> Style {
        Style::default()
            .fg(Self::SUCCESS)
            .add_modifier(Modifier::BOLD)
    }

    // Error
    pub fn error() -> Style {
        Style::default()
            .fg(Self::ERROR)
            .add_modifier(Modifier::BOLD)
    }
}
