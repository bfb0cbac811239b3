use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Widget,
};

use crate::ui::Theme;

/// Status bar with key hints on the left and a summary on the right
pub struct StatusBar<'a> {
    hints: Vec<(&'a str, &'a str)>,
    alert: Option<(String, Style)>,
    right_text: Option<String>,
}

impl<'a> StatusBar<'a> {
    pub fn new() -> Self {
        Self {
            hints: Vec::new(),
            alert: None,
            right_text: None,
        }
    }

    /// Add keyboard hints as (key, description) pairs
    pub fn hints<I>(mut self, hints: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        self.hints = hints.into_iter().collect();
        self
    }

    /// Message shown in place of the hints
    pub fn alert<S: Into<String>>(mut self, text: S, style: Style) -> Self {
        self.alert = Some((text.into(), style));
        self
    }

    /// Set text to display on the right side
    pub fn right<S: Into<String>>(mut self, text: S) -> Self {
        self.right_text = Some(text.into());
        self
    }

    fn left_line(&self) -> Line<'_> {
        if let Some((text, style)) = &self.alert {
            return Line::from(Span::styled(text.as_str(), style.bg(ratatui::style::Color::DarkGray)));
        }

        let mut spans = Vec::new();
        for (i, (key, desc)) in self.hints.iter().enumerate() {
            if i > 0 {
                spans.push(Span::styled(" ", Theme::status_bar()));
            }
            spans.push(Span::styled(format!("[{}]", key), Theme::status_bar_key()));
            spans.push(Span::styled(*desc, Theme::status_bar()));
        }
        Line::from(spans)
    }
}

impl Default for StatusBar<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Fill background
        buf.set_style(area, Theme::status_bar());

        let line = self.left_line();
        let line_width = line.width() as u16;

        // Render hints on the left
        buf.set_line(area.x + 1, area.y, &line, area.width.saturating_sub(2));

        // Right text only when it does not overlap the hints
        if let Some(right) = &self.right_text {
            let right_width = Line::from(right.as_str()).width() as u16;
            let right_x = area.x + area.width.saturating_sub(right_width + 1);
            if right_x > area.x + line_width + 2 {
                let right_span = Span::styled(right.as_str(), Theme::status_bar());
                buf.set_span(right_x, area.y, &right_span, right_width);
            }
        }
    }
}

/// Default hints for the log viewer
pub fn log_viewer_hints() -> Vec<(&'static str, &'static str)> {
    vec![
        ("1-6", "Levels"),
        ("/", "Filter"),
        ("r", "Regex"),
        ("f", "Follow"),
        ("p", "Pause"),
        ("?", "Help"),
        ("q", "Quit"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(bar: StatusBar<'_>, width: u16) -> String {
        let area = Rect::new(0, 0, width, 1);
        let mut buf = Buffer::empty(area);
        bar.render(area, &mut buf);
        (0..width)
            .map(|x| buf[(x, 0)].symbol().to_string())
            .collect()
    }

    #[test]
    fn test_hints_and_right_text() {
        let text = render(
            StatusBar::new().hints([("q", "Quit")]).right("12 lines"),
            40,
        );
        assert!(text.starts_with(" [q]Quit"));
        assert!(text.trim_end().ends_with("12 lines"));
    }

    #[test]
    fn test_alert_replaces_hints() {
        let text = render(
            StatusBar::new()
                .hints([("q", "Quit")])
                .alert("Exported", Theme::status_ok()),
            40,
        );
        assert!(text.contains("Exported"));
        assert!(!text.contains("Quit"));
    }

    #[test]
    fn test_right_text_dropped_when_narrow() {
        let text = render(
            StatusBar::new()
                .hints(log_viewer_hints())
                .right("a very long summary"),
            20,
        );
        assert!(!text.contains("summary"));
    }
}
