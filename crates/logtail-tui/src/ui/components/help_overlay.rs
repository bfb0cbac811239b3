use ratatui::{
    Frame,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
};

use crate::ui::Layout;

/// Help overlay showing keybindings
pub struct HelpOverlay;

impl HelpOverlay {
    pub fn render(frame: &mut Frame) {
        let popup_area = Layout::popup(frame.area(), 52, 30);

        // Clear the background
        frame.render_widget(Clear, popup_area);

        let help_widget = Paragraph::new(Self::lines()).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan))
                .title(Span::styled(
                    " Help ",
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )),
        );

        frame.render_widget(help_widget, popup_area);
    }

    fn lines() -> Vec<Line<'static>> {
        vec![
            Self::section("Levels"),
            Self::key_line("1-6", "Toggle trace/debug/info/warn/error/fatal"),
            Self::key_line("Shift+1-6", "Show that level and above"),
            Self::key_line("a", "Show all levels"),
            Line::from(""),
            Self::section("Filter"),
            Self::key_line("/", "Edit text filter"),
            Self::key_line("r", "Toggle regex mode"),
            Self::key_line("n", "Clear text filter"),
            Line::from(""),
            Self::section("Navigation"),
            Self::key_line("j/↓", "Scroll down"),
            Self::key_line("k/↑", "Scroll up"),
            Self::key_line("Ctrl+d", "Page down"),
            Self::key_line("Ctrl+u", "Page up"),
            Self::key_line("g", "Go to top"),
            Self::key_line("G", "Go to bottom"),
            Line::from(""),
            Self::section("Tailing"),
            Self::key_line("f", "Toggle follow mode"),
            Self::key_line("p", "Pause/resume tailing"),
            Self::key_line("S", "Stop tailing"),
            Self::key_line("s", "Toggle stats bar"),
            Self::key_line("e", "Export lines read to file"),
            Self::key_line("?", "Toggle this help"),
            Self::key_line("q", "Quit"),
        ]
    }

    fn section(title: &'static str) -> Line<'static> {
        Line::from(Span::styled(title, Style::default().fg(Color::Yellow)))
    }

    fn key_line(key: &'static str, desc: &'static str) -> Line<'static> {
        Line::from(vec![
            Span::styled(format!("  {:>9}", key), Style::default().fg(Color::Green)),
            Span::styled(format!("  {}", desc), Style::default().fg(Color::White)),
        ])
    }
}
