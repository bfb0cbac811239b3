use ratatui::{
    Frame,
    layout::{Margin, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState},
};

use logtail_core::{LevelCounts, LogConsole, Severity, SeverityMapping, TailerState, TextFilter};

use crate::app::AppState;
use crate::config::SEVERITY_KEYS;
use crate::surface::{ViewBuffer, ViewLine};
use crate::ui::components::{HelpOverlay, StatusBar, log_viewer_hints};
use crate::ui::{Layout, Theme};

/// Log viewer screen
pub struct LogViewerScreen;

/// Safely truncate a string to a maximum byte length, finding the nearest valid UTF-8 boundary
fn safe_truncate(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut pos = max_bytes;
    while pos > 0 && !s.is_char_boundary(pos) {
        pos -= 1;
    }
    &s[..pos]
}

impl LogViewerScreen {
    pub fn render(frame: &mut Frame, state: &mut AppState, console: &LogConsole, view: &ViewBuffer) {
        let policy = console.policy();
        let show_filter_bar = state.ui_state.search_active
            || policy.text_filter().is_some()
            || state.ui_state.filter_error.is_some();

        let areas = Layout::log_viewer(frame.area(), state.ui_state.stats_visible, show_filter_bar);

        Self::render_header(frame, areas.header, state, console);
        if let Some(area) = areas.stats {
            Self::render_stats_bar(frame, area, state, console);
        }
        if let Some(area) = areas.filter {
            Self::render_filter_bar(frame, area, state, policy.text_filter());
        }
        Self::render_logs(frame, areas.logs, state, console, view);
        Self::render_status_bar(frame, areas.status, state, console.core().counts());

        if state.ui_state.help_visible {
            HelpOverlay::render(frame);
        }
    }

    fn tailer_label(state: &AppState, console: &LogConsole) -> (&'static str, Style) {
        match console.tailer_state() {
            TailerState::Starting => ("starting", Theme::text_dim()),
            TailerState::Polling if state.activity.is_paused() => ("paused", Theme::text_highlight()),
            TailerState::Polling if !state.activity.is_focused() => ("background", Theme::text_dim()),
            TailerState::Polling => ("following", Theme::status_ok()),
            TailerState::Stopping => ("stopping", Theme::text_highlight()),
            TailerState::Stopped => ("stopped", Theme::error()),
        }
    }

    fn render_header(frame: &mut Frame, area: Rect, state: &AppState, console: &LogConsole) {
        let (label, label_style) = Self::tailer_label(state, console);

        let mut spans = vec![
            Span::styled("logtail", Theme::title()),
            Span::styled(" │ ", Theme::text_dim()),
            Span::styled(state.path.display().to_string(), Theme::text_highlight()),
            Span::styled(" │ ", Theme::text_dim()),
            Span::styled(label, label_style),
        ];
        if let Some(process) = state.process_label() {
            spans.push(Span::styled(" │ ", Theme::text_dim()));
            spans.push(Span::styled(format!("process {}", process), Theme::text()));
        }

        let header = Paragraph::new(Line::from(spans)).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Theme::border()),
        );

        frame.render_widget(header, area);
    }

    fn render_stats_bar(frame: &mut Frame, area: Rect, state: &AppState, console: &LogConsole) {
        let counts = console.core().counts();
        let line = Self::stats_line(&state.mapping, counts, |s| console.policy().is_enabled(s));

        let stats_widget = Paragraph::new(line).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Theme::border())
                .title(Span::styled(" Levels ", Theme::title())),
        );

        frame.render_widget(stats_widget, area);
    }

    /// One toggle per severity with its count, then the totals
    fn stats_line(
        mapping: &SeverityMapping,
        counts: &LevelCounts,
        is_enabled: impl Fn(Severity) -> bool,
    ) -> Line<'static> {
        let mut spans = vec![Span::styled(" ", Theme::text())];

        for (i, severity) in Severity::ALL.into_iter().enumerate() {
            let enabled = is_enabled(severity);
            spans.push(Span::styled(format!("{}", SEVERITY_KEYS[i]), Theme::text_dim()));
            spans.push(Span::styled(
                format!("{}:", severity.as_str()),
                Theme::severity_toggle(mapping, severity, enabled),
            ));
            spans.push(Span::styled(format!("{} ", counts.get(severity)), Theme::text()));
        }

        spans.push(Span::styled("│ ", Theme::text_dim()));
        spans.push(Span::styled("Unmarked:", Theme::text_dim()));
        spans.push(Span::styled(format!("{} ", counts.unmarked), Theme::text()));
        spans.push(Span::styled("Total:", Theme::text_dim()));
        spans.push(Span::styled(format!("{}", counts.total()), Theme::text()));

        Line::from(spans)
    }

    fn render_filter_bar(frame: &mut Frame, area: Rect, state: &AppState, active: Option<&TextFilter>) {
        let mut spans = vec![];

        // Prompt
        if state.ui_state.search_active {
            spans.push(Span::styled(
                " /",
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ));
        } else {
            spans.push(Span::styled(" Filter: ", Theme::text_dim()));
        }

        // Input or current filter text
        let text = if state.ui_state.search_active {
            state.ui_state.search_input.as_str()
        } else {
            active.map(TextFilter::as_str).unwrap_or("")
        };
        spans.push(Span::styled(text.to_string(), Theme::text_highlight()));

        // Cursor when active
        if state.ui_state.search_active {
            spans.push(Span::styled(
                "█",
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::SLOW_BLINK),
            ));
        }

        // Error message
        if let Some(err) = &state.ui_state.filter_error {
            spans.push(Span::styled(" ", Theme::text()));
            spans.push(Span::styled(
                format!("⚠ {}", err),
                Style::default().fg(Color::Red),
            ));
        }

        // Mode indicator
        let pattern_mode = if state.ui_state.search_active {
            state.ui_state.pattern_mode
        } else {
            active.is_some_and(TextFilter::is_pattern)
        };
        spans.push(Span::styled("  ", Theme::text()));
        spans.push(Span::styled(
            if pattern_mode { "[r] regex" } else { "[r] text" },
            Theme::text_dim(),
        ));

        // Hints
        if state.ui_state.search_active {
            spans.push(Span::styled(
                "  [Enter] Apply  [Esc] Cancel",
                Theme::text_dim(),
            ));
        } else if active.is_some() {
            spans.push(Span::styled("  [n] Clear  [/] Edit", Theme::text_dim()));
        }

        let filter_bar = Paragraph::new(Line::from(spans)).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(if state.ui_state.search_active {
                    Theme::border_focused()
                } else if state.ui_state.filter_error.is_some() {
                    Style::default().fg(Color::Red)
                } else {
                    Theme::border()
                })
                .title(Span::styled(" Filter ", Theme::title())),
        );

        frame.render_widget(filter_bar, area);
    }

    fn render_logs(
        frame: &mut Frame,
        area: Rect,
        state: &mut AppState,
        console: &LogConsole,
        view: &ViewBuffer,
    ) {
        let total_lines = view.len();

        // Calculate visible area (accounting for border)
        let inner_height = area.height.saturating_sub(2) as usize;
        let max_scroll = total_lines.saturating_sub(inner_height);

        // Auto-scroll: if following, stay at bottom
        if state.ui_state.auto_scroll || state.ui_state.log_scroll > max_scroll {
            state.ui_state.log_scroll = max_scroll;
        }

        let visible = view.window(state.ui_state.log_scroll, inner_height);

        // 2 for borders, 2 for scrollbar
        let inner_width = area.width.saturating_sub(4) as usize;
        let filter = console.policy().text_filter();
        let lines: Vec<Line> = visible
            .iter()
            .map(|line| Self::format_line(line, &state.mapping, filter, inner_width))
            .collect();

        let read = console.core().original().len();
        let title = if console.policy().is_empty() {
            format!(" Logs ({}) ", read)
        } else {
            format!(" Logs ({} of {} shown) ", view.evicted() + total_lines, read)
        };

        let logs_widget = Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Theme::border())
                .title(Span::styled(title, Theme::title())),
        );

        frame.render_widget(logs_widget, area);

        if total_lines > inner_height {
            let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .begin_symbol(Some("▲"))
                .end_symbol(Some("▼"));

            let mut scrollbar_state = ScrollbarState::default()
                .content_length(max_scroll)
                .position(state.ui_state.log_scroll);

            frame.render_stateful_widget(
                scrollbar,
                area.inner(Margin {
                    vertical: 1,
                    horizontal: 0,
                }),
                &mut scrollbar_state,
            );
        }
    }

    /// Render one log line: number, severity tag, message with filter matches highlighted
    fn format_line(
        entry: &ViewLine,
        mapping: &SeverityMapping,
        filter: Option<&TextFilter>,
        available_width: usize,
    ) -> Line<'static> {
        let line = &entry.line;
        let mut spans = vec![Span::styled(format!("{:>5}", entry.number), Theme::text_dim())];

        // " XXX" = 4 chars, blank for continuation lines
        match line.severity {
            Some(severity) => spans.push(Span::styled(
                format!(" {:>3}", severity.as_str()),
                Theme::severity_tag(mapping, severity),
            )),
            None => spans.push(Span::raw("    ")),
        }
        spans.push(Span::styled(" │ ", Theme::text_dim()));

        let message_width = available_width.saturating_sub(5 + 4 + 3);
        let message = if line.text.len() > message_width {
            format!("{}...", safe_truncate(&line.text, message_width.saturating_sub(3)))
        } else {
            line.text.clone()
        };

        let base_style = Theme::message(line.style);
        let matches = filter.map(|f| f.find_matches(&message)).unwrap_or_default();
        let mut last_end = 0;
        for (start, end) in matches {
            if start > last_end {
                spans.push(Span::styled(message[last_end..start].to_string(), base_style));
            }
            spans.push(Span::styled(
                message[start..end].to_string(),
                Theme::match_highlight(),
            ));
            last_end = end;
        }
        if last_end < message.len() {
            spans.push(Span::styled(message[last_end..].to_string(), base_style));
        }

        Line::from(spans)
    }

    fn render_status_bar(frame: &mut Frame, area: Rect, state: &AppState, counts: &LevelCounts) {
        let right_text = format!(
            "E:{} W:{} I:{} | {} lines {}",
            counts.error + counts.fatal,
            counts.warning,
            counts.info,
            counts.total(),
            if state.ui_state.auto_scroll { "▼" } else { " " }
        );

        let mut bar = StatusBar::new().hints(log_viewer_hints()).right(right_text);
        if let Some(err) = &state.ui_state.error_message {
            bar = bar.alert(format!("⚠ {}  [Esc] Dismiss", err), Theme::error());
        } else if let Some(notice) = &state.ui_state.notice {
            bar = bar.alert(notice.clone(), Theme::status_ok());
        }

        frame.render_widget(bar, area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logtail_core::LogLine;

    fn view_line(text: &str, severity: Option<Severity>) -> ViewLine {
        ViewLine {
            number: 7,
            line: LogLine::new(text.to_string(), severity, severity),
        }
    }

    fn text_of(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_format_line_highlights_matches() {
        let filter = TextFilter::substring("disk").unwrap();
        let line = LogViewerScreen::format_line(
            &view_line("ERROR Disk full", Some(Severity::Error)),
            &SeverityMapping::default(),
            Some(&filter),
            80,
        );

        assert_eq!(text_of(&line), "    7 ERR │ ERROR Disk full");
        let highlighted: Vec<_> = line
            .spans
            .iter()
            .filter(|s| s.style == Theme::match_highlight())
            .map(|s| s.content.to_string())
            .collect();
        assert_eq!(highlighted, vec!["Disk"]);
    }

    #[test]
    fn test_format_line_continuation_has_blank_tag() {
        let line = LogViewerScreen::format_line(
            &view_line("  at foo()", None),
            &SeverityMapping::default(),
            None,
            80,
        );
        assert_eq!(text_of(&line), "    7     │   at foo()");
    }

    #[test]
    fn test_format_line_truncates_on_char_boundary() {
        let line = LogViewerScreen::format_line(
            &view_line("ééééééééééééé", None),
            &SeverityMapping::default(),
            None,
            5 + 4 + 3 + 8,
        );
        assert!(text_of(&line).ends_with("│ éé..."));
    }

    #[test]
    fn test_stats_line_lists_every_level() {
        let mut counts = LevelCounts::default();
        counts.record(Some(Severity::Error));
        counts.record(None);
        let line = LogViewerScreen::stats_line(&SeverityMapping::default(), &counts, |_| true);
        let text = text_of(&line);
        assert!(text.contains("1TRC:0"));
        assert!(text.contains("5ERR:1"));
        assert!(text.contains("Unmarked:1"));
        assert!(text.contains("Total:2"));
    }
}
