use ratatui::layout::{Constraint, Direction, Layout as RatatuiLayout, Rect};

/// Areas of the log viewer screen
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LogViewerAreas {
    pub header: Rect,
    pub stats: Option<Rect>,
    pub filter: Option<Rect>,
    pub logs: Rect,
    pub status: Rect,
}

/// Layout helper for consistent screen layouts
pub struct Layout;

impl Layout {
    /// Split the log viewer into header, optional bars, logs and status bar
    pub fn log_viewer(area: Rect, show_stats: bool, show_filter: bool) -> LogViewerAreas {
        let mut constraints = vec![Constraint::Length(3)]; // Header always
        if show_stats {
            constraints.push(Constraint::Length(3));
        }
        if show_filter {
            constraints.push(Constraint::Length(3));
        }
        constraints.push(Constraint::Min(1)); // Logs
        constraints.push(Constraint::Length(1)); // Status bar

        let chunks = RatatuiLayout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(area);

        let mut idx = 1;
        let mut next = |visible: bool| {
            visible.then(|| {
                let rect = chunks[idx];
                idx += 1;
                rect
            })
        };
        let stats = next(show_stats);
        let filter = next(show_filter);

        LogViewerAreas {
            header: chunks[0],
            stats,
            filter,
            logs: chunks[chunks.len() - 2],
            status: chunks[chunks.len() - 1],
        }
    }

    /// Centered popup of at most the given size
    pub fn popup(area: Rect, width: u16, height: u16) -> Rect {
        let width = width.min(area.width.saturating_sub(4));
        let height = height.min(area.height.saturating_sub(4));
        let x = area.x + area.width.saturating_sub(width) / 2;
        let y = area.y + area.height.saturating_sub(height) / 2;
        Rect::new(x, y, width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_bars() {
        let area = Rect::new(0, 0, 80, 30);

        let bare = Layout::log_viewer(area, false, false);
        assert!(bare.stats.is_none() && bare.filter.is_none());
        assert_eq!(bare.logs.height, 30 - 3 - 1);

        let full = Layout::log_viewer(area, true, true);
        assert_eq!(full.stats.map(|r| r.y), Some(3));
        assert_eq!(full.filter.map(|r| r.y), Some(6));
        assert_eq!(full.logs.y, 9);
        assert_eq!(full.status.y, 29);
    }

    #[test]
    fn test_popup_fits_small_area() {
        let popup = Layout::popup(Rect::new(0, 0, 20, 10), 50, 24);
        assert_eq!(popup, Rect::new(2, 2, 16, 6));
    }
}
