//! Logs panel rendering.

use crate::logs::LogBuffer;
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};

/// Render the logs panel. `scroll` counts lines up from the newest entry.
pub fn render_logs_panel(log_buffer: &LogBuffer, scroll: usize, frame: &mut Frame, area: Rect) {
    let entries = log_buffer.entries();

    let block = Block::default()
        .title(format!(" logs ({}) ", entries.len()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    if entries.is_empty() {
        let empty = Paragraph::new(Line::from(Span::styled(
            "  No log entries yet...",
            Style::default().fg(Color::DarkGray),
        )));
        frame.render_widget(empty, inner);
        return;
    }

    let lines: Vec<Line> = entries
        .iter()
        .map(|entry| {
            Line::from(vec![
                Span::styled(
                    format!("[{}]", entry.level_prefix()),
                    Style::default()
                        .fg(entry.level_color())
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!(" {}: ", entry.label()),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::raw(entry.message.clone()),
            ])
        })
        .collect();

    // Newest entries at the bottom; scrolling moves back in time.
    let visible_height = inner.height as usize;
    let newest_first_skip = scroll.min(lines.len().saturating_sub(visible_height));
    let end = lines.len() - newest_first_skip;
    let start = end.saturating_sub(visible_height);

    let logs = Paragraph::new(lines[start..end].to_vec()).wrap(Wrap { trim: false });
    frame.render_widget(logs, inner);
}
