//! Output region: the shared display text.

use ratatui::{
    Frame,
    layout::Rect,
    text::Text,
    widgets::Paragraph,
};

/// Render the display text, clamping `scroll` to the content.
pub fn render_output(text: &str, scroll: usize, frame: &mut Frame, area: Rect) {
    let total = text.lines().count();
    let max_scroll = total.saturating_sub(area.height as usize);
    let offset = scroll.min(max_scroll) as u16;

    let paragraph = Paragraph::new(Text::raw(text)).scroll((offset, 0));
    frame.render_widget(paragraph, area);
}
