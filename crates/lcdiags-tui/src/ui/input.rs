//! Input line rendering.

use crate::input::InputState;
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::Paragraph,
};

/// Prompt shown before the input text.
pub const PROMPT: &str = ">>> ";

/// Render the prompt and input, scrolled so the cursor stays visible.
pub fn render_input(input: &InputState, frame: &mut Frame, area: Rect) {
    let prompt_width = PROMPT.len() as u16;
    let available = area.width.saturating_sub(prompt_width + 1) as usize;
    let cursor = input.cursor_column();
    let skip = cursor.saturating_sub(available);

    let visible: String = input.content().chars().skip(skip).collect();
    let line = Line::from(vec![
        Span::styled(PROMPT, Style::default().fg(Color::Cyan)),
        Span::raw(visible),
    ]);
    frame.render_widget(Paragraph::new(line), area);

    let cursor_x = area.x + prompt_width + (cursor - skip) as u16;
    if cursor_x < area.x + area.width {
        frame.set_cursor_position((cursor_x, area.y));
    }
}
