//! Main layout rendering.
//!
//! ```text
//! ┌ output ─────────────────────┬ logs (Ctrl+L) ┐
//! │ display text                │               │
//! ├─────────────────────────────┤               │
//! │ >>> input                   │               │
//! │ status bar                  │               │
//! └─────────────────────────────┴───────────────┘
//! ```

use crate::app::App;
use crate::ui::input::render_input;
use crate::ui::logs::render_logs_panel;
use crate::ui::output::render_output;
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

/// Render the entire application UI.
pub fn render(app: &App, frame: &mut Frame) {
    let area = frame.area();

    let (main_area, logs_area) = if app.show_logs {
        let chunks =
            Layout::horizontal([Constraint::Min(30), Constraint::Percentage(40)]).split(area);
        (chunks[0], Some(chunks[1]))
    } else {
        (area, None)
    };

    let chunks = Layout::vertical([
        Constraint::Min(1),    // Output
        Constraint::Length(1), // Separator
        Constraint::Length(1), // Input
        Constraint::Length(1), // Status bar
    ])
    .split(main_area);

    let text = app.display.text();
    render_output(&text, app.output_scroll, frame, chunks[0]);
    render_separator(frame, chunks[1]);
    render_input(&app.input, frame, chunks[2]);
    render_status_bar(app, frame, chunks[3]);

    if let Some(logs_area) = logs_area {
        render_logs_panel(&app.log_buffer, app.log_scroll, frame, logs_area);
    }
}

fn render_separator(frame: &mut Frame, area: Rect) {
    let separator = Block::default()
        .borders(Borders::TOP)
        .border_style(Style::default().fg(Color::DarkGray));
    frame.render_widget(separator, area);
}

fn render_status_bar(app: &App, frame: &mut Frame, area: Rect) {
    let dim = Style::default().fg(Color::DarkGray);

    let line = match &app.status_message {
        Some(message) => Line::from(Span::styled(
            format!(" {}", message.replace('\n', "  ")),
            Style::default().fg(Color::Yellow),
        )),
        None => {
            let tasks = app.task_count();
            let mut spans = vec![
                Span::styled(" tab", dim),
                Span::styled(" complete", dim),
                Span::styled(" │ ", dim),
                Span::styled("↑↓", dim),
                Span::styled(" history", dim),
                Span::styled(" │ ", dim),
                Span::styled("^L", dim),
                Span::styled(" logs", dim),
                Span::styled(" │ ", dim),
                Span::styled("q", dim),
                Span::styled(" quit", dim),
            ];
            if tasks > 0 {
                spans.push(Span::styled(" │ ", dim));
                spans.push(Span::styled(
                    format!("{tasks} background task{}", if tasks == 1 { "" } else { "s" }),
                    Style::default().fg(Color::Green),
                ));
            }
            Line::from(spans)
        }
    };

    frame.render_widget(Paragraph::new(line), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TuiConfig;
    use lcdiags_shell::{CommandTree, DisplayBuffer, HandlerRegistry, Session, Shell};
    use ratatui::{Terminal, backend::TestBackend};
    use std::sync::Arc;

    fn screen(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(40, 6)).unwrap();
        terminal.draw(|frame| render(app, frame)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        (0..buffer.area.height)
            .map(|y| {
                (0..buffer.area.width)
                    .map(|x| buffer[(x, y)].symbol().to_string())
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn app(text: &str) -> App {
        let registry = HandlerRegistry::new();
        let tree = CommandTree::from_keys(registry.keys());
        let display = Arc::new(DisplayBuffer::new(text));
        let shell = Shell::from_parts(tree, registry, Session::new(display.clone()));
        App::new(shell, display, TuiConfig::default())
    }

    #[tokio::test]
    async fn test_layout_regions() {
        let mut app = app("Counter: 3");
        app.input.insert_str("watch");
        let screen = screen(&app);
        let lines: Vec<&str> = screen.lines().collect();

        assert!(lines[0].starts_with("Counter: 3"));
        assert!(lines[3].starts_with("────"));
        assert!(lines[4].starts_with(">>> watch"));
        assert!(lines[5].contains("quit"));
    }

    #[tokio::test]
    async fn test_status_message_replaces_hints() {
        let mut app = app("");
        app.status_message = Some("No subcommands".to_string());
        let screen = screen(&app);
        assert!(screen.lines().last().unwrap().contains("No subcommands"));
    }
}
