//! Application state and main loop.

use std::sync::Arc;

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use lcdiags_shell::{DispatchOutcome, DisplayBuffer, Shell, StopReport};

use crate::events::{Event, EventHandler};
use crate::input::{Completion, InputState};
use crate::logs::LogBuffer;
use crate::panics::PanicLog;
use crate::{Tui, TuiConfig, ui};

/// Main application state.
pub struct App {
    shell: Shell,
    /// Shared output region; background tasks write here directly.
    pub display: Arc<DisplayBuffer>,
    pub input: InputState,
    /// One-line notice shown in the status bar until the next key press.
    pub status_message: Option<String>,
    pub log_buffer: LogBuffer,
    pub show_logs: bool,
    pub log_scroll: usize,
    /// Output scroll offset (lines from top).
    pub output_scroll: usize,
    pub should_quit: bool,
    config: TuiConfig,
    /// Display version last drawn.
    drawn_version: Option<u64>,
    /// Log generation last drawn.
    drawn_logs: u64,
    dirty: bool,
    panics: Option<PanicLog>,
    /// Panic count at the last full redraw.
    panics_seen: usize,
}

impl App {
    pub fn new(shell: Shell, display: Arc<DisplayBuffer>, config: TuiConfig) -> Self {
        Self {
            shell,
            display,
            input: InputState::new(),
            status_message: None,
            log_buffer: config.log_buffer.clone(),
            show_logs: false,
            log_scroll: 0,
            output_scroll: 0,
            should_quit: false,
            config,
            drawn_version: None,
            drawn_logs: 0,
            dirty: true,
            panics: None,
            panics_seen: 0,
        }
    }

    /// Repaint the whole screen whenever `panics` records a new panic.
    pub fn with_panic_log(mut self, panics: PanicLog) -> Self {
        self.panics_seen = panics.count();
        self.panics = Some(panics);
        self
    }

    /// Whether a panic was recorded since the last call.
    fn take_new_panic(&mut self) -> bool {
        let Some(count) = self.panics.as_ref().map(PanicLog::count) else {
            return false;
        };
        let new = count != self.panics_seen;
        self.panics_seen = count;
        new
    }

    pub fn shell(&self) -> &Shell {
        &self.shell
    }

    /// Number of background tasks currently tracked.
    pub fn task_count(&self) -> usize {
        self.shell.session().supervisor().len()
    }

    /// Run the startup batch, then the main loop until the operator quits.
    pub async fn run(&mut self, terminal: &mut Tui) -> Result<()> {
        let mut events = EventHandler::new(self.config.tick);

        self.run_batch().await;

        while !self.should_quit {
            if self.take_new_panic() {
                terminal.clear()?;
                self.dirty = true;
            }
            if self.needs_redraw() {
                self.draw(terminal)?;
            }

            match events.next().await? {
                Event::Key(key) => self.handle_key(key).await,
                Event::Resize(_, _) => self.dirty = true,
                Event::Tick => {}
            }
        }

        Ok(())
    }

    /// Stop background work before leaving.
    pub async fn shutdown(&self) -> StopReport {
        self.shell.shutdown(self.config.stop_timeout).await
    }

    async fn run_batch(&mut self) {
        let report = self.shell.run_batch().await;
        if let Some((line, DispatchOutcome::Notice(notice))) = report.outcomes.last() {
            self.status_message = Some(format!("{line}: {notice}"));
        }
        if report.quit {
            self.should_quit = true;
        }
        self.dirty = true;
    }

    fn needs_redraw(&self) -> bool {
        self.dirty
            || self.drawn_version != Some(self.display.version())
            || (self.show_logs && self.drawn_logs != self.log_buffer.generation())
    }

    fn draw(&mut self, terminal: &mut Tui) -> Result<()> {
        let version = self.display.version();
        let logs = self.log_buffer.generation();
        terminal.draw(|frame| ui::render(self, frame))?;
        self.drawn_version = Some(version);
        self.drawn_logs = logs;
        self.dirty = false;
        Ok(())
    }

    /// Handle keyboard input.
    pub async fn handle_key(&mut self, key: KeyEvent) {
        self.dirty = true;

        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('l') => {
                    self.show_logs = !self.show_logs;
                    return;
                }
                KeyCode::Char('c') => {
                    self.input.clear();
                    self.status_message = None;
                    return;
                }
                KeyCode::Char('w') => {
                    self.input.delete_word_before();
                    return;
                }
                KeyCode::Char('a') => {
                    self.input.move_to_start();
                    return;
                }
                KeyCode::Char('e') => {
                    self.input.move_to_end();
                    return;
                }
                _ => {}
            }
        }

        match key.code {
            KeyCode::Enter => self.submit().await,
            KeyCode::Tab => self.complete(),
            KeyCode::Char(c) => {
                self.status_message = None;
                self.input.insert_char(c);
            }
            KeyCode::Backspace => self.input.delete_char_before(),
            KeyCode::Delete => self.input.delete_char_at(),
            KeyCode::Left => self.input.move_left(),
            KeyCode::Right => self.input.move_right(),
            KeyCode::Home => self.input.move_to_start(),
            KeyCode::End => self.input.move_to_end(),
            KeyCode::Up if self.show_logs => self.log_scroll = self.log_scroll.saturating_sub(1),
            KeyCode::Down if self.show_logs => self.log_scroll += 1,
            KeyCode::Up => {
                self.input.history_prev();
            }
            KeyCode::Down => {
                self.input.history_next();
            }
            KeyCode::PageUp => self.output_scroll = self.output_scroll.saturating_sub(10),
            KeyCode::PageDown => self.output_scroll += 10,
            KeyCode::Esc => {
                if self.show_logs {
                    self.show_logs = false;
                } else {
                    self.input.clear();
                    self.status_message = None;
                }
            }
            _ => {}
        }
    }

    async fn submit(&mut self) {
        let line = self.input.submit();
        self.status_message = None;

        match self.shell.submit(&line).await {
            DispatchOutcome::Output(_) => self.output_scroll = 0,
            DispatchOutcome::Silent => {}
            DispatchOutcome::Notice(notice) => self.status_message = Some(notice.to_string()),
            DispatchOutcome::Quit => self.should_quit = true,
        }
    }

    fn complete(&mut self) {
        let candidates = self.shell.completions(self.input.before_cursor());
        match self.input.complete(&candidates) {
            Completion::Ambiguous(all) => self.status_message = Some(all.join("  ")),
            Completion::Applied | Completion::None => self.status_message = None,
        }
    }
}
