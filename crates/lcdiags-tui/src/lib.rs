//! lcdiags TUI - full-screen front end for the operator shell.
//!
//! The screen is split into the output region (the shared display, written
//! by commands and background tasks), a separator, the `>>> ` input line and
//! a status bar. Ctrl+L toggles a log panel fed by [`TuiLogLayer`].

pub mod app;
pub mod events;
pub mod input;
pub mod logs;
pub mod panics;
pub mod ui;

use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use lcdiags_shell::{DisplayBuffer, Shell};
use ratatui::prelude::*;

pub use app::App;
pub use logs::{LogBuffer, TuiLogLayer};
pub use panics::{PanicHookGuard, PanicLog, RestoreOnUnwind};

/// Terminal type alias for convenience.
pub type Tui = Terminal<CrosstermBackend<Stdout>>;

/// Initialize the terminal for TUI mode.
pub fn init_terminal() -> Result<Tui> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

/// Restore the terminal to normal mode.
pub fn restore_terminal(terminal: &mut Tui) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Best-effort terminal restore for a crash, then report the panic that
/// caused it on stderr.
fn restore_after_crash(panics: &PanicLog) {
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen, crossterm::cursor::Show);
    if let Some(message) = panics.last() {
        eprintln!("lcdiags crashed: {message}");
    }
}

/// Configuration for running the TUI.
#[derive(Debug, Clone)]
pub struct TuiConfig {
    /// Redraw tick.
    pub tick: Duration,
    /// How long quitting waits for background tasks.
    pub stop_timeout: Duration,
    /// Buffer the [`TuiLogLayer`] writes to.
    pub log_buffer: LogBuffer,
}

impl Default for TuiConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(100),
            stop_timeout: Duration::from_secs(2),
            log_buffer: LogBuffer::new(),
        }
    }
}

/// Run the TUI until the operator quits.
///
/// `display` must be the sink the shell's session writes to. Runs the
/// startup batch first. Background tasks are stopped and the terminal is
/// restored before this returns.
///
/// Panics caught by the shell are logged and leave the screen as it is. A
/// panic escaping the UI loop restores the terminal before unwinding on.
pub async fn run(shell: Shell, display: Arc<DisplayBuffer>, config: TuiConfig) -> Result<()> {
    let hook = PanicHookGuard::install();
    let panics = hook.log().clone();

    let mut terminal = init_terminal()?;
    let mut app = App::new(shell, display, config).with_panic_log(panics.clone());

    let result = {
        let _restore = RestoreOnUnwind::new(|| restore_after_crash(&panics));
        let result = app.run(&mut terminal).await;
        let report = app.shutdown().await;
        tracing::info!(stopped = report.stopped, timed_out = report.timed_out, "background tasks stopped");
        result
    };

    restore_terminal(&mut terminal)?;
    drop(hook);

    result
}
