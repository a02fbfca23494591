//! Line-mode front end: rustyline prompt, output written straight to stdout.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use console::{Style, Term, style};
use lcdiags_shell::{CommandTree, DispatchOutcome, DisplaySink, Notice, Shell};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use rustyline::completion::Completer;
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{CompletionType, Config, Context, Editor, Helper};

const PROMPT: &str = ">>> ";

/// Display sink printing each update as a block on stdout.
///
/// Background tasks and the prompt loop share the terminal; the lock keeps
/// one update from interleaving with another.
pub struct ConsoleDisplay {
    term: Mutex<Term>,
}

impl ConsoleDisplay {
    pub fn new() -> Self {
        Self {
            term: Mutex::new(Term::stdout()),
        }
    }
}

impl DisplaySink for ConsoleDisplay {
    fn display(&self, text: &str) {
        let term = self.term.lock();
        if let Err(e) = term.write_line(text) {
            tracing::debug!(error = %e, "failed to write display update");
        }
    }
}

/// Tab completion over the command tree.
struct CommandHelper {
    tree: Arc<CommandTree>,
}

impl Completer for CommandHelper {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        let before = &line[..pos];
        let start = before
            .rfind(char::is_whitespace)
            .map(|i| i + 1)
            .unwrap_or(0);
        Ok((start, self.tree.complete(before)))
    }
}

impl Hinter for CommandHelper {
    type Hint = String;
}

impl Highlighter for CommandHelper {}

impl Validator for CommandHelper {}

impl Helper for CommandHelper {}

/// Something the prompt thread reads lines from.
trait LineSource {
    fn read_line(&mut self, prompt: &str) -> rustyline::Result<String>;
}

impl<H: Helper> LineSource for Editor<H, DefaultHistory> {
    fn read_line(&mut self, prompt: &str) -> rustyline::Result<String> {
        self.readline(prompt)
    }
}

/// Reads input on a dedicated thread so the runtime keeps driving background
/// tasks while the prompt waits. One line is read per request, so the next
/// prompt only appears after the previous command has finished.
struct PromptThread {
    requests: std::sync::mpsc::Sender<()>,
    lines: mpsc::Receiver<rustyline::Result<String>>,
}

impl PromptThread {
    fn spawn<S, F>(open: F) -> Result<Self>
    where
        S: LineSource,
        F: FnOnce() -> rustyline::Result<S> + Send + 'static,
    {
        let (requests, request_rx) = std::sync::mpsc::channel::<()>();
        let (line_tx, lines) = mpsc::channel(1);

        std::thread::Builder::new()
            .name("lcdiags-prompt".into())
            .spawn(move || {
                let mut source = match open() {
                    Ok(source) => source,
                    Err(e) => {
                        let _ = line_tx.blocking_send(Err(e));
                        return;
                    }
                };
                while request_rx.recv().is_ok() {
                    let line = source.read_line(PROMPT);
                    let last = matches!(&line, Err(e) if !matches!(e, ReadlineError::Interrupted));
                    if line_tx.blocking_send(line).is_err() || last {
                        break;
                    }
                }
                tracing::debug!("prompt thread exiting");
            })?;

        Ok(Self { requests, lines })
    }

    /// Ask for the next line. `None` once the thread has gone away.
    async fn next_line(&mut self) -> Option<rustyline::Result<String>> {
        if self.requests.send(()).is_err() {
            tracing::debug!("prompt thread already exited");
        }
        self.lines.recv().await
    }
}

/// Run the prompt loop until `q` or end of input, then stop background work.
pub async fn run(mut shell: Shell, stop_timeout: Duration) -> Result<()> {
    let tree = shell.tree().clone();
    let open = move || -> rustyline::Result<Editor<CommandHelper, DefaultHistory>> {
        let config = Config::builder()
            .history_ignore_space(true)
            .auto_add_history(true)
            .completion_type(CompletionType::List)
            .build();
        let mut editor = Editor::with_config(config)?;
        editor.set_helper(Some(CommandHelper { tree }));
        Ok(editor)
    };

    print_welcome();

    let report = shell.run_batch().await;
    for (_, outcome) in &report.outcomes {
        if let DispatchOutcome::Notice(notice) = outcome {
            print_notice(notice);
        }
    }

    let result = if report.quit {
        Ok(())
    } else {
        match PromptThread::spawn(open) {
            Ok(mut prompt) => prompt_loop(&shell, &mut prompt).await,
            Err(e) => Err(e),
        }
    };

    let stopped = shell.shutdown(stop_timeout).await;
    tracing::info!(
        stopped = stopped.stopped,
        timed_out = stopped.timed_out,
        "background tasks stopped"
    );
    result
}

async fn prompt_loop(shell: &Shell, prompt: &mut PromptThread) -> Result<()> {
    loop {
        match prompt.next_line().await {
            Some(Ok(line)) => match shell.submit(&line).await {
                DispatchOutcome::Output(_) | DispatchOutcome::Silent => {}
                DispatchOutcome::Notice(notice) => print_notice(&notice),
                DispatchOutcome::Quit => return Ok(()),
            },
            Some(Err(ReadlineError::Interrupted)) => {
                print_dim("(Interrupted - type q to quit)");
            }
            Some(Err(ReadlineError::Eof)) | None => {
                tracing::debug!("end of input");
                return Ok(());
            }
            Some(Err(e)) => return Err(e.into()),
        }
    }
}

fn print_welcome() {
    let dim = Style::new().dim();
    println!("{}", style("lcdiags").bold().cyan());
    println!(
        "{}",
        dim.apply_to("Type ? for commands, <command> ? for subcommands, q to quit.")
    );
}

fn print_notice(notice: &Notice) {
    match notice {
        Notice::Subcommands(names) => {
            for name in names {
                println!("  {}", style(name).cyan());
            }
        }
        other => print_dim(&other.to_string()),
    }
}

fn print_dim(msg: &str) {
    let dim = Style::new().dim();
    println!("{}", dim.apply_to(msg));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use lcdiags_shell::{DisplayBuffer, HandlerRegistry, Session};
    use rustyline::history::MemHistory;

    /// Hands out fixed lines after a delay, then end of input.
    struct Scripted {
        lines: VecDeque<&'static str>,
        delay: Duration,
    }

    impl Scripted {
        fn new(delay: Duration, lines: &[&'static str]) -> Self {
            Self {
                lines: lines.iter().copied().collect(),
                delay,
            }
        }
    }

    impl LineSource for Scripted {
        fn read_line(&mut self, _prompt: &str) -> rustyline::Result<String> {
            std::thread::sleep(self.delay);
            self.lines
                .pop_front()
                .map(String::from)
                .ok_or(ReadlineError::Eof)
        }
    }

    fn shell() -> (Shell, Arc<DisplayBuffer>) {
        let display = Arc::new(DisplayBuffer::new(""));
        let shell = Shell::from_parts(
            CommandTree::from_keys(["watch/kill"]),
            HandlerRegistry::new(),
            Session::new(display.clone()),
        );
        (shell, display)
    }

    #[tokio::test]
    async fn test_background_tasks_run_while_waiting_for_input() {
        let (shell, display) = shell();
        let ticks = Arc::new(AtomicUsize::new(0));
        let t = ticks.clone();
        shell
            .session()
            .start_interval_process("ticker", Duration::from_millis(10), move || {
                (t.fetch_add(1, Ordering::SeqCst) + 1).to_string()
            });

        // Single-threaded runtime: ticks only advance if the read happens elsewhere.
        let mut prompt =
            PromptThread::spawn(|| Ok(Scripted::new(Duration::from_millis(200), &["q"]))).unwrap();
        prompt_loop(&shell, &mut prompt).await.unwrap();

        assert!(ticks.load(Ordering::SeqCst) >= 3);
        assert!(!display.text().is_empty());
        shell.shutdown(Duration::from_secs(1)).await;
    }

    #[tokio::test]
    async fn test_prompt_loop_ends_on_eof() {
        let (shell, _display) = shell();
        let mut prompt =
            PromptThread::spawn(|| Ok(Scripted::new(Duration::ZERO, &["", "bogus"]))).unwrap();
        prompt_loop(&shell, &mut prompt).await.unwrap();
        assert!(prompt.next_line().await.is_none());
    }

    #[tokio::test]
    async fn test_editor_open_failure_is_reported() {
        let (shell, _display) = shell();
        let mut prompt = PromptThread::spawn(|| {
            Err::<Scripted, _>(ReadlineError::Io(std::io::Error::other("no terminal")))
        })
        .unwrap();
        let err = prompt_loop(&shell, &mut prompt).await.unwrap_err();
        assert!(err.to_string().contains("no terminal"));
    }

    #[test]
    fn test_completion_replaces_current_word() {
        let helper = CommandHelper {
            tree: Arc::new(CommandTree::from_keys(["watch/kill", "watch/leases", "show/site-status"])),
        };
        let history = MemHistory::new();
        let ctx = Context::new(&history);

        let (start, candidates) = helper.complete("watch l", 7, &ctx).unwrap();
        assert_eq!(start, 6);
        assert_eq!(candidates, vec!["leases"]);

        let (start, candidates) = helper.complete("sh", 2, &ctx).unwrap();
        assert_eq!(start, 0);
        assert_eq!(candidates, vec!["show"]);
    }
}
