//! The shell: dispatcher, session and startup batch tied together.
//!
//! Front ends (the full-screen TUI and the plain line mode) own a [`Shell`]
//! and feed it submitted lines; they decide how notices are shown and act on
//! [`DispatchOutcome::Quit`].

use std::sync::Arc;
use std::time::Duration;

use crate::batch::BatchScript;
use crate::dispatcher::{DispatchOutcome, Dispatcher};
use crate::registry::{HandlerRegistry, PluginLoader};
use crate::session::Session;
use crate::supervisor::StopReport;
use crate::tree::CommandTree;

/// Outcome of running the startup batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Each executed line with its outcome, in file order.
    pub outcomes: Vec<(String, DispatchOutcome)>,
    /// A batch line asked to quit; lines after it were not run.
    pub quit: bool,
}

impl BatchReport {
    /// Number of lines executed.
    pub fn executed(&self) -> usize {
        self.outcomes.len()
    }
}

/// Interactive command shell.
pub struct Shell {
    dispatcher: Dispatcher,
    session: Session,
    batch: BatchScript,
}

impl Shell {
    /// Create a shell over an existing dispatcher and session.
    pub fn new(dispatcher: Dispatcher, session: Session) -> Self {
        Self {
            dispatcher,
            session,
            batch: BatchScript::empty(),
        }
    }

    /// Build the dispatcher from a tree and registry.
    pub fn from_parts(tree: CommandTree, registry: HandlerRegistry, session: Session) -> Self {
        let loader = PluginLoader::new(Arc::new(tree), registry);
        Self::new(Dispatcher::new(loader), session)
    }

    /// Set the startup batch.
    pub fn with_batch(mut self, batch: BatchScript) -> Self {
        self.batch = batch;
        self
    }

    /// Dispatch one submitted line.
    ///
    /// Output text replaces the display; notices and quit are returned for
    /// the front end to handle.
    pub async fn submit(&self, line: &str) -> DispatchOutcome {
        let outcome = self.dispatcher.dispatch(line, &self.session).await;
        if let DispatchOutcome::Output(text) = &outcome {
            self.session.display(text);
        }
        outcome
    }

    /// Run the startup batch once, in file order.
    ///
    /// Every line runs regardless of how earlier lines went. A quit line
    /// stops the batch and is reported through [`BatchReport::quit`].
    pub async fn run_batch(&mut self) -> BatchReport {
        let batch = std::mem::take(&mut self.batch);
        let mut report = BatchReport::default();

        for line in batch.lines() {
            tracing::debug!(line = %line, "running batch line");
            let outcome = self.submit(line).await;
            let quit = outcome == DispatchOutcome::Quit;
            report.outcomes.push((line.clone(), outcome));
            if quit {
                report.quit = true;
                break;
            }
        }

        if !batch.is_empty() {
            tracing::info!(executed = report.executed(), quit = report.quit, "batch finished");
        }
        report
    }

    /// Completion candidates for the word being typed.
    pub fn completions(&self, line: &str) -> Vec<String> {
        self.dispatcher.tree().complete(line)
    }

    /// Stop background work before the process exits.
    pub async fn shutdown(&self, timeout: Duration) -> StopReport {
        self.session.stop_all_within(timeout).await
    }

    /// The session shared with handlers.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// The dispatcher.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// The command tree.
    pub fn tree(&self) -> &Arc<CommandTree> {
        self.dispatcher.tree()
    }

    /// Lines still waiting in the startup batch.
    pub fn pending_batch(&self) -> &BatchScript {
        &self.batch
    }
}

impl std::fmt::Debug for Shell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shell")
            .field("dispatcher", &self.dispatcher)
            .field("session", &self.session)
            .field("batch", &self.batch.len())
            .finish()
    }
}
