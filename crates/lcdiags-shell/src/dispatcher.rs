//! Command-line dispatch.
//!
//! A line is split into shell-style tokens and walked down the command tree
//! one token per depth. `q` and `?` are reserved at every depth. When a token
//! matches no child, the whole token list goes to the [`PluginLoader`], which
//! locates the leaf handler; the handler is constructed, executed once and
//! dropped. Every failure on the way is turned into display text.

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;

use crate::error::ShellError;
use crate::registry::PluginLoader;
use crate::session::Session;
use crate::tree::{CommandNode, CommandTree};

/// Token that terminates the process.
pub const QUIT_TOKEN: &str = "q";

/// Token that lists the subcommands of the current level.
pub const LIST_TOKEN: &str = "?";

/// Reported conditions that produce no output text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// The line stopped at an interior node.
    NotImplemented { line: String },
    /// Immediate children of the current level.
    Subcommands(Vec<String>),
    /// `?` at a level without children.
    NoSubcommands,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::NotImplemented { line } => write!(f, "Command not implemented: {line}"),
            Notice::Subcommands(names) => write!(f, "{}", names.join("\n")),
            Notice::NoSubcommands => write!(f, "No subcommands"),
        }
    }
}

/// Result of dispatching one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Text for the display sink.
    Output(String),
    /// Nothing to show (blank line, or the handler returned no text).
    Silent,
    /// A report for the operator that is not display output.
    Notice(Notice),
    /// `q` was entered; the process should exit with status 0.
    Quit,
}

/// Where a token walk ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// No tokens.
    Empty,
    /// `q` at `depth`.
    Quit { depth: usize },
    /// `?` at a level with children.
    List(Vec<String>),
    /// `?` at a leaf or childless level.
    NoSubcommands,
    /// Tokens ran out above any leaf.
    NotImplemented { depth: usize },
    /// Hand the tokens to the loader.
    Execute { depth: usize },
}

/// In-progress walk state for one line.
#[derive(Debug)]
struct DispatchCursor<'a> {
    tokens: &'a [String],
    node: &'a CommandNode,
    path: Vec<&'a str>,
    depth: usize,
}

impl<'a> DispatchCursor<'a> {
    fn new(tokens: &'a [String], root: &'a CommandNode) -> Self {
        Self {
            tokens,
            node: root,
            path: Vec::new(),
            depth: 0,
        }
    }

    fn token(&self) -> Option<&'a str> {
        self.tokens.get(self.depth).map(String::as_str)
    }

    fn descend(&mut self, child: &'a CommandNode) {
        self.path.push(child.name());
        self.node = child;
        self.depth += 1;
        tracing::trace!(depth = self.depth, path = %self.path.join("/"), "descended");
    }
}

/// Resolves lines against the command tree and runs handlers.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    loader: PluginLoader,
}

impl Dispatcher {
    /// Create a dispatcher over `loader`'s tree and registry.
    pub fn new(loader: PluginLoader) -> Self {
        Self { loader }
    }

    /// The command tree.
    pub fn tree(&self) -> &Arc<CommandTree> {
        self.loader.tree()
    }

    /// The handler loader.
    pub fn loader(&self) -> &PluginLoader {
        &self.loader
    }

    /// Walk `tokens` down the tree without running anything.
    pub fn resolve(&self, tokens: &[String]) -> Resolution {
        if tokens.is_empty() {
            return Resolution::Empty;
        }

        let mut cursor = DispatchCursor::new(tokens, self.tree().root());
        loop {
            let Some(token) = cursor.token() else {
                return if cursor.node.is_leaf() {
                    Resolution::Execute { depth: cursor.depth }
                } else {
                    tracing::debug!(path = %cursor.path.join("/"), "ran out of tokens above a leaf");
                    Resolution::NotImplemented { depth: cursor.depth }
                };
            };

            match token {
                QUIT_TOKEN => return Resolution::Quit { depth: cursor.depth },
                LIST_TOKEN => {
                    return if cursor.node.has_children() {
                        Resolution::List(cursor.node.child_names())
                    } else {
                        Resolution::NoSubcommands
                    };
                }
                name => match cursor.node.child(name) {
                    Some(child) => cursor.descend(child),
                    None => return Resolution::Execute { depth: cursor.depth },
                },
            }
        }
    }

    /// Dispatch one command line.
    pub async fn dispatch(&self, line: &str, session: &Session) -> DispatchOutcome {
        let tokens = match shell_words::split(line) {
            Ok(tokens) => tokens,
            Err(e) => {
                let err = ShellError::from(e);
                tracing::warn!(line = %line, error = %err, "could not tokenize command line");
                return DispatchOutcome::Output(err.to_string());
            }
        };

        match self.resolve(&tokens) {
            Resolution::Empty => DispatchOutcome::Silent,
            Resolution::Quit { depth } => {
                tracing::info!(depth, "quit requested");
                DispatchOutcome::Quit
            }
            Resolution::List(names) => DispatchOutcome::Notice(Notice::Subcommands(names)),
            Resolution::NoSubcommands => DispatchOutcome::Notice(Notice::NoSubcommands),
            Resolution::NotImplemented { depth } => {
                tracing::info!(line = %line, depth, "command not implemented");
                DispatchOutcome::Notice(Notice::NotImplemented {
                    line: line.to_string(),
                })
            }
            Resolution::Execute { .. } => self.execute(tokens, session).await,
        }
    }

    async fn execute(&self, tokens: Vec<String>, session: &Session) -> DispatchOutcome {
        let loaded = match self.loader.load(&tokens) {
            Ok(loaded) => loaded,
            Err(e) => {
                tracing::warn!(tokens = ?tokens, error = %e, "could not load handler");
                return DispatchOutcome::Output(e.to_string());
            }
        };

        let key = loaded.leaf.key.clone();
        let mut handler = match loaded.instantiate(tokens, session.clone()) {
            Ok(handler) => handler,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "could not construct handler");
                return DispatchOutcome::Output(e.to_string());
            }
        };

        tracing::debug!(key = %key, "executing handler");
        match AssertUnwindSafe(handler.execute()).catch_unwind().await {
            Ok(Ok(Some(text))) => DispatchOutcome::Output(text),
            Ok(Ok(None)) => DispatchOutcome::Silent,
            Ok(Err(e)) => {
                tracing::warn!(key = %key, error = %e, "handler failed");
                DispatchOutcome::Output(format!("{key}: {e}"))
            }
            Err(_) => {
                tracing::error!(key = %key, "handler panicked");
                DispatchOutcome::Output(format!("{key}: command crashed"))
            }
        }
    }
}
