//! Error types for command resolution and handler execution.

/// Errors raised while resolving or loading a command handler.
///
/// None of these end the session: the dispatcher converts every variant
/// into display text.
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    /// No leaf handler exists along the given command path.
    #[error("command not found: {path}")]
    HandlerNotFound { path: String },

    /// A leaf exists but its handler could not be loaded or constructed.
    #[error("failed to load handler '{key}': {reason}")]
    HandlerLoadError { key: String, reason: String },

    /// The command line could not be split into tokens.
    #[error("invalid command line: {0}")]
    Tokenize(#[from] shell_words::ParseError),

    /// The batch file does not exist.
    #[error("cannot open batch file: {path}")]
    BatchFileMissing { path: String },

    /// IO error while reading shell files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors a command handler can return from construction or `execute`.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// The handler was given arguments it cannot use.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// A collaborator the handler depends on failed.
    #[error("{0}")]
    Failed(String),

    /// IO error inside the handler.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HandlerError {
    /// Wrap any displayable error as a handler failure.
    pub fn failed(err: impl std::fmt::Display) -> Self {
        Self::Failed(err.to_string())
    }
}

/// Result type for shell operations.
pub type Result<T> = std::result::Result<T, ShellError>;
