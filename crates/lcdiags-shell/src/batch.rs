//! Startup batch script.

use std::path::{Path, PathBuf};

use crate::error::{Result, ShellError};

/// Default batch file name inside the command root.
pub const BATCH_FILE_NAME: &str = "commands.batch";

/// Command lines read once at startup, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchScript {
    path: Option<PathBuf>,
    lines: Vec<String>,
}

impl BatchScript {
    /// An empty script.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A script from in-memory lines.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            path: None,
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    /// Read a batch file. Blank lines and `#` comments are dropped.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ShellError::BatchFileMissing {
                path: path.display().to_string(),
            },
            _ => ShellError::Io(e),
        })?;

        let lines = contents
            .lines()
            .map(str::trim_end)
            .filter(|l| !l.trim().is_empty() && !l.trim_start().starts_with('#'))
            .map(str::to_owned)
            .collect();

        Ok(Self {
            path: Some(path.to_path_buf()),
            lines,
        })
    }

    /// Read a batch file, falling back to an empty script with a warning.
    pub fn load_or_empty(path: &Path) -> Self {
        match Self::load(path) {
            Ok(script) => {
                tracing::info!(path = %path.display(), lines = script.len(), "loaded batch file");
                script
            }
            Err(e) => {
                tracing::warn!(error = %e, "no startup batch");
                Self::empty()
            }
        }
    }

    /// File the script was read from.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// The command lines.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Number of command lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether there is nothing to run.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
