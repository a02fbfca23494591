//! Tracing setup: a front-end layer plus a rolling JSON file.

use std::path::{Path, PathBuf};

use lcdiags_config::LoggingConfig;
use lcdiags_tui::{LogBuffer, TuiLogLayer};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

const VERBOSE_FILTER: &str =
    "lcdiags=debug,lcdiags_shell=debug,lcdiags_domain=debug,lcdiags_tui=debug,lcdiags_config=debug,info";

const FILE_FILTER: &str =
    "lcdiags=trace,lcdiags_shell=trace,lcdiags_domain=trace,lcdiags_tui=debug,lcdiags_config=trace,info";

const LOG_FILE_NAME: &str = "lcdiags.log";

/// Where human-readable log lines go.
pub enum LogOutput {
    /// Line mode: formatted lines on stderr, keeping stdout for output.
    Stderr,
    /// Full-screen mode: the TUI's log panel.
    Tui(LogBuffer),
}

/// Install the global subscriber.
///
/// `RUST_LOG` overrides the configured filter. The returned guard flushes
/// the file writer on drop.
pub fn init(
    verbose: bool,
    config: &LoggingConfig,
    config_dir: Option<&Path>,
    output: LogOutput,
) -> Option<WorkerGuard> {
    let directive = if verbose {
        VERBOSE_FILTER
    } else {
        config.filter.as_str()
    };
    let filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    let (stderr_layer, tui_layer) = match output {
        LogOutput::Stderr => (
            Some(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_writer(std::io::stderr)
                    .with_filter(filter()),
            ),
            None,
        ),
        LogOutput::Tui(buffer) => (None, Some(TuiLogLayer::new(buffer).with_filter(filter()))),
    };

    let (file_layer, guard) = if config.file {
        let file_appender = tracing_appender::rolling::daily(log_dir(config_dir), LOG_FILE_NAME);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        let layer = tracing_subscriber::fmt::layer()
            .json()
            .with_writer(non_blocking)
            .with_filter(EnvFilter::new(FILE_FILTER));
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(tui_layer)
        .with(file_layer)
        .init();

    guard
}

fn log_dir(config_dir: Option<&Path>) -> PathBuf {
    config_dir
        .map(|d| d.join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"))
}
