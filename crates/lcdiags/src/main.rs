//! lcdiags - interactive diagnostics shell for local charging sites
//!
//! Main entry point: resolves configuration, sets up logging, builds the
//! command tree and hands the shell to the full-screen or plain front end.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use lcdiags_config::LcdiagsConfig;
use lcdiags_shell::{BatchScript, CommandTree, DisplayBuffer, HandlerRegistry, Session, Shell};
use lcdiags_tui::{LogBuffer, TuiConfig};

mod commands;
mod logging;
mod plain;

use commands::CommandEnv;
use logging::LogOutput;

/// Text shown in the output region before the first command.
const WELCOME: &str = "lcdiags - type ? for commands, q to quit";

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// lcdiags - interactive diagnostics shell for local charging sites
#[derive(Parser, Debug)]
#[command(name = "lcdiags")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Line-mode front end instead of the full-screen terminal UI
    #[arg(long)]
    pub plain: bool,

    /// Directory holding config.toml and logs/
    #[arg(long, env = "LCDIAGS_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,

    /// Command root directory (default: ./commands)
    #[arg(long, env = "LCDIAGS_COMMAND_ROOT")]
    pub command_root: Option<PathBuf>,

    /// Startup batch file (default: <command root>/commands.batch)
    #[arg(long)]
    pub batch: Option<PathBuf>,

    /// Skip the startup batch
    #[arg(long, conflicts_with = "batch")]
    pub no_batch: bool,

    /// Seconds between refreshes of watch commands
    #[arg(long)]
    pub interval: Option<f64>,

    /// Directory holding the published status documents
    #[arg(long)]
    pub store_dir: Option<PathBuf>,

    /// dnsmasq lease file
    #[arg(long)]
    pub leases: Option<PathBuf>,
}

/// Effective settings: config file values with CLI overrides applied.
#[derive(Debug, Clone)]
struct Settings {
    command_root: PathBuf,
    batch: Option<PathBuf>,
    tick: Duration,
    stop_timeout: Duration,
    env: CommandEnv,
}

impl Settings {
    fn resolve(cli: &Cli, config: &LcdiagsConfig) -> Result<Self> {
        let mut shell = config.shell();
        if let Some(root) = &cli.command_root {
            shell.command_root = root.clone();
        }

        let batch = match (&cli.batch, cli.no_batch) {
            (_, true) => None,
            (Some(path), false) => Some(path.clone()),
            (None, false) => Some(shell.batch_path()),
        };

        let watch_interval = match cli.interval {
            Some(secs) => lcdiags_config::interval_from_secs("--interval", secs)?,
            None => config.watch().interval()?,
        };

        let mut status = config.status();
        if let Some(dir) = &cli.store_dir {
            status.store_dir = dir.clone();
        }
        if let Some(path) = &cli.leases {
            status.leases_path = path.clone();
        }

        Ok(Self {
            tick: shell.tick(),
            stop_timeout: shell.stop_timeout(),
            command_root: shell.command_root,
            batch,
            env: CommandEnv {
                watch_interval,
                status,
            },
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = lcdiags_config::load_config_with_options(None, cli.config_dir.as_deref())?;
    let settings = Settings::resolve(&cli, &loaded.config)?;

    let config_dir = cli
        .config_dir
        .clone()
        .or_else(lcdiags_config::xdg_config_dir);
    let log_buffer = LogBuffer::new();
    let output = if cli.plain {
        LogOutput::Stderr
    } else {
        LogOutput::Tui(log_buffer.clone())
    };
    let guard = logging::init(
        cli.verbose,
        &loaded.config.logging(),
        config_dir.as_deref(),
        output,
    );

    for warning in &loaded.warnings {
        tracing::warn!("{}", warning);
    }
    tracing::debug!(sources = ?loaded.loaded_from(), "configuration loaded");

    let registry = commands::registry(Arc::new(settings.env.clone()));
    let tree = build_tree(&settings.command_root, &registry);
    let batch = match &settings.batch {
        Some(path) => BatchScript::load_or_empty(path),
        None => BatchScript::empty(),
    };

    if cli.plain {
        let console = Arc::new(plain::ConsoleDisplay::new());
        let shell = Shell::from_parts(tree, registry, Session::new(console)).with_batch(batch);
        plain::run(shell, settings.stop_timeout).await?;
    } else {
        let display = Arc::new(DisplayBuffer::new(WELCOME));
        let shell =
            Shell::from_parts(tree, registry, Session::new(display.clone())).with_batch(batch);
        let config = TuiConfig {
            tick: settings.tick,
            stop_timeout: settings.stop_timeout,
            log_buffer,
        };
        lcdiags_tui::run(shell, display, config).await?;
    }

    // Detached producers may still be blocked; don't wait on the runtime.
    drop(guard);
    std::process::exit(0);
}

/// Command tree from the command root, or from the registry when the root
/// does not exist.
fn build_tree(root: &std::path::Path, registry: &HandlerRegistry) -> CommandTree {
    let tree = if root.is_dir() {
        CommandTree::build(root)
    } else {
        tracing::warn!(
            root = %root.display(),
            "command root not found, using built-in command tree"
        );
        CommandTree::from_keys(registry.keys())
    };

    for leaf in tree.leaves() {
        if !registry.contains(&leaf.key) {
            tracing::warn!(key = %leaf.key, "command has no registered handler");
        }
    }
    tracing::info!(
        leaves = tree.leaves().len(),
        depth = tree.depth(),
        "command tree ready"
    );
    tree
}
