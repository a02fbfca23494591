//! Built-in command handlers.
//!
//! Each handler is registered under its command path and constructed per
//! invocation with the line's [`HandlerContext`].

mod show;
mod test;
mod watch;

use std::sync::Arc;
use std::time::Duration;

use lcdiags_config::{StatusConfig, WatchConfig, interval_from_secs};
use lcdiags_domain::{FileStatusStore, LastRunSnapshot, SiteStatusView, StatusKeys};
use lcdiags_shell::{HandlerError, HandlerRegistry};

/// Settings the built-in commands run with.
#[derive(Debug, Clone)]
pub struct CommandEnv {
    /// Default refresh interval of repeating tasks.
    pub watch_interval: Duration,
    pub status: StatusConfig,
}

impl Default for CommandEnv {
    fn default() -> Self {
        Self {
            watch_interval: WatchConfig::DEFAULT_INTERVAL,
            status: StatusConfig::default(),
        }
    }
}

impl CommandEnv {
    /// Site status view over the configured sources.
    pub fn site_view(&self) -> SiteStatusView {
        let status = &self.status;
        SiteStatusView::new(
            Arc::new(FileStatusStore::new(status.store_dir.clone())),
            StatusKeys {
                site_status: status.site_status_key.clone(),
                stations_status: status.stations_status_key.clone(),
            },
            status.leases_path.clone(),
            LastRunSnapshot::new(status.snapshot_path.clone(), status.change_log_path.clone()),
        )
    }

    /// Refresh interval from an optional `<seconds>` argument.
    pub fn interval(&self, args: &[String]) -> Result<Duration, HandlerError> {
        match args {
            [] => Ok(self.watch_interval),
            [secs] => secs
                .parse::<f64>()
                .ok()
                .and_then(|s| interval_from_secs("interval", s).ok())
                .ok_or_else(|| {
                    HandlerError::InvalidArguments(format!(
                        "expected an interval in seconds, got '{secs}'"
                    ))
                }),
            _ => Err(HandlerError::InvalidArguments(format!(
                "expected at most one argument, got {}",
                args.len()
            ))),
        }
    }
}

/// Registry with every built-in command.
pub fn registry(env: Arc<CommandEnv>) -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    watch::register(&mut registry, &env);
    show::register(&mut registry, &env);
    test::register(&mut registry, &env);
    registry
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use lcdiags_shell::{CommandTree, DisplayBuffer, Session, Shell};

    use super::{CommandEnv, registry};

    /// Shell over the built-in commands writing into a buffer.
    pub fn shell(env: CommandEnv) -> (Shell, Arc<DisplayBuffer>) {
        let registry = registry(Arc::new(env));
        let tree = CommandTree::from_keys(registry.keys());
        let display = Arc::new(DisplayBuffer::new(""));
        let shell = Shell::from_parts(tree, registry, Session::new(display.clone()));
        (shell, display)
    }
}
