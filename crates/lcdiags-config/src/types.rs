//! Configuration types mapping to the TOML schema.
//!
//! ```toml
//! [shell]     # command root, batch file, UI tick
//! [watch]     # background task interval
//! [status]    # status store, lease file, last-run snapshot
//! [logging]   # log filter and file logging
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::{ConfigError, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All sections are optional so that partial configs (project-local
/// overrides) can be loaded and merged. Accessors return the section or its
/// defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LcdiagsConfig {
    /// Shell and command root configuration.
    pub shell: Option<ShellConfig>,

    /// Background watch configuration.
    pub watch: Option<WatchConfig>,

    /// Status sources used by the built-in commands.
    pub status: Option<StatusConfig>,

    /// Logging configuration.
    pub logging: Option<LoggingConfig>,
}

impl LcdiagsConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Merge another config on top of this one (other takes priority).
    ///
    /// Sections are replaced wholesale, not field by field.
    pub fn merge(&mut self, other: LcdiagsConfig) {
        if other.shell.is_some() {
            self.shell = other.shell;
        }

        if other.watch.is_some() {
            self.watch = other.watch;
        }

        if other.status.is_some() {
            self.status = other.status;
        }

        if other.logging.is_some() {
            self.logging = other.logging;
        }
    }

    /// Effective `[shell]` section.
    pub fn shell(&self) -> ShellConfig {
        self.shell.clone().unwrap_or_default()
    }

    /// Effective `[watch]` section.
    pub fn watch(&self) -> WatchConfig {
        self.watch.clone().unwrap_or_default()
    }

    /// Effective `[status]` section.
    pub fn status(&self) -> StatusConfig {
        self.status.clone().unwrap_or_default()
    }

    /// Effective `[logging]` section.
    pub fn logging(&self) -> LoggingConfig {
        self.logging.clone().unwrap_or_default()
    }

    fn validate(&self) -> Result<()> {
        if let Some(watch) = &self.watch {
            watch.interval()?;
        }
        if let Some(shell) = &self.shell
            && shell.tick_ms == 0
        {
            return Err(ConfigError::InvalidValue {
                field: "shell.tick_ms".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Sections
// ─────────────────────────────────────────────────────────────────────────────

/// `[shell]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    /// Command root directory. Relative paths resolve against the working directory.
    pub command_root: PathBuf,
    /// Batch file name, resolved inside the command root.
    pub batch_file: String,
    /// UI redraw tick in milliseconds.
    pub tick_ms: u64,
    /// How long shutdown waits for background tasks before detaching them.
    pub stop_timeout_ms: u64,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            command_root: PathBuf::from("commands"),
            batch_file: "commands.batch".to_string(),
            tick_ms: 100,
            stop_timeout_ms: 2000,
        }
    }
}

impl ShellConfig {
    /// Full path of the batch file.
    pub fn batch_path(&self) -> PathBuf {
        self.command_root.join(&self.batch_file)
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }
}

/// `[watch]` section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Seconds between refreshes of a watch task.
    pub interval_secs: f64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            interval_secs: Self::DEFAULT_INTERVAL.as_secs_f64(),
        }
    }
}

impl WatchConfig {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(2);

    /// Refresh interval as a [`Duration`].
    pub fn interval(&self) -> Result<Duration> {
        interval_from_secs("watch.interval_secs", self.interval_secs)
    }
}

/// Convert seconds to a non-zero [`Duration`].
///
/// Rejects NaN, infinities, negatives, and values too large or too small to
/// represent. `field` names the setting in the error.
pub fn interval_from_secs(field: &str, secs: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs)
        .ok()
        .filter(|d| !d.is_zero())
        .ok_or_else(|| ConfigError::InvalidValue {
            field: field.to_string(),
            message: format!("must be a positive number of seconds, got {secs}"),
        })
}

/// `[status]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StatusConfig {
    /// Directory holding the status store files.
    pub store_dir: PathBuf,
    /// dnsmasq lease file.
    pub leases_path: PathBuf,
    /// Store key for the site status document.
    pub site_status_key: String,
    /// Store key for the charging stations document.
    pub stations_status_key: String,
    /// Connections table of the previous render.
    pub snapshot_path: PathBuf,
    /// CSV log of status changes between renders.
    pub change_log_path: PathBuf,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            store_dir: PathBuf::from("."),
            leases_path: PathBuf::from("/data/dnsmasq/dnsmasq.leases"),
            site_status_key: "cgw/SiteStatus".to_string(),
            stations_status_key: "cgw/ChargingStationsStatus".to_string(),
            snapshot_path: PathBuf::from("tabledata.json"),
            change_log_path: PathBuf::from("status_changes.csv"),
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `EnvFilter` directive when `RUST_LOG` is unset.
    pub filter: String,
    /// Write a daily rolling JSON log under the config directory.
    pub file: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "lcdiags=info,lcdiags_shell=info,lcdiags_domain=info,lcdiags_tui=info,warn".to_string(),
            file: true,
        }
    }
}
