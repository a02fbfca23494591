//! Configuration system for the lcdiags shell.
//!
//! TOML configuration with layered discovery:
//! - `~/.config/lcdiags/config.toml` (or `$LCDIAGS_CONFIG_DIR/config.toml`)
//! - `./lcdiags.toml` (project-local, overrides whole sections)
//! - CLI flags (applied by the binary)

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    ConfigSource, LoadedConfig, load_config_file, load_config_with_options, xdg_config_dir,
    xdg_config_path,
};
pub use error::{ConfigError, Result};
pub use types::*;
