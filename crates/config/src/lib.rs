//! Process configuration for the apiscan core.
//!
//! There is no module-level config singleton: the boundary constructs one
//! [`AppConfig`] and passes it down. Construction order is fixed —
//! defaults, then an environment overlay, then a profile-selected YAML file
//! overlay, with file values taking precedence over the environment.

mod config;
mod error;
mod loader;

pub use config::{AppConfig, FetchSettings, RulesetSourceConfig, ScanSettings, SchemaSourceConfig};
pub use error::{ConfigError, Result};
pub use loader::{apply_env, apply_file, load, load_profile};
