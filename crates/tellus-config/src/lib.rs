//! Runtime configuration persisted as RON, with CLI overrides.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    Config, DebugConfig, PlanetConfig, StreamingConfig, WindowConfig, default_config_dir,
};
pub use error::ConfigError;
