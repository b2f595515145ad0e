//! Configuration for the orbis planet renderer.
//!
//! Settings persist to disk as `config.ron`, can be overridden from the
//! command line, and can be reloaded while running.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{Config, DebugConfig, DemoConfig, LodConfig, PlanetConfig, default_config_dir};
pub use error::ConfigError;
