//! Configuration module for mapframe
//!
//! Provides types, discovery and parsing for `mapframe.toml`.

pub mod loader;
pub mod schema;

pub use loader::{load_config, ConfigError};
pub use schema::*;
