//! Configuration schema types for `mapframe.toml`
//!
//! Defines the structure and validation rules for mapframe configuration.

use crate::registry::RegistrySettings;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Storage section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Data directory for image records
    #[serde(default = "default_dir")]
    pub dir: PathBuf,
}

fn default_dir() -> PathBuf {
    PathBuf::from("data")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { dir: default_dir() }
    }
}

/// Registry section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Seconds `shutdown` waits for the registry lock
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
    /// Animation tick length in milliseconds
    #[serde(default = "default_tick_length")]
    pub tick_length_ms: u64,
    /// How long a computed tick is reused, in milliseconds
    #[serde(default = "default_tick_cache")]
    pub tick_cache_ms: u64,
}

fn default_shutdown_timeout() -> u64 {
    5
}

fn default_tick_length() -> u64 {
    50
}

fn default_tick_cache() -> u64 {
    25
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            shutdown_timeout_secs: default_shutdown_timeout(),
            tick_length_ms: default_tick_length(),
            tick_cache_ms: default_tick_cache(),
        }
    }
}

/// Render section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Surface edge length in pixels
    #[serde(default = "default_surface_size")]
    pub surface_size: u32,
    /// Paint placeholders on surfaces of deleted images
    #[serde(default = "default_true")]
    pub placeholder_on_delete: bool,
}

fn default_surface_size() -> u32 {
    128
}

fn default_true() -> bool {
    true
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self { surface_size: default_surface_size(), placeholder_on_delete: true }
    }
}

/// Logging section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default `tracing` filter when `RUST_LOG` is unset
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_level() }
    }
}

/// Root of `mapframe.toml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapframeConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    /// Path to the invalid field (e.g., "render.surface_size")
    pub field: String,
    /// Error message
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "mapframe.toml: '{}' {}", self.field, self.message)
    }
}

impl MapframeConfig {
    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();

        if self.registry.shutdown_timeout_secs == 0 {
            errors.push(ConfigValidationError {
                field: "registry.shutdown_timeout_secs".to_string(),
                message: "must be a positive integer".to_string(),
            });
        }

        if self.registry.tick_length_ms == 0 {
            errors.push(ConfigValidationError {
                field: "registry.tick_length_ms".to_string(),
                message: "must be a positive integer".to_string(),
            });
        } else if self.registry.tick_cache_ms >= self.registry.tick_length_ms {
            errors.push(ConfigValidationError {
                field: "registry.tick_cache_ms".to_string(),
                message: "must be shorter than registry.tick_length_ms".to_string(),
            });
        }

        if self.render.surface_size == 0 {
            errors.push(ConfigValidationError {
                field: "render.surface_size".to_string(),
                message: "must be a positive integer".to_string(),
            });
        }

        if self.logging.level.trim().is_empty() {
            errors.push(ConfigValidationError {
                field: "logging.level".to_string(),
                message: "must be a non-empty filter".to_string(),
            });
        }

        errors
    }

    /// Check if validation passed
    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }

    /// Registry tunables from the `[registry]` and `[render]` sections.
    pub fn registry_settings(&self) -> RegistrySettings {
        RegistrySettings {
            shutdown_timeout: Duration::from_secs(self.registry.shutdown_timeout_secs),
            tick_length: Duration::from_millis(self.registry.tick_length_ms),
            tick_cache: Duration::from_millis(self.registry.tick_cache_ms),
            surface_size: self.render.surface_size,
            placeholder_on_delete: self.render.placeholder_on_delete,
        }
    }
}
