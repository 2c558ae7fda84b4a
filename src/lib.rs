//! Mapframe - palette quantization and a concurrent image registry for
//! fixed-size map surfaces
//!
//! This library provides functionality to:
//! - Quantize true-color images onto the map palette with Floyd-Steinberg dithering
//! - Track named, possibly animated images bound to host surfaces
//! - Keep the in-memory registry in step with persistent storage

pub mod cli;
pub mod color;
pub mod config;
pub mod events;
pub mod host;
pub mod image_map;
pub mod models;
pub mod output;
pub mod palettes;
pub mod quantize;
pub mod registry;
pub mod resource;
pub mod scheduler;
pub mod storage;

pub use image_map::{ImageMap, ImageMapLoader, ImageMapParams};
pub use registry::{ImageRegistry, RegistryError, RegistrySettings};
pub use resource::{ImageResource, LoadError, ResourceLoader};
