//! Data model types shared by the registry, storage backends and resources.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

/// Owning principal of an image.
pub type CreatorId = Uuid;

/// Stable registry index of an image, assigned by the storage backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageIndex(pub u32);

impl fmt::Display for ImageIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Host identifier of a render surface (real or fake).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SurfaceId(pub i32);

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Someone looking at a surface during a render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewerId(pub Uuid);

/// Identity of the registry that owns an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegistryId(pub Uuid);

impl RegistryId {
    /// A fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RegistryId {
    fn default() -> Self {
        Self::new()
    }
}

/// A marker drawn on top of a surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapCursor {
    pub x: i8,
    pub y: i8,
    /// Rotation in sixteenths of a turn
    pub direction: u8,
    pub kind: u8,
    pub caption: Option<String>,
}

/// Output of one render pass for one surface and viewer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RenderData {
    /// Palette indices, `size * size`, row-major
    pub pixels: Vec<u8>,
    pub cursors: Vec<MapCursor>,
}

/// Persisted description of an image, enough to rebuild it with a loader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub index: ImageIndex,
    pub creator: CreatorId,
    pub name: String,
    /// Width in surfaces
    pub width: u32,
    /// Height in surfaces
    pub height: u32,
    /// Physical surfaces, row-major over the `width x height` grid
    pub surfaces: Vec<SurfaceId>,
    /// Source image for each animation frame
    #[serde(default)]
    pub frames: Vec<PathBuf>,
    /// Delay between frames in milliseconds (ignored for a single frame)
    #[serde(default = "default_frame_delay")]
    pub frame_delay_ms: u32,
    /// Whether surfaces of this image show a placeholder after deletion
    #[serde(default = "default_track_deleted")]
    pub track_deleted: bool,
}

fn default_frame_delay() -> u32 {
    100
}

fn default_track_deleted() -> bool {
    true
}
