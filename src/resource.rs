//! The image resource contract the registry manages.

use crate::models::{CreatorId, ImageIndex, ImageRecord, RegistryId, RenderData, SurfaceId};
use crate::registry::ImageRegistry;
use crate::storage::{ImageStorage, StorageError};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Error building or updating a resource from persisted data.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoadError {
    /// The backing record could not be read
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// Surface list does not cover the `width x height` grid
    #[error("expected {expected} surfaces for a {width}x{height} image, got {actual}")]
    SurfaceCount { width: u32, height: u32, expected: usize, actual: usize },
    /// A frame source could not be decoded
    #[error("failed to decode frame {path}: {source}")]
    Frame {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    /// The record describes a different image than the one being updated
    #[error("record for index {record} applied to image {image}")]
    IndexMismatch { record: ImageIndex, image: ImageIndex },
}

/// A named, owned displayable image bound to one or more surfaces.
///
/// Implementations use interior mutability: the registry shares resources as
/// `Arc<dyn ImageResource>` between threads.
pub trait ImageResource: Send + Sync {
    /// Registry index, `None` until storage assigns one.
    fn index(&self) -> Option<ImageIndex>;

    /// Record the index assigned by storage.
    fn set_index(&self, index: ImageIndex);

    /// The registry this image was created for.
    fn owner(&self) -> RegistryId;

    fn creator(&self) -> CreatorId;

    fn name(&self) -> String;

    /// Physical surfaces, in grid order.
    fn surfaces(&self) -> Vec<SurfaceId>;

    /// Virtual surface ids used for animation frames.
    fn fake_surface_ids(&self) -> Vec<SurfaceId> {
        Vec::new()
    }

    /// Whether the image needs the animation service (and fake ids).
    fn requires_animation_service(&self) -> bool {
        false
    }

    /// Whether deleting this image should leave placeholders on its surfaces.
    fn tracks_deleted_surfaces(&self) -> bool {
        true
    }

    fn is_valid(&self) -> bool;

    /// Permanently invalidate. Later operations must be rejected.
    fn mark_invalid(&self);

    /// Release runtime resources (animation, caches).
    fn stop(&self);

    /// Persist through the storage backend.
    fn save(&self, storage: &dyn ImageStorage) -> Result<(), StorageError>;

    /// Apply freshly loaded data in place. Returns whether anything changed.
    fn apply_update(&self, record: &ImageRecord) -> Result<bool, LoadError>;

    /// Rebuild cached palette data from the image sources.
    fn reload_color_cache(&self);

    /// Pixel data for one surface at an animation tick.
    fn render(&self, surface: SurfaceId, tick: u64) -> Option<RenderData>;
}

impl fmt::Debug for dyn ImageResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageResource")
            .field("index", &self.index())
            .field("creator", &self.creator())
            .field("name", &self.name())
            .field("surfaces", &self.surfaces())
            .field("valid", &self.is_valid())
            .finish()
    }
}

/// Rebuilds resources from persisted records.
pub trait ResourceLoader: Send + Sync {
    fn load(
        &self,
        registry: &Arc<ImageRegistry>,
        record: ImageRecord,
    ) -> Result<Arc<dyn ImageResource>, LoadError>;
}
