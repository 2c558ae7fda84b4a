//! Persistent storage backends for image records.
//!
//! This module provides:
//! - The `ImageStorage` trait the registry persists through
//! - `MemoryStorage`, an in-process backend with failure injection
//! - `FileStorage`, JSON files in a data directory

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use crate::models::{ImageIndex, ImageRecord, SurfaceId};
use crate::registry::ImageRegistry;
use crate::resource::{ImageResource, LoadError};
use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;

/// Storage backend error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    /// File I/O error
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Record (de)serialization error
    #[error("invalid record data: {0}")]
    Json(#[from] serde_json::Error),
    /// No record exists for the index
    #[error("no image stored at index {0}")]
    NotFound(ImageIndex),
    /// A record was saved before an index was assigned
    #[error("image has no index assigned")]
    Unindexed,
    /// Backend-specific failure
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Deferred construction of one stored image; runs off the calling thread.
pub type PendingLoad = Box<dyn FnOnce() -> Result<Arc<dyn ImageResource>, LoadError> + Send>;

/// Persistent backing store for images and the deleted-surface set.
pub trait ImageStorage: Send + Sync {
    /// Index for an image about to be registered: its current index if it has
    /// one, otherwise a newly reserved one.
    fn prepare_image_index(&self, image: &dyn ImageResource) -> Result<ImageIndex, StorageError>;

    /// Write (or overwrite) a record.
    fn save_image(&self, record: &ImageRecord) -> Result<(), StorageError>;

    /// Read a record.
    fn load_image_data(&self, index: ImageIndex) -> Result<ImageRecord, StorageError>;

    /// Remove a record. Removing a missing record is not an error.
    fn delete_image(&self, index: ImageIndex) -> Result<(), StorageError>;

    /// Persist the deleted-surface set.
    fn save_deleted_surfaces(&self, surfaces: &BTreeSet<SurfaceId>) -> Result<(), StorageError>;

    /// Restore the deleted-surface set; empty if never saved.
    fn load_deleted_surfaces(&self) -> Result<BTreeSet<SurfaceId>, StorageError>;

    /// Every index with a stored record.
    fn all_image_indexes(&self) -> Result<BTreeSet<ImageIndex>, StorageError>;

    /// One labelled pending load per stored image.
    ///
    /// Records are read up front; turning them into resources (which may
    /// decode frames) is left to the returned closures.
    fn load_images(
        &self,
        registry: &Arc<ImageRegistry>,
    ) -> Result<Vec<(String, PendingLoad)>, StorageError> {
        let indexes = self.all_image_indexes()?;
        Ok(indexes
            .into_iter()
            .map(|index| {
                let record = self.load_image_data(index);
                let registry = Arc::clone(registry);
                let load: PendingLoad = Box::new(move || {
                    let loader = Arc::clone(registry.loader());
                    loader.load(&registry, record?)
                });
                (format!("image {}", index), load)
            })
            .collect())
    }
}
