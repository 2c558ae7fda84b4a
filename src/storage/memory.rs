//! In-process storage backend.

use super::{ImageStorage, StorageError};
use crate::models::{ImageIndex, ImageRecord, SurfaceId};
use crate::resource::ImageResource;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Default)]
struct Inner {
    records: BTreeMap<ImageIndex, ImageRecord>,
    reserved: BTreeSet<ImageIndex>,
    deleted_surfaces: BTreeSet<SurfaceId>,
}

/// Keeps records in memory. Useful for embedding and tests.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    inner: Mutex<Inner>,
    fail_next_save: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `save_image` call fail.
    pub fn fail_next_save(&self) {
        self.fail_next_save.store(true, Ordering::SeqCst);
    }

    /// Insert or replace a record directly, bypassing the registry.
    pub fn insert_record(&self, record: ImageRecord) {
        let mut inner = self.inner.lock();
        inner.reserved.insert(record.index);
        inner.records.insert(record.index, record);
    }

    /// Remove a record directly, bypassing the registry.
    pub fn remove_record(&self, index: ImageIndex) -> Option<ImageRecord> {
        let mut inner = self.inner.lock();
        inner.reserved.remove(&index);
        inner.records.remove(&index)
    }

    /// Snapshot of one record.
    pub fn record(&self, index: ImageIndex) -> Option<ImageRecord> {
        self.inner.lock().records.get(&index).cloned()
    }

    /// Last saved deleted-surface set.
    pub fn saved_deleted_surfaces(&self) -> BTreeSet<SurfaceId> {
        self.inner.lock().deleted_surfaces.clone()
    }
}

/// Smallest index not in `taken`.
pub(super) fn first_free_index(taken: &BTreeSet<ImageIndex>) -> ImageIndex {
    let mut candidate = 0u32;
    for index in taken {
        if index.0 != candidate {
            break;
        }
        candidate += 1;
    }
    ImageIndex(candidate)
}

impl ImageStorage for MemoryStorage {
    fn prepare_image_index(&self, image: &dyn ImageResource) -> Result<ImageIndex, StorageError> {
        let mut inner = self.inner.lock();
        let index = match image.index() {
            Some(index) => index,
            None => first_free_index(&inner.reserved),
        };
        inner.reserved.insert(index);
        Ok(index)
    }

    fn save_image(&self, record: &ImageRecord) -> Result<(), StorageError> {
        if self.fail_next_save.swap(false, Ordering::SeqCst) {
            return Err(StorageError::Backend(format!("injected failure saving {}", record.index)));
        }
        let mut inner = self.inner.lock();
        inner.reserved.insert(record.index);
        inner.records.insert(record.index, record.clone());
        Ok(())
    }

    fn load_image_data(&self, index: ImageIndex) -> Result<ImageRecord, StorageError> {
        self.inner.lock().records.get(&index).cloned().ok_or(StorageError::NotFound(index))
    }

    fn delete_image(&self, index: ImageIndex) -> Result<(), StorageError> {
        let mut inner = self.inner.lock();
        inner.records.remove(&index);
        inner.reserved.remove(&index);
        Ok(())
    }

    fn save_deleted_surfaces(&self, surfaces: &BTreeSet<SurfaceId>) -> Result<(), StorageError> {
        self.inner.lock().deleted_surfaces = surfaces.clone();
        Ok(())
    }

    fn load_deleted_surfaces(&self) -> Result<BTreeSet<SurfaceId>, StorageError> {
        Ok(self.inner.lock().deleted_surfaces.clone())
    }

    fn all_image_indexes(&self) -> Result<BTreeSet<ImageIndex>, StorageError> {
        Ok(self.inner.lock().records.keys().copied().collect())
    }
}
