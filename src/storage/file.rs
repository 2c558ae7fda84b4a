//! JSON file storage backend.
//!
//! Layout under the data directory:
//! - `images/<index>.json` - one pretty-printed `ImageRecord` per image
//! - `deleted_surfaces.json` - sorted array of deleted surface ids

use super::memory::first_free_index;
use super::{ImageStorage, StorageError};
use crate::models::{ImageIndex, ImageRecord, SurfaceId};
use crate::resource::ImageResource;
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const IMAGES_DIR: &str = "images";
const DELETED_FILE: &str = "deleted_surfaces.json";

/// Stores records as JSON files in a directory.
#[derive(Debug)]
pub struct FileStorage {
    root: PathBuf,
    reserved: Mutex<BTreeSet<ImageIndex>>,
}

impl FileStorage {
    /// Open (creating if needed) a data directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(root.join(IMAGES_DIR))?;
        Ok(Self { root, reserved: Mutex::new(BTreeSet::new()) })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_path(&self, index: ImageIndex) -> PathBuf {
        self.root.join(IMAGES_DIR).join(format!("{}.json", index))
    }

    fn scan_indexes(&self) -> Result<BTreeSet<ImageIndex>, StorageError> {
        let mut indexes = BTreeSet::new();
        for entry in fs::read_dir(self.root.join(IMAGES_DIR))? {
            let path = entry?.path();
            if path.extension().map_or(false, |e| e == "json") {
                if let Some(index) =
                    path.file_stem().and_then(|s| s.to_str()).and_then(|s| s.parse::<u32>().ok())
                {
                    indexes.insert(ImageIndex(index));
                }
            }
        }
        Ok(indexes)
    }
}

/// Write through a temporary file so readers never see a partial record.
fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, contents)?;
    fs::rename(&tmp, path)
}

impl ImageStorage for FileStorage {
    fn prepare_image_index(&self, image: &dyn ImageResource) -> Result<ImageIndex, StorageError> {
        let mut reserved = self.reserved.lock();
        let index = match image.index() {
            Some(index) => index,
            None => {
                let mut taken = self.scan_indexes()?;
                taken.extend(reserved.iter().copied());
                first_free_index(&taken)
            }
        };
        reserved.insert(index);
        Ok(index)
    }

    fn save_image(&self, record: &ImageRecord) -> Result<(), StorageError> {
        let json = serde_json::to_vec_pretty(record)?;
        write_atomic(&self.record_path(record.index), &json)?;
        Ok(())
    }

    fn load_image_data(&self, index: ImageIndex) -> Result<ImageRecord, StorageError> {
        let contents = match fs::read(self.record_path(index)) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(index))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&contents)?)
    }

    fn delete_image(&self, index: ImageIndex) -> Result<(), StorageError> {
        self.reserved.lock().remove(&index);
        match fs::remove_file(self.record_path(index)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn save_deleted_surfaces(&self, surfaces: &BTreeSet<SurfaceId>) -> Result<(), StorageError> {
        let json = serde_json::to_vec_pretty(surfaces)?;
        write_atomic(&self.root.join(DELETED_FILE), &json)?;
        Ok(())
    }

    fn load_deleted_surfaces(&self) -> Result<BTreeSet<SurfaceId>, StorageError> {
        match fs::read(self.root.join(DELETED_FILE)) {
            Ok(contents) => Ok(serde_json::from_slice(&contents)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(BTreeSet::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn all_image_indexes(&self) -> Result<BTreeSet<ImageIndex>, StorageError> {
        self.scan_indexes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use uuid::Uuid;

    fn record(index: u32) -> ImageRecord {
        ImageRecord {
            index: ImageIndex(index),
            creator: Uuid::nil(),
            name: format!("image-{}", index),
            width: 1,
            height: 1,
            surfaces: vec![SurfaceId(index as i32 + 100)],
            frames: vec![],
            frame_delay_ms: 100,
            track_deleted: true,
        }
    }

    #[test]
    fn test_save_load_delete() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::open(dir.path()).unwrap();
        storage.save_image(&record(2)).unwrap();
        assert_eq!(storage.load_image_data(ImageIndex(2)).unwrap(), record(2));
        assert_eq!(storage.all_image_indexes().unwrap(), [ImageIndex(2)].into_iter().collect());

        storage.delete_image(ImageIndex(2)).unwrap();
        assert!(matches!(storage.load_image_data(ImageIndex(2)), Err(StorageError::NotFound(_))));
        assert!(storage.delete_image(ImageIndex(2)).is_ok());
    }

    #[test]
    fn test_ignores_foreign_files() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::open(dir.path()).unwrap();
        fs::write(dir.path().join(IMAGES_DIR).join("notes.txt"), "hi").unwrap();
        fs::write(dir.path().join(IMAGES_DIR).join("abc.json"), "{}").unwrap();
        storage.save_image(&record(0)).unwrap();
        assert_eq!(storage.all_image_indexes().unwrap().len(), 1);
    }

    #[test]
    fn test_corrupt_record() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::open(dir.path()).unwrap();
        fs::write(dir.path().join(IMAGES_DIR).join("4.json"), "{not json").unwrap();
        assert!(matches!(storage.load_image_data(ImageIndex(4)), Err(StorageError::Json(_))));
    }

    #[test]
    fn test_deleted_surfaces_persist() {
        let dir = tempdir().unwrap();
        let set: BTreeSet<_> = [SurfaceId(3), SurfaceId(1)].into_iter().collect();
        {
            let storage = FileStorage::open(dir.path()).unwrap();
            assert!(storage.load_deleted_surfaces().unwrap().is_empty());
            storage.save_deleted_surfaces(&set).unwrap();
        }
        let reopened = FileStorage::open(dir.path()).unwrap();
        assert_eq!(reopened.load_deleted_surfaces().unwrap(), set);
    }
}
