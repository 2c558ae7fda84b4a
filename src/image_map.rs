//! `ImageMap`: a possibly animated picture spread over a grid of surfaces.

use crate::models::{CreatorId, ImageIndex, ImageRecord, RegistryId, RenderData, SurfaceId};
use crate::palettes::PALETTE_TRANSPARENT;
use crate::quantize::{dither, fit_to_surfaces, PaletteMatcher};
use crate::registry::{FakeIdAllocator, ImageRegistry};
use crate::resource::{ImageResource, LoadError, ResourceLoader};
use crate::storage::{ImageStorage, StorageError};
use image::RgbaImage;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Everything needed to create an [`ImageMap`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageMapParams {
    pub creator: CreatorId,
    pub name: String,
    /// Width in surfaces
    pub width: u32,
    /// Height in surfaces
    pub height: u32,
    /// Row-major, `width * height` entries
    pub surfaces: Vec<SurfaceId>,
    pub frames: Vec<PathBuf>,
    pub frame_delay_ms: u32,
    pub track_deleted: bool,
}

#[derive(Debug)]
struct State {
    index: Option<ImageIndex>,
    name: String,
    width: u32,
    height: u32,
    surfaces: Vec<SurfaceId>,
    frames: Vec<PathBuf>,
    frame_delay_ms: u32,
    /// One per (extra frame, surface), frame-major
    fake_ids: Vec<SurfaceId>,
}

/// Frame -> surface -> `size * size` palette indices
type TileCache = Vec<Vec<Vec<u8>>>;

/// A picture quantized onto map surfaces, animated when it has several frames.
pub struct ImageMap {
    owner: RegistryId,
    creator: CreatorId,
    surface_size: u32,
    tick_length_ms: u64,
    track_deleted: bool,
    fake_ids: Arc<FakeIdAllocator>,
    state: RwLock<State>,
    cache: RwLock<TileCache>,
    valid: AtomicBool,
    revision: AtomicU64,
}

fn check_surface_count(width: u32, height: u32, actual: usize) -> Result<(), LoadError> {
    let expected = (width as usize) * (height as usize);
    if expected == 0 || actual != expected {
        return Err(LoadError::SurfaceCount { width, height, expected, actual });
    }
    Ok(())
}

fn allocate_fake_ids(alloc: &FakeIdAllocator, frames: usize, surfaces: usize) -> Vec<SurfaceId> {
    let extra = frames.saturating_sub(1) * surfaces;
    (0..extra).map(|_| alloc.next_id()).collect()
}

fn decode_frame(path: &Path) -> Result<RgbaImage, LoadError> {
    image::open(path)
        .map(|img| img.to_rgba8())
        .map_err(|source| LoadError::Frame { path: path.to_path_buf(), source })
}

impl ImageMap {
    /// Create an unregistered image owned by `registry`.
    ///
    /// The tile cache starts empty; call `reload_color_cache` to fill it.
    pub fn new(registry: &ImageRegistry, params: ImageMapParams) -> Result<Self, LoadError> {
        check_surface_count(params.width, params.height, params.surfaces.len())?;
        let settings = registry.settings();
        let fake_ids = Arc::clone(registry.fake_ids());
        let state = State {
            index: None,
            fake_ids: allocate_fake_ids(&fake_ids, params.frames.len(), params.surfaces.len()),
            name: params.name,
            width: params.width,
            height: params.height,
            surfaces: params.surfaces,
            frames: params.frames,
            frame_delay_ms: params.frame_delay_ms,
        };
        Ok(Self {
            owner: registry.id(),
            creator: params.creator,
            surface_size: settings.surface_size,
            tick_length_ms: settings.tick_length.as_millis() as u64,
            track_deleted: params.track_deleted,
            fake_ids,
            state: RwLock::new(state),
            cache: RwLock::new(Vec::new()),
            valid: AtomicBool::new(true),
            revision: AtomicU64::new(0),
        })
    }

    /// Rebuild a stored image, keeping its index.
    pub fn from_record(registry: &ImageRegistry, record: ImageRecord) -> Result<Self, LoadError> {
        let index = record.index;
        let map = Self::new(
            registry,
            ImageMapParams {
                creator: record.creator,
                name: record.name,
                width: record.width,
                height: record.height,
                surfaces: record.surfaces,
                frames: record.frames,
                frame_delay_ms: record.frame_delay_ms,
                track_deleted: record.track_deleted,
            },
        )?;
        map.state.write().index = Some(index);
        Ok(map)
    }

    /// Persistable description of the current state.
    pub fn to_record(&self) -> Option<ImageRecord> {
        let state = self.state.read();
        Some(ImageRecord {
            index: state.index?,
            creator: self.creator,
            name: state.name.clone(),
            width: state.width,
            height: state.height,
            surfaces: state.surfaces.clone(),
            frames: state.frames.clone(),
            frame_delay_ms: state.frame_delay_ms,
            track_deleted: self.track_deleted,
        })
    }

    /// Grid size in surfaces.
    pub fn dimensions(&self) -> (u32, u32) {
        let state = self.state.read();
        (state.width, state.height)
    }

    pub fn frame_count(&self) -> usize {
        self.state.read().frames.len()
    }

    /// Number of applied updates.
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::Acquire)
    }

    /// Frame shown at `tick`.
    fn frame_at(&self, state: &State, tick: u64) -> usize {
        let frames = state.frames.len();
        if frames <= 1 {
            return 0;
        }
        let delay = u64::from(state.frame_delay_ms.max(1));
        ((tick * self.tick_length_ms / delay) % frames as u64) as usize
    }
}

impl ImageResource for ImageMap {
    fn index(&self) -> Option<ImageIndex> {
        self.state.read().index
    }

    fn set_index(&self, index: ImageIndex) {
        self.state.write().index = Some(index);
    }

    fn owner(&self) -> RegistryId {
        self.owner
    }

    fn creator(&self) -> CreatorId {
        self.creator
    }

    fn name(&self) -> String {
        self.state.read().name.clone()
    }

    fn surfaces(&self) -> Vec<SurfaceId> {
        self.state.read().surfaces.clone()
    }

    fn fake_surface_ids(&self) -> Vec<SurfaceId> {
        self.state.read().fake_ids.clone()
    }

    fn requires_animation_service(&self) -> bool {
        self.state.read().frames.len() > 1
    }

    fn tracks_deleted_surfaces(&self) -> bool {
        self.track_deleted
    }

    fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }

    fn mark_invalid(&self) {
        self.valid.store(false, Ordering::Release);
    }

    fn stop(&self) {
        self.cache.write().clear();
    }

    fn save(&self, storage: &dyn ImageStorage) -> Result<(), StorageError> {
        let record = self.to_record().ok_or(StorageError::Unindexed)?;
        storage.save_image(&record)
    }

    fn apply_update(&self, record: &ImageRecord) -> Result<bool, LoadError> {
        let mut state = self.state.write();
        if let Some(index) = state.index {
            if index != record.index {
                return Err(LoadError::IndexMismatch { record: record.index, image: index });
            }
        }
        check_surface_count(record.width, record.height, record.surfaces.len())?;
        let changed = state.name != record.name
            || state.width != record.width
            || state.height != record.height
            || state.surfaces != record.surfaces
            || state.frames != record.frames
            || state.frame_delay_ms != record.frame_delay_ms;
        if !changed {
            return Ok(false);
        }
        let reshaped = state.frames.len() != record.frames.len()
            || state.surfaces.len() != record.surfaces.len();
        state.name = record.name.clone();
        state.width = record.width;
        state.height = record.height;
        state.surfaces = record.surfaces.clone();
        state.frames = record.frames.clone();
        state.frame_delay_ms = record.frame_delay_ms;
        if reshaped {
            state.fake_ids =
                allocate_fake_ids(&self.fake_ids, state.frames.len(), state.surfaces.len());
        }
        self.revision.fetch_add(1, Ordering::AcqRel);
        Ok(true)
    }

    fn reload_color_cache(&self) {
        let (width, height, frames) = {
            let state = self.state.read();
            (state.width, state.height, state.frames.clone())
        };
        let size = self.surface_size;
        let blank = vec![vec![PALETTE_TRANSPARENT; (size * size) as usize]; (width * height) as usize];
        let tiles: TileCache = frames
            .iter()
            .map(|path| match decode_frame(path) {
                Ok(source) => {
                    let fitted = fit_to_surfaces(&source, width, height, size);
                    dither(&fitted, PaletteMatcher::global()).split_surfaces(width, height, size)
                }
                Err(e) => {
                    tracing::warn!(name = %self.name(), error = %e, "frame left blank");
                    blank.clone()
                }
            })
            .collect();
        *self.cache.write() = tiles;
    }

    fn render(&self, surface: SurfaceId, tick: u64) -> Option<RenderData> {
        let state = self.state.read();
        let count = state.surfaces.len();
        let (frame, position) = match state.surfaces.iter().position(|s| *s == surface) {
            Some(position) => (self.frame_at(&state, tick), position),
            None => {
                let k = state.fake_ids.iter().position(|s| *s == surface)?;
                (k / count + 1, k % count)
            }
        };
        let pixels = self
            .cache
            .read()
            .get(frame)
            .and_then(|tiles| tiles.get(position))
            .cloned()
            .unwrap_or_else(|| vec![PALETTE_TRANSPARENT; (self.surface_size * self.surface_size) as usize]);
        Some(RenderData { pixels, cursors: Vec::new() })
    }
}

/// Default loader: turns records into cached [`ImageMap`]s.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageMapLoader;

impl ResourceLoader for ImageMapLoader {
    fn load(
        &self,
        registry: &Arc<ImageRegistry>,
        record: ImageRecord,
    ) -> Result<Arc<dyn ImageResource>, LoadError> {
        let map = ImageMap::from_record(registry, record)?;
        map.reload_color_cache();
        Ok(Arc::new(map))
    }
}
