//! The image registry: in-memory index of live images, kept in step with
//! persistent storage and the host's surfaces.
//!
//! This module provides:
//! - `ImageRegistry` with register/delete/reconcile and the bulk operations
//! - `FakeIdAllocator` for virtual animation-frame surfaces
//! - `AnimationClock`, the cached render tick
//! - `RenderEventListener` hooks run on every render pass
//!
//! Mutations are serialised by one reentrant lock per registry. Queries go
//! straight to concurrent maps and never wait on it, so `by_index` and
//! `by_surface` can briefly disagree while a mutation is in flight.

mod clock;
mod fake_id;
mod listener;
mod placeholder;

pub use clock::AnimationClock;
pub use fake_id::{FakeIdAllocator, FAKE_SURFACE_ID_START};
pub use listener::RenderEventListener;

use crate::events::{EventSink, ImageEvent, TracingSink};
use crate::host::{Renderer, RendererId, SurfaceHost};
use crate::image_map::ImageMapLoader;
use crate::models::{CreatorId, ImageIndex, RegistryId, RenderData, SurfaceId, ViewerId};
use crate::resource::{ImageResource, LoadError, ResourceLoader};
use crate::scheduler::{RayonScheduler, Scheduler};
use crate::storage::{ImageStorage, StorageError};
use dashmap::{DashMap, DashSet};
use listener::ListenerChain;
use parking_lot::ReentrantMutex;
use std::cmp::Ordering as CmpOrdering;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc, Weak};
use std::time::Duration;
use thiserror::Error;

/// Error from a registry operation
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RegistryError {
    /// The image was created for another registry
    #[error("image '{name}' is not owned by this registry")]
    NotOwned { name: String },
    /// The creator already has a different image with this name
    #[error("creator {creator} already has an image named '{name}'")]
    DuplicateName { creator: CreatorId, name: String },
    /// The image was invalidated (deleted or cleared)
    #[error("image '{name}' is no longer valid")]
    Invalid { name: String },
    /// Storage handed out an index held by a different image
    #[error("index {0} is already in use")]
    IndexInUse(ImageIndex),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Load(#[from] LoadError),
}

/// Tunables for a registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrySettings {
    /// How long `shutdown` waits for the registry lock
    pub shutdown_timeout: Duration,
    /// Length of one animation tick
    pub tick_length: Duration,
    /// Staleness bound of the cached animation tick
    pub tick_cache: Duration,
    /// Surface edge length in pixels
    pub surface_size: u32,
    /// Draw placeholders on surfaces orphaned by a delete
    pub placeholder_on_delete: bool,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            shutdown_timeout: Duration::from_secs(5),
            tick_length: Duration::from_millis(50),
            tick_cache: Duration::from_millis(25),
            surface_size: 128,
            placeholder_on_delete: true,
        }
    }
}

/// What `reconcile` decided to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileAction {
    /// Memory already agrees with storage
    Noop,
    /// The image is being loaded and registered in the background
    ScheduledLoad,
    /// Fresh data is being applied to the live image in the background
    ScheduledUpdate,
    /// The image was deleted
    Deleted,
}

/// Outcome of `bulk_sync`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub added: usize,
    pub deleted: usize,
    pub failed: usize,
}

/// Outcome of `bulk_load`, delivered once the batch finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: usize,
    pub failed: usize,
}

/// Builder for [`ImageRegistry`].
pub struct RegistryBuilder {
    storage: Arc<dyn ImageStorage>,
    host: Arc<dyn SurfaceHost>,
    loader: Option<Arc<dyn ResourceLoader>>,
    scheduler: Option<Arc<dyn Scheduler>>,
    events: Option<Arc<dyn EventSink>>,
    fake_ids: Option<Arc<FakeIdAllocator>>,
    settings: RegistrySettings,
}

impl RegistryBuilder {
    /// Loader used by reconcile and bulk load. Defaults to [`ImageMapLoader`].
    pub fn loader(mut self, loader: Arc<dyn ResourceLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Defaults to a [`RayonScheduler`] with the configured tick length.
    pub fn scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Defaults to [`TracingSink`].
    pub fn events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = Some(events);
        self
    }

    /// Share a fake id allocator between registries.
    pub fn fake_ids(mut self, fake_ids: Arc<FakeIdAllocator>) -> Self {
        self.fake_ids = Some(fake_ids);
        self
    }

    pub fn settings(mut self, settings: RegistrySettings) -> Self {
        self.settings = settings;
        self
    }

    /// Build the registry, restoring the deleted-surface set from storage.
    pub fn build(self) -> Result<Arc<ImageRegistry>, RegistryError> {
        let deleted: DashSet<SurfaceId> =
            self.storage.load_deleted_surfaces()?.into_iter().collect();
        let settings = self.settings;
        let scheduler = self
            .scheduler
            .unwrap_or_else(|| Arc::new(RayonScheduler::new(settings.tick_length)));
        let registry = Arc::new_cyclic(|weak_self| ImageRegistry {
            id: RegistryId::new(),
            weak_self: weak_self.clone(),
            storage: self.storage,
            host: self.host,
            loader: self.loader.unwrap_or_else(|| Arc::new(ImageMapLoader)),
            scheduler,
            events: self.events.unwrap_or_else(|| Arc::new(TracingSink)),
            fake_ids: self.fake_ids.unwrap_or_default(),
            by_index: DashMap::new(),
            by_surface: DashMap::new(),
            deleted_surfaces: deleted,
            bound: DashMap::new(),
            listeners: ListenerChain::new(),
            clock: AnimationClock::new(settings.tick_length, settings.tick_cache),
            lock: ReentrantMutex::new(()),
            epoch: AtomicU64::new(0),
            deleted_at: DashMap::new(),
            cleared_at: AtomicU64::new(0),
            settings,
        });
        tracing::debug!(
            registry = %registry.id.0,
            deleted_surfaces = registry.deleted_surfaces.len(),
            "registry ready"
        );
        Ok(registry)
    }
}

/// Registry of live images.
pub struct ImageRegistry {
    id: RegistryId,
    weak_self: Weak<ImageRegistry>,
    storage: Arc<dyn ImageStorage>,
    host: Arc<dyn SurfaceHost>,
    loader: Arc<dyn ResourceLoader>,
    scheduler: Arc<dyn Scheduler>,
    events: Arc<dyn EventSink>,
    fake_ids: Arc<FakeIdAllocator>,
    by_index: DashMap<ImageIndex, Arc<dyn ImageResource>>,
    by_surface: DashMap<SurfaceId, Arc<dyn ImageResource>>,
    deleted_surfaces: DashSet<SurfaceId>,
    /// The registry's own renderer on each bound surface
    bound: DashMap<SurfaceId, RendererId>,
    listeners: ListenerChain,
    clock: AnimationClock,
    lock: ReentrantMutex<()>,
    /// Bumped by every delete and clear
    epoch: AtomicU64,
    deleted_at: DashMap<ImageIndex, u64>,
    cleared_at: AtomicU64,
    settings: RegistrySettings,
}

impl ImageRegistry {
    pub fn builder(storage: Arc<dyn ImageStorage>, host: Arc<dyn SurfaceHost>) -> RegistryBuilder {
        RegistryBuilder {
            storage,
            host,
            loader: None,
            scheduler: None,
            events: None,
            fake_ids: None,
            settings: RegistrySettings::default(),
        }
    }

    pub fn id(&self) -> RegistryId {
        self.id
    }

    pub fn settings(&self) -> &RegistrySettings {
        &self.settings
    }

    pub fn loader(&self) -> &Arc<dyn ResourceLoader> {
        &self.loader
    }

    pub fn fake_ids(&self) -> &Arc<FakeIdAllocator> {
        &self.fake_ids
    }

    pub fn storage(&self) -> &Arc<dyn ImageStorage> {
        &self.storage
    }

    pub fn clock(&self) -> &AnimationClock {
        &self.clock
    }

    // ---- mutations -------------------------------------------------------

    /// Register an image, assigning it an index if it has none.
    ///
    /// Either the image ends up fully visible (both maps, persisted, `Added`
    /// emitted) or nothing changes and the error is returned.
    pub fn register(&self, image: Arc<dyn ImageResource>) -> Result<ImageIndex, RegistryError> {
        let _guard = self.lock.lock();
        let name = image.name();
        if image.owner() != self.id {
            return Err(RegistryError::NotOwned { name });
        }
        if !image.is_valid() {
            return Err(RegistryError::Invalid { name });
        }
        let creator = image.creator();
        if let Some(existing) = self.get_by_creator_name(creator, &name) {
            if !Arc::ptr_eq(&existing, &image) {
                return Err(RegistryError::DuplicateName { creator, name });
            }
        }

        let had_index = image.index().is_some();
        let index = self.storage.prepare_image_index(image.as_ref())?;
        image.set_index(index);
        let previous = self.get(index);
        if let Some(existing) = &previous {
            if !Arc::ptr_eq(existing, &image) {
                return Err(RegistryError::IndexInUse(index));
            }
        }

        self.by_index.insert(index, Arc::clone(&image));
        let surfaces = image.surfaces();
        let mut displaced = Vec::new();
        for surface in &surfaces {
            if let Some(owner) = self.by_surface.insert(*surface, Arc::clone(&image)) {
                displaced.push((*surface, owner));
            }
        }
        let revived: Vec<SurfaceId> =
            surfaces.iter().filter_map(|s| self.deleted_surfaces.remove(s)).collect();

        if let Err(e) = image.save(self.storage.as_ref()) {
            if previous.is_none() {
                self.by_index.remove(&index);
            }
            for surface in &surfaces {
                self.by_surface.remove_if(surface, |_, v| Arc::ptr_eq(v, &image));
            }
            for (surface, owner) in displaced {
                self.by_surface.insert(surface, owner);
            }
            for surface in revived {
                self.deleted_surfaces.insert(surface);
            }
            if !had_index {
                if let Err(release) = self.storage.delete_image(index) {
                    tracing::warn!(index = %index, error = %release, "failed to release index");
                }
            }
            tracing::debug!(index = %index, name = %name, error = %e, "register rolled back");
            return Err(e.into());
        }

        if !revived.is_empty() {
            self.log_persist_deleted();
        }
        self.deleted_at.remove(&index);
        self.bind_surfaces(&surfaces);
        tracing::debug!(index = %index, creator = %creator, name = %name, "image registered");
        self.events.emit(ImageEvent::Added(image));
        Ok(index)
    }

    /// Delete an image. Returns `Ok(false)` if the index is unknown.
    ///
    /// The in-memory removal always commits; a storage failure is returned
    /// afterwards and suppresses the `Deleted` event.
    pub fn delete(&self, index: ImageIndex) -> Result<bool, RegistryError> {
        let (orphaned, result) = {
            let _guard = self.lock.lock();
            let Some((_, image)) = self.by_index.remove(&index) else {
                return Ok(false);
            };
            let orphaned: Vec<SurfaceId> = image
                .surfaces()
                .into_iter()
                .filter(|s| self.by_surface.remove_if(s, |_, v| Arc::ptr_eq(v, &image)).is_some())
                .collect();
            self.unbind_surfaces(&orphaned);

            let tracked = image.tracks_deleted_surfaces();
            if tracked {
                for surface in image.surfaces() {
                    self.deleted_surfaces.insert(surface);
                }
            }
            image.mark_invalid();
            self.deleted_at.insert(index, self.epoch.fetch_add(1, Ordering::SeqCst) + 1);
            image.stop();

            let result = self.storage.delete_image(index);
            if tracked {
                self.log_persist_deleted();
            }
            match &result {
                Ok(()) => {
                    tracing::debug!(index = %index, name = %image.name(), "image deleted");
                    self.events.emit(ImageEvent::Deleted(Arc::clone(&image)));
                }
                Err(e) => {
                    tracing::error!(index = %index, error = %e, "failed to delete stored image")
                }
            }
            (orphaned, result)
        };

        if self.settings.placeholder_on_delete && !orphaned.is_empty() {
            self.schedule_placeholders(orphaned);
        }
        result?;
        Ok(true)
    }

    /// Bring one index in line with storage.
    ///
    /// Loads and updates run on the scheduler. A completion that arrives after
    /// the index was deleted (or the registry cleared) is discarded.
    pub fn reconcile(
        &self,
        index: ImageIndex,
        exists: bool,
    ) -> Result<ReconcileAction, RegistryError> {
        let _guard = self.lock.lock();
        match (self.get(index), exists) {
            (None, false) => Ok(ReconcileAction::Noop),
            (Some(_), false) => Ok(if self.delete(index)? {
                ReconcileAction::Deleted
            } else {
                ReconcileAction::Noop
            }),
            (None, true) => {
                let epoch = self.epoch.load(Ordering::SeqCst);
                let registry = self.weak_self.clone();
                self.scheduler.run_async(Box::new(move || {
                    if let Some(registry) = registry.upgrade() {
                        registry.complete_load(index, epoch);
                    }
                }));
                Ok(ReconcileAction::ScheduledLoad)
            }
            (Some(image), true) => {
                let registry = self.weak_self.clone();
                self.scheduler.run_async(Box::new(move || {
                    if let Some(registry) = registry.upgrade() {
                        registry.complete_update(index, image);
                    }
                }));
                Ok(ReconcileAction::ScheduledUpdate)
            }
        }
    }

    fn complete_load(self: &Arc<Self>, index: ImageIndex, epoch: u64) {
        let loaded = self
            .storage
            .load_image_data(index)
            .map_err(LoadError::from)
            .and_then(|record| self.loader.load(self, record));
        match loaded {
            Ok(image) => {
                if let Err(e) = self.register_current(image, epoch) {
                    tracing::error!(index = %index, error = %e, "failed to register loaded image");
                }
            }
            Err(e) => tracing::error!(index = %index, error = %e, "failed to load image"),
        }
    }

    fn complete_update(&self, index: ImageIndex, image: Arc<dyn ImageResource>) {
        let record = match self.storage.load_image_data(index) {
            Ok(record) => record,
            Err(e) => {
                tracing::error!(index = %index, error = %e, "failed to load image update");
                return;
            }
        };
        {
            let _guard = self.lock.lock();
            let current = self.get(index).map_or(false, |live| Arc::ptr_eq(&live, &image));
            if !current || !image.is_valid() {
                tracing::debug!(index = %index, "discarding stale image update");
                return;
            }
            let before = image.surfaces();
            match image.apply_update(&record) {
                Ok(true) => self.reindex_surfaces(&image, &before),
                Ok(false) => return,
                Err(e) => {
                    tracing::error!(index = %index, error = %e, "failed to apply image update");
                    return;
                }
            }
        }
        image.reload_color_cache();
        {
            let _guard = self.lock.lock();
            let current = self.get(index).map_or(false, |live| Arc::ptr_eq(&live, &image));
            if !current || !image.is_valid() {
                tracing::debug!(index = %index, "image deleted during update");
                image.stop();
                return;
            }
            tracing::debug!(index = %index, "image updated");
            self.events.emit(ImageEvent::Updated(image));
        }
    }

    /// Register unless the index was deleted, or the registry cleared, after
    /// `epoch`. Returns `None` for a discarded image.
    fn register_current(
        &self,
        image: Arc<dyn ImageResource>,
        epoch: u64,
    ) -> Result<Option<ImageIndex>, RegistryError> {
        let _guard = self.lock.lock();
        let stale = self.cleared_at.load(Ordering::SeqCst) > epoch
            || image.index().map_or(false, |index| {
                self.by_index.contains_key(&index)
                    || self.deleted_at.get(&index).map_or(false, |at| *at > epoch)
            });
        if stale {
            tracing::debug!(index = ?image.index(), "discarding stale image load");
            image.mark_invalid();
            image.stop();
            return Ok(None);
        }
        self.register(image).map(Some)
    }

    fn reindex_surfaces(&self, image: &Arc<dyn ImageResource>, before: &[SurfaceId]) {
        let after = image.surfaces();
        let dropped: Vec<SurfaceId> = before
            .iter()
            .filter(|s| !after.contains(*s))
            .filter(|s| self.by_surface.remove_if(*s, |_, v| Arc::ptr_eq(v, image)).is_some())
            .copied()
            .collect();
        self.unbind_surfaces(&dropped);
        let mut revived = false;
        for surface in &after {
            self.by_surface.insert(*surface, Arc::clone(image));
            revived |= self.deleted_surfaces.remove(surface).is_some();
        }
        if revived {
            self.log_persist_deleted();
        }
        self.bind_surfaces(&after);
    }

    /// Reconcile every index on which storage and memory disagree.
    pub fn bulk_sync(&self, verbose: bool) -> Result<SyncReport, RegistryError> {
        let stored = self.storage.all_image_indexes()?;
        let local: BTreeSet<ImageIndex> = {
            let _guard = self.lock.lock();
            self.by_index.iter().map(|entry| *entry.key()).collect()
        };
        let mut report = SyncReport::default();
        for index in stored.symmetric_difference(&local) {
            match self.reconcile(*index, stored.contains(index)) {
                Ok(ReconcileAction::ScheduledLoad) => report.added += 1,
                Ok(ReconcileAction::Deleted) => report.deleted += 1,
                Ok(_) => {}
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(index = %index, error = %e, "failed to sync image");
                }
            }
        }
        if verbose {
            tracing::info!(
                added = report.added,
                deleted = report.deleted,
                failed = report.failed,
                "image sync finished"
            );
        } else {
            tracing::debug!(
                added = report.added,
                deleted = report.deleted,
                failed = report.failed,
                "image sync finished"
            );
        }
        Ok(report)
    }

    /// Drop all local state and register everything storage holds.
    ///
    /// Registration runs on the scheduler; the receiver yields one report
    /// when the batch is done.
    pub fn bulk_load(self: &Arc<Self>) -> Result<mpsc::Receiver<LoadReport>, RegistryError> {
        let epoch = {
            let _guard = self.lock.lock();
            let cleared: Vec<Arc<dyn ImageResource>> =
                self.by_index.iter().map(|entry| Arc::clone(entry.value())).collect();
            self.by_index.clear();
            self.by_surface.clear();
            let bound: Vec<SurfaceId> = self.bound.iter().map(|entry| *entry.key()).collect();
            self.unbind_surfaces(&bound);
            for image in cleared {
                image.mark_invalid();
                image.stop();
            }
            let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
            self.cleared_at.store(epoch, Ordering::SeqCst);
            self.deleted_at.clear();
            self.deleted_surfaces.clear();
            match self.storage.load_deleted_surfaces() {
                Ok(set) => set.into_iter().for_each(|s| {
                    self.deleted_surfaces.insert(s);
                }),
                Err(e) => tracing::warn!(error = %e, "failed to load deleted surfaces"),
            }
            epoch
        };

        let pending = self.storage.load_images(self)?;
        let (tx, rx) = mpsc::channel();
        let registry = Arc::clone(self);
        self.scheduler.run_async(Box::new(move || {
            let mut report = LoadReport::default();
            for (label, load) in pending {
                let result = load()
                    .map_err(RegistryError::from)
                    .and_then(|image| registry.register_current(image, epoch));
                match result {
                    Ok(Some(_)) => report.loaded += 1,
                    Ok(None) => {
                        report.failed += 1;
                        tracing::debug!(image = %label, "image load superseded");
                    }
                    Err(e) => {
                        report.failed += 1;
                        tracing::error!(image = %label, error = %e, "failed to load image");
                    }
                }
            }
            tracing::info!(loaded = report.loaded, failed = report.failed, "images loaded");
            // The caller may have dropped the receiver
            let _ = tx.send(report);
        }));
        Ok(rx)
    }

    /// Persist the deleted-surface set, waiting a bounded time for the lock.
    ///
    /// Never fails: a timeout or storage error is logged.
    pub fn shutdown(&self) {
        let guard = self.lock.try_lock_for(self.settings.shutdown_timeout);
        if guard.is_none() {
            tracing::warn!(
                timeout_ms = self.settings.shutdown_timeout.as_millis() as u64,
                "registry lock not acquired; saving deleted surfaces without it"
            );
        }
        self.log_persist_deleted();
        tracing::debug!(registry = %self.id.0, "registry shut down");
    }

    /// Persist the deleted-surface set.
    pub fn save_deleted_surfaces(&self) -> Result<(), RegistryError> {
        let _guard = self.lock.lock();
        self.persist_deleted()?;
        Ok(())
    }

    fn persist_deleted(&self) -> Result<(), StorageError> {
        self.storage.save_deleted_surfaces(&self.deleted_surfaces())
    }

    fn log_persist_deleted(&self) {
        if let Err(e) = self.persist_deleted() {
            tracing::warn!(error = %e, "failed to save deleted surfaces");
        }
    }

    // ---- host surfaces ---------------------------------------------------

    /// A renderer drawing whatever this registry shows on the surface.
    pub fn renderer(&self) -> Renderer {
        let registry = self.weak_self.clone();
        Renderer::new(move |pass| {
            let Some(registry) = registry.upgrade() else {
                return;
            };
            if let Some(data) = registry.render(pass.surface, pass.viewer) {
                pass.canvas.draw(&data.pixels);
                pass.canvas.cursors.extend(data.cursors);
            }
        })
    }

    fn bind_surfaces(&self, surfaces: &[SurfaceId]) {
        for surface in surfaces {
            if self.bound.contains_key(surface) || !self.host.contains(*surface) {
                continue;
            }
            let renderer = self.renderer();
            self.bound.insert(*surface, renderer.id());
            self.host.attach(*surface, renderer);
        }
    }

    fn unbind_surfaces(&self, surfaces: &[SurfaceId]) {
        for surface in surfaces {
            if let Some((_, renderer)) = self.bound.remove(surface) {
                self.host.detach(*surface, renderer);
            }
        }
    }

    fn schedule_placeholders(&self, surfaces: Vec<SurfaceId>) {
        let host = Arc::downgrade(&self.host);
        let scheduler = Arc::clone(&self.scheduler);
        let size = self.settings.surface_size;
        self.scheduler.run_task(Box::new(move || {
            let Some(strong) = host.upgrade() else {
                return;
            };
            for surface in surfaces {
                if strong.contains(surface) && strong.renderers(surface).is_empty() {
                    let renderer = placeholder::placeholder_renderer(
                        surface,
                        size,
                        host.clone(),
                        Arc::clone(&scheduler),
                    );
                    strong.attach(surface, renderer);
                }
            }
        }));
    }

    // ---- rendering -------------------------------------------------------

    /// Render a surface for a viewer: the owning image's pixels at the
    /// current tick, passed through the listener chain.
    pub fn render(&self, surface: SurfaceId, viewer: ViewerId) -> Option<RenderData> {
        let image = self.get_by_surface(surface)?;
        if !image.is_valid() {
            return None;
        }
        let mut data = image.render(surface, self.clock.current_tick())?;
        self.listeners.dispatch(self, image.as_ref(), surface, viewer, &mut data);
        Some(data)
    }

    pub fn append_listener(&self, listener: Arc<dyn RenderEventListener>) {
        self.listeners.append(listener);
    }

    pub fn prepend_listener(&self, listener: Arc<dyn RenderEventListener>) {
        self.listeners.prepend(listener);
    }

    /// Remove a listener by identity.
    pub fn remove_listener(&self, listener: &Arc<dyn RenderEventListener>) -> bool {
        self.listeners.remove(listener)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    // ---- queries ---------------------------------------------------------

    pub fn contains(&self, index: ImageIndex) -> bool {
        self.by_index.contains_key(&index)
    }

    pub fn get(&self, index: ImageIndex) -> Option<Arc<dyn ImageResource>> {
        self.by_index.get(&index).map(|entry| Arc::clone(entry.value()))
    }

    /// All live images, ordered by index.
    pub fn images(&self) -> Vec<Arc<dyn ImageResource>> {
        let mut images: Vec<_> = self.by_index.iter().map(|e| Arc::clone(e.value())).collect();
        images.sort_by_key(|image| image.index());
        images
    }

    pub fn get_by_surface(&self, surface: SurfaceId) -> Option<Arc<dyn ImageResource>> {
        self.by_surface.get(&surface).map(|entry| Arc::clone(entry.value()))
    }

    /// Images of one creator, ordered by index.
    pub fn get_by_creator(&self, creator: CreatorId) -> Vec<Arc<dyn ImageResource>> {
        let mut images: Vec<_> = self
            .by_index
            .iter()
            .filter(|entry| entry.value().creator() == creator)
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        images.sort_by_key(|image| image.index());
        images
    }

    /// Images of one creator in caller-defined order.
    pub fn get_by_creator_sorted<F>(&self, creator: CreatorId, compare: F) -> Vec<Arc<dyn ImageResource>>
    where
        F: FnMut(&Arc<dyn ImageResource>, &Arc<dyn ImageResource>) -> CmpOrdering,
    {
        let mut images = self.get_by_creator(creator);
        images.sort_by(compare);
        images
    }

    /// Look up by creator and name, ignoring case.
    pub fn get_by_creator_name(
        &self,
        creator: CreatorId,
        name: &str,
    ) -> Option<Arc<dyn ImageResource>> {
        let wanted = name.to_lowercase();
        self.by_index
            .iter()
            .find(|entry| {
                entry.value().creator() == creator && entry.value().name().to_lowercase() == wanted
            })
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Every creator with at least one live image.
    pub fn creators(&self) -> BTreeSet<CreatorId> {
        self.by_index.iter().map(|entry| entry.value().creator()).collect()
    }

    /// The image owning a fake (animation frame) surface id.
    pub fn get_by_fake_id(&self, fake: SurfaceId) -> Option<Arc<dyn ImageResource>> {
        if !FakeIdAllocator::is_fake(fake) {
            return None;
        }
        self.by_index
            .iter()
            .find(|entry| {
                entry.value().requires_animation_service()
                    && entry.value().fake_surface_ids().contains(&fake)
            })
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Snapshot of the deleted-surface set.
    pub fn deleted_surfaces(&self) -> BTreeSet<SurfaceId> {
        self.deleted_surfaces.iter().map(|s| *s).collect()
    }

    pub fn is_surface_deleted(&self, surface: SurfaceId) -> bool {
        self.deleted_surfaces.contains(&surface)
    }

    pub fn len(&self) -> usize {
        self.by_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_index.is_empty()
    }
}

impl std::fmt::Debug for ImageRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageRegistry")
            .field("id", &self.id)
            .field("images", &self.by_index.len())
            .field("surfaces", &self.by_surface.len())
            .field("deleted_surfaces", &self.deleted_surfaces.len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
