//! Registry lifecycle, reconciliation and concurrency tests

use mapframe::events::{EventSink, ImageEvent};
use mapframe::host::{MemoryHost, SurfaceHost};
use mapframe::models::{ImageIndex, ImageRecord, RegistryId, RenderData, SurfaceId, ViewerId};
use mapframe::palettes::{Palette, PALETTE_TRANSPARENT};
use mapframe::registry::{
    ImageRegistry, ReconcileAction, RegistryError, RegistrySettings, RenderEventListener,
    SyncReport,
};
use mapframe::scheduler::{InlineScheduler, Job, Scheduler};
use mapframe::storage::{ImageStorage, MemoryStorage, StorageError};
use mapframe::{ImageMap, ImageMapParams, ImageResource, LoadError};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Weak};
use std::thread;
use std::time::Duration;
use uuid::Uuid;

const SIZE: u32 = 4;

type EventLog = Arc<Mutex<Vec<String>>>;

struct Fixture {
    registry: Arc<ImageRegistry>,
    storage: Arc<MemoryStorage>,
    host: Arc<MemoryHost>,
    events: EventLog,
}

fn settings() -> RegistrySettings {
    RegistrySettings {
        surface_size: SIZE,
        shutdown_timeout: Duration::from_millis(50),
        ..Default::default()
    }
}

fn fixture_with(storage: Arc<MemoryStorage>, scheduler: Arc<dyn Scheduler>) -> Fixture {
    let host = Arc::new(MemoryHost::new(SIZE));
    let events: EventLog = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&events);
    let sink: Arc<dyn EventSink> = Arc::new(move |event: ImageEvent| {
        log.lock().push(format!("{} {}", event.kind(), event.image().name()));
    });
    let registry = ImageRegistry::builder(storage.clone(), host.clone())
        .scheduler(scheduler)
        .events(sink)
        .settings(settings())
        .build()
        .unwrap();
    Fixture { registry, storage, host, events }
}

fn fixture() -> Fixture {
    fixture_with(Arc::new(MemoryStorage::new()), Arc::new(InlineScheduler))
}

fn params(creator: Uuid, name: &str, surfaces: &[i32]) -> ImageMapParams {
    ImageMapParams {
        creator,
        name: name.to_string(),
        width: surfaces.len() as u32,
        height: 1,
        surfaces: surfaces.iter().copied().map(SurfaceId).collect(),
        frames: vec![],
        frame_delay_ms: 100,
        track_deleted: true,
    }
}

fn image(registry: &ImageRegistry, name: &str, surfaces: &[i32]) -> Arc<dyn ImageResource> {
    Arc::new(ImageMap::new(registry, params(Uuid::nil(), name, surfaces)).unwrap())
}

fn record(index: u32, name: &str, surfaces: &[i32]) -> ImageRecord {
    ImageRecord {
        index: ImageIndex(index),
        creator: Uuid::nil(),
        name: name.to_string(),
        width: surfaces.len() as u32,
        height: 1,
        surfaces: surfaces.iter().copied().map(SurfaceId).collect(),
        frames: vec![],
        frame_delay_ms: 100,
        track_deleted: true,
    }
}

fn viewer() -> ViewerId {
    ViewerId(Uuid::nil())
}

/// Queues jobs until the test runs them.
#[derive(Default)]
struct ManualScheduler {
    jobs: Mutex<VecDeque<Job>>,
}

impl ManualScheduler {
    fn run_next(&self) -> bool {
        let job = self.jobs.lock().pop_front();
        match job {
            Some(job) => {
                job();
                true
            }
            None => false,
        }
    }

    fn run_all(&self) {
        while self.run_next() {}
    }

    fn pending(&self) -> usize {
        self.jobs.lock().len()
    }
}

impl Scheduler for ManualScheduler {
    fn run_async(&self, job: Job) {
        self.jobs.lock().push_back(job);
    }

    fn run_task(&self, job: Job) {
        self.jobs.lock().push_back(job);
    }

    fn run_later(&self, _delay_ticks: u32, job: Job) {
        self.jobs.lock().push_back(job);
    }
}

// ============================================================================
// register
// ============================================================================

#[test]
fn test_register_makes_image_reachable() {
    let f = fixture();
    let img = image(&f.registry, "logo", &[1, 2]);
    let index = f.registry.register(img.clone()).unwrap();

    assert_eq!(img.index(), Some(index));
    assert!(Arc::ptr_eq(&f.registry.get(index).unwrap(), &img));
    assert!(Arc::ptr_eq(&f.registry.get_by_surface(SurfaceId(1)).unwrap(), &img));
    assert!(Arc::ptr_eq(&f.registry.get_by_surface(SurfaceId(2)).unwrap(), &img));
    assert_eq!(f.storage.record(index).unwrap().name, "logo");
    assert_eq!(*f.events.lock(), vec!["added logo"]);
}

#[test]
fn test_register_assigns_distinct_indexes() {
    let f = fixture();
    let a = f.registry.register(image(&f.registry, "a", &[1])).unwrap();
    let b = f.registry.register(image(&f.registry, "b", &[2])).unwrap();
    assert_ne!(a, b);
    assert_eq!(f.registry.len(), 2);
}

#[test]
fn test_register_rejects_foreign_image() {
    let f = fixture();
    let other = fixture();
    let foreign = image(&other.registry, "stray", &[1]);
    assert!(matches!(f.registry.register(foreign), Err(RegistryError::NotOwned { .. })));
    assert!(f.registry.is_empty());
}

#[test]
fn test_register_rejects_duplicate_name_ignoring_case() {
    let f = fixture();
    let first = image(&f.registry, "Banner", &[1]);
    f.registry.register(first.clone()).unwrap();

    let clash = image(&f.registry, "bANNER", &[2]);
    assert!(matches!(f.registry.register(clash), Err(RegistryError::DuplicateName { .. })));
    assert!(f.registry.get_by_surface(SurfaceId(2)).is_none());

    // Same instance again is not a clash
    f.registry.register(first).unwrap();
    assert_eq!(f.registry.len(), 1);

    // Another creator may reuse the name
    let other = Arc::new(ImageMap::new(&f.registry, params(Uuid::new_v4(), "banner", &[3])).unwrap());
    f.registry.register(other).unwrap();
    assert_eq!(f.registry.len(), 2);
}

#[test]
fn test_register_rejects_invalid_image() {
    let f = fixture();
    let img = image(&f.registry, "gone", &[1]);
    img.mark_invalid();
    assert!(matches!(f.registry.register(img), Err(RegistryError::Invalid { .. })));
}

#[test]
fn test_register_rolls_back_on_storage_failure() {
    let f = fixture();
    let old = image(&f.registry, "old", &[5]);
    let old_index = f.registry.register(old).unwrap();
    f.registry.delete(old_index).unwrap();
    assert!(f.registry.is_surface_deleted(SurfaceId(5)));

    f.storage.fail_next_save();
    let img = image(&f.registry, "fresh", &[5, 6]);
    let result = f.registry.register(img.clone());
    assert!(matches!(result, Err(RegistryError::Storage(_))));

    let index = img.index().unwrap();
    assert!(!f.registry.contains(index));
    assert!(f.registry.get_by_surface(SurfaceId(5)).is_none());
    assert!(f.registry.get_by_surface(SurfaceId(6)).is_none());
    assert!(f.registry.is_surface_deleted(SurfaceId(5)));
    assert!(f.storage.record(index).is_none());
    assert!(!f.events.lock().iter().any(|e| e == "added fresh"));

    // The next attempt goes through
    f.registry.register(img).unwrap();
    assert!(!f.registry.is_surface_deleted(SurfaceId(5)));
}

// ============================================================================
// delete
// ============================================================================

#[test]
fn test_delete_removes_and_tracks_surfaces() {
    let f = fixture();
    let img = image(&f.registry, "poster", &[3, 4]);
    let index = f.registry.register(img.clone()).unwrap();

    assert!(f.registry.delete(index).unwrap());
    assert!(f.registry.get(index).is_none());
    assert!(f.registry.get_by_surface(SurfaceId(3)).is_none());
    assert!(f.registry.is_surface_deleted(SurfaceId(3)));
    assert!(f.registry.is_surface_deleted(SurfaceId(4)));
    assert!(!img.is_valid());
    assert!(f.storage.record(index).is_none());
    assert_eq!(
        f.storage.saved_deleted_surfaces(),
        [SurfaceId(3), SurfaceId(4)].into_iter().collect()
    );
    assert_eq!(*f.events.lock(), vec!["added poster", "deleted poster"]);

    // Idempotent
    assert!(!f.registry.delete(index).unwrap());
    assert_eq!(f.events.lock().len(), 2);
}

#[test]
fn test_delete_untracked_image_leaves_no_trace() {
    let f = fixture();
    let mut p = params(Uuid::nil(), "temp", &[8]);
    p.track_deleted = false;
    let img = Arc::new(ImageMap::new(&f.registry, p).unwrap());
    let index = f.registry.register(img).unwrap();
    f.registry.delete(index).unwrap();
    assert!(!f.registry.is_surface_deleted(SurfaceId(8)));
}

#[test]
fn test_delete_untracked_image_still_paints_placeholder() {
    let f = fixture();
    let surface = SurfaceId(40);
    f.host.add_surface(surface);
    let mut p = params(Uuid::nil(), "flyer", &[40]);
    p.track_deleted = false;
    let index = f.registry.register(Arc::new(ImageMap::new(&f.registry, p).unwrap())).unwrap();

    f.registry.delete(index).unwrap();
    assert!(!f.registry.is_surface_deleted(surface));
    assert_eq!(f.host.renderers(surface).len(), 1);
    let canvas = f.host.render(surface, viewer()).unwrap();
    assert!(canvas.pixels().iter().all(|&p| p != PALETTE_TRANSPARENT));
}

#[test]
fn test_delete_paints_stable_placeholder() {
    let f = fixture();
    let surface = SurfaceId(11);
    f.host.add_surface(surface);
    let index = f.registry.register(image(&f.registry, "sign", &[11])).unwrap();
    assert_eq!(f.host.renderers(surface).len(), 1);

    f.registry.delete(index).unwrap();
    assert_eq!(f.host.renderers(surface).len(), 1);
    let first = f.host.render(surface, viewer()).unwrap();
    let second = f.host.render(surface, viewer()).unwrap();
    assert_eq!(first, second);
    let palette = Palette::map();
    for &px in first.pixels() {
        let color = palette.color(px).unwrap();
        assert!(!color.transparent && color.r == color.g && color.g == color.b);
    }

    // A new image on the surface supersedes the placeholder
    f.registry.register(image(&f.registry, "sign2", &[11])).unwrap();
    assert_eq!(f.host.renderers(surface).len(), 2);
    let canvas = f.host.render(surface, viewer()).unwrap();
    assert!(canvas.pixels().iter().all(|&p| p == PALETTE_TRANSPARENT));
    assert_eq!(f.host.renderers(surface).len(), 1);
}

#[test]
fn test_placeholder_skips_surface_with_renderer() {
    let f = fixture();
    let surface = SurfaceId(12);
    f.host.add_surface(surface);
    let index = f.registry.register(image(&f.registry, "sign", &[12])).unwrap();
    let other = mapframe::host::Renderer::new(|pass| pass.canvas.set_pixel(0, 0, 9));
    let other_id = other.id();
    f.host.attach(surface, other);

    f.registry.delete(index).unwrap();
    assert_eq!(f.host.renderers(surface), vec![other_id]);
}

// ============================================================================
// reconcile
// ============================================================================

#[test]
fn test_reconcile_unknown_missing_is_noop() {
    let f = fixture();
    assert_eq!(f.registry.reconcile(ImageIndex(4), false).unwrap(), ReconcileAction::Noop);
    assert!(f.events.lock().is_empty());
}

#[test]
fn test_reconcile_known_missing_deletes() {
    let f = fixture();
    let index = f.registry.register(image(&f.registry, "old", &[1])).unwrap();
    assert_eq!(f.registry.reconcile(index, false).unwrap(), ReconcileAction::Deleted);
    assert!(!f.registry.contains(index));
    assert!(f.registry.is_surface_deleted(SurfaceId(1)));
}

#[test]
fn test_reconcile_loads_new_index() {
    let f = fixture();
    f.storage.insert_record(record(7, "remote", &[20, 21]));
    assert_eq!(
        f.registry.reconcile(ImageIndex(7), true).unwrap(),
        ReconcileAction::ScheduledLoad
    );
    let loaded = f.registry.get(ImageIndex(7)).unwrap();
    assert_eq!(loaded.name(), "remote");
    assert!(Arc::ptr_eq(&f.registry.get_by_surface(SurfaceId(21)).unwrap(), &loaded));
    assert_eq!(*f.events.lock(), vec!["added remote"]);
}

#[test]
fn test_reconcile_updates_in_place() {
    let f = fixture();
    let img = image(&f.registry, "before", &[1, 2]);
    let index = f.registry.register(img.clone()).unwrap();

    // Unchanged data: no event
    f.registry.reconcile(index, true).unwrap();
    assert_eq!(f.events.lock().len(), 1);

    f.storage.insert_record(record(index.0, "after", &[2, 3]));
    assert_eq!(f.registry.reconcile(index, true).unwrap(), ReconcileAction::ScheduledUpdate);
    assert!(Arc::ptr_eq(&f.registry.get(index).unwrap(), &img));
    assert_eq!(img.name(), "after");
    assert!(f.registry.get_by_surface(SurfaceId(1)).is_none());
    assert!(Arc::ptr_eq(&f.registry.get_by_surface(SurfaceId(3)).unwrap(), &img));
    assert_eq!(f.events.lock().last().unwrap(), "updated after");
}

#[test]
fn test_stale_load_does_not_resurrect_deleted_index() {
    let scheduler = Arc::new(ManualScheduler::default());
    let f = fixture_with(Arc::new(MemoryStorage::new()), scheduler.clone());
    f.storage.insert_record(record(2, "flaky", &[9]));

    f.registry.reconcile(ImageIndex(2), true).unwrap();
    f.registry.reconcile(ImageIndex(2), true).unwrap();
    assert_eq!(scheduler.pending(), 2);

    scheduler.run_next();
    assert!(f.registry.contains(ImageIndex(2)));
    f.registry.delete(ImageIndex(2)).unwrap();

    // The backend lags and still serves the record
    f.storage.insert_record(record(2, "flaky", &[9]));
    scheduler.run_all();
    assert!(!f.registry.contains(ImageIndex(2)));
    assert!(f.registry.get_by_surface(SurfaceId(9)).is_none());
    assert_eq!(*f.events.lock(), vec!["added flaky", "deleted flaky"]);
}

#[test]
fn test_load_scheduled_after_delete_still_applies() {
    let scheduler = Arc::new(ManualScheduler::default());
    let f = fixture_with(Arc::new(MemoryStorage::new()), scheduler.clone());
    let index = f.registry.register(image(&f.registry, "again", &[4])).unwrap();
    f.registry.delete(index).unwrap();
    scheduler.run_all();

    f.storage.insert_record(record(index.0, "again", &[4]));
    f.registry.reconcile(index, true).unwrap();
    scheduler.run_all();
    assert!(f.registry.contains(index));
}

#[test]
fn test_stale_update_is_discarded() {
    let scheduler = Arc::new(ManualScheduler::default());
    let f = fixture_with(Arc::new(MemoryStorage::new()), scheduler.clone());
    let img = image(&f.registry, "stale", &[1]);
    let index = f.registry.register(img.clone()).unwrap();
    f.storage.insert_record(record(index.0, "renamed", &[1]));

    f.registry.reconcile(index, true).unwrap();
    f.registry.delete(index).unwrap();
    f.storage.insert_record(record(index.0, "renamed", &[1]));
    scheduler.run_all();

    assert_eq!(img.name(), "stale");
    assert!(!f.events.lock().iter().any(|e| e.starts_with("updated")));
}

/// Deletes itself from the registry while its color cache reloads.
struct DeletedDuringReload {
    inner: ImageMap,
    registry: Weak<ImageRegistry>,
    reloads: AtomicUsize,
}

impl ImageResource for DeletedDuringReload {
    fn index(&self) -> Option<ImageIndex> {
        self.inner.index()
    }

    fn set_index(&self, index: ImageIndex) {
        self.inner.set_index(index)
    }

    fn owner(&self) -> RegistryId {
        self.inner.owner()
    }

    fn creator(&self) -> Uuid {
        self.inner.creator()
    }

    fn name(&self) -> String {
        self.inner.name()
    }

    fn surfaces(&self) -> Vec<SurfaceId> {
        self.inner.surfaces()
    }

    fn is_valid(&self) -> bool {
        self.inner.is_valid()
    }

    fn mark_invalid(&self) {
        self.inner.mark_invalid()
    }

    fn stop(&self) {
        self.inner.stop()
    }

    fn save(&self, storage: &dyn ImageStorage) -> Result<(), StorageError> {
        self.inner.save(storage)
    }

    fn apply_update(&self, record: &ImageRecord) -> Result<bool, LoadError> {
        self.inner.apply_update(record)
    }

    fn reload_color_cache(&self) {
        self.inner.reload_color_cache();
        self.reloads.fetch_add(1, Ordering::SeqCst);
        if let (Some(registry), Some(index)) = (self.registry.upgrade(), self.index()) {
            registry.delete(index).unwrap();
        }
    }

    fn render(&self, surface: SurfaceId, tick: u64) -> Option<RenderData> {
        self.inner.render(surface, tick)
    }
}

#[test]
fn test_update_finishing_after_delete_emits_nothing() {
    let f = fixture();
    let img = Arc::new(DeletedDuringReload {
        inner: ImageMap::new(&f.registry, params(Uuid::nil(), "racy", &[6])).unwrap(),
        registry: Arc::downgrade(&f.registry),
        reloads: AtomicUsize::new(0),
    });
    let index = f.registry.register(img.clone()).unwrap();
    f.storage.insert_record(record(index.0, "renamed", &[6]));

    f.registry.reconcile(index, true).unwrap();
    assert_eq!(img.reloads.load(Ordering::SeqCst), 1);
    assert!(!f.registry.contains(index));
    assert!(!img.is_valid());
    assert_eq!(*f.events.lock(), vec!["added racy", "deleted renamed"]);
}

// ============================================================================
// bulk operations
// ============================================================================

#[test]
fn test_bulk_load_reports_counts() {
    let storage = Arc::new(MemoryStorage::new());
    storage.insert_record(record(0, "a", &[1]));
    storage.insert_record(record(1, "b", &[2, 3]));
    let mut bad = record(2, "broken", &[4]);
    bad.width = 3;
    storage.insert_record(bad);
    let f = fixture_with(storage, Arc::new(InlineScheduler));

    let report = f.registry.bulk_load().unwrap().recv().unwrap();
    assert_eq!(report.loaded, 2);
    assert_eq!(report.failed, 1);
    assert!(f.registry.contains(ImageIndex(0)));
    assert!(f.registry.contains(ImageIndex(1)));
    assert!(!f.registry.contains(ImageIndex(2)));
}

#[test]
fn test_bulk_load_clears_previous_state() {
    let f = fixture();
    let local = image(&f.registry, "local", &[1]);
    let index = f.registry.register(local.clone()).unwrap();
    f.storage.remove_record(index);
    f.storage.insert_record(record(5, "stored", &[2]));

    let report = f.registry.bulk_load().unwrap().recv().unwrap();
    assert_eq!(report.loaded, 1);
    assert!(!f.registry.contains(index));
    assert!(!local.is_valid());
    assert!(f.registry.get_by_surface(SurfaceId(1)).is_none());
    assert!(f.registry.contains(ImageIndex(5)));
}

#[test]
fn test_bulk_load_superseded_by_second_clear() {
    let scheduler = Arc::new(ManualScheduler::default());
    let storage = Arc::new(MemoryStorage::new());
    storage.insert_record(record(0, "a", &[1]));
    let f = fixture_with(storage, scheduler.clone());

    let first = f.registry.bulk_load().unwrap();
    let second = f.registry.bulk_load().unwrap();
    scheduler.run_all();
    assert_eq!(first.recv().unwrap().loaded, 0);
    assert_eq!(second.recv().unwrap().loaded, 1);
    assert_eq!(f.registry.len(), 1);
}

#[test]
fn test_bulk_sync_touches_only_differences() {
    let storage = Arc::new(MemoryStorage::new());
    for (i, name) in ["a", "b", "c"].iter().enumerate() {
        storage.insert_record(record(i as u32, name, &[i as i32 + 10]));
    }
    let f = fixture_with(storage, Arc::new(InlineScheduler));
    f.registry.bulk_load().unwrap().recv().unwrap();
    let kept_a = f.registry.get(ImageIndex(0)).unwrap();
    let kept_c = f.registry.get(ImageIndex(2)).unwrap();

    f.storage.insert_record(record(3, "d", &[13]));
    f.storage.remove_record(ImageIndex(1));
    let report = f.registry.bulk_sync(true).unwrap();
    assert_eq!(report, SyncReport { added: 1, deleted: 1, failed: 0 });

    assert!(f.registry.contains(ImageIndex(3)));
    assert!(!f.registry.contains(ImageIndex(1)));
    assert!(Arc::ptr_eq(&f.registry.get(ImageIndex(0)).unwrap(), &kept_a));
    assert!(Arc::ptr_eq(&f.registry.get(ImageIndex(2)).unwrap(), &kept_c));

    assert_eq!(f.registry.bulk_sync(false).unwrap(), SyncReport::default());
}

// ============================================================================
// concurrency and shutdown
// ============================================================================

#[test]
fn test_concurrent_register_distinct_images() {
    const THREADS: usize = 8;
    const PER_THREAD: usize = 25;
    let f = fixture();
    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let registry = Arc::clone(&f.registry);
            thread::spawn(move || {
                for m in 0..PER_THREAD {
                    let surface = (t * PER_THREAD + m) as i32;
                    let img = image(&registry, &format!("img-{}-{}", t, m), &[surface]);
                    registry.register(img).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(f.registry.len(), THREADS * PER_THREAD);
    for surface in 0..(THREADS * PER_THREAD) as i32 {
        let img = f.registry.get_by_surface(SurfaceId(surface)).unwrap();
        assert!(Arc::ptr_eq(&f.registry.get(img.index().unwrap()).unwrap(), &img));
    }
}

#[test]
fn test_shutdown_saves_without_lock_after_timeout() {
    let storage = Arc::new(MemoryStorage::new());
    let host = Arc::new(MemoryHost::new(SIZE));
    let started = Arc::new(Barrier::new(2));
    let release = Arc::new(Barrier::new(2));
    let (s, r) = (Arc::clone(&started), Arc::clone(&release));
    let sink: Arc<dyn EventSink> = Arc::new(move |event: ImageEvent| {
        if matches!(event, ImageEvent::Added(_)) && event.image().name() == "blocker" {
            s.wait();
            r.wait();
        }
    });
    let registry = ImageRegistry::builder(storage.clone(), host)
        .scheduler(Arc::new(InlineScheduler))
        .events(sink)
        .settings(settings())
        .build()
        .unwrap();

    let index = registry.register(image(&registry, "old", &[30])).unwrap();
    registry.delete(index).unwrap();
    storage.save_deleted_surfaces(&Default::default()).unwrap();

    let holder = {
        let registry = Arc::clone(&registry);
        thread::spawn(move || {
            registry.register(image(&registry, "blocker", &[31])).unwrap();
        })
    };
    started.wait();
    registry.shutdown();
    assert_eq!(storage.saved_deleted_surfaces(), [SurfaceId(30)].into_iter().collect());
    release.wait();
    holder.join().unwrap();
}

#[test]
fn test_startup_restores_deleted_surfaces() {
    let storage = Arc::new(MemoryStorage::new());
    storage.save_deleted_surfaces(&[SurfaceId(1), SurfaceId(2)].into_iter().collect()).unwrap();
    let f = fixture_with(storage, Arc::new(InlineScheduler));
    assert!(f.registry.is_surface_deleted(SurfaceId(1)));
    assert_eq!(f.registry.deleted_surfaces().len(), 2);
}

// ============================================================================
// rendering and queries
// ============================================================================

struct Tagged {
    tag: &'static str,
    log: Arc<Mutex<Vec<&'static str>>>,
    paint: Option<u8>,
}

impl RenderEventListener for Tagged {
    fn on_render(
        &self,
        _registry: &ImageRegistry,
        _image: &dyn ImageResource,
        _surface: SurfaceId,
        _viewer: ViewerId,
        data: &mut RenderData,
    ) {
        self.log.lock().push(self.tag);
        if let Some(index) = self.paint {
            data.pixels[0] = index;
        }
    }
}

#[test]
fn test_listener_chain_order() {
    let f = fixture();
    f.registry.register(image(&f.registry, "shown", &[1])).unwrap();
    let log = Arc::new(Mutex::new(Vec::new()));
    let listener = |tag, paint| -> Arc<dyn RenderEventListener> {
        Arc::new(Tagged { tag, log: Arc::clone(&log), paint })
    };
    let middle = listener("middle", Some(7));
    f.registry.append_listener(middle.clone());
    f.registry.append_listener(listener("last", Some(9)));
    f.registry.prepend_listener(listener("first", Some(5)));

    let data = f.registry.render(SurfaceId(1), viewer()).unwrap();
    assert_eq!(*log.lock(), vec!["first", "middle", "last"]);
    assert_eq!(data.pixels[0], 9);
    assert_eq!(data.pixels.len(), (SIZE * SIZE) as usize);

    assert!(f.registry.remove_listener(&middle));
    assert!(!f.registry.remove_listener(&middle));
    assert_eq!(f.registry.listener_count(), 2);
    assert!(f.registry.render(SurfaceId(99), viewer()).is_none());
}

#[test]
fn test_creator_queries() {
    let f = fixture();
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    for (creator, name, surface) in [(alice, "zebra", 1), (alice, "apple", 2), (bob, "moon", 3)] {
        let img = Arc::new(ImageMap::new(&f.registry, params(creator, name, &[surface])).unwrap());
        f.registry.register(img).unwrap();
    }

    assert_eq!(f.registry.get_by_creator(alice).len(), 2);
    let sorted = f.registry.get_by_creator_sorted(alice, |a, b| a.name().cmp(&b.name()));
    let names: Vec<String> = sorted.iter().map(|i| i.name()).collect();
    assert_eq!(names, vec!["apple", "zebra"]);
    assert_eq!(f.registry.get_by_creator_name(bob, "MOON").unwrap().name(), "moon");
    assert!(f.registry.get_by_creator_name(bob, "apple").is_none());
    assert_eq!(f.registry.creators(), [alice, bob].into_iter().collect());
}

#[test]
fn test_get_by_fake_id() {
    let f = fixture();
    let mut p = params(Uuid::nil(), "anim", &[1, 2]);
    p.frames = vec!["a.png".into(), "b.png".into()];
    let img: Arc<dyn ImageResource> = Arc::new(ImageMap::new(&f.registry, p).unwrap());
    f.registry.register(img.clone()).unwrap();

    let fakes = img.fake_surface_ids();
    assert_eq!(fakes.len(), 2);
    for fake in fakes {
        assert!(Arc::ptr_eq(&f.registry.get_by_fake_id(fake).unwrap(), &img));
    }
    assert!(f.registry.get_by_fake_id(SurfaceId(1)).is_none());
}
