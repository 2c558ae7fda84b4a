//! Cached animation tick for the render path.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Current animation tick derived from wall-clock time.
///
/// The tick is `now_ms / tick_length`, recomputed at most once per
/// `cache_window`; readers in between get the cached value, which is stale by
/// at most that window.
#[derive(Debug)]
pub struct AnimationClock {
    tick_length_ms: u64,
    cache_window_ms: u64,
    last_compute_ms: AtomicU64,
    tick: AtomicU64,
}

impl AnimationClock {
    pub fn new(tick_length: Duration, cache_window: Duration) -> Self {
        Self {
            tick_length_ms: (tick_length.as_millis() as u64).max(1),
            cache_window_ms: cache_window.as_millis() as u64,
            last_compute_ms: AtomicU64::new(0),
            tick: AtomicU64::new(0),
        }
    }

    pub fn tick_length(&self) -> Duration {
        Duration::from_millis(self.tick_length_ms)
    }

    /// Tick at the current wall-clock time.
    pub fn current_tick(&self) -> u64 {
        self.tick_at(now_ms())
    }

    /// Tick at `now_ms` milliseconds since the epoch, honouring the cache.
    pub fn tick_at(&self, now_ms: u64) -> u64 {
        let last = self.last_compute_ms.load(Ordering::Acquire);
        if last != 0 && now_ms.saturating_sub(last) <= self.cache_window_ms {
            return self.tick.load(Ordering::Acquire);
        }
        let tick = now_ms / self.tick_length_ms;
        self.tick.store(tick, Ordering::Release);
        self.last_compute_ms.store(now_ms.max(1), Ordering::Release);
        tick
    }
}

impl Default for AnimationClock {
    fn default() -> Self {
        Self::new(Duration::from_millis(50), Duration::from_millis(25))
    }
}

fn now_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or(0)
}
