//! Task scheduling seam.
//!
//! The registry never blocks its caller on storage loads or image updates;
//! it hands that work to a [`Scheduler`].

use parking_lot::Mutex;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fmt;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::{Duration, Instant};

/// A unit of deferred work.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Runs registry work off the calling thread.
pub trait Scheduler: Send + Sync {
    /// Run on a background worker.
    fn run_async(&self, job: Job);

    /// Run on the host's main (render) thread.
    fn run_task(&self, job: Job);

    /// Run on the main thread after `delay_ticks` host ticks.
    fn run_later(&self, delay_ticks: u32, job: Job);
}

/// Schedules everything on the rayon global pool.
///
/// There is no dedicated main thread, so main-thread tasks also run on the
/// pool. Delayed tasks wait on one timer thread per scheduler and are handed
/// to the pool when due, so no pool worker ever sleeps.
#[derive(Clone)]
pub struct RayonScheduler {
    tick: Duration,
    timer: Arc<OnceLock<Mutex<mpsc::Sender<Delayed>>>>,
}

impl RayonScheduler {
    pub fn new(tick: Duration) -> Self {
        Self { tick, timer: Arc::new(OnceLock::new()) }
    }

    fn timer(&self) -> Option<&Mutex<mpsc::Sender<Delayed>>> {
        if let Some(timer) = self.timer.get() {
            return Some(timer);
        }
        let (tx, rx) = mpsc::channel();
        match thread::Builder::new().name("mapframe-timer".to_string()).spawn(move || run_timer(rx)) {
            Ok(_) => Some(self.timer.get_or_init(|| Mutex::new(tx))),
            Err(e) => {
                tracing::error!(error = %e, "failed to start scheduler timer thread");
                None
            }
        }
    }
}

impl Default for RayonScheduler {
    fn default() -> Self {
        Self::new(Duration::from_millis(50))
    }
}

impl fmt::Debug for RayonScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RayonScheduler")
            .field("tick", &self.tick)
            .field("timer_started", &self.timer.get().is_some())
            .finish()
    }
}

impl Scheduler for RayonScheduler {
    fn run_async(&self, job: Job) {
        tracing::trace!("scheduler.run_async");
        rayon::spawn(job);
    }

    fn run_task(&self, job: Job) {
        tracing::trace!("scheduler.run_task");
        rayon::spawn(job);
    }

    fn run_later(&self, delay_ticks: u32, job: Job) {
        tracing::trace!(delay_ticks, "scheduler.run_later");
        let delayed = Delayed { due: Instant::now() + self.tick * delay_ticks, job };
        let rejected = match self.timer() {
            Some(timer) => timer.lock().send(delayed).err().map(|e| e.0),
            None => Some(delayed),
        };
        // Without a timer the job runs undelayed
        if let Some(delayed) = rejected {
            rayon::spawn(delayed.job);
        }
    }
}

/// A job waiting on the timer thread.
struct Delayed {
    due: Instant,
    job: Job,
}

impl PartialEq for Delayed {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due
    }
}

impl Eq for Delayed {}

impl PartialOrd for Delayed {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Delayed {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.due.cmp(&other.due)
    }
}

/// Timer loop: hands each job to the pool once it is due. Exits when every
/// sender is gone and the queue has drained.
fn run_timer(rx: mpsc::Receiver<Delayed>) {
    let mut queue: BinaryHeap<Reverse<Delayed>> = BinaryHeap::new();
    let mut connected = true;
    loop {
        let now = Instant::now();
        while queue.peek().map_or(false, |Reverse(next)| next.due <= now) {
            if let Some(Reverse(due)) = queue.pop() {
                rayon::spawn(due.job);
            }
        }
        let wait = queue.peek().map(|Reverse(next)| next.due.saturating_duration_since(now));
        if !connected {
            match wait {
                Some(wait) => thread::sleep(wait),
                None => return,
            }
            continue;
        }
        let received = match wait {
            Some(wait) => rx.recv_timeout(wait),
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };
        match received {
            Ok(delayed) => queue.push(Reverse(delayed)),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => connected = false,
        }
    }
}

/// Runs every job immediately on the calling thread.
///
/// Makes registry behaviour deterministic in tests and single-threaded tools.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineScheduler;

impl Scheduler for InlineScheduler {
    fn run_async(&self, job: Job) {
        job();
    }

    fn run_task(&self, job: Job) {
        job();
    }

    fn run_later(&self, _delay_ticks: u32, job: Job) {
        job();
    }
}
