//! Allocator for synthetic surface ids used by animation frames.

use crate::models::SurfaceId;
use std::sync::atomic::{AtomicI32, Ordering};

/// Lowest id the allocator hands out, three quarters of `i32::MAX`.
///
/// Host surface ids are allocated upwards from zero and never get near it.
pub const FAKE_SURFACE_ID_START: i32 = i32::MAX / 4 * 3;

/// Lock-free source of fake surface ids.
///
/// Ids are strictly increasing from [`FAKE_SURFACE_ID_START`] and wrap back
/// to it after `i32::MAX`.
#[derive(Debug)]
pub struct FakeIdAllocator {
    next: AtomicI32,
}

impl FakeIdAllocator {
    pub fn new() -> Self {
        Self { next: AtomicI32::new(FAKE_SURFACE_ID_START) }
    }

    /// Allocator whose first id is `first`, raised to the start of the range.
    pub fn starting_at(first: i32) -> Self {
        Self { next: AtomicI32::new(first.max(FAKE_SURFACE_ID_START)) }
    }

    /// Hand out the next id.
    pub fn next_id(&self) -> SurfaceId {
        let previous = self
            .next
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
                Some(if current == i32::MAX || current < FAKE_SURFACE_ID_START {
                    FAKE_SURFACE_ID_START
                } else {
                    current + 1
                })
            })
            .unwrap_or_else(|current| current);
        SurfaceId(previous)
    }

    /// Whether an id falls in the fake range.
    pub fn is_fake(id: SurfaceId) -> bool {
        id.0 >= FAKE_SURFACE_ID_START
    }
}

impl Default for FakeIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
