//! Precomputed nearest-palette lookup over the full 24-bit RGB space.

use crate::color::C3;
use crate::palettes::Palette;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;

/// Number of keys in each lookup table (every 24-bit RGB value).
pub const LUT_SIZE: usize = 1 << 24;

const PLANE: usize = 1 << 16;

/// Maps every `0xRRGGBB` key to its nearest palette entry.
///
/// Nearest means smallest squared Euclidean distance; on a tie the entry that
/// comes first in palette order wins. Both tables are filled once at
/// construction and never change afterwards.
pub struct PaletteMatcher {
    index_lut: Box<[u8]>,
    rgb_lut: Box<[u32]>,
}

impl PaletteMatcher {
    /// Build the tables for a palette.
    ///
    /// # Panics
    ///
    /// Panics if the palette has no opaque entries.
    pub fn new(palette: &Palette) -> Self {
        let candidates = palette.candidates();
        assert!(!candidates.is_empty(), "palette has no opaque entries");

        let mut index_lut = vec![0u8; LUT_SIZE].into_boxed_slice();
        let mut rgb_lut = vec![0u32; LUT_SIZE].into_boxed_slice();

        // Scoped threads, not the rayon pool: the first caller may itself be a pool job.
        let jobs = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1).min(256);
        let planes: Vec<(usize, (&mut [u8], &mut [u32]))> =
            index_lut.chunks_mut(PLANE).zip(rgb_lut.chunks_mut(PLANE)).enumerate().collect();
        let planes: Vec<_> = planes.into_iter().map(parking_lot::Mutex::new).collect();
        let next = AtomicUsize::new(0);

        std::thread::scope(|s| {
            for _ in 0..jobs {
                s.spawn(|| loop {
                    let idx = next.fetch_add(1, Ordering::Relaxed);
                    let Some(slot) = planes.get(idx) else {
                        break;
                    };
                    let mut plane = slot.lock();
                    let (r, (index_plane, rgb_plane)) = &mut *plane;
                    fill_red_plane(*r as i32, &candidates, index_plane, rgb_plane);
                });
            }
        });
        drop(planes);

        tracing::debug!(entries = candidates.len(), "built palette lookup tables");
        Self { index_lut, rgb_lut }
    }

    /// Shared matcher for the built-in map palette, built on first use.
    pub fn global() -> &'static PaletteMatcher {
        static GLOBAL: OnceLock<PaletteMatcher> = OnceLock::new();
        GLOBAL.get_or_init(|| PaletteMatcher::new(Palette::map()))
    }

    /// Palette index nearest to a packed `0xRRGGBB` key.
    #[inline]
    pub fn index_of(&self, rgb: u32) -> u8 {
        self.index_lut[(rgb & 0xFF_FFFF) as usize]
    }

    /// Canonical packed color of the palette entry nearest to `rgb`.
    #[inline]
    pub fn rgb_of(&self, rgb: u32) -> u32 {
        self.rgb_lut[(rgb & 0xFF_FFFF) as usize]
    }

    /// Nearest index and its canonical color for an arbitrary (clamped) color.
    #[inline]
    pub fn lookup(&self, color: C3) -> (u8, C3) {
        let key = color.packed();
        (self.index_of(key), C3::from_packed(self.rgb_of(key)))
    }
}

impl std::fmt::Debug for PaletteMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaletteMatcher").field("keys", &self.index_lut.len()).finish()
    }
}

/// Fill the 65536 keys sharing one red value.
///
/// For a fixed (r, g) the red/green part of every candidate's distance is
/// constant, so candidates are visited in ascending order of that partial
/// distance and the scan stops once it alone exceeds the best full distance.
fn fill_red_plane(r: i32, candidates: &[(u8, C3)], index_plane: &mut [u8], rgb_plane: &mut [u32]) {
    let mut row: Vec<(i32, usize)> = Vec::with_capacity(candidates.len());
    for g in 0..256i32 {
        row.clear();
        row.extend(candidates.iter().enumerate().map(|(pos, (_, c))| {
            let dr = r - c.r;
            let dg = g - c.g;
            (dr * dr + dg * dg, pos)
        }));
        row.sort_unstable();

        for b in 0..256i32 {
            let mut best = i32::MAX;
            let mut best_pos = usize::MAX;
            for &(partial, pos) in &row {
                if partial > best {
                    break;
                }
                let db = b - candidates[pos].1.b;
                let distance = partial + db * db;
                if distance < best || (distance == best && pos < best_pos) {
                    best = distance;
                    best_pos = pos;
                }
            }
            let (index, color) = candidates[best_pos];
            let offset = ((g as usize) << 8) | b as usize;
            index_plane[offset] = index;
            rgb_plane[offset] = color.packed();
        }
    }
}

/// Exhaustive nearest-color search, first minimal entry wins.
pub fn nearest_brute_force(candidates: &[(u8, C3)], color: C3) -> (u8, C3) {
    let mut closest = candidates[0];
    for &candidate in candidates {
        if candidate.1.distance_sq(color) < closest.1.distance_sq(color) {
            closest = candidate;
        }
    }
    closest
}
