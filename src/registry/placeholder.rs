//! Placeholder drawn on surfaces whose image was deleted.

use crate::host::{Renderer, SurfaceHost};
use crate::models::SurfaceId;
use crate::palettes::Palette;
use crate::scheduler::Scheduler;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// splitmix64 step.
fn next_random(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Grayscale noise for `surface`, `size x size` palette indices.
///
/// Seeded by the surface id, so the same surface always gets the same noise.
pub(crate) fn placeholder_pixels(surface: SurfaceId, size: u32, grays: &[u8]) -> Vec<u8> {
    let count = (size * size) as usize;
    if grays.is_empty() {
        return vec![crate::palettes::PALETTE_TRANSPARENT; count];
    }
    let mut state = surface.0 as u32 as u64;
    (0..count).map(|_| grays[(next_random(&mut state) % grays.len() as u64) as usize]).collect()
}

/// Renderer painting the placeholder for `surface`.
///
/// Once another renderer is attached to the surface it stops painting and
/// detaches itself on the next tick. The detach is scheduled once, however
/// many passes see it superseded.
pub(crate) fn placeholder_renderer(
    surface: SurfaceId,
    size: u32,
    host: Weak<dyn SurfaceHost>,
    scheduler: Arc<dyn Scheduler>,
) -> Renderer {
    let pixels: Arc<[u8]> =
        placeholder_pixels(surface, size, &Palette::map().grayscale_indices()).into();
    let detaching = AtomicBool::new(false);
    Renderer::new(move |pass| {
        if pass.attached.len() > 1 {
            if detaching.swap(true, Ordering::AcqRel) {
                return;
            }
            let renderer = pass.renderer;
            let host = host.clone();
            scheduler.run_later(
                1,
                Box::new(move || {
                    if let Some(host) = host.upgrade() {
                        if host.detach(surface, renderer) {
                            tracing::debug!(surface = %surface, "placeholder detached");
                        }
                    }
                }),
            );
            return;
        }
        pass.canvas.draw(&pixels);
    })
}
