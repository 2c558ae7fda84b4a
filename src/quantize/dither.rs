//! Floyd-Steinberg error diffusion against a fixed palette.

use super::matcher::PaletteMatcher;
use super::IndexedImage;
use crate::color::{clamp_channel, ALPHA_THRESHOLD};
use crate::palettes::PALETTE_TRANSPARENT;
use image::RgbaImage;

/// Per-channel error accumulated at every pixel position.
///
/// Kept apart from the source image, which is never written to.
struct ErrorPlanes {
    width: usize,
    height: usize,
    r: Vec<i32>,
    g: Vec<i32>,
    b: Vec<i32>,
}

impl ErrorPlanes {
    fn new(width: usize, height: usize) -> Self {
        let len = width * height;
        Self { width, height, r: vec![0; len], g: vec![0; len], b: vec![0; len] }
    }

    #[inline]
    fn get(&self, i: usize) -> (i32, i32, i32) {
        (self.r[i], self.g[i], self.b[i])
    }

    /// Add `err * weight / 16` to (x, y) if it is inside the image.
    #[inline]
    fn diffuse(&mut self, x: isize, y: usize, err: (i32, i32, i32), weight: i32) {
        if x < 0 || x as usize >= self.width || y >= self.height {
            return;
        }
        let i = y * self.width + x as usize;
        self.r[i] += err.0 * weight / 16;
        self.g[i] += err.1 * weight / 16;
        self.b[i] += err.2 * weight / 16;
    }
}

/// Quantize an image with Floyd-Steinberg dithering.
///
/// Pixels with alpha below 128 become [`PALETTE_TRANSPARENT`] and neither
/// receive nor spread error. Opaque pixels are visited in raster order; the
/// error of each one goes right (7/16), below-left (3/16), below (5/16) and
/// below-right (1/16) with truncating integer division.
pub fn dither(image: &RgbaImage, matcher: &PaletteMatcher) -> IndexedImage {
    let (w, h) = image.dimensions();
    let (width, height) = (w as usize, h as usize);
    let mut errors = ErrorPlanes::new(width, height);
    let mut pixels = vec![PALETTE_TRANSPARENT; width * height];

    for (x, y, px) in image.enumerate_pixels() {
        if px[3] < ALPHA_THRESHOLD {
            continue;
        }
        let (x, y) = (x as usize, y as usize);
        let i = y * width + x;
        let (er, eg, eb) = errors.get(i);
        let old_r = px[0] as i32 + er;
        let old_g = px[1] as i32 + eg;
        let old_b = px[2] as i32 + eb;

        let key = ((clamp_channel(old_r) as u32) << 16)
            | ((clamp_channel(old_g) as u32) << 8)
            | clamp_channel(old_b) as u32;
        pixels[i] = matcher.index_of(key);

        let canonical = matcher.rgb_of(key);
        let err = (
            old_r - ((canonical >> 16) & 0xFF) as i32,
            old_g - ((canonical >> 8) & 0xFF) as i32,
            old_b - (canonical & 0xFF) as i32,
        );

        let x = x as isize;
        errors.diffuse(x + 1, y, err, 7);
        errors.diffuse(x - 1, y + 1, err, 3);
        errors.diffuse(x, y + 1, err, 5);
        errors.diffuse(x + 1, y + 1, err, 1);
    }

    IndexedImage { width: w, height: h, pixels }
}

/// Quantize without diffusion: every opaque pixel maps straight to its
/// nearest palette entry.
pub fn quantize_nearest(image: &RgbaImage, matcher: &PaletteMatcher) -> IndexedImage {
    let (w, h) = image.dimensions();
    let pixels = image
        .pixels()
        .map(|px| {
            if px[3] < ALPHA_THRESHOLD {
                PALETTE_TRANSPARENT
            } else {
                matcher.index_of(((px[0] as u32) << 16) | ((px[1] as u32) << 8) | px[2] as u32)
            }
        })
        .collect();
    IndexedImage { width: w, height: h, pixels }
}
