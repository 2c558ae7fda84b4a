//! Color quantization into palette-indexed pixel buffers.
//!
//! This module provides:
//! - `PaletteMatcher`: 24-bit RGB lookup tables built once per palette
//! - `dither`: Floyd-Steinberg error diffusion
//! - `quantize_nearest`: plain nearest-color mapping
//! - Helpers to fit a source image onto a grid of fixed-size surfaces

mod dither;
mod matcher;

pub use dither::{dither, quantize_nearest};
pub use matcher::{nearest_brute_force, PaletteMatcher, LUT_SIZE};

use crate::palettes::Palette;
use image::imageops::FilterType;
use image::{Rgba, RgbaImage};

/// A palette-indexed image, row-major (`y * width + x`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl IndexedImage {
    /// Palette index at (x, y).
    pub fn get(&self, x: u32, y: u32) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get((y * self.width + x) as usize).copied()
    }

    /// Expand indices back into colors. Transparent entries get alpha 0.
    pub fn to_rgba(&self, palette: &Palette) -> RgbaImage {
        let mut out = RgbaImage::new(self.width, self.height);
        for (px, &index) in out.pixels_mut().zip(&self.pixels) {
            *px = match palette.color(index) {
                Some(c) if !c.transparent => c.to_rgba(),
                _ => Rgba([0, 0, 0, 0]),
            };
        }
        out
    }

    /// Cut into `size x size` tiles, row-major over a `cols x rows` grid.
    ///
    /// Tiles reaching past the image edge are padded with the transparent
    /// sentinel.
    pub fn split_surfaces(&self, cols: u32, rows: u32, size: u32) -> Vec<Vec<u8>> {
        let mut tiles = Vec::with_capacity((cols * rows) as usize);
        for row in 0..rows {
            for col in 0..cols {
                let mut tile = vec![crate::palettes::PALETTE_TRANSPARENT; (size * size) as usize];
                for y in 0..size {
                    for x in 0..size {
                        if let Some(index) = self.get(col * size + x, row * size + y) {
                            tile[(y * size + x) as usize] = index;
                        }
                    }
                }
                tiles.push(tile);
            }
        }
        tiles
    }
}

/// Resize a source image to exactly cover a `cols x rows` grid of surfaces.
pub fn fit_to_surfaces(image: &RgbaImage, cols: u32, rows: u32, size: u32) -> RgbaImage {
    let (target_w, target_h) = (cols * size, rows * size);
    if image.dimensions() == (target_w, target_h) {
        return image.clone();
    }
    image::imageops::resize(image, target_w, target_h, FilterType::Triangle)
}
