//! Color primitives used by palette matching and error diffusion
//!
//! `C3` is a signed RGB triple. It is signed because error diffusion pushes
//! channel values outside `0..=255` before they are clamped for lookup.

use image::Rgba;
use std::ops::{Add, Sub};

/// Alpha values below this are treated as fully transparent.
pub const ALPHA_THRESHOLD: u8 = 128;

/// An RGB triple with a transparency flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct C3 {
    pub r: i32,
    pub g: i32,
    pub b: i32,
    pub transparent: bool,
}

impl C3 {
    /// Create an opaque color.
    pub const fn new(r: i32, g: i32, b: i32) -> Self {
        Self { r, g, b, transparent: false }
    }

    /// Create a color with an explicit transparency flag.
    pub const fn with_transparency(r: i32, g: i32, b: i32, transparent: bool) -> Self {
        Self { r, g, b, transparent }
    }

    /// Build from an RGBA pixel, classifying it as transparent below [`ALPHA_THRESHOLD`].
    pub fn from_rgba(rgba: Rgba<u8>) -> Self {
        Self {
            r: rgba[0] as i32,
            g: rgba[1] as i32,
            b: rgba[2] as i32,
            transparent: rgba[3] < ALPHA_THRESHOLD,
        }
    }

    /// Unpack a `0xRRGGBB` value.
    pub const fn from_packed(rgb: u32) -> Self {
        Self::new(((rgb >> 16) & 0xFF) as i32, ((rgb >> 8) & 0xFF) as i32, (rgb & 0xFF) as i32)
    }

    /// Pack into `0xRRGGBB`, clamping each channel to `0..=255`.
    pub fn packed(self) -> u32 {
        let c = self.clamped();
        ((c.r as u32) << 16) | ((c.g as u32) << 8) | c.b as u32
    }

    /// Clamp every channel into the displayable range.
    pub fn clamped(self) -> Self {
        Self {
            r: clamp_channel(self.r),
            g: clamp_channel(self.g),
            b: clamp_channel(self.b),
            transparent: self.transparent,
        }
    }

    /// Scale every channel, truncating toward zero.
    pub fn scale(self, factor: f64) -> Self {
        Self {
            r: (factor * self.r as f64) as i32,
            g: (factor * self.g as f64) as i32,
            b: (factor * self.b as f64) as i32,
            transparent: self.transparent,
        }
    }

    /// Squared Euclidean distance to another color.
    pub fn distance_sq(self, other: C3) -> i32 {
        let dr = other.r - self.r;
        let dg = other.g - self.g;
        let db = other.b - self.b;
        dr * dr + dg * dg + db * db
    }

    /// Format as `#RRGGBB`.
    pub fn to_hex(self) -> String {
        let c = self.clamped();
        format!("#{:02X}{:02X}{:02X}", c.r, c.g, c.b)
    }

    /// Convert to an RGBA pixel; transparent colors get alpha 0.
    pub fn to_rgba(self) -> Rgba<u8> {
        let c = self.clamped();
        let alpha = if self.transparent { 0 } else { 255 };
        Rgba([c.r as u8, c.g as u8, c.b as u8, alpha])
    }
}

impl Add for C3 {
    type Output = C3;

    fn add(self, o: C3) -> C3 {
        C3::with_transparency(self.r + o.r, self.g + o.g, self.b + o.b, self.transparent)
    }
}

impl Sub for C3 {
    type Output = C3;

    fn sub(self, o: C3) -> C3 {
        C3::with_transparency(self.r - o.r, self.g - o.g, self.b - o.b, self.transparent)
    }
}

/// Clamp a channel value into `0..=255`.
#[inline]
pub fn clamp_channel(c: i32) -> i32 {
    c.clamp(0, 255)
}
