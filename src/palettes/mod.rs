//! Palette definitions.
//!
//! The built-in map palette is every base map color at four shades. Indices
//! 0 through 3 are transparent and double as the transparent sentinel.

use crate::color::C3;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Palette index written for transparent pixels.
pub const PALETTE_TRANSPARENT: u8 = 0;

/// Shade multipliers applied to each base color, in index order.
const SHADES: [i32; 4] = [180, 220, 255, 135];

/// Base map colors. Entry 0 is the transparent "none" color.
const BASE_COLORS: [[u8; 3]; 62] = [
    [0, 0, 0],
    [127, 178, 56],
    [247, 233, 163],
    [199, 199, 199],
    [255, 0, 0],
    [160, 160, 255],
    [167, 167, 167],
    [0, 124, 0],
    [255, 255, 255],
    [164, 168, 184],
    [151, 109, 77],
    [112, 112, 112],
    [64, 64, 255],
    [143, 119, 72],
    [255, 252, 245],
    [216, 127, 51],
    [178, 76, 216],
    [102, 153, 216],
    [229, 229, 51],
    [127, 204, 25],
    [242, 127, 165],
    [76, 76, 76],
    [153, 153, 153],
    [76, 127, 153],
    [127, 63, 178],
    [51, 76, 178],
    [102, 76, 51],
    [102, 127, 51],
    [153, 51, 51],
    [25, 25, 25],
    [250, 238, 77],
    [92, 219, 213],
    [74, 128, 255],
    [0, 217, 58],
    [129, 86, 49],
    [112, 2, 0],
    [209, 177, 161],
    [159, 82, 36],
    [149, 87, 108],
    [112, 108, 138],
    [186, 133, 36],
    [103, 117, 53],
    [160, 77, 78],
    [57, 41, 35],
    [135, 107, 98],
    [87, 92, 92],
    [122, 73, 88],
    [76, 62, 92],
    [76, 50, 35],
    [76, 82, 42],
    [142, 60, 46],
    [37, 22, 16],
    [189, 48, 49],
    [148, 63, 97],
    [92, 25, 29],
    [22, 126, 134],
    [58, 142, 140],
    [86, 44, 62],
    [20, 180, 133],
    [100, 100, 100],
    [216, 175, 147],
    [127, 167, 150],
];

/// An indexed set of colors. Transparent entries are never matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    entries: Vec<C3>,
}

impl Palette {
    /// The built-in map palette (62 base colors x 4 shades).
    pub fn map() -> &'static Palette {
        static MAP: OnceLock<Palette> = OnceLock::new();
        MAP.get_or_init(|| {
            let entries = BASE_COLORS
                .iter()
                .enumerate()
                .flat_map(|(base, rgb)| {
                    SHADES.iter().map(move |shade| {
                        C3::with_transparency(
                            rgb[0] as i32 * shade / 255,
                            rgb[1] as i32 * shade / 255,
                            rgb[2] as i32 * shade / 255,
                            base == 0,
                        )
                    })
                })
                .collect();
            Palette { entries }
        })
    }

    /// Build a palette from opaque colors. Index 0 is reserved as the
    /// transparent sentinel, so `colors[i]` lands at index `i + 1`.
    ///
    /// At most 255 colors are kept.
    pub fn from_colors(colors: &[[u8; 3]]) -> Palette {
        let mut entries = Vec::with_capacity(colors.len().min(255) + 1);
        entries.push(C3::with_transparency(0, 0, 0, true));
        entries.extend(
            colors.iter().take(255).map(|c| C3::new(c[0] as i32, c[1] as i32, c[2] as i32)),
        );
        Palette { entries }
    }

    /// Number of entries, transparent ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the palette has no entries at all.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Color of a palette entry.
    pub fn color(&self, index: u8) -> Option<C3> {
        self.entries.get(index as usize).copied()
    }

    /// Whether an index refers to a transparent (or missing) entry.
    pub fn is_transparent(&self, index: u8) -> bool {
        self.color(index).map_or(true, |c| c.transparent)
    }

    /// Iterate `(index, color)` over every entry.
    pub fn iter(&self) -> impl Iterator<Item = (u8, C3)> + '_ {
        self.entries.iter().enumerate().map(|(i, c)| (i as u8, *c))
    }

    /// Opaque entries eligible for matching, with duplicate colors removed.
    ///
    /// Enumeration order is index order; the first index of a duplicated
    /// color wins.
    pub fn candidates(&self) -> Vec<(u8, C3)> {
        let mut seen = HashSet::new();
        self.iter().filter(|(_, c)| !c.transparent && seen.insert((c.r, c.g, c.b))).collect()
    }

    /// Opaque entries whose color is a pure gray.
    pub fn grayscale_indices(&self) -> Vec<u8> {
        self.candidates()
            .into_iter()
            .filter(|(_, c)| c.r == c.g && c.g == c.b)
            .map(|(i, _)| i)
            .collect()
    }
}
