//! Quantize command implementation

use std::path::Path;
use std::process::ExitCode;

use crate::config::MapframeConfig;
use crate::output::{preview_path, save_preview};
use crate::palettes::Palette;
use crate::quantize::{dither, fit_to_surfaces, quantize_nearest, PaletteMatcher};

use super::{EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_SUCCESS};

/// Parse a `COLSxROWS` grid such as `2x1`.
pub(crate) fn parse_grid(spec: &str) -> Option<(u32, u32)> {
    let (cols, rows) = spec.trim().split_once(['x', 'X'])?;
    let cols: u32 = cols.trim().parse().ok()?;
    let rows: u32 = rows.trim().parse().ok()?;
    if cols == 0 || rows == 0 {
        return None;
    }
    Some((cols, rows))
}

/// Execute the quantize command
pub fn run_quantize(
    config: &MapframeConfig,
    input: &Path,
    output: Option<&Path>,
    nearest: bool,
    grid: Option<&str>,
    scale: u8,
) -> ExitCode {
    let grid = match grid.map(|g| (g, parse_grid(g))) {
        None => None,
        Some((_, Some(grid))) => Some(grid),
        Some((raw, None)) => {
            eprintln!("Error: invalid grid '{}', expected COLSxROWS (e.g. 2x1)", raw);
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
    };

    let source = match image::open(input) {
        Ok(img) => img.to_rgba8(),
        Err(e) => {
            eprintln!("Error: cannot read '{}': {}", input.display(), e);
            return ExitCode::from(EXIT_ERROR);
        }
    };
    let source = match grid {
        Some((cols, rows)) => fit_to_surfaces(&source, cols, rows, config.render.surface_size),
        None => source,
    };

    tracing::debug!(
        width = source.width(),
        height = source.height(),
        nearest,
        "quantizing image"
    );
    let matcher = PaletteMatcher::global();
    let indexed = if nearest { quantize_nearest(&source, matcher) } else { dither(&source, matcher) };

    let path = preview_path(input, output);
    if let Err(e) = save_preview(&indexed, Palette::map(), &path, scale) {
        eprintln!("Error: cannot write '{}': {}", path.display(), e);
        return ExitCode::from(EXIT_ERROR);
    }
    println!("Saved: {}", path.display());
    ExitCode::from(EXIT_SUCCESS)
}
