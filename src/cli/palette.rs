//! Palette command implementation

use std::process::ExitCode;

use crate::palettes::Palette;

use super::EXIT_SUCCESS;

/// One listing line per opaque palette entry.
pub(crate) fn palette_lines(palette: &Palette, grayscale: bool) -> Vec<String> {
    let grays = palette.grayscale_indices();
    palette
        .iter()
        .filter(|(_, color)| !color.transparent)
        .filter(|(index, _)| !grayscale || grays.contains(index))
        .map(|(index, color)| format!("{:>3}  {}", index, color.to_hex()))
        .collect()
}

/// Execute the palette command
pub fn run_palette(grayscale: bool) -> ExitCode {
    for line in palette_lines(Palette::map(), grayscale) {
        println!("{}", line);
    }
    ExitCode::from(EXIT_SUCCESS)
}
