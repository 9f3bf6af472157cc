//! Brightness-to-glyph mapping.
//!
//! Intensity is the plain channel average `(R + G + B) / 3`, not perceptual
//! luma. The ramp runs from `@` at intensity 0 to `.` at intensity 255.

use crate::raster::RasterFrame;

pub const GLYPH_RAMP: &[u8; 11] = b"@#S%?*+;:,.";
pub const ASCII_GRID_COLUMNS: u32 = 100;
pub const ASCII_GRID_ROWS: u32 = 75;
pub const CELL_WIDTH: u32 = 6;
pub const CELL_HEIGHT: u32 = 10;

/// Ramp index for an intensity in `[0, 255]`: `floor((i / 255) * 10)`.
pub fn glyph_index(intensity: u8) -> usize {
    channel_sum_to_index(u32::from(intensity) * 3)
}

/// Same mapping computed from the raw channel sum so the average never has
/// to be rounded.
#[inline(always)]
fn channel_sum_to_index(sum: u32) -> usize {
    let steps = (GLYPH_RAMP.len() - 1) as u32;
    ((sum * steps) / (3 * 255)).min(steps) as usize
}

pub fn glyph_for_rgb(r: u8, g: u8, b: u8) -> u8 {
    let sum = u32::from(r) + u32::from(g) + u32::from(b);
    GLYPH_RAMP[channel_sum_to_index(sum)]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlyphGrid {
    width: usize,
    height: usize,
    cells: Vec<u8>,
}

impl GlyphGrid {
    /// Map every pixel of `frame` to one ramp glyph.
    pub fn from_frame(frame: &RasterFrame) -> Self {
        let cells = frame
            .pixels()
            .map(|px| glyph_for_rgb(px[0], px[1], px[2]))
            .collect();
        Self {
            width: frame.width() as usize,
            height: frame.height() as usize,
            cells,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    pub fn glyph_at(&self, column: usize, row: usize) -> Option<u8> {
        if column >= self.width || row >= self.height {
            return None;
        }
        self.cells.get(row * self.width + column).copied()
    }

    pub fn rows(&self) -> impl Iterator<Item = &[u8]> {
        self.cells.chunks(self.width.max(1))
    }

    pub fn to_text(&self) -> String {
        if self.cells.is_empty() {
            return String::new();
        }
        let mut value = String::with_capacity(self.cells.len() + self.height);
        for row in self.rows() {
            value.extend(row.iter().map(|&byte| char::from(byte)));
            value.push('\n');
        }
        value
    }
}
