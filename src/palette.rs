//! Fixed-grid palette extraction.
//!
//! The source is resampled to a 300x300 working raster and twelve interior
//! grid points (4 columns x 3 rows) are read back one pixel each, row-major.
//! There is no clustering or averaging: identical input pixels always give the
//! identical palette.

use std::fmt;

use image::RgbaImage;
use serde::{Serialize, Serializer};
use tiny_skia::{Paint, Pixmap, Rect, Transform};

use crate::error::{GlyphcamError, GlyphcamResult};
use crate::raster::RasterFrame;
use crate::source::FrameSource;

pub const PALETTE_SIZE: usize = 12;
pub const PALETTE_COLUMNS: u32 = 4;
pub const PALETTE_ROWS: u32 = 3;
pub const WORKING_SIZE: u32 = 300;
pub const SWATCH_SIZE: u32 = 50;
pub const STRIP_WIDTH: u32 = 600;
pub const STRIP_HEIGHT: u32 = SWATCH_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb({}, {}, {})", self.r, self.g, self.b)
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Palette {
    colors: [Rgb; PALETTE_SIZE],
}

impl Palette {
    pub fn colors(&self) -> &[Rgb; PALETTE_SIZE] {
        &self.colors
    }

    pub fn to_hex_strings(&self) -> Vec<String> {
        self.colors.iter().map(|color| color.to_hex()).collect()
    }

    /// Twelve 50x50 swatches left to right on a 600x50 strip.
    pub fn render_strip(&self) -> GlyphcamResult<Pixmap> {
        let mut pixmap = Pixmap::new(STRIP_WIDTH, STRIP_HEIGHT).ok_or_else(|| {
            GlyphcamError::encode(format!(
                "failed to allocate palette strip {STRIP_WIDTH}x{STRIP_HEIGHT}"
            ))
        })?;

        for (index, color) in self.colors.iter().enumerate() {
            let x = (index as u32 * SWATCH_SIZE) as f32;
            let rect = Rect::from_xywh(x, 0.0, SWATCH_SIZE as f32, SWATCH_SIZE as f32)
                .ok_or_else(|| GlyphcamError::encode("invalid swatch rectangle"))?;
            let mut paint = Paint::default();
            paint.set_color_rgba8(color.r, color.g, color.b, 255);
            paint.anti_alias = false;
            pixmap.fill_rect(rect, &paint, Transform::identity(), None);
        }

        Ok(pixmap)
    }
}

/// Sample coordinates in the 300x300 working raster, in palette order.
pub fn sample_points() -> [(u32, u32); PALETTE_SIZE] {
    let mut points = [(0, 0); PALETTE_SIZE];
    let mut index = 0;
    for y in 1..=PALETTE_ROWS {
        for x in 1..=PALETTE_COLUMNS {
            points[index] = (
                x * WORKING_SIZE / (PALETTE_COLUMNS + 1),
                y * WORKING_SIZE / (PALETTE_ROWS + 1),
            );
            index += 1;
        }
    }
    points
}

pub fn extract_palette(image: &RgbaImage) -> Palette {
    palette_from_working(&RasterFrame::resampled(image, WORKING_SIZE, WORKING_SIZE))
}

/// Extract from whatever `source` is currently showing.
pub fn extract_from_source(source: &mut dyn FrameSource) -> Palette {
    palette_from_working(&source.sample(WORKING_SIZE, WORKING_SIZE))
}

fn palette_from_working(working: &RasterFrame) -> Palette {
    let mut colors = [Rgb::default(); PALETTE_SIZE];
    for (color, (x, y)) in colors.iter_mut().zip(sample_points()) {
        if let Some([r, g, b, _]) = working.pixel(x, y) {
            *color = Rgb::new(r, g, b);
        }
    }
    Palette { colors }
}
