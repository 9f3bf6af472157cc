//! The two per-frame pipelines.
//!
//! Both take their source explicitly on every tick and hand back the display
//! surface they drew into. Settings are passed per tick so a caller can
//! change filter or resolution between any two frames.

use tiny_skia::Pixmap;
use tracing::debug;

use crate::compositor::TrailCompositor;
use crate::error::{GlyphcamError, GlyphcamResult};
use crate::filter::PixelFilter;
use crate::glyph::{GlyphGrid, ASCII_GRID_COLUMNS, ASCII_GRID_ROWS};
use crate::glyph_atlas::RampAtlas;
use crate::noise::XorShift64;
use crate::raster::RasterFrame;
use crate::source::FrameSource;

pub const DEFAULT_RESOLUTION: u32 = 8;
pub const GLYPH_COLOR: [u8; 4] = [255, 255, 255, 255];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelSettings {
    pub filter: PixelFilter,
    pub resolution: u32,
}

impl Default for PixelSettings {
    fn default() -> Self {
        Self {
            filter: PixelFilter::None,
            resolution: DEFAULT_RESOLUTION,
        }
    }
}

pub struct AsciiPipeline {
    atlas: RampAtlas,
    surface: Option<Pixmap>,
    last_grid: Option<GlyphGrid>,
}

impl AsciiPipeline {
    pub fn new() -> Self {
        Self {
            atlas: RampAtlas,
            surface: None,
            last_grid: None,
        }
    }

    /// Sample 100x75, map to glyphs, paint the 600x750 surface.
    pub fn tick(&mut self, source: &mut dyn FrameSource) -> GlyphcamResult<&Pixmap> {
        let frame = source.sample(ASCII_GRID_COLUMNS, ASCII_GRID_ROWS);
        let grid = GlyphGrid::from_frame(&frame);
        let surface = self.atlas.render_grid(&grid, GLYPH_COLOR)?;
        self.last_grid = Some(grid);
        Ok(self.surface.insert(surface))
    }

    pub fn last_grid(&self) -> Option<&GlyphGrid> {
        self.last_grid.as_ref()
    }

    pub fn surface(&self) -> Option<&Pixmap> {
        self.surface.as_ref()
    }
}

impl Default for AsciiPipeline {
    fn default() -> Self {
        Self::new()
    }
}

pub struct PixelPipeline {
    compositor: TrailCompositor,
    rng: XorShift64,
}

impl PixelPipeline {
    pub fn new(seed: Option<u64>) -> GlyphcamResult<Self> {
        Ok(Self {
            compositor: TrailCompositor::new()?,
            rng: XorShift64::seeded_or_clock(seed),
        })
    }

    /// Sample an RxR raster, filter it in place, composite onto the 500x500
    /// surface.
    pub fn tick(
        &mut self,
        source: &mut dyn FrameSource,
        settings: PixelSettings,
    ) -> GlyphcamResult<&Pixmap> {
        let frame = self.filtered_frame(source, settings)?;
        self.compositor.composite(frame, settings.filter)
    }

    /// Sample and filter without compositing.
    pub fn filtered_frame(
        &mut self,
        source: &mut dyn FrameSource,
        settings: PixelSettings,
    ) -> GlyphcamResult<RasterFrame> {
        if settings.resolution == 0 {
            return Err(GlyphcamError::config("resolution must be at least 1"));
        }
        let mut frame = source.sample(settings.resolution, settings.resolution);
        settings.filter.apply(&mut frame, &mut self.rng);
        Ok(frame)
    }

    pub fn previous_frame(&self) -> Option<&RasterFrame> {
        self.compositor.previous()
    }

    pub fn surface(&self) -> &Pixmap {
        self.compositor.surface()
    }

    pub fn reset(&mut self) {
        debug!("pixel pipeline reset, previous frame dropped");
        self.compositor.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glyph::GLYPH_RAMP;
    use crate::source::StillSource;

    fn solid_source(rgba: [u8; 4]) -> StillSource {
        StillSource::new(image::RgbaImage::from_pixel(64, 48, image::Rgba(rgba)))
    }

    #[test]
    fn ascii_tick_produces_full_grid_and_surface() {
        let mut source = solid_source([0, 0, 0, 255]);
        let mut pipeline = AsciiPipeline::new();
        let surface = pipeline.tick(&mut source).expect("tick");
        assert_eq!((surface.width(), surface.height()), (600, 750));

        let grid = pipeline.last_grid().expect("grid");
        assert_eq!((grid.width(), grid.height()), (100, 75));
        assert!(grid.cells().iter().all(|&c| c == GLYPH_RAMP[0]));
    }

    #[test]
    fn pixel_tick_uses_requested_resolution() {
        let mut source = solid_source([10, 20, 30, 255]);
        let mut pipeline = PixelPipeline::new(Some(1)).expect("pipeline");
        let settings = PixelSettings {
            filter: PixelFilter::Invert,
            resolution: 3,
        };
        pipeline.tick(&mut source, settings).expect("tick");
        let previous = pipeline.previous_frame().expect("previous");
        assert_eq!((previous.width(), previous.height()), (3, 3));
        assert!(previous.pixels().all(|px| px == [245, 235, 225, 255]));
    }

    #[test]
    fn zero_resolution_is_rejected() {
        let mut source = solid_source([0, 0, 0, 255]);
        let mut pipeline = PixelPipeline::new(Some(1)).expect("pipeline");
        let settings = PixelSettings {
            filter: PixelFilter::None,
            resolution: 0,
        };
        assert!(matches!(
            pipeline.tick(&mut source, settings),
            Err(GlyphcamError::Config(_))
        ));
    }
}
