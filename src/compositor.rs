//! Pixel surface compositing with an optional one-frame motion trail.
//!
//! Each tick clears the surface, optionally draws the previous tick's raster
//! at [`TRAIL_ALPHA`], then draws the current raster opaque on top. Both are
//! scaled with nearest-neighbour sampling so pixels stay square. The current
//! raster is retained as the previous frame on every tick, whatever the
//! filter, so switching to the trail mid-session blends immediately.

use tiny_skia::{Color, FilterQuality, Pixmap, PixmapPaint, Transform};

use crate::error::{GlyphcamError, GlyphcamResult};
use crate::filter::PixelFilter;
use crate::raster::RasterFrame;

pub const PIXEL_SURFACE_SIZE: u32 = 500;
pub const TRAIL_ALPHA: f32 = 0.2;

pub struct TrailCompositor {
    surface: Pixmap,
    previous: Option<RasterFrame>,
}

impl TrailCompositor {
    pub fn new() -> GlyphcamResult<Self> {
        Self::with_surface_size(PIXEL_SURFACE_SIZE, PIXEL_SURFACE_SIZE)
    }

    pub fn with_surface_size(width: u32, height: u32) -> GlyphcamResult<Self> {
        let surface = Pixmap::new(width, height).ok_or_else(|| {
            GlyphcamError::encode(format!("failed to allocate pixel surface {width}x{height}"))
        })?;
        Ok(Self {
            surface,
            previous: None,
        })
    }

    pub fn surface(&self) -> &Pixmap {
        &self.surface
    }

    /// The raster retained from the last tick, at its native resolution.
    pub fn previous(&self) -> Option<&RasterFrame> {
        self.previous.as_ref()
    }

    /// Drop the retained frame, e.g. when the pipeline stops.
    pub fn reset(&mut self) {
        self.previous = None;
    }

    pub fn composite(
        &mut self,
        current: RasterFrame,
        filter: PixelFilter,
    ) -> GlyphcamResult<&Pixmap> {
        self.surface.fill(Color::TRANSPARENT);

        if filter.blends_previous_frame() {
            if let Some(previous) = &self.previous {
                let layer = previous.to_pixmap()?;
                draw_scaled(&mut self.surface, &layer, TRAIL_ALPHA);
            }
        }

        if current.pixel_count() > 0 {
            let layer = current.to_pixmap()?;
            draw_scaled(&mut self.surface, &layer, 1.0);
        }

        self.previous = Some(current);
        Ok(&self.surface)
    }
}

fn draw_scaled(surface: &mut Pixmap, layer: &Pixmap, opacity: f32) {
    let sx = surface.width() as f32 / layer.width() as f32;
    let sy = surface.height() as f32 / layer.height() as f32;
    let paint = PixmapPaint {
        opacity,
        quality: FilterQuality::Nearest,
        ..PixmapPaint::default()
    };
    surface.draw_pixmap(
        0,
        0,
        layer.as_ref(),
        &paint,
        Transform::from_scale(sx, sy),
        None,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surface_pixel(pixmap: &Pixmap, x: u32, y: u32) -> [u8; 4] {
        let px = pixmap.pixels()[(y * pixmap.width() + x) as usize];
        [px.red(), px.green(), px.blue(), px.alpha()]
    }

    #[test]
    fn opaque_frame_fills_surface() {
        let mut compositor = TrailCompositor::with_surface_size(40, 40).expect("surface");
        let surface = compositor
            .composite(RasterFrame::solid(4, 4, [0, 0, 255, 255]), PixelFilter::None)
            .expect("composite");
        assert_eq!(surface_pixel(surface, 0, 0), [0, 0, 255, 255]);
        assert_eq!(surface_pixel(surface, 39, 39), [0, 0, 255, 255]);
    }

    #[test]
    fn nearest_scaling_keeps_hard_edges() {
        let mut rgba = Vec::new();
        rgba.extend_from_slice(&[255, 0, 0, 255]);
        rgba.extend_from_slice(&[0, 255, 0, 255]);
        let frame = RasterFrame::from_rgba(2, 1, rgba).expect("frame");
        let mut compositor = TrailCompositor::with_surface_size(10, 10).expect("surface");
        let surface = compositor.composite(frame, PixelFilter::None).expect("composite");
        assert_eq!(surface_pixel(surface, 4, 5), [255, 0, 0, 255]);
        assert_eq!(surface_pixel(surface, 5, 5), [0, 255, 0, 255]);
    }

    #[test]
    fn previous_frame_is_retained_for_every_filter() {
        let mut compositor = TrailCompositor::with_surface_size(8, 8).expect("surface");
        let first = RasterFrame::solid(2, 2, [1, 2, 3, 255]);
        compositor
            .composite(first.clone(), PixelFilter::Sepia)
            .expect("composite");
        assert_eq!(compositor.previous(), Some(&first));

        compositor.reset();
        assert!(compositor.previous().is_none());
    }

    #[test]
    fn trail_shows_through_transparent_current_frame() {
        let mut compositor = TrailCompositor::with_surface_size(10, 10).expect("surface");
        compositor
            .composite(RasterFrame::solid(2, 2, [255, 255, 255, 255]), PixelFilter::Invert)
            .expect("composite");

        let surface = compositor
            .composite(RasterFrame::blank(2, 2), PixelFilter::MotionTrail)
            .expect("composite");
        let [r, g, b, a] = surface_pixel(surface, 5, 5);
        assert!((50..=52).contains(&a), "alpha={a}");
        assert_eq!((r, g, b), (a, a, a));
    }

    #[test]
    fn trail_is_skipped_without_motiontrail() {
        let mut compositor = TrailCompositor::with_surface_size(10, 10).expect("surface");
        compositor
            .composite(RasterFrame::solid(2, 2, [255, 255, 255, 255]), PixelFilter::None)
            .expect("composite");
        let surface = compositor
            .composite(RasterFrame::blank(2, 2), PixelFilter::Grayscale)
            .expect("composite");
        assert_eq!(surface_pixel(surface, 5, 5), [0, 0, 0, 0]);
    }
}
