//! Flat RGBA raster frames.
//!
//! A [`RasterFrame`] is the unit of work passed between pipeline stages. Pixels
//! are stored row-major as straight (non-premultiplied) RGBA bytes. Transforms
//! only ever touch the RGB bytes; alpha is carried through untouched.

use image::imageops::{self, FilterType};
use image::RgbaImage;
use tiny_skia::{ColorU8, IntSize, Pixmap};

use crate::error::{GlyphcamError, GlyphcamResult};

pub const BYTES_PER_PIXEL: usize = 4;

/// Resampling kernel used whenever a source is scaled into a raster frame.
pub const RESAMPLE_FILTER: FilterType = FilterType::Triangle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RasterError {
    #[error("frame dimensions overflowed usize")]
    DimensionsOverflow,
    #[error("RGBA buffer length mismatch: expected {expected} bytes, got {actual} bytes")]
    BufferLengthMismatch { expected: usize, actual: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterFrame {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl RasterFrame {
    /// All-zero frame, used when a source has nothing to show yet.
    pub fn blank(width: u32, height: u32) -> Self {
        let len = width as usize * height as usize * BYTES_PER_PIXEL;
        Self {
            width,
            height,
            rgba: vec![0; len],
        }
    }

    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixel_count = width as usize * height as usize;
        let mut data = Vec::with_capacity(pixel_count * BYTES_PER_PIXEL);
        for _ in 0..pixel_count {
            data.extend_from_slice(&rgba);
        }
        Self {
            width,
            height,
            rgba: data,
        }
    }

    pub fn from_rgba(width: u32, height: u32, rgba: Vec<u8>) -> Result<Self, RasterError> {
        let expected = expected_len(width, height)?;
        if rgba.len() != expected {
            return Err(RasterError::BufferLengthMismatch {
                expected,
                actual: rgba.len(),
            });
        }
        Ok(Self {
            width,
            height,
            rgba,
        })
    }

    pub fn from_image(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            rgba: image.into_raw(),
        }
    }

    /// Scale `image` to exactly `width`x`height`.
    ///
    /// Zero-sized targets or sources produce a blank frame of the requested size.
    pub fn resampled(image: &RgbaImage, width: u32, height: u32) -> Self {
        if width == 0 || height == 0 || image.width() == 0 || image.height() == 0 {
            return Self::blank(width, height);
        }
        if image.dimensions() == (width, height) {
            return Self::from_image(image.clone());
        }
        Self::from_image(imageops::resize(image, width, height, RESAMPLE_FILTER))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn as_rgba(&self) -> &[u8] {
        &self.rgba
    }

    pub fn pixels(&self) -> impl Iterator<Item = &[u8]> {
        self.rgba.chunks_exact(BYTES_PER_PIXEL)
    }

    pub fn pixels_mut(&mut self) -> impl Iterator<Item = &mut [u8]> {
        self.rgba.chunks_exact_mut(BYTES_PER_PIXEL)
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL;
        let px = &self.rgba[idx..idx + BYTES_PER_PIXEL];
        Some([px[0], px[1], px[2], px[3]])
    }

    pub fn to_image(&self) -> GlyphcamResult<RgbaImage> {
        RgbaImage::from_raw(self.width, self.height, self.rgba.clone()).ok_or_else(|| {
            RasterError::BufferLengthMismatch {
                expected: self.width as usize * self.height as usize * BYTES_PER_PIXEL,
                actual: self.rgba.len(),
            }
            .into()
        })
    }

    /// Premultiplied copy suitable for drawing onto a display surface.
    pub fn to_pixmap(&self) -> GlyphcamResult<Pixmap> {
        let size = IntSize::from_wh(self.width, self.height).ok_or_else(|| {
            GlyphcamError::encode(format!(
                "cannot build a {}x{} pixmap",
                self.width, self.height
            ))
        })?;
        let mut pixmap = Pixmap::new(size.width(), size.height()).ok_or_else(|| {
            GlyphcamError::encode(format!(
                "failed to allocate pixmap {}x{}",
                self.width, self.height
            ))
        })?;

        for (dst, src) in pixmap.pixels_mut().iter_mut().zip(self.pixels()) {
            *dst = ColorU8::from_rgba(src[0], src[1], src[2], src[3]).premultiply();
        }
        Ok(pixmap)
    }
}

fn expected_len(width: u32, height: u32) -> Result<usize, RasterError> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|count| count.checked_mul(BYTES_PER_PIXEL))
        .ok_or(RasterError::DimensionsOverflow)
}
