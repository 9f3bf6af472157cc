//! Per-pixel color filters for the pixel-art pipeline.
//!
//! Every filter is a function of one pixel's RGB bytes. Alpha is never
//! modified. Arithmetic is done in f64 and results are clamped to `[0, 255]`
//! and rounded half-to-even, which matches how a clamped byte canvas stores
//! fractional channel values.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::noise::XorShift64;
use crate::raster::RasterFrame;

/// Contrast level baked into the `highcontrast` filter.
pub const HIGH_CONTRAST_LEVEL: f64 = 128.0;
/// Half-width of the `oldtv` noise band; noise is drawn from `[-25, 25)`.
pub const OLD_TV_NOISE_AMPLITUDE: f64 = 25.0;
/// The four shades produced by the `gameboy` filter, darkest first.
pub const GAMEBOY_SHADES: [u8; 4] = [34, 85, 170, 255];

const SEPIA_MATRIX: [[f64; 3]; 3] = [
    [0.393, 0.769, 0.189],
    [0.349, 0.686, 0.168],
    [0.272, 0.534, 0.131],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "&'static str")]
pub enum PixelFilter {
    #[default]
    None,
    Grayscale,
    Sepia,
    Invert,
    HighContrast,
    OldTv,
    RandomColor,
    GameBoy,
    /// Leaves pixels untouched and asks the compositor to blend in the
    /// previous frame.
    MotionTrail,
}

impl PixelFilter {
    pub const ALL: [PixelFilter; 9] = [
        PixelFilter::None,
        PixelFilter::Grayscale,
        PixelFilter::Sepia,
        PixelFilter::Invert,
        PixelFilter::HighContrast,
        PixelFilter::OldTv,
        PixelFilter::RandomColor,
        PixelFilter::GameBoy,
        PixelFilter::MotionTrail,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Grayscale => "grayscale",
            Self::Sepia => "sepia",
            Self::Invert => "invert",
            Self::HighContrast => "highcontrast",
            Self::OldTv => "oldtv",
            Self::RandomColor => "randomcolor",
            Self::GameBoy => "gameboy",
            Self::MotionTrail => "motiontrail",
        }
    }

    /// Parse a filter name. Unrecognised names fall back to [`PixelFilter::None`].
    pub fn parse(raw: &str) -> Self {
        let value = raw.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|filter| filter.name() == value)
            .unwrap_or(Self::None)
    }

    /// Whether this selection enables the temporal blend in the compositor.
    pub fn blends_previous_frame(self) -> bool {
        matches!(self, Self::MotionTrail)
    }

    pub fn apply_pixel(self, rgb: [u8; 3], rng: &mut XorShift64) -> [u8; 3] {
        let [r, g, b] = rgb;
        match self {
            Self::None | Self::MotionTrail => rgb,
            Self::Grayscale => {
                let gray = clamp_channel(average(r, g, b));
                [gray; 3]
            }
            Self::Sepia => {
                let input = [f64::from(r), f64::from(g), f64::from(b)];
                SEPIA_MATRIX.map(|row| {
                    clamp_channel(row[0] * input[0] + row[1] * input[1] + row[2] * input[2])
                })
            }
            Self::Invert => [255 - r, 255 - g, 255 - b],
            Self::HighContrast => {
                let factor = contrast_factor(HIGH_CONTRAST_LEVEL);
                rgb.map(|channel| clamp_channel(factor * (f64::from(channel) - 128.0) + 128.0))
            }
            Self::OldTv => {
                let noise = (f64::from(rng.next_unit()) - 0.5) * (OLD_TV_NOISE_AMPLITUDE * 2.0);
                [clamp_channel(average(r, g, b) + noise); 3]
            }
            Self::RandomColor => {
                [(); 3].map(|_| (f64::from(rng.next_unit()) * 255.0).floor() as u8)
            }
            Self::GameBoy => {
                let gray = average(r, g, b);
                let shade = if gray > 200.0 {
                    GAMEBOY_SHADES[3]
                } else if gray > 100.0 {
                    GAMEBOY_SHADES[2]
                } else if gray > 50.0 {
                    GAMEBOY_SHADES[1]
                } else {
                    GAMEBOY_SHADES[0]
                };
                [shade; 3]
            }
        }
    }

    /// Filter every pixel of `frame` in place.
    pub fn apply(self, frame: &mut RasterFrame, rng: &mut XorShift64) {
        if matches!(self, Self::None | Self::MotionTrail) {
            return;
        }
        for px in frame.pixels_mut() {
            let [r, g, b] = self.apply_pixel([px[0], px[1], px[2]], rng);
            px[0] = r;
            px[1] = g;
            px[2] = b;
        }
    }
}

impl FromStr for PixelFilter {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<String> for PixelFilter {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<PixelFilter> for &'static str {
    fn from(value: PixelFilter) -> Self {
        value.name()
    }
}

impl fmt::Display for PixelFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Standard contrast-stretch factor for a contrast level in `[-255, 255]`.
pub fn contrast_factor(level: f64) -> f64 {
    (259.0 * (level + 255.0)) / (255.0 * (259.0 - level))
}

#[inline(always)]
fn average(r: u8, g: u8, b: u8) -> f64 {
    (f64::from(r) + f64::from(g) + f64::from(b)) / 3.0
}

#[inline(always)]
fn clamp_channel(value: f64) -> u8 {
    value.clamp(0.0, 255.0).round_ties_even() as u8
}
