//! Frame sources and the sampler contract.
//!
//! A [`FrameSource`] hands out fixed-size snapshots of whatever it is showing
//! right now. Sampling never waits for a new frame: live sources keep the most
//! recent decoded frame and rescale that, and a source with nothing decoded yet
//! yields a blank frame.

use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use image::{ImageReader, RgbaImage};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{GlyphcamError, GlyphcamResult};
use crate::raster::RasterFrame;

pub const DEFAULT_CAPTURE_WIDTH: u32 = 640;
pub const DEFAULT_CAPTURE_HEIGHT: u32 = 480;

pub trait FrameSource {
    /// Snapshot of the current frame scaled to `width`x`height`.
    fn sample(&mut self, width: u32, height: u32) -> RasterFrame;

    /// Whether at least one real frame is available.
    fn has_frame(&self) -> bool;

    /// Whether the source will never produce another frame.
    fn is_exhausted(&self) -> bool {
        false
    }
}

/// A still image. Always ready, never advances.
#[derive(Debug, Clone)]
pub struct StillSource {
    image: RgbaImage,
}

impl StillSource {
    pub fn new(image: RgbaImage) -> Self {
        Self { image }
    }

    pub fn from_frame(frame: &RasterFrame) -> GlyphcamResult<Self> {
        Ok(Self::new(frame.to_image()?))
    }

    /// Decode an uploaded image. Undecodable bytes are reported as
    /// [`GlyphcamError::ImageLoad`].
    pub fn from_bytes(bytes: &[u8]) -> GlyphcamResult<Self> {
        let image = image::load_from_memory(bytes)
            .map_err(|error| GlyphcamError::image_load(format!("failed decoding image: {error}")))?
            .to_rgba8();
        Ok(Self::new(image))
    }

    pub fn open(path: &Path) -> GlyphcamResult<Self> {
        let image = ImageReader::open(path)
            .map_err(|error| {
                GlyphcamError::image_load(format!("failed opening {}: {error}", path.display()))
            })?
            .with_guessed_format()
            .map_err(|error| {
                GlyphcamError::image_load(format!("failed reading {}: {error}", path.display()))
            })?
            .decode()
            .map_err(|error| {
                GlyphcamError::image_load(format!("failed decoding {}: {error}", path.display()))
            })?
            .to_rgba8();
        Ok(Self::new(image))
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }
}

impl FrameSource for StillSource {
    fn sample(&mut self, width: u32, height: u32) -> RasterFrame {
        RasterFrame::resampled(&self.image, width, height)
    }

    fn has_frame(&self) -> bool {
        self.image.width() > 0 && self.image.height() > 0
    }
}

#[derive(Debug, Default)]
struct SlotState {
    pending: Option<RgbaImage>,
    closed: bool,
}

type SharedSlot = Arc<Mutex<SlotState>>;

fn lock_slot(slot: &SharedSlot) -> MutexGuard<'_, SlotState> {
    // A panicking producer cannot leave the slot half-written.
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Create a connected producer/sampler pair sharing a single frame slot.
pub fn latest_frame_slot() -> (FramePublisher, LatestFrameSource) {
    let slot = SharedSlot::default();
    (
        FramePublisher { slot: slot.clone() },
        LatestFrameSource {
            slot,
            latest: None,
            disconnected: false,
        },
    )
}

/// Producer half of [`latest_frame_slot`]. Each publish overwrites any frame
/// the sampler has not picked up yet. Dropping the publisher closes the slot.
pub struct FramePublisher {
    slot: SharedSlot,
}

impl FramePublisher {
    pub fn publish(&self, frame: RgbaImage) {
        lock_slot(&self.slot).pending = Some(frame);
    }
}

impl Drop for FramePublisher {
    fn drop(&mut self) {
        lock_slot(&self.slot).closed = true;
    }
}

/// Sampler half of [`latest_frame_slot`]: always the newest published frame.
pub struct LatestFrameSource {
    slot: SharedSlot,
    latest: Option<RgbaImage>,
    disconnected: bool,
}

impl LatestFrameSource {
    /// Whether the producer has gone away. The last frame stays sampleable.
    pub fn is_disconnected(&self) -> bool {
        self.disconnected
    }

    fn refresh(&mut self) {
        let (frame, closed) = {
            let mut state = lock_slot(&self.slot);
            (state.pending.take(), state.closed)
        };
        if let Some(frame) = frame {
            if self.latest.is_none() {
                debug!(
                    width = frame.width(),
                    height = frame.height(),
                    "first source frame arrived"
                );
            }
            self.latest = Some(frame);
        }
        if closed && !self.disconnected {
            debug!("frame producer disconnected");
            self.disconnected = true;
        }
    }
}

impl FrameSource for LatestFrameSource {
    fn sample(&mut self, width: u32, height: u32) -> RasterFrame {
        self.refresh();
        match &self.latest {
            Some(image) => RasterFrame::resampled(image, width, height),
            None => RasterFrame::blank(width, height),
        }
    }

    fn has_frame(&self) -> bool {
        self.latest.is_some()
    }

    fn is_exhausted(&self) -> bool {
        self.disconnected
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FfmpegSourceConfig {
    /// File path or device name passed to `ffmpeg -i`.
    pub input: String,
    /// Optional demuxer, e.g. `v4l2` or `avfoundation` for cameras.
    pub format: Option<String>,
    pub width: u32,
    pub height: u32,
    /// Read file inputs at their native frame rate.
    pub realtime: bool,
}

impl Default for FfmpegSourceConfig {
    fn default() -> Self {
        Self {
            input: String::new(),
            format: None,
            width: DEFAULT_CAPTURE_WIDTH,
            height: DEFAULT_CAPTURE_HEIGHT,
            realtime: true,
        }
    }
}

impl FfmpegSourceConfig {
    pub fn ffmpeg_args(&self) -> Vec<String> {
        let mut args = vec![
            "-hide_banner".to_owned(),
            "-loglevel".to_owned(),
            "error".to_owned(),
        ];
        if self.realtime {
            args.push("-re".to_owned());
        }
        if let Some(format) = &self.format {
            args.push("-f".to_owned());
            args.push(format.clone());
        }
        args.extend([
            "-i".to_owned(),
            self.input.clone(),
            "-f".to_owned(),
            "rawvideo".to_owned(),
            "-pix_fmt".to_owned(),
            "rgba".to_owned(),
            "-s".to_owned(),
            format!("{}x{}", self.width, self.height),
            "-sws_flags".to_owned(),
            "area".to_owned(),
            "-".to_owned(),
        ]);
        args
    }
}

/// Camera or video file decoded by an `ffmpeg` child process.
pub struct FfmpegSource {
    frames: LatestFrameSource,
    worker: Option<JoinHandle<GlyphcamResult<()>>>,
    child: Child,
}

impl FfmpegSource {
    pub fn spawn(config: &FfmpegSourceConfig) -> GlyphcamResult<Self> {
        if config.input.trim().is_empty() {
            return Err(GlyphcamError::config("ffmpeg source needs an input"));
        }
        if config.width == 0 || config.height == 0 {
            return Err(GlyphcamError::config(format!(
                "capture size must be positive, got {}x{}",
                config.width, config.height
            )));
        }

        let (publisher, frames) = latest_frame_slot();
        let mut child = Command::new("ffmpeg")
            .args(config.ffmpeg_args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|error| GlyphcamError::source(format!("failed to spawn ffmpeg: {error}")))?;

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| GlyphcamError::source("failed to capture ffmpeg stdout"))?;
        let (width, height) = (config.width, config.height);
        let frame_size = width as usize * height as usize * 4;

        let worker = thread::Builder::new()
            .name("glyphcam-ffmpeg-decoder".to_owned())
            .spawn(move || {
                loop {
                    let mut buffer = vec![0u8; frame_size];
                    match stdout.read_exact(&mut buffer) {
                        Ok(()) => {}
                        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
                        Err(e) => {
                            return Err(GlyphcamError::source(format!(
                                "failed to read from ffmpeg: {e}"
                            )))
                        }
                    }
                    let Some(image) = RgbaImage::from_raw(width, height, buffer) else {
                        return Err(GlyphcamError::source("ffmpeg frame size mismatch"));
                    };
                    publisher.publish(image);
                }
                Ok(())
            })
            .map_err(|error| {
                GlyphcamError::source(format!("failed to spawn ffmpeg reader thread: {error}"))
            })?;

        info!(input = %config.input, width, height, "ffmpeg source started");
        Ok(Self {
            frames,
            worker: Some(worker),
            child,
        })
    }

    pub fn finish(mut self) -> GlyphcamResult<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> GlyphcamResult<()> {
        let _ = self.child.kill();
        let _ = self.child.wait();

        match self.worker.take() {
            Some(handle) => match handle.join() {
                Ok(result) => result,
                Err(_) => Err(GlyphcamError::source("ffmpeg reader thread panicked")),
            },
            None => Ok(()),
        }
    }
}

impl FrameSource for FfmpegSource {
    fn sample(&mut self, width: u32, height: u32) -> RasterFrame {
        self.frames.sample(width, height)
    }

    fn has_frame(&self) -> bool {
        self.frames.has_frame()
    }

    fn is_exhausted(&self) -> bool {
        self.frames.is_exhausted()
    }
}

impl Drop for FfmpegSource {
    fn drop(&mut self) {
        if self.worker.is_some() {
            if let Err(error) = self.shutdown() {
                warn!("ffmpeg source shutdown: {error}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn gray(level: u8) -> RgbaImage {
        RgbaImage::from_pixel(2, 2, Rgba([level, level, level, 255]))
    }

    #[test]
    fn latest_source_is_blank_until_first_frame() {
        let (_publisher, mut source) = latest_frame_slot();
        assert!(!source.has_frame());
        assert_eq!(source.sample(4, 3), RasterFrame::blank(4, 3));
    }

    #[test]
    fn latest_source_keeps_newest_and_reuses_it() {
        let (publisher, mut source) = latest_frame_slot();
        publisher.publish(gray(10));
        publisher.publish(gray(90));

        let first = source.sample(2, 2);
        assert_eq!(first.pixel(0, 0), Some([90, 90, 90, 255]));

        // Nothing new arrived: same frame again, no blocking.
        let second = source.sample(2, 2);
        assert_eq!(first, second);

        drop(publisher);
        let third = source.sample(2, 2);
        assert!(source.is_disconnected());
        assert!(source.is_exhausted());
        assert_eq!(third, first);
    }

    #[test]
    fn burst_between_samples_serves_the_last_frame() {
        let (publisher, mut source) = latest_frame_slot();
        publisher.publish(gray(1));
        assert_eq!(source.sample(2, 2).pixel(0, 0), Some([1, 1, 1, 255]));

        for level in 2..=30 {
            publisher.publish(gray(level));
        }
        assert_eq!(source.sample(2, 2).pixel(0, 0), Some([30, 30, 30, 255]));
    }

    #[test]
    fn frame_published_before_close_is_still_delivered() {
        let (publisher, mut source) = latest_frame_slot();
        let producer = thread::spawn(move || {
            for level in 1..=12 {
                publisher.publish(gray(level));
            }
        });
        producer.join().expect("producer thread");

        assert_eq!(source.sample(2, 2).pixel(0, 0), Some([12, 12, 12, 255]));
        assert!(source.is_exhausted());
    }

    #[test]
    fn still_source_wraps_an_existing_frame() {
        let frame = RasterFrame::solid(30, 20, [40, 80, 120, 255]);
        let mut source = StillSource::from_frame(&frame).expect("still source");
        assert!(source.has_frame());

        let palette = crate::palette::extract_from_source(&mut source);
        assert!(palette.to_hex_strings().iter().all(|hex| hex == "#285078"));
    }

    #[test]
    fn undecodable_upload_is_an_explicit_error() {
        let err = StillSource::from_bytes(b"definitely not a png").expect_err("decode should fail");
        assert!(matches!(err, GlyphcamError::ImageLoad(_)));
    }

    #[test]
    fn ffmpeg_args_place_format_before_input() {
        let config = FfmpegSourceConfig {
            input: "/dev/video0".to_owned(),
            format: Some("v4l2".to_owned()),
            realtime: false,
            ..FfmpegSourceConfig::default()
        };
        let args = config.ffmpeg_args();
        let format_at = args.iter().position(|a| a == "v4l2").expect("format");
        let input_at = args.iter().position(|a| a == "/dev/video0").expect("input");
        assert!(format_at < input_at);
        assert!(args.contains(&"640x480".to_owned()));
        assert!(!args.contains(&"-re".to_owned()));
    }

    #[test]
    fn spawn_rejects_empty_input() {
        let err = FfmpegSource::spawn(&FfmpegSourceConfig::default())
            .err()
            .expect("empty input should fail");
        assert!(matches!(err, GlyphcamError::Config(_)));
    }
}
