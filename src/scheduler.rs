//! Fixed-cadence driver for the ASCII and pixel pipelines.
//!
//! Everything runs on the calling thread. Each pipeline is a task that can be
//! started and stopped on its own; [`Scheduler::set_visible`] starts the view
//! being shown and stops the other, so hidden views cost nothing. Stop handles
//! are plain shared flags and may be tripped from any thread (e.g. a Ctrl-C
//! handler); the scheduler notices them at the start of the next tick.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tiny_skia::Pixmap;
use tracing::{debug, info};

use crate::config::SessionConfig;
use crate::error::{GlyphcamError, GlyphcamResult};
use crate::pipeline::{AsciiPipeline, PixelPipeline, PixelSettings};
use crate::source::FrameSource;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum View {
    Ascii,
    #[default]
    Pixel,
}

impl View {
    pub fn other(self) -> Self {
        match self {
            Self::Ascii => Self::Pixel,
            Self::Pixel => Self::Ascii,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Ascii => "ascii",
            Self::Pixel => "pixel",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    fn rearm(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Receives each surface a running pipeline produced this tick.
pub trait SurfaceSink {
    fn present(&mut self, view: View, surface: &Pixmap) -> GlyphcamResult<()>;
}

/// Keeps a copy of the most recent surface per view.
#[derive(Default)]
pub struct LatestSurfaces {
    ascii: Option<Pixmap>,
    pixel: Option<Pixmap>,
}

impl LatestSurfaces {
    pub fn get(&self, view: View) -> Option<&Pixmap> {
        match view {
            View::Ascii => self.ascii.as_ref(),
            View::Pixel => self.pixel.as_ref(),
        }
    }
}

impl SurfaceSink for LatestSurfaces {
    fn present(&mut self, view: View, surface: &Pixmap) -> GlyphcamResult<()> {
        let slot = match view {
            View::Ascii => &mut self.ascii,
            View::Pixel => &mut self.pixel,
        };
        *slot = Some(surface.clone());
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub ascii: bool,
    pub pixel: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub ascii_frames: u64,
    pub pixel_frames: u64,
    pub overruns: u64,
}

#[derive(Debug, Default)]
struct Task {
    running: bool,
    stop: StopHandle,
}

pub struct Scheduler {
    ascii: AsciiPipeline,
    pixel: PixelPipeline,
    ascii_task: Task,
    pixel_task: Task,
    settings: PixelSettings,
    interval: Duration,
    session_stop: StopHandle,
    source_ready: bool,
}

impl Scheduler {
    pub fn new(pixel: PixelPipeline, fps: u32) -> GlyphcamResult<Self> {
        Ok(Self {
            ascii: AsciiPipeline::new(),
            pixel,
            ascii_task: Task::default(),
            pixel_task: Task::default(),
            settings: PixelSettings::default(),
            interval: frame_interval(fps)?,
            session_stop: StopHandle::default(),
            source_ready: false,
        })
    }

    /// Build from a session config with its view already visible.
    pub fn from_config(config: &SessionConfig) -> GlyphcamResult<Self> {
        config.validate()?;
        let mut scheduler = Self::new(PixelPipeline::new(config.seed)?, config.fps)?;
        *scheduler.settings_mut() = config.pixel_settings();
        scheduler.set_visible(config.view);
        Ok(scheduler)
    }

    pub fn start(&mut self, view: View) {
        let task = self.task_mut(view);
        task.stop.rearm();
        if !task.running {
            task.running = true;
            info!(view = view.label(), "pipeline started");
        }
    }

    pub fn stop(&mut self, view: View) {
        let task = self.task_mut(view);
        task.stop.stop();
        if !task.running {
            return;
        }
        task.running = false;
        info!(view = view.label(), "pipeline stopped");
        if view == View::Pixel {
            self.pixel.reset();
        }
    }

    pub fn is_running(&self, view: View) -> bool {
        self.task(view).running
    }

    /// Start `view` and stop the other one.
    pub fn set_visible(&mut self, view: View) {
        self.stop(view.other());
        self.start(view);
    }

    pub fn stop_handle(&self, view: View) -> StopHandle {
        self.task(view).stop.clone()
    }

    pub fn session_stop_handle(&self) -> StopHandle {
        self.session_stop.clone()
    }

    pub fn settings_mut(&mut self) -> &mut PixelSettings {
        &mut self.settings
    }

    pub fn ascii(&self) -> &AsciiPipeline {
        &self.ascii
    }

    pub fn pixel(&self) -> &PixelPipeline {
        &self.pixel
    }

    /// Run one frame of every running pipeline.
    pub fn tick(
        &mut self,
        source: &mut dyn FrameSource,
        sink: &mut dyn SurfaceSink,
    ) -> GlyphcamResult<TickReport> {
        self.honor_stop_requests();
        let mut report = TickReport::default();

        if self.ascii_task.running {
            let surface = self.ascii.tick(source)?;
            sink.present(View::Ascii, surface)?;
            report.ascii = true;
        }

        if self.pixel_task.running {
            let surface = self.pixel.tick(source, self.settings)?;
            sink.present(View::Pixel, surface)?;
            report.pixel = true;
        }

        if !self.source_ready && source.has_frame() {
            self.source_ready = true;
            info!("source ready");
        }

        Ok(report)
    }

    /// Tick at the configured cadence until the session stop handle trips,
    /// both pipelines are stopped, the source runs dry, or `max_ticks` frames
    /// have run.
    pub fn run(
        &mut self,
        source: &mut dyn FrameSource,
        sink: &mut dyn SurfaceSink,
        max_ticks: Option<u64>,
    ) -> GlyphcamResult<RunSummary> {
        let mut summary = RunSummary::default();
        let mut next_tick_at = Instant::now();

        loop {
            if self.session_stop.is_stopped() {
                info!("session stop requested");
                break;
            }
            if max_ticks.is_some_and(|max| summary.ticks >= max) {
                break;
            }
            self.honor_stop_requests();
            if !self.ascii_task.running && !self.pixel_task.running {
                info!("no pipeline running, leaving render loop");
                break;
            }

            let report = self.tick(source, sink)?;
            summary.ticks += 1;
            summary.ascii_frames += u64::from(report.ascii);
            summary.pixel_frames += u64::from(report.pixel);
            if source.is_exhausted() {
                info!("source exhausted, leaving render loop");
                break;
            }

            next_tick_at += self.interval;
            let now = Instant::now();
            if next_tick_at > now {
                thread::sleep(next_tick_at - now);
            } else {
                summary.overruns += 1;
                debug!(
                    behind_ms = (now - next_tick_at).as_secs_f64() * 1000.0,
                    "tick overran its frame budget"
                );
                next_tick_at = now;
            }
        }

        info!(
            ticks = summary.ticks,
            ascii_frames = summary.ascii_frames,
            pixel_frames = summary.pixel_frames,
            overruns = summary.overruns,
            "render loop finished"
        );
        Ok(summary)
    }

    fn honor_stop_requests(&mut self) {
        for view in [View::Ascii, View::Pixel] {
            let task = self.task(view);
            if task.running && task.stop.is_stopped() {
                self.stop(view);
            }
        }
    }

    fn task(&self, view: View) -> &Task {
        match view {
            View::Ascii => &self.ascii_task,
            View::Pixel => &self.pixel_task,
        }
    }

    fn task_mut(&mut self, view: View) -> &mut Task {
        match view {
            View::Ascii => &mut self.ascii_task,
            View::Pixel => &mut self.pixel_task,
        }
    }
}

pub fn frame_interval(fps: u32) -> GlyphcamResult<Duration> {
    if fps == 0 {
        return Err(GlyphcamError::config("fps must be at least 1"));
    }
    Ok(Duration::from_secs_f64(1.0 / fps as f64))
}
