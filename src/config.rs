//! Session configuration: YAML file plus command-line overrides.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{GlyphcamError, GlyphcamResult};
use crate::filter::PixelFilter;
use crate::pipeline::{PixelSettings, DEFAULT_RESOLUTION};
use crate::scheduler::View;
use crate::source::FfmpegSourceConfig;

pub const DEFAULT_FPS: u32 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    pub filter: PixelFilter,
    pub resolution: u32,
    pub fps: u32,
    pub view: View,
    /// Fixed seed for the noisy filters; clock-seeded when absent.
    pub seed: Option<u64>,
    pub source: Option<FfmpegSourceConfig>,
    /// Stop after this many ticks; run until interrupted when absent.
    pub frames: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            filter: PixelFilter::None,
            resolution: DEFAULT_RESOLUTION,
            fps: DEFAULT_FPS,
            view: View::Pixel,
            seed: None,
            source: None,
            frames: None,
        }
    }
}

impl SessionConfig {
    pub fn from_yaml(contents: &str) -> GlyphcamResult<Self> {
        let config: Self = serde_yaml::from_str(contents).map_err(|error| {
            let location = error
                .location()
                .map(|location| format!("line {}, column {}", location.line(), location.column()))
                .unwrap_or_else(|| "unknown location".to_owned());
            GlyphcamError::config(format!("failed to parse yaml at {location}: {error}"))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> GlyphcamResult<()> {
        if self.resolution == 0 {
            return Err(GlyphcamError::config("resolution must be at least 1"));
        }
        if self.fps == 0 {
            return Err(GlyphcamError::config("fps must be at least 1"));
        }
        if let Some(source) = &self.source {
            if source.width == 0 || source.height == 0 {
                return Err(GlyphcamError::config(format!(
                    "source capture size must be positive, got {}x{}",
                    source.width, source.height
                )));
            }
        }
        Ok(())
    }

    pub fn pixel_settings(&self) -> PixelSettings {
        PixelSettings {
            filter: self.filter,
            resolution: self.resolution,
        }
    }
}

/// Read a session file. Relative source inputs that exist next to the file
/// are resolved against its directory; anything else (device names, URLs
/// understood by ffmpeg) is kept verbatim.
pub fn load_and_validate_config(path: &Path) -> GlyphcamResult<SessionConfig> {
    let contents = fs::read_to_string(path).map_err(|error| {
        GlyphcamError::config(format!("failed to read config {}: {error}", path.display()))
    })?;
    let mut config = SessionConfig::from_yaml(&contents)
        .map_err(|error| GlyphcamError::config(format!("{}: {error}", path.display())))?;

    let config_dir = path
        .parent()
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    if let Some(source) = &mut config.source {
        let input = Path::new(&source.input);
        if !input.is_absolute() {
            let candidate = config_dir.join(input);
            if candidate.is_file() {
                source.input = candidate.display().to_string();
            }
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = SessionConfig::from_yaml("{}").expect("config should parse");
        assert_eq!(config, SessionConfig::default());
        assert_eq!(config.resolution, 8);
        assert_eq!(config.view, View::Pixel);
    }

    #[test]
    fn full_document_round_trips_fields() {
        let config = SessionConfig::from_yaml(
            r#"
filter: gameboy
resolution: 16
fps: 24
view: ascii
seed: 9
frames: 120
source:
  input: /dev/video0
  format: v4l2
  width: 320
  height: 240
"#,
        )
        .expect("config should parse");
        assert_eq!(config.filter, PixelFilter::GameBoy);
        assert_eq!(config.view, View::Ascii);
        assert_eq!(config.frames, Some(120));
        let source = config.source.expect("source");
        assert_eq!(source.format.as_deref(), Some("v4l2"));
        assert!(source.realtime);
    }

    #[test]
    fn unknown_filter_is_passthrough_not_error() {
        let config = SessionConfig::from_yaml("filter: thermal").expect("config should parse");
        assert_eq!(config.filter, PixelFilter::None);
    }

    #[test]
    fn invalid_values_are_config_errors() {
        for yaml in ["resolution: 0", "fps: 0", "colour: red"] {
            let err = SessionConfig::from_yaml(yaml).expect_err("config should fail");
            assert!(matches!(err, GlyphcamError::Config(_)), "{yaml}");
        }
    }

    #[test]
    fn relative_source_resolves_next_to_config() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("clip.mp4"), b"").expect("write clip");
        let path = dir.path().join("session.yaml");
        fs::write(&path, "source:\n  input: clip.mp4\n").expect("write config");

        let config = load_and_validate_config(&path).expect("config should load");
        let input = config.source.expect("source").input;
        assert_eq!(Path::new(&input), dir.path().join("clip.mp4"));
    }
}
