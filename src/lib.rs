pub mod compositor;
pub mod config;
pub mod error;
pub mod export;
pub mod filter;
pub mod glyph;
pub mod glyph_atlas;
pub mod noise;
pub mod palette;
pub mod pipeline;
pub mod raster;
pub mod scheduler;
pub mod source;

pub use error::{GlyphcamError, GlyphcamResult};
pub use filter::PixelFilter;
pub use raster::RasterFrame;
pub use scheduler::{Scheduler, View};
pub use source::FrameSource;
