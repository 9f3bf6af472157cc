use crate::raster::RasterError;

pub type GlyphcamResult<T> = Result<T, GlyphcamError>;

#[derive(thiserror::Error, Debug)]
pub enum GlyphcamError {
    #[error("image load error: {0}")]
    ImageLoad(String),

    #[error("encode error: {0}")]
    Encode(String),

    #[error("source error: {0}")]
    Source(String),

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Raster(#[from] RasterError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GlyphcamError {
    pub fn image_load(msg: impl Into<String>) -> Self {
        Self::ImageLoad(msg.into())
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    pub fn source(msg: impl Into<String>) -> Self {
        Self::Source(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
