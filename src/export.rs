use std::fs;
use std::path::Path;

use tiny_skia::Pixmap;
use tracing::info;

use crate::error::{GlyphcamError, GlyphcamResult};

pub fn encode_png(surface: &Pixmap) -> GlyphcamResult<Vec<u8>> {
    surface
        .encode_png()
        .map_err(|error| GlyphcamError::encode(format!("failed to encode png: {error}")))
}

pub fn write_png(surface: &Pixmap, path: &Path) -> GlyphcamResult<()> {
    let bytes = encode_png(surface)?;
    write_bytes(path, &bytes)?;
    info!(
        path = %path.display(),
        width = surface.width(),
        height = surface.height(),
        "wrote png"
    );
    Ok(())
}

pub fn write_text(text: &str, path: &Path) -> GlyphcamResult<()> {
    write_bytes(path, text.as_bytes())?;
    info!(path = %path.display(), "wrote text");
    Ok(())
}

fn write_bytes(path: &Path, bytes: &[u8]) -> GlyphcamResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, bytes)?;
    Ok(())
}
