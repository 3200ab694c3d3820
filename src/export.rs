//! Snapshot export
//!
//! Snapshots are plain RGBA8 rasters. Saving writes a PNG whose name is
//! derived from the encoded content so exports of different codes do not
//! collide.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::EngineError;
use crate::gfx::resources::fallback;

pub type RasterImage = image::RgbaImage;

const MAX_NAME_CHARS: usize = 32;

/// Image returned by an export while 3D rendering is unavailable.
pub fn degraded_placeholder(width: u32, height: u32) -> RasterImage {
    fallback::placeholder(width, height, fallback::NO_PREVIEW_LABEL)
}

/// `code3d-<content>-<unix secs>.png` with the content reduced to at most
/// 32 filename-safe characters.
pub fn snapshot_file_name(content: &str, unix_secs: u64) -> String {
    let mut slug = String::new();
    for ch in content.chars() {
        if slug.chars().count() >= MAX_NAME_CHARS {
            break;
        }
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-');
    let slug = if slug.is_empty() { "code" } else { slug };
    format!("code3d-{slug}-{unix_secs}.png")
}

/// Writes `image` as PNG into `dir` and returns the path.
pub fn save_snapshot(image: &RasterImage, dir: &Path, content: &str) -> Result<PathBuf, EngineError> {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let path = dir.join(snapshot_file_name(content, secs));
    image
        .save_with_format(&path, image::ImageFormat::Png)
        .map_err(|err| EngineError::Export(format!("{}: {err}", path.display())))?;
    log::info!("snapshot saved to {}", path.display());
    Ok(path)
}
