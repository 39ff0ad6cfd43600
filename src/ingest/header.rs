//! Declared dimensions of uploaded images, read from the file header.

use std::path::Path;

use image::ImageReader;
use tracing::{trace, warn};

/// Reads an image's dimensions without decoding its pixels.
///
/// Returns `None` for unreadable files, unknown formats, and zero-sized
/// images, so the caller can substitute its defaults.
pub fn read_dimensions(path: &Path) -> Option<(u32, u32)> {
    let reader = match ImageReader::open(path).and_then(|r| r.with_guessed_format()) {
        Ok(reader) => reader,
        Err(e) => {
            warn!(?path, error = %e, "Failed to open upload");
            return None;
        }
    };

    match reader.into_dimensions() {
        Ok((w, h)) if w > 0 && h > 0 => {
            trace!(?path, w, h, "Read upload dimensions");
            Some((w, h))
        }
        Ok(_) => None,
        Err(e) => {
            warn!(?path, error = %e, "Failed to read upload dimensions");
            None
        }
    }
}
