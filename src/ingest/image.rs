//! Still-image loading.

use anyhow::{Context, Result};
use std::path::Path;

use crate::frame::Frame;

/// Load an image file from disk as frame 0.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<Frame> {
    let path = path.as_ref();
    let image = image::open(path)
        .with_context(|| format!("failed to load image {}", path.display()))?
        .to_rgb8();
    log::info!(
        "loaded image {} ({}x{})",
        path.display(),
        image.width(),
        image.height()
    );
    Ok(Frame::new(0, image))
}
