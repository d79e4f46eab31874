//! Streaming frame source.
//!
//! `VideoSource` yields frames in order until the stream ends. Supported inputs:
//! - `stub://<name>`: synthetic frames, endless unless `max_frames` is set
//! - a directory of image files: a recorded clip exported as a frame sequence,
//!   played back in file-name order
//! - a single image file: a one-frame stream
//!
//! Camera devices and network streams (`/dev/video0`, `csi://`, `rtsp://`)
//! need a capture backend that is not part of this crate; they are rejected
//! with an error at construction.

use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};

use crate::frame::Frame;

const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Configuration for a streaming source.
#[derive(Clone, Debug)]
pub struct SourceConfig {
    /// Input URI or local path.
    pub uri: String,
    /// Frame width (synthetic frames only).
    pub width: u32,
    /// Frame height (synthetic frames only).
    pub height: u32,
    /// Stop after this many frames.
    pub max_frames: Option<u64>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            uri: "stub://camera".to_string(),
            width: 640,
            height: 480,
            max_frames: None,
        }
    }
}

/// Streaming frame source.
pub struct VideoSource {
    backend: SourceBackend,
    uri: String,
    max_frames: Option<u64>,
    frames_captured: u64,
    streaming: bool,
}

enum SourceBackend {
    Synthetic(SyntheticSource),
    Sequence(SequenceSource),
}

impl VideoSource {
    pub fn new(config: SourceConfig) -> Result<Self> {
        let backend = if config.uri.starts_with("stub://") {
            SourceBackend::Synthetic(SyntheticSource {
                width: config.width,
                height: config.height,
            })
        } else if config.uri.contains("://") || config.uri.starts_with("/dev/") {
            return Err(anyhow!(
                "input '{}' needs a capture backend; use stub://, an image file, or a directory of frames",
                config.uri
            ));
        } else {
            SourceBackend::Sequence(SequenceSource::new(Path::new(&config.uri))?)
        };
        Ok(Self {
            backend,
            uri: config.uri,
            max_frames: config.max_frames,
            frames_captured: 0,
            streaming: false,
        })
    }

    /// Open the source. Must be called before `next_frame`.
    pub fn connect(&mut self) -> Result<()> {
        match &self.backend {
            SourceBackend::Synthetic(source) => log::info!(
                "VideoSource: connected to {} (synthetic {}x{})",
                self.uri,
                source.width,
                source.height
            ),
            SourceBackend::Sequence(source) => log::info!(
                "VideoSource: connected to {} ({} frame(s))",
                self.uri,
                source.files.len()
            ),
        }
        self.streaming = true;
        Ok(())
    }

    /// Capture the next frame. Returns `Ok(None)` once the stream has ended.
    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        if !self.streaming {
            return Ok(None);
        }
        if self
            .max_frames
            .is_some_and(|limit| self.frames_captured >= limit)
        {
            self.streaming = false;
            return Ok(None);
        }

        let index = self.frames_captured;
        let frame = match &mut self.backend {
            SourceBackend::Synthetic(source) => Some(source.frame(index)),
            SourceBackend::Sequence(source) => source.frame(index)?,
        };
        match frame {
            Some(frame) => {
                self.frames_captured += 1;
                Ok(Some(frame))
            }
            None => {
                self.streaming = false;
                Ok(None)
            }
        }
    }

    /// True until the stream ends or the frame limit is reached.
    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    pub fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frames_captured,
            uri: self.uri.clone(),
        }
    }
}

/// Statistics for a streaming source.
#[derive(Clone, Debug)]
pub struct SourceStats {
    pub frames_captured: u64,
    pub uri: String,
}

// ----------------------------------------------------------------------------
// Synthetic source (stub://)
// ----------------------------------------------------------------------------

struct SyntheticSource {
    width: u32,
    height: u32,
}

impl SyntheticSource {
    fn frame(&self, index: u64) -> Frame {
        let shade = 48 + (index % 32) as u8;
        let mut frame = Frame::filled(index, self.width, self.height, [shade, shade, shade]);
        // horizon line so overlays have something to sit on
        let horizon = self.height * 3 / 4;
        if horizon < self.height {
            for x in 0..self.width {
                frame
                    .image_mut()
                    .put_pixel(x, horizon, image::Rgb([90, 90, 90]));
            }
        }
        frame
    }
}

// ----------------------------------------------------------------------------
// Image sequence source
// ----------------------------------------------------------------------------

struct SequenceSource {
    files: Vec<PathBuf>,
}

impl SequenceSource {
    fn new(path: &Path) -> Result<Self> {
        if path.is_file() {
            return Ok(Self {
                files: vec![path.to_path_buf()],
            });
        }
        if !path.is_dir() {
            return Err(anyhow!("input {} does not exist", path.display()));
        }
        let mut files: Vec<PathBuf> = std::fs::read_dir(path)
            .with_context(|| format!("failed to list frames in {}", path.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && has_image_extension(p))
            .collect();
        files.sort();
        if files.is_empty() {
            return Err(anyhow!("no image frames found in {}", path.display()));
        }
        Ok(Self { files })
    }

    fn frame(&self, index: u64) -> Result<Option<Frame>> {
        let Some(path) = usize::try_from(index).ok().and_then(|i| self.files.get(i)) else {
            return Ok(None);
        };
        let image = image::open(path)
            .with_context(|| format!("failed to decode frame {}", path.display()))?
            .to_rgb8();
        Ok(Some(Frame::new(index, image)))
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}
