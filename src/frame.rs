//! Frames flowing through the pipeline.
//!
//! A `Frame` owns an RGB8 image plus its position in the stream. Pose
//! backends read the pixels; the overlay renderer draws into them before the
//! frame is handed to the output sinks.

use image::RgbImage;

#[derive(Clone, Debug)]
pub struct Frame {
    /// Zero-based position in the source stream (always 0 for still images).
    pub index: u64,
    image: RgbImage,
}

impl Frame {
    pub fn new(index: u64, image: RgbImage) -> Self {
        Self { index, image }
    }

    /// Solid-color frame.
    pub fn filled(index: u64, width: u32, height: u32, rgb: [u8; 3]) -> Self {
        Self {
            index,
            image: RgbImage::from_pixel(width, height, image::Rgb(rgb)),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn image_mut(&mut self) -> &mut RgbImage {
        &mut self.image
    }
}
