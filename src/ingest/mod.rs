//! Frame acquisition.
//!
//! - `load_image`: a single still image (single-image mode)
//! - `VideoSource`: a stream of frames (synthetic `stub://`, image sequences)
//!
//! Sources only produce frames. They never run pose estimation or write
//! anything to disk.

pub mod image;
pub mod video;

pub use self::image::load_image;
pub use video::{SourceConfig, SourceStats, VideoSource};
