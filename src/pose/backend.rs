use anyhow::Result;

use crate::frame::Frame;
use crate::keypoint::Person;

/// Pose estimator backend.
///
/// Implementations receive each frame read-only, in stream order, and return
/// every person they detected. Coordinates are image pixels of the frame they
/// were given.
pub trait PoseBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Detect people in a frame.
    fn estimate(&mut self, frame: &Frame) -> Result<Vec<Person>>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
