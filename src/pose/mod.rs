//! Pose-estimation boundary.
//!
//! The pose model is an external collaborator: a backend turns a frame into a
//! list of `Person`s. Minimum-confidence filtering happens here, inside the
//! backends; the proximity classifier treats every reported keypoint as usable.

mod backend;
mod backends;
mod registry;

pub use backend::PoseBackend;
#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
pub use backends::{parse_pose_frames, standing_person, ReplayBackend, StubBackend};
pub use registry::BackendRegistry;
