pub mod replay;
pub mod stub;

#[cfg(feature = "backend-tract")]
pub mod tract;

pub use replay::{parse_pose_frames, ReplayBackend};
pub use stub::{standing_person, StubBackend};

#[cfg(feature = "backend-tract")]
pub use tract::TractBackend;
