use anyhow::Result;

use crate::frame::Frame;
use crate::keypoint::{JointId, Keypoint, Person};
use crate::pose::backend::PoseBackend;

/// Frames per approach/retreat cycle of the synthetic scene.
const CYCLE_FRAMES: u64 = 60;

/// Joint offsets relative to the hip midpoint, as fractions of body height.
const BODY_LAYOUT: [(JointId, f32, f32); 18] = [
    (JointId::Nose, 0.0, -0.45),
    (JointId::LeftEye, 0.03, -0.5),
    (JointId::RightEye, -0.03, -0.5),
    (JointId::LeftEar, 0.06, -0.48),
    (JointId::RightEar, -0.06, -0.48),
    (JointId::LeftShoulder, 0.12, -0.33),
    (JointId::RightShoulder, -0.12, -0.33),
    (JointId::LeftElbow, 0.15, -0.18),
    (JointId::RightElbow, -0.15, -0.18),
    (JointId::LeftWrist, 0.16, -0.03),
    (JointId::RightWrist, -0.16, -0.03),
    (JointId::LeftHip, 0.08, 0.0),
    (JointId::RightHip, -0.08, 0.0),
    (JointId::LeftKnee, 0.08, 0.25),
    (JointId::RightKnee, -0.08, 0.25),
    (JointId::LeftAnkle, 0.08, 0.5),
    (JointId::RightAnkle, -0.08, 0.5),
    (JointId::Neck, 0.0, -0.35),
];

/// Upright person with all 18 joints, hip midpoint at `(cx, hip_y)` and a
/// vertical keypoint span of exactly `height`.
pub fn standing_person(cx: f32, hip_y: f32, height: f32) -> Person {
    Person::new(
        BODY_LAYOUT
            .iter()
            .map(|&(joint, dx, dy)| {
                Keypoint::new(joint, cx + dx * height, hip_y + dy * height, 0.9)
            })
            .collect(),
    )
}

/// Stub backend for demos and tests.
///
/// Ignores pixel content and reports two people who walk toward each other
/// and apart again over a fixed cycle, so the verdict alternates between
/// SAFE and VIOLATION on any frame source.
#[derive(Default)]
pub struct StubBackend;

impl StubBackend {
    pub fn new() -> Self {
        Self
    }

    /// Scene phase in `[0, 1]`: 0 = farthest apart, 1 = closest.
    fn phase(index: u64) -> f32 {
        let t = (index % CYCLE_FRAMES) as f32 / (CYCLE_FRAMES - 1) as f32;
        1.0 - (2.0 * t - 1.0).abs()
    }
}

impl PoseBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn estimate(&mut self, frame: &Frame) -> Result<Vec<Person>> {
        let width = frame.width() as f32;
        let height = frame.height() as f32;
        let body = height * 0.6;
        let hip_y = height * 0.55;
        let p = Self::phase(frame.index);

        Ok(vec![
            standing_person(width * (0.15 + 0.3 * p), hip_y, body),
            standing_person(width * (0.85 - 0.3 * p), hip_y, body),
        ])
    }
}
