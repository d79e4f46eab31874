//! Body keypoints as reported by the pose model.
//!
//! Joint identifiers follow the 18-point body topology used by the
//! `resnet18-body` family of pose networks: the 17 COCO joints in COCO order
//! plus a synthetic neck point at id 17.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Enumerated body joint label.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "JointRepr", into = "String")]
pub enum JointId {
    Nose,
    LeftEye,
    RightEye,
    LeftEar,
    RightEar,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
    Neck,
}

impl JointId {
    pub const ALL: [JointId; 18] = [
        JointId::Nose,
        JointId::LeftEye,
        JointId::RightEye,
        JointId::LeftEar,
        JointId::RightEar,
        JointId::LeftShoulder,
        JointId::RightShoulder,
        JointId::LeftElbow,
        JointId::RightElbow,
        JointId::LeftWrist,
        JointId::RightWrist,
        JointId::LeftHip,
        JointId::RightHip,
        JointId::LeftKnee,
        JointId::RightKnee,
        JointId::LeftAnkle,
        JointId::RightAnkle,
        JointId::Neck,
    ];

    /// Numeric id as emitted by the pose network.
    pub fn id(self) -> u32 {
        self as u32
    }

    pub fn from_id(id: u32) -> Result<Self> {
        Self::ALL
            .get(id as usize)
            .copied()
            .ok_or_else(|| anyhow!("unknown joint id {}", id))
    }

    pub fn name(self) -> &'static str {
        match self {
            JointId::Nose => "nose",
            JointId::LeftEye => "left_eye",
            JointId::RightEye => "right_eye",
            JointId::LeftEar => "left_ear",
            JointId::RightEar => "right_ear",
            JointId::LeftShoulder => "left_shoulder",
            JointId::RightShoulder => "right_shoulder",
            JointId::LeftElbow => "left_elbow",
            JointId::RightElbow => "right_elbow",
            JointId::LeftWrist => "left_wrist",
            JointId::RightWrist => "right_wrist",
            JointId::LeftHip => "left_hip",
            JointId::RightHip => "right_hip",
            JointId::LeftKnee => "left_knee",
            JointId::RightKnee => "right_knee",
            JointId::LeftAnkle => "left_ankle",
            JointId::RightAnkle => "right_ankle",
            JointId::Neck => "neck",
        }
    }

    pub fn from_name(name: &str) -> Result<Self> {
        let normalized = name.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .iter()
            .copied()
            .find(|joint| joint.name() == normalized)
            .ok_or_else(|| anyhow!("unknown joint name '{}'", name))
    }
}

impl fmt::Display for JointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<JointId> for String {
    fn from(joint: JointId) -> Self {
        joint.name().to_string()
    }
}

/// Joints may be written either by numeric id or by name.
#[derive(Deserialize)]
#[serde(untagged)]
enum JointRepr {
    Id(u32),
    Name(String),
}

impl TryFrom<JointRepr> for JointId {
    type Error = anyhow::Error;

    fn try_from(repr: JointRepr) -> Result<Self> {
        match repr {
            JointRepr::Id(id) => JointId::from_id(id),
            JointRepr::Name(name) => JointId::from_name(&name),
        }
    }
}

/// Pairs of joints drawn as skeleton links in overlays.
pub const SKELETON_LINKS: [(JointId, JointId); 20] = [
    (JointId::Nose, JointId::LeftEye),
    (JointId::Nose, JointId::RightEye),
    (JointId::LeftEye, JointId::LeftEar),
    (JointId::RightEye, JointId::RightEar),
    (JointId::LeftEye, JointId::RightEye),
    (JointId::Nose, JointId::Neck),
    (JointId::Neck, JointId::LeftShoulder),
    (JointId::Neck, JointId::RightShoulder),
    (JointId::LeftShoulder, JointId::RightShoulder),
    (JointId::LeftShoulder, JointId::LeftElbow),
    (JointId::RightShoulder, JointId::RightElbow),
    (JointId::LeftElbow, JointId::LeftWrist),
    (JointId::RightElbow, JointId::RightWrist),
    (JointId::LeftShoulder, JointId::LeftHip),
    (JointId::RightShoulder, JointId::RightHip),
    (JointId::LeftHip, JointId::RightHip),
    (JointId::LeftHip, JointId::LeftKnee),
    (JointId::RightHip, JointId::RightKnee),
    (JointId::LeftKnee, JointId::LeftAnkle),
    (JointId::RightKnee, JointId::RightAnkle),
];

/// A single detected joint in image pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub joint: JointId,
    pub x: f32,
    pub y: f32,
    #[serde(default = "default_confidence")]
    pub confidence: f32,
}

fn default_confidence() -> f32 {
    1.0
}

impl Keypoint {
    pub fn new(joint: JointId, x: f32, y: f32, confidence: f32) -> Self {
        Self {
            joint,
            x,
            y,
            confidence,
        }
    }
}

/// One detected person. Not every joint is necessarily present.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub keypoints: Vec<Keypoint>,
}

impl Person {
    pub fn new(keypoints: Vec<Keypoint>) -> Self {
        Self { keypoints }
    }

    /// First keypoint carrying the given joint label.
    pub fn find(&self, joint: JointId) -> Option<&Keypoint> {
        self.keypoints.iter().find(|kp| kp.joint == joint)
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }

    /// Drops keypoints below `min_confidence`. Used by backends, never by the classifier.
    pub fn retain_confident(&mut self, min_confidence: f32) {
        self.keypoints.retain(|kp| kp.confidence >= min_confidence);
    }
}
