//! Replays pre-recorded pose detections.
//!
//! Accepted file layouts:
//! - a single JSON array of persons (one frame, e.g. detections for a still image)
//! - JSON lines, one array of persons per frame; blank lines are skipped
//!
//! Frame `n` of the stream receives the detections recorded for frame `n`.
//! Frames past the end of the recording have no people.

use anyhow::{anyhow, Context, Result};
use std::path::Path;

use crate::frame::Frame;
use crate::keypoint::Person;
use crate::pose::backend::PoseBackend;

pub struct ReplayBackend {
    frames: Vec<Vec<Person>>,
    min_confidence: f32,
    exhausted_logged: bool,
}

impl ReplayBackend {
    pub fn from_frames(frames: Vec<Vec<Person>>, min_confidence: f32) -> Self {
        Self {
            frames,
            min_confidence,
            exhausted_logged: false,
        }
    }

    pub fn from_path<P: AsRef<Path>>(path: P, min_confidence: f32) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read pose recording {}", path.display()))?;
        let frames = parse_pose_frames(&raw)
            .with_context(|| format!("invalid pose recording {}", path.display()))?;
        log::info!(
            "ReplayBackend: loaded {} recorded frame(s) from {}",
            frames.len(),
            path.display()
        );
        Ok(Self::from_frames(frames, min_confidence))
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl PoseBackend for ReplayBackend {
    fn name(&self) -> &'static str {
        "replay"
    }

    fn estimate(&mut self, frame: &Frame) -> Result<Vec<Person>> {
        let Some(recorded) = usize::try_from(frame.index)
            .ok()
            .and_then(|index| self.frames.get(index))
        else {
            if !self.exhausted_logged {
                log::warn!(
                    "ReplayBackend: recording has {} frame(s); frame {} onward has no detections",
                    self.frames.len(),
                    frame.index
                );
                self.exhausted_logged = true;
            }
            return Ok(Vec::new());
        };

        let mut people = recorded.clone();
        for person in &mut people {
            person.retain_confident(self.min_confidence);
        }
        Ok(people)
    }
}

/// Parse recorded detections into one `Vec<Person>` per frame.
pub fn parse_pose_frames(raw: &str) -> Result<Vec<Vec<Person>>> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    if let Ok(single) = serde_json::from_str::<Vec<Person>>(raw) {
        return Ok(vec![single]);
    }
    raw.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(lineno, line)| {
            serde_json::from_str::<Vec<Person>>(line)
                .map_err(|e| anyhow!("line {}: {}", lineno + 1, e))
        })
        .collect()
}
