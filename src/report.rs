//! Per-frame observability records.
//!
//! A `FrameReport` carries everything the classifier derived for one frame:
//! scored people with their centers and heights, every pair measurement, and
//! the verdict. It serializes to one JSON object per frame and is logged in a
//! human-readable form.

use serde::Serialize;

use crate::proximity::{CenterEstimate, ProximityReport, Thresholds, Verdict};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FrameReport {
    pub frame: u64,
    pub thresholds: Thresholds,
    #[serde(flatten)]
    pub proximity: ProximityReport,
}

impl FrameReport {
    pub fn new(frame: u64, thresholds: Thresholds, proximity: ProximityReport) -> Self {
        Self {
            frame,
            thresholds,
            proximity,
        }
    }

    pub fn verdict(&self) -> Verdict {
        self.proximity.verdict.verdict
    }

    pub fn people(&self) -> usize {
        self.proximity.verdict.people
    }

    /// Short status line, e.g. `VIOLATION | people=3`.
    pub fn status_line(&self) -> String {
        format!("{} | people={}", self.verdict(), self.people())
    }

    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Log the per-person and per-pair breakdown of a frame.
pub fn log_report(report: &FrameReport) {
    let proximity = &report.proximity;
    if proximity.verdict.people == 0 {
        log::info!("No people detected.");
        return;
    }

    log::info!("Person centers & heights (image coordinates):");
    for person in &proximity.people {
        let c = person.center.point();
        let method = match person.center {
            CenterEstimate::HipMidpoint(_) => "hips",
            CenterEstimate::Centroid(_) => "centroid",
        };
        log::info!(
            "  Person {}: center = ({:.2}, {:.2}) [{}], height ~ {:.2} px",
            person.index,
            c.x,
            c.y,
            method,
            person.height
        );
    }

    if !proximity.pairs.is_empty() {
        log::info!("Pairwise distances:");
    }
    for pair in &proximity.pairs {
        let norm = match pair.normalized {
            Some(ratio) => format!("{:.2}", ratio),
            None => "inf".to_string(),
        };
        log::info!(
            "  Person {} - Person {}: abs = {:.2} px, avg_height = {:.2} px, norm = {} => abs_violation={}, rel_violation={}",
            pair.first,
            pair.second,
            pair.distance_px,
            pair.average_height,
            norm,
            u8::from(pair.absolute_violation),
            u8::from(pair.relative_violation)
        );
    }

    log::info!(
        "Absolute threshold = {:.2} px, relative threshold = {:.2} (distance/height)",
        report.thresholds.absolute_px(),
        report.thresholds.relative()
    );
    match report.verdict() {
        Verdict::Violation => {
            log::warn!("=> TOO CLOSE DETECTED (at least one rule violated)")
        }
        Verdict::Safe => log::info!("=> SAFE (no pair closer than thresholds)"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::standing_person;
    use crate::proximity::classify;

    #[test]
    fn json_line_flattens_classifier_output() {
        let thresholds = Thresholds::default();
        let persons = vec![
            standing_person(0.0, 400.0, 800.0),
            standing_person(100.0, 400.0, 800.0),
        ];
        let report = FrameReport::new(4, thresholds, classify(&persons, &thresholds));
        assert_eq!(report.status_line(), "VIOLATION | people=2");

        let value: serde_json::Value =
            serde_json::from_str(&report.to_json_line().unwrap()).unwrap();
        assert_eq!(value["frame"], 4);
        assert_eq!(value["verdict"]["verdict"], "VIOLATION");
        assert_eq!(value["verdict"]["people"], 2);
        assert_eq!(value["people"][0]["center"]["method"], "hip_midpoint");
        assert_eq!(value["pairs"][0]["absolute_violation"], true);
        assert_eq!(value["thresholds"]["absolute_px"], 150.0);
    }

    #[test]
    fn zero_height_pair_serializes_null_ratio() {
        use crate::keypoint::{JointId, Keypoint, Person};
        let flat = |x: f32| Person::new(vec![Keypoint::new(JointId::Nose, x, 5.0, 1.0)]);
        let thresholds = Thresholds::default();
        let proximity = classify(&[flat(0.0), flat(500.0)], &thresholds);
        let report = FrameReport::new(0, thresholds, proximity);
        let value: serde_json::Value =
            serde_json::from_str(&report.to_json_line().unwrap()).unwrap();
        assert!(value["pairs"][0]["normalized"].is_null());
        assert_eq!(report.status_line(), "SAFE | people=2");
    }
}
