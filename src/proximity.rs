//! Proximity classification of detected people.
//!
//! For every person a reference point (center) and a scale (pose height) are
//! derived from the keypoints. Every unordered pair of scorable people is then
//! checked against two thresholds:
//!
//! - an absolute pixel distance between centers, and
//! - a relative distance: pixel distance divided by the pair's average height,
//!   which stays meaningful when the camera zooms or people stand far away.
//!
//! A pair violating either threshold makes the whole frame a violation.
//!
//! Degenerate inputs never fail:
//! - a person without keypoints is excluded from every pair,
//! - a pair whose average height is zero never raises the relative flag.

use anyhow::{anyhow, Result};
use serde::Serialize;
use std::fmt;

use crate::keypoint::{JointId, Person};

pub const DEFAULT_DISTANCE_PX: f32 = 150.0;
pub const DEFAULT_REL_THRESHOLD: f32 = 0.7;

/// Validated classifier thresholds.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Thresholds {
    absolute_px: f32,
    relative: f32,
}

impl Thresholds {
    /// Both thresholds must be finite and strictly positive.
    pub fn new(absolute_px: f32, relative: f32) -> Result<Self> {
        if !absolute_px.is_finite() || absolute_px <= 0.0 {
            return Err(anyhow!(
                "absolute distance threshold must be a positive number of pixels (got {})",
                absolute_px
            ));
        }
        if !relative.is_finite() || relative <= 0.0 {
            return Err(anyhow!(
                "relative distance threshold must be a positive ratio (got {})",
                relative
            ));
        }
        Ok(Self {
            absolute_px,
            relative,
        })
    }

    pub fn absolute_px(&self) -> f32 {
        self.absolute_px
    }

    pub fn relative(&self) -> f32 {
        self.relative
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            absolute_px: DEFAULT_DISTANCE_PX,
            relative: DEFAULT_REL_THRESHOLD,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Person center, tagged with the branch that produced it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum CenterEstimate {
    /// Midpoint of the left and right hip keypoints.
    HipMidpoint(Point),
    /// Unweighted average of every keypoint present (at least one hip missing).
    Centroid(Point),
}

impl CenterEstimate {
    pub fn point(&self) -> Point {
        match *self {
            CenterEstimate::HipMidpoint(p) | CenterEstimate::Centroid(p) => p,
        }
    }
}

/// Computes the person center. Returns `None` for a person without keypoints.
pub fn estimate_center(person: &Person) -> Option<CenterEstimate> {
    if person.is_empty() {
        return None;
    }
    if let (Some(lh), Some(rh)) = (person.find(JointId::LeftHip), person.find(JointId::RightHip)) {
        return Some(CenterEstimate::HipMidpoint(Point::new(
            (lh.x + rh.x) / 2.0,
            (lh.y + rh.y) / 2.0,
        )));
    }
    let n = person.keypoints.len() as f32;
    let (sx, sy) = person
        .keypoints
        .iter()
        .fold((0.0f32, 0.0f32), |(sx, sy), kp| (sx + kp.x, sy + kp.y));
    Some(CenterEstimate::Centroid(Point::new(sx / n, sy / n)))
}

/// Vertical pixel span of the keypoints. Returns `None` for a person without keypoints.
pub fn estimate_height(person: &Person) -> Option<f32> {
    let mut ys = person.keypoints.iter().map(|kp| kp.y);
    let first = ys.next()?;
    let (min_y, max_y) = ys.fold((first, first), |(lo, hi), y| (lo.min(y), hi.max(y)));
    Some(max_y - min_y)
}

/// Derived attributes of one scorable person.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PersonMetrics {
    /// Position of the person in the detector output.
    pub index: usize,
    pub center: CenterEstimate,
    pub height: f32,
}

impl PersonMetrics {
    pub fn from_person(index: usize, person: &Person) -> Option<Self> {
        Some(Self {
            index,
            center: estimate_center(person)?,
            height: estimate_height(person)?,
        })
    }
}

/// Measurements for one unordered pair of people.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PairMeasurement {
    pub first: usize,
    pub second: usize,
    pub distance_px: f32,
    pub average_height: f32,
    /// `distance_px / average_height`; `None` when the average height is zero.
    pub normalized: Option<f32>,
    pub absolute_violation: bool,
    pub relative_violation: bool,
}

impl PairMeasurement {
    pub fn is_violation(&self) -> bool {
        self.absolute_violation || self.relative_violation
    }
}

/// Scores a pair. Order-independent apart from the reported indices.
pub fn measure_pair(
    a: &PersonMetrics,
    b: &PersonMetrics,
    thresholds: &Thresholds,
) -> PairMeasurement {
    let distance_px = a.center.point().distance(b.center.point());
    let average_height = (a.height + b.height) / 2.0;
    let normalized = if average_height > 0.0 {
        Some(distance_px / average_height)
    } else {
        None
    };
    PairMeasurement {
        first: a.index,
        second: b.index,
        distance_px,
        average_height,
        normalized,
        absolute_violation: distance_px < thresholds.absolute_px,
        relative_violation: normalized.is_some_and(|ratio| ratio < thresholds.relative),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Safe,
    Violation,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Safe => "SAFE",
            Verdict::Violation => "VIOLATION",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate result for one image or frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct FrameVerdict {
    pub verdict: Verdict,
    /// People reported by the detector, scorable or not.
    pub people: usize,
    /// People that took part in pairwise scoring.
    pub scorable: usize,
}

impl FrameVerdict {
    pub fn is_violation(&self) -> bool {
        self.verdict == Verdict::Violation
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProximityReport {
    pub people: Vec<PersonMetrics>,
    pub pairs: Vec<PairMeasurement>,
    pub verdict: FrameVerdict,
}

impl ProximityReport {
    pub fn violating_pairs(&self) -> impl Iterator<Item = &PairMeasurement> {
        self.pairs.iter().filter(|pair| pair.is_violation())
    }
}

/// Classifies one frame. Pure and total: O(n²) in the number of scorable people.
pub fn classify(persons: &[Person], thresholds: &Thresholds) -> ProximityReport {
    let people: Vec<PersonMetrics> = persons
        .iter()
        .enumerate()
        .filter_map(|(index, person)| {
            let metrics = PersonMetrics::from_person(index, person);
            if metrics.is_none() {
                log::debug!("person {} has no keypoints; excluded from scoring", index);
            }
            metrics
        })
        .collect();

    let mut pairs = Vec::with_capacity(people.len() * people.len().saturating_sub(1) / 2);
    for (i, a) in people.iter().enumerate() {
        for b in &people[i + 1..] {
            let pair = measure_pair(a, b, thresholds);
            if pair.normalized.is_none() {
                log::debug!(
                    "persons {} and {} have zero average height; relative check skipped",
                    pair.first,
                    pair.second
                );
            }
            pairs.push(pair);
        }
    }

    let verdict = if pairs.iter().any(PairMeasurement::is_violation) {
        Verdict::Violation
    } else {
        Verdict::Safe
    };
    let scorable = people.len();

    ProximityReport {
        people,
        pairs,
        verdict: FrameVerdict {
            verdict,
            people: persons.len(),
            scorable,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keypoint::Keypoint;

    const EPS: f32 = 1e-4;

    /// Person whose hip midpoint is `(cx, cy)` and whose vertical span is `height`.
    fn standing(cx: f32, cy: f32, height: f32) -> Person {
        Person::new(vec![
            Keypoint::new(JointId::Nose, cx, cy - height / 2.0, 0.9),
            Keypoint::new(JointId::LeftHip, cx - 10.0, cy, 0.9),
            Keypoint::new(JointId::RightHip, cx + 10.0, cy, 0.9),
            Keypoint::new(JointId::LeftAnkle, cx, cy + height / 2.0, 0.9),
        ])
    }

    fn flat(points: &[(f32, f32)]) -> Person {
        Person::new(
            points
                .iter()
                .map(|&(x, y)| Keypoint::new(JointId::Nose, x, y, 0.5))
                .collect(),
        )
    }

    fn thresholds() -> Thresholds {
        Thresholds::new(150.0, 0.7).unwrap()
    }

    #[test]
    fn close_pair_violates_both_rules() {
        let persons = [standing(0.0, 0.0, 800.0), standing(100.0, 0.0, 800.0)];
        let report = classify(&persons, &thresholds());
        assert_eq!(report.pairs.len(), 1);
        let pair = report.pairs[0];
        assert!((pair.distance_px - 100.0).abs() < EPS);
        assert!((pair.average_height - 800.0).abs() < EPS);
        assert!((pair.normalized.unwrap() - 0.125).abs() < EPS);
        assert!(pair.absolute_violation);
        assert!(pair.relative_violation);
        assert_eq!(report.verdict.verdict, Verdict::Violation);
    }

    #[test]
    fn relative_rule_alone_triggers_violation() {
        let persons = [standing(0.0, 0.0, 800.0), standing(500.0, 0.0, 800.0)];
        let report = classify(&persons, &thresholds());
        let pair = report.pairs[0];
        assert!(!pair.absolute_violation);
        assert!((pair.normalized.unwrap() - 0.625).abs() < EPS);
        assert!(pair.relative_violation);
        assert!(report.verdict.is_violation());
    }

    #[test]
    fn distant_pair_is_safe() {
        let persons = [standing(0.0, 0.0, 800.0), standing(1000.0, 0.0, 800.0)];
        let report = classify(&persons, &thresholds());
        let pair = report.pairs[0];
        assert!(!pair.absolute_violation);
        assert!((pair.normalized.unwrap() - 1.25).abs() < EPS);
        assert!(!pair.relative_violation);
        assert_eq!(report.verdict.verdict, Verdict::Safe);
    }

    #[test]
    fn fewer_than_two_scorable_people_is_safe() {
        for persons in [
            vec![],
            vec![standing(0.0, 0.0, 100.0)],
            vec![standing(0.0, 0.0, 100.0), Person::default()],
        ] {
            let report = classify(&persons, &thresholds());
            assert!(report.pairs.is_empty());
            assert_eq!(report.verdict.verdict, Verdict::Safe);
            assert_eq!(report.verdict.people, persons.len());
        }
    }

    #[test]
    fn person_without_keypoints_is_excluded() {
        let persons = vec![
            standing(0.0, 0.0, 100.0),
            Person::default(),
            standing(50.0, 0.0, 100.0),
        ];
        let report = classify(&persons, &thresholds());
        assert_eq!(report.verdict.people, 3);
        assert_eq!(report.verdict.scorable, 2);
        assert_eq!(report.pairs.len(), 1);
        assert_eq!((report.pairs[0].first, report.pairs[0].second), (0, 2));
    }

    #[test]
    fn identical_hips_give_zero_distance() {
        let persons = [standing(40.0, 60.0, 300.0), standing(40.0, 60.0, 300.0)];
        let report = classify(&persons, &Thresholds::new(0.001, 0.001).unwrap());
        let pair = report.pairs[0];
        assert_eq!(pair.distance_px, 0.0);
        assert!(pair.absolute_violation);
    }

    #[test]
    fn hip_midpoint_is_preferred() {
        let center = estimate_center(&standing(30.0, 40.0, 200.0)).unwrap();
        assert_eq!(center, CenterEstimate::HipMidpoint(Point::new(30.0, 40.0)));
    }

    #[test]
    fn missing_hip_falls_back_to_centroid() {
        let person = Person::new(vec![
            Keypoint::new(JointId::LeftHip, 0.0, 0.0, 0.9),
            Keypoint::new(JointId::Nose, 6.0, 3.0, 0.9),
            Keypoint::new(JointId::LeftAnkle, 3.0, 9.0, 0.9),
        ]);
        match estimate_center(&person).unwrap() {
            CenterEstimate::Centroid(p) => {
                assert!((p.x - 3.0).abs() < EPS);
                assert!((p.y - 4.0).abs() < EPS);
            }
            other => panic!("expected centroid fallback, got {:?}", other),
        }
        assert!(estimate_center(&Person::default()).is_none());
        assert!(estimate_height(&Person::default()).is_none());
    }

    #[test]
    fn person_without_hips_uses_average_of_all_keypoints() {
        let person = Person::new(vec![
            Keypoint::new(JointId::Nose, 10.0, 0.0, 0.9),
            Keypoint::new(JointId::LeftShoulder, 20.0, 30.0, 0.9),
            Keypoint::new(JointId::RightShoulder, 0.0, 30.0, 0.9),
            Keypoint::new(JointId::LeftKnee, 14.0, 80.0, 0.9),
        ]);
        assert_eq!(
            estimate_center(&person),
            Some(CenterEstimate::Centroid(Point::new(11.0, 35.0)))
        );

        // the fallback center drives the pair distance
        let hips = Person::new(vec![
            Keypoint::new(JointId::LeftHip, 41.0, 35.0, 0.9),
            Keypoint::new(JointId::RightHip, 41.0, 35.0, 0.9),
        ]);
        let report = classify(&[person, hips], &thresholds());
        assert!((report.pairs[0].distance_px - 30.0).abs() < EPS);
        assert!(matches!(report.people[0].center, CenterEstimate::Centroid(_)));
        assert!(matches!(report.people[1].center, CenterEstimate::HipMidpoint(_)));
    }

    #[test]
    fn zero_height_never_flags_relative() {
        let a = flat(&[(0.0, 10.0), (20.0, 10.0)]);
        let b = flat(&[(5.0, 10.0)]);
        let report = classify(&[a, b], &Thresholds::new(1.0, 1000.0).unwrap());
        let pair = report.pairs[0];
        assert_eq!(pair.average_height, 0.0);
        assert_eq!(pair.normalized, None);
        assert!(!pair.relative_violation);
        assert!(!pair.absolute_violation);
        assert_eq!(report.verdict.verdict, Verdict::Safe);
    }

    #[test]
    fn zero_height_still_checks_absolute_distance() {
        let report = classify(&[flat(&[(0.0, 10.0)]), flat(&[(5.0, 10.0)])], &thresholds());
        assert!(report.pairs[0].absolute_violation);
        assert!(report.verdict.is_violation());
    }

    #[test]
    fn pair_measurement_is_symmetric() {
        let t = thresholds();
        let a = PersonMetrics::from_person(0, &standing(10.0, 20.0, 300.0)).unwrap();
        let b = PersonMetrics::from_person(1, &standing(210.0, 90.0, 500.0)).unwrap();
        let ab = measure_pair(&a, &b, &t);
        let ba = measure_pair(&b, &a, &t);
        assert_eq!(ab.distance_px, ba.distance_px);
        assert_eq!(ab.average_height, ba.average_height);
        assert_eq!(ab.normalized, ba.normalized);
        assert_eq!(ab.absolute_violation, ba.absolute_violation);
        assert_eq!(ab.relative_violation, ba.relative_violation);
    }

    #[test]
    fn raising_absolute_threshold_only_adds_violations() {
        let persons: Vec<Person> = [0.0, 90.0, 260.0, 700.0]
            .iter()
            .map(|&x| standing(x, 0.0, 100.0))
            .collect();
        let mut previous: Option<Vec<bool>> = None;
        for abs in [1.0, 50.0, 100.0, 200.0, 500.0, 1000.0] {
            let report = classify(&persons, &Thresholds::new(abs, 0.01).unwrap());
            let flags: Vec<bool> = report.pairs.iter().map(|p| p.absolute_violation).collect();
            if let Some(prev) = &previous {
                for (before, now) in prev.iter().zip(&flags) {
                    assert!(!before || *now, "violation disappeared at threshold {}", abs);
                }
            }
            previous = Some(flags);
        }
    }

    #[test]
    fn thresholds_must_be_positive_and_finite() {
        assert!(Thresholds::new(0.0, 0.7).is_err());
        assert!(Thresholds::new(-1.0, 0.7).is_err());
        assert!(Thresholds::new(150.0, 0.0).is_err());
        assert!(Thresholds::new(f32::NAN, 0.7).is_err());
        assert!(Thresholds::new(150.0, f32::INFINITY).is_err());
        let t = Thresholds::default();
        assert_eq!(t.absolute_px(), DEFAULT_DISTANCE_PX);
        assert_eq!(t.relative(), DEFAULT_REL_THRESHOLD);
    }
}
