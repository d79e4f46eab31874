//! Pose Proximity Monitor
//!
//! Flags pairs of people standing closer than a configurable threshold, in a
//! single still image or in a stream of frames.
//!
//! # Architecture
//!
//! Pose estimation is delegated to a backend that returns, for every detected
//! person, a set of labelled 2-D keypoints. From those keypoints the
//! classifier derives a center and a height per person and checks every pair
//! against two rules:
//!
//! 1. **Absolute**: center distance below a pixel threshold.
//! 2. **Relative**: center distance divided by the pair's average height below
//!    a ratio threshold, which is robust to camera zoom and depth.
//!
//! A frame is a VIOLATION when any pair breaks either rule, SAFE otherwise.
//!
//! # Module Structure
//!
//! - `keypoint`: joint labels, keypoints, persons
//! - `proximity`: the pure classifier
//! - `pose`: pose backends (stub, replay, tract) and their registry
//! - `ingest`: still images and frame streams
//! - `render`: overlay drawing
//! - `report`: per-frame reports and console logging
//! - `output`: result folder and frame sinks
//! - `pipeline`: single-image and stream run modes
//! - `config`: layered configuration

pub mod config;
pub mod frame;
pub mod ingest;
pub mod keypoint;
pub mod output;
pub mod pipeline;
pub mod pose;
pub mod proximity;
pub mod render;
pub mod report;

pub use config::ProximityConfig;
pub use frame::Frame;
pub use ingest::{load_image, SourceConfig, VideoSource};
pub use keypoint::{JointId, Keypoint, Person};
pub use output::{open_output, FrameSink, MemorySink, RecordingSink, ResultDir, StatusSink};
pub use pipeline::{ImageOutcome, Pipeline, StreamSummary};
pub use pose::{BackendRegistry, PoseBackend, ReplayBackend, StubBackend};
pub use proximity::{
    classify, CenterEstimate, FrameVerdict, PairMeasurement, PersonMetrics, ProximityReport,
    Thresholds, Verdict,
};
pub use render::Overlay;
pub use report::FrameReport;

use anyhow::{anyhow, Result};

/// Build a registry holding the backend named in `detection`, set as default.
///
/// `replay` needs `poses` (a recording of detections). `tract` needs the
/// `backend-tract` feature and treats `network` as the path to an ONNX model.
pub fn build_registry(
    detection: &config::DetectionSettings,
    poses: Option<&std::path::Path>,
) -> Result<BackendRegistry> {
    let mut registry = BackendRegistry::new();
    match detection.backend.as_str() {
        "stub" => {
            log::warn!(
                "stub pose backend: people are scripted, not detected from the pixels; \
                 use --backend tract or --poses for real input"
            );
            registry.register(StubBackend::new());
        }
        "replay" => {
            let path = poses.ok_or_else(|| anyhow!("the replay backend needs --poses <FILE>"))?;
            registry.register(ReplayBackend::from_path(path, detection.min_confidence)?);
        }
        #[cfg(feature = "backend-tract")]
        "tract" => {
            let backend = pose::TractBackend::new(&detection.network, 256, 256)?
                .with_threshold(detection.min_confidence);
            registry.register(backend);
        }
        #[cfg(not(feature = "backend-tract"))]
        "tract" => return Err(anyhow!("the tract backend requires the backend-tract feature")),
        other => return Err(anyhow!("unknown pose backend '{}'", other)),
    }
    registry.warm_up_all()?;
    log::info!(
        "pose backend: {} (network={}, min_confidence={:.2})",
        registry.default_name().unwrap_or("none"),
        detection.network,
        detection.min_confidence
    );
    log::debug!("registered pose backends: {}", registry.list().join(", "));
    Ok(registry)
}

/// Refuse to score real pixels with the scripted stub backend unless it was
/// named explicitly (`--backend stub`).
///
/// `input` is the image path or stream URI; only `stub://` streams are
/// synthetic.
pub fn check_backend_for_input(
    detection: &config::DetectionSettings,
    input: &str,
    explicit: bool,
) -> Result<()> {
    if detection.backend != "stub" || explicit || input.starts_with("stub://") {
        return Ok(());
    }
    Err(anyhow!(
        "input '{}' is real footage but the pose backend is the scripted stub; \
         pass --backend tract --network <model.onnx>, --poses <FILE>, \
         or --backend stub to run the demo scene anyway",
        input
    ))
}
