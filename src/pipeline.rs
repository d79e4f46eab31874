//! Per-frame processing and the two run modes.
//!
//! Each frame goes through the same sequential steps, one frame at a time:
//! acquire → estimate poses → classify → draw overlay → hand to sinks.
//! Nothing is shared between frames except the backend's own state.

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::frame::Frame;
use crate::ingest::{load_image, VideoSource};
use crate::output::{FrameSink, ResultDir};
use crate::pose::BackendRegistry;
use crate::proximity::{classify, Thresholds};
use crate::render::{draw_overlay, Overlay};
use crate::report::{log_report, FrameReport};

pub struct Pipeline {
    registry: BackendRegistry,
    thresholds: Thresholds,
    overlay: Overlay,
}

/// Result of single-image mode.
#[derive(Debug)]
pub struct ImageOutcome {
    pub report: FrameReport,
    pub output_path: PathBuf,
}

/// Totals for a finished stream run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StreamSummary {
    pub frames: u64,
    pub violation_frames: u64,
    pub max_people: usize,
    /// True when the run ended because of the stop flag.
    pub interrupted: bool,
}

impl Pipeline {
    pub fn new(registry: BackendRegistry, thresholds: Thresholds) -> Self {
        Self {
            registry,
            thresholds,
            overlay: Overlay::default(),
        }
    }

    pub fn with_overlay(mut self, overlay: Overlay) -> Self {
        self.overlay = overlay;
        self
    }

    /// Estimate, classify, log and annotate one frame in place.
    pub fn process_frame(&self, frame: &mut Frame) -> Result<FrameReport> {
        let persons = self.registry.estimate(frame)?;
        log::debug!("frame {}: detected {} person(s)", frame.index, persons.len());

        let report = FrameReport::new(
            frame.index,
            self.thresholds,
            classify(&persons, &self.thresholds),
        );
        log_report(&report);

        if !self.overlay.is_empty() {
            draw_overlay(
                frame.image_mut(),
                &persons,
                &report.proximity,
                &report.status_line(),
                self.overlay,
            );
        }
        Ok(report)
    }

    /// Single-image mode: load, score, annotate, save into `results`.
    pub fn run_image(&self, input: &Path, results: &ResultDir) -> Result<ImageOutcome> {
        let mut frame = load_image(input)?;
        let report = self.process_frame(&mut frame)?;
        log::info!("Detected {} person(s) in image.", report.people());
        let output_path = results.save_annotated(input, frame.image())?;
        log::info!("Saved annotated image to: {}", output_path.display());
        Ok(ImageOutcome {
            report,
            output_path,
        })
    }

    /// Stream mode: process frames until the source ends, any sink stops
    /// streaming, or `stop` is raised. `stop` is checked between frames.
    pub fn run_stream(
        &self,
        source: &mut VideoSource,
        sinks: &mut [&mut dyn FrameSink],
        stop: &AtomicBool,
    ) -> Result<StreamSummary> {
        let mut summary = StreamSummary::default();

        loop {
            if stop.load(Ordering::SeqCst) {
                log::info!("stop requested; leaving capture loop");
                summary.interrupted = true;
                break;
            }

            let Some(mut frame) = source.next_frame()? else {
                if source.is_streaming() {
                    continue;
                }
                break;
            };

            let report = self.process_frame(&mut frame)?;
            log::info!("[FRAME] {}, people={}", report.verdict(), report.people());

            summary.frames += 1;
            if report.proximity.verdict.is_violation() {
                summary.violation_frames += 1;
            }
            summary.max_people = summary.max_people.max(report.people());

            for sink in sinks.iter_mut() {
                sink.render(&frame, &report)?;
            }

            if !source.is_streaming() || sinks.iter().any(|sink| !sink.is_streaming()) {
                break;
            }
        }

        for sink in sinks.iter_mut() {
            sink.finish()?;
        }
        let stats = source.stats();
        log::info!(
            "stream finished: {} frame(s) from {}, {} with violations",
            stats.frames_captured,
            stats.uri,
            summary.violation_frames
        );
        Ok(summary)
    }
}
