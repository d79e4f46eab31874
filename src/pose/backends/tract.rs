#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use image::imageops::{self, FilterType};
use tract_onnx::prelude::*;

use crate::frame::Frame;
use crate::keypoint::{JointId, Keypoint, Person};
use crate::pose::backend::PoseBackend;

/// Values per detected person: 17 x (y, x, score) followed by a box
/// (ymin, xmin, ymax, xmax, score).
const ROW_LEN: usize = 56;
const COCO_JOINTS: usize = 17;

/// Tract-based backend for multi-person pose ONNX models.
///
/// Expects an NCHW f32 input normalized to `0..1` and a `[1, N, 56]` output
/// with coordinates normalized to the model input. The neck point is
/// synthesized from the shoulders so the joint set matches the 18-point
/// body topology.
pub struct TractBackend {
    model: TypedRunnableModel<TypedModel>,
    width: u32,
    height: u32,
    min_confidence: f32,
}

impl TractBackend {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P, width: u32, height: u32) -> Result<Self> {
        let model_path = model_path.as_ref();
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(
                    f32::datum_type(),
                    tvec!(1, 3, height as usize, width as usize),
                ),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            model,
            width,
            height,
            min_confidence: 0.15,
        })
    }

    /// Override the default minimum detection confidence.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.min_confidence = threshold;
        self
    }

    fn build_input(&self, frame: &Frame) -> Tensor {
        let resized = imageops::resize(
            frame.image(),
            self.width,
            self.height,
            FilterType::Triangle,
        );
        let input = tract_ndarray::Array4::from_shape_fn(
            (1, 3, self.height as usize, self.width as usize),
            |(_, channel, y, x)| resized.get_pixel(x as u32, y as u32)[channel] as f32 / 255.0,
        );
        input.into_tensor()
    }

    fn decode(&self, outputs: TVec<TValue>, frame: &Frame) -> Result<Vec<Person>> {
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let view = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;
        let values: Vec<f32> = view.iter().copied().collect();
        if values.len() % ROW_LEN != 0 {
            return Err(anyhow!(
                "model output has {} values, not a multiple of {}",
                values.len(),
                ROW_LEN
            ));
        }

        let scale_x = frame.width() as f32;
        let scale_y = frame.height() as f32;
        let mut people = Vec::new();
        for row in values.chunks_exact(ROW_LEN) {
            let person_score = row[ROW_LEN - 1];
            if person_score < self.min_confidence {
                continue;
            }
            let mut keypoints: Vec<Keypoint> = (0..COCO_JOINTS)
                .filter_map(|i| {
                    let (y, x, score) = (row[i * 3], row[i * 3 + 1], row[i * 3 + 2]);
                    (score >= self.min_confidence).then(|| {
                        Keypoint::new(JointId::ALL[i], x * scale_x, y * scale_y, score)
                    })
                })
                .collect();
            let neck = {
                let person = Person::new(keypoints.clone());
                match (
                    person.find(JointId::LeftShoulder),
                    person.find(JointId::RightShoulder),
                ) {
                    (Some(l), Some(r)) => Some(Keypoint::new(
                        JointId::Neck,
                        (l.x + r.x) / 2.0,
                        (l.y + r.y) / 2.0,
                        l.confidence.min(r.confidence),
                    )),
                    _ => None,
                }
            };
            keypoints.extend(neck);
            people.push(Person::new(keypoints));
        }
        Ok(people)
    }
}

impl PoseBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn estimate(&mut self, frame: &Frame) -> Result<Vec<Person>> {
        let input = self.build_input(frame);
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        self.decode(outputs, frame)
    }

    fn warm_up(&mut self) -> Result<()> {
        let blank = Frame::filled(0, self.width, self.height, [0; 3]);
        self.estimate(&blank).map(|_| ())
    }
}
