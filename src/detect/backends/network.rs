#![cfg(feature = "backend-network")]

//! Network classification backend: ONNX object detector plus color bands.
//!
//! The frame is resized to the network's square input, scaled by 1/255 and
//! laid out NCHW. Every output tensor is decoded as rows of
//! `[cx, cy, w, h, objectness, class scores…]`; decoded boxes pass through
//! class-agnostic NMS, and surviving person/helmet boxes run the shared
//! color test over their upper slice. Frames arrive in RGB order from the
//! ingestion layer, which is already what the detector expects.

use anyhow::{anyhow, Context, Result};
use std::path::Path;
use tract_onnx::prelude::*;

use crate::config::DetectSettings;
use crate::detect::backend::ClassifyBackend;
use crate::detect::nms::{decode_rows, non_max_suppression, Detection};
use crate::detect::{color, helmet_zone_on_person};
use crate::frame::Frame;
use crate::overlay::{Overlay, GREEN, RED};

pub struct NetworkBackend {
    plan: TypedSimplePlan<TypedModel>,
    labels: Vec<String>,
    input_size: u32,
    confidence_threshold: f32,
    nms_threshold: f32,
    min_coverage: f64,
    overlay: Overlay,
}

impl NetworkBackend {
    /// Load an ONNX detector from disk and prepare it for inference.
    pub fn load(
        model_path: &Path,
        labels: Vec<String>,
        settings: &DetectSettings,
        overlay: Overlay,
    ) -> Result<Self> {
        let size = settings.input_size as usize;
        let plan = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, size, size)),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        log::info!(
            "network backend loaded from {} ({} output layers, {} labels)",
            model_path.display(),
            plan.model().outputs.len(),
            labels.len()
        );

        Ok(Self {
            plan,
            labels,
            input_size: settings.input_size,
            confidence_threshold: settings.confidence_threshold,
            nms_threshold: settings.nms_threshold,
            min_coverage: settings.person_coverage,
            overlay,
        })
    }

    fn build_input(&self, frame: &Frame) -> Tensor {
        let size = self.input_size;
        let resized = frame.resized(size, size);
        let image = resized.image();
        let input = tract_ndarray::Array4::from_shape_fn(
            (1, 3, size as usize, size as usize),
            |(_, channel, y, x)| f32::from(image.get_pixel(x as u32, y as u32).0[channel]) / 255.0,
        );
        input.into_tensor()
    }

    fn label(&self, class_id: usize) -> &str {
        self.labels
            .get(class_id)
            .map(String::as_str)
            .unwrap_or("unknown")
    }

    fn decode_outputs(&self, outputs: &TVec<TValue>, frame: &Frame) -> Result<Vec<Detection>> {
        let mut detections = Vec::new();
        for output in outputs {
            let view = output
                .to_array_view::<f32>()
                .context("model output tensor was not f32")?;
            let Some(&row_len) = view.shape().last() else {
                continue;
            };
            let decoded = match view.as_slice() {
                Some(data) => decode_rows(
                    data,
                    row_len,
                    frame.width(),
                    frame.height(),
                    self.confidence_threshold,
                ),
                None => {
                    let data: Vec<f32> = view.iter().copied().collect();
                    decode_rows(
                        &data,
                        row_len,
                        frame.width(),
                        frame.height(),
                        self.confidence_threshold,
                    )
                }
            };
            detections.extend(decoded);
        }
        Ok(detections)
    }
}

impl ClassifyBackend for NetworkBackend {
    fn name(&self) -> &'static str {
        "network"
    }

    fn classify(&mut self, frame: &mut Frame) -> Result<bool> {
        let input = self.build_input(frame);
        let outputs = self
            .plan
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;

        let raw = self.decode_outputs(&outputs, frame)?;
        let survivors = non_max_suppression(raw, self.confidence_threshold, self.nms_threshold);

        let mut any_helmet = false;
        for detection in survivors {
            let label = self.label(detection.class_id).to_string();
            if !is_wearer_class(&label) {
                continue;
            }

            let helmet = helmet_zone_on_person(detection.region)
                .clamped(frame.width(), frame.height())
                .map(|zone| color::region_has_helmet_color(frame, zone, self.min_coverage))
                .unwrap_or(false);

            let rect_color = if helmet { GREEN } else { RED };
            self.overlay.rect(frame, detection.region, rect_color);
            self.overlay.label(
                frame,
                detection.region,
                &format!("{}: {:.2}", label, detection.confidence),
                rect_color,
            );
            any_helmet = any_helmet || helmet;
        }
        Ok(any_helmet)
    }
}

/// Classes whose boxes are inspected for a helmet: exactly "person", or any
/// label containing "helmet" (case-insensitive).
fn is_wearer_class(label: &str) -> bool {
    label == "person" || label.to_lowercase().contains("helmet")
}
