#![cfg(feature = "backend-tract")]

//! Tract-based ONNX backend.
//!
//! Loads a YOLO-style detection model and decodes its output head:
//! rows `[cx, cy, w, h, class scores...]` per anchor, confidence = best
//! class score, class-aware non-maximum suppression, boxes scaled back to
//! source-frame pixels.

use crate::detector::backend::{DetectorBackend, RawDetection};
use crate::error::{Error, Result};
use image::RgbImage;
use tract_onnx::prelude::*;

/// Pre-filter confidence floor applied before NMS
const CONF_FLOOR: f32 = 0.25;
/// IoU above which same-class boxes are suppressed
const IOU_THRESHOLD: f32 = 0.45;
/// Default model input edge length
pub const DEFAULT_INPUT_SIZE: u32 = 640;

pub struct TractBackend {
    model: TypedSimplePlan<TypedModel>,
    input_size: u32,
    conf_floor: f32,
    iou_threshold: f32,
}

#[derive(Clone)]
struct Candidate {
    class_id: usize,
    conf: f32,
    bbox: [f32; 4],
}

impl TractBackend {
    /// Load an ONNX model and prepare an optimized runnable plan.
    pub fn new(path: &str, input_size: u32) -> Result<Self> {
        let size = input_size as usize;
        let model = tract_onnx::onnx()
            .model_for_path(path)
            .map_err(|e| Error::Internal(format!("failed to read ONNX model {}: {}", path, e)))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, size, size)),
            )
            .map_err(|e| Error::Internal(format!("failed to set input fact for {}: {}", path, e)))?
            .into_optimized()
            .map_err(|e| Error::Internal(format!("failed to optimize model {}: {}", path, e)))?
            .into_runnable()
            .map_err(|e| Error::Internal(format!("failed to build plan for {}: {}", path, e)))?;

        Ok(Self {
            model,
            input_size,
            conf_floor: CONF_FLOOR,
            iou_threshold: IOU_THRESHOLD,
        })
    }

    pub fn with_conf_floor(mut self, conf: f32) -> Self {
        self.conf_floor = conf;
        self
    }

    fn build_input(&self, frame: &RgbImage) -> Tensor {
        let size = self.input_size;
        let resized = image::imageops::resize(
            frame,
            size,
            size,
            image::imageops::FilterType::Triangle,
        );
        tract_ndarray::Array4::from_shape_fn(
            (1, 3, size as usize, size as usize),
            |(_, c, y, x)| resized.get_pixel(x as u32, y as u32)[c] as f32 / 255.0,
        )
        .into_tensor()
    }

    fn decode_output(
        &self,
        outputs: &TVec<TValue>,
        src_w: u32,
        src_h: u32,
    ) -> Result<Vec<RawDetection>> {
        let output = outputs
            .first()
            .ok_or_else(|| Error::Inference("model produced no outputs".to_string()))?;
        let view = output
            .to_array_view::<f32>()
            .map_err(|e| Error::Inference(format!("model output was not f32: {}", e)))?;

        let shape = view.shape().to_vec();
        if shape.len() != 3 || shape[0] != 1 || shape[1] < 5 {
            return Err(Error::Inference(format!(
                "unexpected output shape {:?}",
                shape
            )));
        }
        let classes = shape[1] - 4;
        let anchors = shape[2];

        let mut candidates = Vec::new();
        for a in 0..anchors {
            let mut best_class = 0usize;
            let mut best_score = 0f32;
            for c in 0..classes {
                let score = view[[0, 4 + c, a]];
                if score > best_score {
                    best_score = score;
                    best_class = c;
                }
            }
            if best_score < self.conf_floor {
                continue;
            }

            let cx = view[[0, 0, a]];
            let cy = view[[0, 1, a]];
            let w = view[[0, 2, a]];
            let h = view[[0, 3, a]];
            candidates.push(Candidate {
                class_id: best_class,
                conf: best_score,
                bbox: [cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0],
            });
        }

        let kept = non_maximum_suppression(candidates, self.iou_threshold);

        // scale from model input space back to source pixels
        let sx = src_w as f32 / self.input_size as f32;
        let sy = src_h as f32 / self.input_size as f32;
        Ok(kept
            .into_iter()
            .map(|c| RawDetection {
                class_id: c.class_id,
                conf: c.conf,
                bbox: [
                    (c.bbox[0] * sx).clamp(0.0, src_w as f32),
                    (c.bbox[1] * sy).clamp(0.0, src_h as f32),
                    (c.bbox[2] * sx).clamp(0.0, src_w as f32),
                    (c.bbox[3] * sy).clamp(0.0, src_h as f32),
                ],
            })
            .filter(|d| d.bbox[2] > d.bbox[0] && d.bbox[3] > d.bbox[1])
            .collect())
    }
}

/// Class-aware greedy NMS, highest confidence first.
fn non_maximum_suppression(mut boxes: Vec<Candidate>, iou_threshold: f32) -> Vec<Candidate> {
    boxes.sort_by(|a, b| {
        b.conf
            .partial_cmp(&a.conf)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<Candidate> = Vec::new();
    while !boxes.is_empty() {
        let current = boxes.remove(0);
        boxes.retain(|other| {
            other.class_id != current.class_id || iou(&current.bbox, &other.bbox) <= iou_threshold
        });
        keep.push(current);
    }
    keep
}

fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = a[2].min(b[2]);
    let y2 = a[3].min(b[3]);

    let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let area_a = (a[2] - a[0]) * (a[3] - a[1]);
    let area_b = (b[2] - b[0]) * (b[3] - b[1]);
    let union = area_a + area_b - intersection;
    if union <= 0.0 {
        return 0.0;
    }
    intersection / union
}

impl DetectorBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn detect(&mut self, frame: &RgbImage) -> Result<Vec<RawDetection>> {
        let input = self.build_input(frame);
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .map_err(|e| Error::Inference(format!("ONNX inference failed: {}", e)))?;
        self.decode_output(&outputs, frame.width(), frame.height())
    }

    fn warm_up(&mut self) -> Result<()> {
        let size = self.input_size as usize;
        let zeros = tract_ndarray::Array4::<f32>::zeros((1, 3, size, size)).into_tensor();
        self.model
            .run(tvec!(zeros.into()))
            .map_err(|e| Error::Inference(format!("warm-up run failed: {}", e)))?;
        Ok(())
    }
}
