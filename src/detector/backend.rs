//! Detector backend trait
//!
//! A backend wraps one loaded model. It receives a decoded RGB frame and
//! returns raw class-indexed detections; label mapping and per-label
//! threshold filtering happen in the service layer on top.

use crate::Result;
use image::RgbImage;

/// One raw, class-indexed box straight out of a backend
#[derive(Debug, Clone, PartialEq)]
pub struct RawDetection {
    pub class_id: usize,
    pub conf: f32,
    /// `[x1, y1, x2, y2]` in source-frame pixels
    pub bbox: [f32; 4],
}

/// Inference backend for one model.
///
/// `detect` is a blocking CPU call; callers run it on a blocking thread and
/// serialize access per model. Implementations must not retain the frame.
pub trait DetectorBackend: Send {
    /// Backend identifier for logs
    fn name(&self) -> &'static str;

    /// Run the model on one frame.
    fn detect(&mut self, frame: &RgbImage) -> Result<Vec<RawDetection>>;

    /// The model's own label for a class index, when it knows one.
    fn class_name(&self, _class_id: usize) -> Option<String> {
        None
    }

    /// Optional warm-up hook (first-run allocations, graph priming).
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
