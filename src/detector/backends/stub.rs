//! Stub backend for tests and weight-less deployments.
//!
//! Returns a fixed detection list on every call, so the full pipeline can
//! run without model files. Configure weights as `"stub"` to get an empty
//! stub in a live server.

use crate::detector::backend::{DetectorBackend, RawDetection};
use crate::Result;
use image::RgbImage;

pub struct StubBackend {
    detections: Vec<RawDetection>,
    labels: Vec<String>,
    calls: u64,
}

impl StubBackend {
    /// A stub that never detects anything.
    pub fn new() -> Self {
        Self {
            detections: Vec::new(),
            labels: Vec::new(),
            calls: 0,
        }
    }

    /// A stub that returns the same detections on every frame.
    pub fn with_detections(detections: Vec<RawDetection>) -> Self {
        Self {
            detections,
            labels: Vec::new(),
            calls: 0,
        }
    }

    /// Class-index -> label mapping reported via `class_name`.
    pub fn with_labels(mut self, labels: &[&str]) -> Self {
        self.labels = labels.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn call_count(&self) -> u64 {
        self.calls
    }
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(&mut self, _frame: &RgbImage) -> Result<Vec<RawDetection>> {
        self.calls += 1;
        Ok(self.detections.clone())
    }

    fn class_name(&self, class_id: usize) -> Option<String> {
        self.labels.get(class_id).cloned()
    }
}
