//! Detection Capability - fire / PPE model inference
//!
//! ## Responsibilities
//! - Own the loaded detection models (fire, PPE), constructed once at startup
//! - Serialize access per model (backends are not assumed reentrant)
//! - Map class indices to labels and apply per-label confidence thresholds
//!
//! Inference is blocking CPU work and runs on the blocking thread pool; a
//! per-model lock queues concurrent pipeline runs instead of racing the
//! backend. A model that is not loaded is simply absent from `infer`
//! results; `ensure_available` is the strict check used by the upload path.

pub mod backend;
pub mod backends;
pub mod meta;

pub use backend::{DetectorBackend, RawDetection};
pub use backends::StubBackend;
pub use meta::{ModelMeta, DEFAULT_CONFIDENCE};

use crate::error::{Error, Result};
use crate::models::{Detection, ModelKind, ModelSelector};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// Loaded-model status for the health endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorHealth {
    pub fire_loaded: bool,
    pub ppe_loaded: bool,
    pub fire_weights: Option<String>,
    pub ppe_weights: Option<String>,
}

/// One loaded model: backend + metadata, access serialized by the lock
pub struct ModelHandle {
    weights: String,
    meta: ModelMeta,
    backend: Arc<Mutex<Box<dyn DetectorBackend>>>,
}

impl ModelHandle {
    pub fn new(
        backend: Box<dyn DetectorBackend>,
        meta: ModelMeta,
        weights: impl Into<String>,
    ) -> Self {
        Self {
            weights: weights.into(),
            meta,
            backend: Arc::new(Mutex::new(backend)),
        }
    }
}

/// Shared detection capability, injected into every ingestion source
pub struct DetectorService {
    fire: Option<ModelHandle>,
    ppe: Option<ModelHandle>,
}

impl DetectorService {
    pub fn new(fire: Option<ModelHandle>, ppe: Option<ModelHandle>) -> Self {
        Self { fire, ppe }
    }

    /// Build from configuration. Unset weight paths leave that model
    /// unloaded; `"stub"` loads the no-op stub backend (useful without
    /// model files on disk).
    pub fn from_config(config: &crate::state::AppConfig) -> Result<Self> {
        let fire = Self::load_model(
            ModelKind::Fire,
            config.fire_model_path.as_deref(),
            config.fire_labels_path.as_deref(),
            config.detector_default_conf,
        )?;
        let ppe = Self::load_model(
            ModelKind::Ppe,
            config.ppe_model_path.as_deref(),
            config.ppe_labels_path.as_deref(),
            config.detector_default_conf,
        )?;
        Ok(Self::new(fire, ppe))
    }

    fn load_model(
        kind: ModelKind,
        weights: Option<&str>,
        labels: Option<&str>,
        default_conf: f32,
    ) -> Result<Option<ModelHandle>> {
        let Some(weights) = weights.filter(|w| !w.is_empty()) else {
            tracing::info!(model = %kind, "model not configured");
            return Ok(None);
        };
        let meta = ModelMeta::load(labels)?.with_default_conf(default_conf);

        if weights == "stub" {
            tracing::info!(model = %kind, "using stub backend");
            return Ok(Some(ModelHandle::new(
                Box::new(StubBackend::new()),
                meta,
                weights,
            )));
        }

        load_backend(kind, weights, meta)
    }

    pub fn has_model(&self, kind: ModelKind) -> bool {
        match kind {
            ModelKind::Fire => self.fire.is_some(),
            ModelKind::Ppe => self.ppe.is_some(),
        }
    }

    /// Strict availability check for one-shot upload requests: the
    /// selector's model(s) must be loaded (for `both`, at least one).
    pub fn ensure_available(&self, selector: ModelSelector) -> Result<()> {
        match selector {
            ModelSelector::Fire if self.fire.is_none() => Err(Error::ModelUnavailable(
                "fire model not loaded".to_string(),
            )),
            ModelSelector::Ppe if self.ppe.is_none() => {
                Err(Error::ModelUnavailable("ppe model not loaded".to_string()))
            }
            ModelSelector::Both if self.fire.is_none() && self.ppe.is_none() => Err(
                Error::ModelUnavailable("no detection models loaded".to_string()),
            ),
            _ => Ok(()),
        }
    }

    pub fn health(&self) -> DetectorHealth {
        DetectorHealth {
            fire_loaded: self.fire.is_some(),
            ppe_loaded: self.ppe.is_some(),
            fire_weights: self.fire.as_ref().map(|m| m.weights.clone()),
            ppe_weights: self.ppe.as_ref().map(|m| m.weights.clone()),
        }
    }

    /// Run the selected model(s) over one decoded frame.
    ///
    /// The result map contains one entry per model that is both requested
    /// and loaded, holding that model's thresholded detections. Overlay
    /// drawing is left to the caller (stream and upload paths annotate
    /// differently).
    pub async fn infer(
        &self,
        frame: &RgbImage,
        selector: ModelSelector,
    ) -> Result<BTreeMap<ModelKind, Vec<Detection>>> {
        let mut out = BTreeMap::new();

        for (kind, handle) in [
            (ModelKind::Fire, self.fire.as_ref()),
            (ModelKind::Ppe, self.ppe.as_ref()),
        ] {
            let Some(handle) = handle else { continue };
            if !selector.wants(kind) {
                continue;
            }

            let detections = run_model(handle, frame).await?;
            out.insert(kind, detections);
        }

        Ok(out)
    }
}

/// Lock the model, run the backend on a blocking thread, then map class
/// indices to labels and drop detections below their effective threshold.
async fn run_model(handle: &ModelHandle, frame: &RgbImage) -> Result<Vec<Detection>> {
    let backend = handle.backend.clone();
    let meta = handle.meta.clone();
    let frame = frame.clone();

    tokio::task::spawn_blocking(move || -> Result<Vec<Detection>> {
        let mut backend = backend
            .lock()
            .map_err(|_| Error::Inference("backend lock poisoned".to_string()))?;
        let raw = backend.detect(&frame)?;

        let mut detections = Vec::with_capacity(raw.len());
        for r in raw {
            let label = meta
                .name_for(r.class_id)
                .or_else(|| backend.class_name(r.class_id))
                .unwrap_or_else(|| r.class_id.to_string());
            if r.conf < meta.threshold_for(&label) {
                continue;
            }
            detections.push(Detection::new(label, r.conf, r.bbox));
        }
        Ok(detections)
    })
    .await
    .map_err(|e| Error::Inference(format!("inference task failed: {}", e)))?
}

#[cfg(feature = "backend-tract")]
fn load_backend(kind: ModelKind, weights: &str, meta: ModelMeta) -> Result<Option<ModelHandle>> {
    let mut backend = backends::TractBackend::new(weights, backends::tract::DEFAULT_INPUT_SIZE)?;
    if let Err(e) = backend.warm_up() {
        tracing::warn!(model = %kind, error = %e, "model warm-up failed");
    }
    tracing::info!(model = %kind, weights = %weights, "ONNX model loaded");
    Ok(Some(ModelHandle::new(Box::new(backend), meta, weights)))
}

#[cfg(not(feature = "backend-tract"))]
fn load_backend(kind: ModelKind, weights: &str, _meta: ModelMeta) -> Result<Option<ModelHandle>> {
    tracing::warn!(
        model = %kind,
        weights = %weights,
        "model weights configured but the backend-tract feature is not enabled; model disabled"
    );
    Ok(None)
}
