//! Model metadata: class-name overrides and per-label confidence thresholds
//!
//! Loaded from an optional JSON file next to the weights. Three shapes are
//! accepted:
//!
//! 1. `{"names": {"0": "smoke", "1": "fire"}, "thresholds": {"default": 0.25, "fire": 0.2}}`
//! 2. `{"0": "smoke", "1": "fire"}`
//! 3. `["smoke", "fire"]`

use crate::error::{Error, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

/// Service-wide confidence floor when neither a per-label nor a "default"
/// threshold entry exists
pub const DEFAULT_CONFIDENCE: f32 = 0.25;

/// Names and thresholds for one model
#[derive(Debug, Clone, Default)]
pub struct ModelMeta {
    /// class index (as string) -> label override
    names: Option<HashMap<String, String>>,
    /// label -> minimum confidence; "default" applies to unlisted labels
    thresholds: HashMap<String, f32>,
    default_conf: f32,
}

impl ModelMeta {
    pub fn empty() -> Self {
        Self {
            names: None,
            thresholds: HashMap::new(),
            default_conf: DEFAULT_CONFIDENCE,
        }
    }

    /// Load metadata from a JSON file. A missing/unset path yields empty
    /// metadata, not an error.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let Some(path) = path.filter(|p| !p.is_empty()) else {
            return Ok(Self::empty());
        };
        if !Path::new(path).exists() {
            tracing::warn!(path = %path, "labels file not found, using model-internal names");
            return Ok(Self::empty());
        }
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
            .map_err(|e| Error::InvalidInput(format!("labels file {}: {}", path, e)))
    }

    /// Parse one of the three accepted JSON shapes.
    pub fn from_json(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw)?;
        let mut meta = Self::empty();

        match value {
            Value::Object(map) if map.contains_key("names") => {
                if let Some(Value::Object(names)) = map.get("names") {
                    meta.names = Some(
                        names
                            .iter()
                            .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                            .collect(),
                    );
                }
                if let Some(Value::Object(thr)) = map.get("thresholds") {
                    meta.thresholds = thr
                        .iter()
                        .filter_map(|(k, v)| v.as_f64().map(|f| (k.clone(), f as f32)))
                        .collect();
                }
            }
            Value::Object(map) => {
                if map.keys().all(|k| k.chars().all(|c| c.is_ascii_digit())) {
                    meta.names = Some(
                        map.iter()
                            .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                            .collect(),
                    );
                }
                // otherwise fall through to model-internal names
            }
            Value::Array(items) => {
                meta.names = Some(
                    items
                        .iter()
                        .enumerate()
                        .filter_map(|(i, v)| v.as_str().map(|s| (i.to_string(), s.to_string())))
                        .collect(),
                );
            }
            _ => {
                return Err(Error::InvalidInput(
                    "unsupported labels JSON shape".to_string(),
                ));
            }
        }

        Ok(meta)
    }

    pub fn with_threshold(mut self, label: impl Into<String>, conf: f32) -> Self {
        self.thresholds.insert(label.into(), conf);
        self
    }

    pub fn with_default_conf(mut self, conf: f32) -> Self {
        self.default_conf = conf;
        self
    }

    /// Label override for a class index, if one is configured.
    pub fn name_for(&self, class_id: usize) -> Option<String> {
        self.names
            .as_ref()
            .and_then(|n| n.get(&class_id.to_string()))
            .cloned()
    }

    /// Effective minimum confidence: `threshold[label]` falling back to
    /// `threshold["default"]` falling back to the service default.
    pub fn threshold_for(&self, label: &str) -> f32 {
        self.thresholds
            .get(label)
            .or_else(|| self.thresholds.get("default"))
            .copied()
            .unwrap_or(self.default_conf)
    }
}
