//! Shared models and types for sitewatch
//!
//! This module contains types shared across multiple modules
//! to avoid circular dependencies.

use serde::{Deserialize, Serialize};

/// Standard API response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

/// One labeled, confidence-scored, localized object found in a frame.
///
/// `bbox` is `[x1, y1, x2, y2]` in source-image pixel coordinates with
/// `x1 < x2`, `y1 < y2`. Produced fresh per inference call; embedded in
/// outbound messages, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub label: String,
    pub conf: f32,
    pub bbox: [f32; 4],
}

impl Detection {
    pub fn new(label: impl Into<String>, conf: f32, bbox: [f32; 4]) -> Self {
        Self {
            label: label.into(),
            conf,
            bbox,
        }
    }

    pub fn width(&self) -> f32 {
        self.bbox[2] - self.bbox[0]
    }

    pub fn height(&self) -> f32 {
        self.bbox[3] - self.bbox[1]
    }
}

/// Detection model identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Fire,
    Ppe,
}

impl ModelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Fire => "fire",
            ModelKind::Ppe => "ppe",
        }
    }
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which model(s) a caller wants to run.
///
/// Parsing is deliberately permissive: `"fire/smoke"` is an accepted alias
/// for the fire model, and anything unrecognized (including empty) falls
/// back to running both models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelSelector {
    Fire,
    Ppe,
    Both,
}

impl ModelSelector {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "fire" | "fire/smoke" => ModelSelector::Fire,
            "ppe" => ModelSelector::Ppe,
            _ => ModelSelector::Both,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelSelector::Fire => "fire",
            ModelSelector::Ppe => "ppe",
            ModelSelector::Both => "both",
        }
    }

    /// Does this selector ask for the given model?
    pub fn wants(&self, kind: ModelKind) -> bool {
        match (self, kind) {
            (ModelSelector::Both, _) => true,
            (ModelSelector::Fire, ModelKind::Fire) => true,
            (ModelSelector::Ppe, ModelKind::Ppe) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for ModelSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for ModelSelector {
    fn default() -> Self {
        ModelSelector::Both
    }
}
