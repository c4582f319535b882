//! Broadcast Hub - WebSocket viewer distribution
//!
//! ## Responsibilities
//! - Viewer connection registry (register/unregister)
//! - Fan-out of frame / alert / error messages to every viewer
//! - Pruning viewers whose channel is no longer writable
//!
//! Delivery is best-effort and at-most-once per viewer per call: a dead
//! viewer is removed without aborting delivery to the rest, and sends are
//! non-blocking channel writes so one slow consumer cannot stall the
//! broadcaster. Stale frames are never retried; freshness beats
//! completeness for a live view.

use crate::models::Detection;
use crate::risk::{RiskAssessment, RiskLevel};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Hub message types, serialized flat with a `type` discriminator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HubMessage {
    /// Annotated frame ready for display
    Frame {
        /// `data:image/jpeg;base64,` payload
        image: String,
        detections: Vec<Detection>,
        risk: RiskAssessment,
    },
    /// Emitted only for High/Critical frames
    Alert {
        severity: RiskLevel,
        message: String,
        risk: RiskAssessment,
        detections: Vec<Detection>,
    },
    /// Transport or inference failure description
    Error { message: String },
}

impl HubMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            HubMessage::Frame { .. } => "frame",
            HubMessage::Alert { .. } => "alert",
            HubMessage::Error { .. } => "error",
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        HubMessage::Error {
            message: message.into(),
        }
    }
}

/// One connected viewer
struct Viewer {
    id: Uuid,
    tx: mpsc::UnboundedSender<String>,
}

/// Viewer registry and fan-out point, shared by every ingestion source
pub struct BroadcastHub {
    viewers: RwLock<HashMap<Uuid, Viewer>>,
    viewer_count: AtomicU64,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self {
            viewers: RwLock::new(HashMap::new()),
            viewer_count: AtomicU64::new(0),
        }
    }

    /// Register a new viewer; messages arrive on the returned receiver.
    pub async fn register(&self) -> (Uuid, mpsc::UnboundedReceiver<String>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();

        {
            let mut viewers = self.viewers.write().await;
            viewers.insert(id, Viewer { id, tx });
        }
        self.viewer_count.fetch_add(1, Ordering::Relaxed);

        tracing::info!(viewer_id = %id, "Viewer connected");

        (id, rx)
    }

    /// Remove a viewer; idempotent.
    pub async fn unregister(&self, id: &Uuid) {
        let mut viewers = self.viewers.write().await;
        if viewers.remove(id).is_some() {
            self.viewer_count.fetch_sub(1, Ordering::Relaxed);
            tracing::info!(viewer_id = %id, "Viewer disconnected");
        }
    }

    /// Deliver a message to every registered viewer.
    ///
    /// The message is serialized once. Viewers whose channel rejects the
    /// send are pruned after the sweep; delivery to the remaining viewers
    /// always completes.
    pub async fn broadcast(&self, message: &HubMessage) {
        let json = match serde_json::to_string(message) {
            Ok(j) => j,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize hub message");
                return;
            }
        };

        let mut dead: Vec<Uuid> = Vec::new();
        {
            let viewers = self.viewers.read().await;
            tracing::debug!(
                message_type = %message.kind(),
                viewer_count = viewers.len(),
                "Broadcasting to viewers"
            );
            for viewer in viewers.values() {
                if viewer.tx.send(json.clone()).is_err() {
                    dead.push(viewer.id);
                }
            }
        }

        if !dead.is_empty() {
            let mut viewers = self.viewers.write().await;
            for id in &dead {
                if viewers.remove(id).is_some() {
                    self.viewer_count.fetch_sub(1, Ordering::Relaxed);
                    tracing::info!(viewer_id = %id, "Pruned dead viewer");
                }
            }
        }
    }

    pub fn viewer_count(&self) -> u64 {
        self.viewer_count.load(Ordering::Relaxed)
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new()
    }
}
