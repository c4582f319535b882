//! StreamSession - Camera Pull Loop Lifecycle
//!
//! ## Responsibilities
//!
//! - Run at most one camera pull loop at a time
//! - Replace the active loop on start: the previous loop is signalled
//!   and awaited before the new one spawns
//! - Report session status
//!
//! The pull loop itself fetches snapshot frames over HTTP and funnels
//! them through the shared frame pipeline. A source that cannot be
//! opened at all ends the session with an error broadcast; transient
//! read failures are retried in place.

mod camera;

pub use camera::CameraSource;

use crate::broadcast_hub::{BroadcastHub, HubMessage};
use crate::error::{Error, Result};
use crate::models::ModelSelector;
use crate::pipeline::FramePipeline;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Delay before retrying after a failed frame read
const READ_RETRY_DELAY: Duration = Duration::from_millis(200);

/// Session status for the status endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamStatus {
    pub running: bool,
    pub url: Option<String>,
    pub kind: Option<ModelSelector>,
}

struct ActiveSession {
    url: String,
    kind: ModelSelector,
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// Owns the single camera pull loop
pub struct StreamSessionManager {
    pipeline: Arc<FramePipeline>,
    hub: Arc<BroadcastHub>,
    camera: Arc<CameraSource>,
    interval: Duration,
    session: Mutex<Option<ActiveSession>>,
}

impl StreamSessionManager {
    pub fn new(pipeline: Arc<FramePipeline>, hub: Arc<BroadcastHub>, interval_ms: u64) -> Self {
        Self {
            pipeline,
            hub,
            camera: Arc::new(CameraSource::new()),
            interval: Duration::from_millis(interval_ms),
            session: Mutex::new(None),
        }
    }

    /// Start pulling from `url`. An already-running loop is stopped and
    /// awaited first, so two loops never feed the hub at once.
    pub async fn start(&self, url: String, kind: ModelSelector) -> Result<()> {
        if url.trim().is_empty() {
            return Err(Error::InvalidInput("url is required".to_string()));
        }

        let mut session = self.session.lock().await;

        if let Some(prev) = session.take() {
            tracing::info!(url = %prev.url, "Replacing active stream session");
            prev.stop.store(true, Ordering::Relaxed);
            if let Err(e) = prev.handle.await {
                tracing::warn!(error = %e, "Previous pull loop ended abnormally");
            }
        }

        let stop = Arc::new(AtomicBool::new(false));
        let handle = tokio::spawn(pull_loop(
            self.camera.clone(),
            self.pipeline.clone(),
            self.hub.clone(),
            url.clone(),
            kind,
            self.interval,
            stop.clone(),
        ));

        tracing::info!(url = %url, kind = %kind, "Stream session started");
        *session = Some(ActiveSession {
            url,
            kind,
            stop,
            handle,
        });
        Ok(())
    }

    /// Stop the active loop, waiting for it to exit. Returns whether a
    /// loop was running.
    pub async fn stop(&self) -> bool {
        let mut session = self.session.lock().await;
        match session.take() {
            Some(prev) => {
                prev.stop.store(true, Ordering::Relaxed);
                if let Err(e) = prev.handle.await {
                    tracing::warn!(error = %e, "Pull loop ended abnormally");
                }
                tracing::info!(url = %prev.url, "Stream session stopped");
                true
            }
            None => false,
        }
    }

    /// Current session status. A loop that exited on its own (source
    /// could not be opened) reports as not running.
    pub async fn status(&self) -> StreamStatus {
        let session = self.session.lock().await;
        match session.as_ref() {
            Some(s) if !s.handle.is_finished() => StreamStatus {
                running: true,
                url: Some(s.url.clone()),
                kind: Some(s.kind),
            },
            _ => StreamStatus {
                running: false,
                url: None,
                kind: None,
            },
        }
    }
}

/// The pull loop: fetch a frame, run the pipeline, sleep, repeat.
///
/// The first fetch doubles as the open check; if it fails the loop
/// broadcasts `cannot open stream` and exits. Later fetch failures are
/// retried after a short delay. Pipeline failures are broadcast as
/// error messages and the loop keeps going.
async fn pull_loop(
    camera: Arc<CameraSource>,
    pipeline: Arc<FramePipeline>,
    hub: Arc<BroadcastHub>,
    url: String,
    kind: ModelSelector,
    interval: Duration,
    stop: Arc<AtomicBool>,
) {
    let mut pending = match camera.fetch_frame(&url).await {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            tracing::error!(url = %url, error = %e, "Cannot open stream");
            hub.broadcast(&HubMessage::error("cannot open stream")).await;
            return;
        }
    };

    while !stop.load(Ordering::Relaxed) {
        let bytes = match pending.take() {
            Some(bytes) => bytes,
            None => match camera.fetch_frame(&url).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "Frame read failed, retrying");
                    tokio::time::sleep(READ_RETRY_DELAY).await;
                    continue;
                }
            },
        };

        if let Err(e) = pipeline.process_bytes(&bytes, kind, "camera").await {
            tracing::error!(url = %url, error = %e, "Frame processing failed");
            hub.broadcast(&HubMessage::error(e.to_string())).await;
        }

        tokio::time::sleep(interval).await;
    }

    tracing::info!(url = %url, "Pull loop exited");
}
