//! Application state
//!
//! Holds all shared components and state

use crate::alert_log::AlertLog;
use crate::broadcast_hub::BroadcastHub;
use crate::detector::{DetectorService, DEFAULT_CONFIDENCE};
use crate::media_store::MediaStore;
use crate::pipeline::FramePipeline;
use crate::publisher::PostPublisher;
use crate::report::ReportClient;
use crate::stream_session::StreamSessionManager;
use std::path::PathBuf;
use std::sync::Arc;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Fire/smoke model weights path (`stub` loads the stub backend)
    pub fire_model_path: Option<String>,
    /// Fire/smoke labels & thresholds JSON path
    pub fire_labels_path: Option<String>,
    /// PPE model weights path (`stub` loads the stub backend)
    pub ppe_model_path: Option<String>,
    /// PPE labels & thresholds JSON path
    pub ppe_labels_path: Option<String>,
    /// Confidence floor when a label has no threshold entry
    pub detector_default_conf: f32,
    /// Upload storage root, served at /uploads
    pub media_root: PathBuf,
    /// CMS base URL for report publishing
    pub posts_base_url: Option<String>,
    /// CMS bearer token
    pub posts_token: Option<String>,
    /// OpenAI-compatible LLM base URL for report prose
    pub llm_base_url: Option<String>,
    /// LLM model name
    pub llm_model: Option<String>,
    /// Alert ring buffer capacity
    pub alert_log_capacity: usize,
    /// Camera pull loop interval in milliseconds
    pub stream_interval_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("SITEWATCH_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("SITEWATCH_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            fire_model_path: std::env::var("FIRE_MODEL_PATH").ok(),
            fire_labels_path: std::env::var("FIRE_LABELS").ok(),
            ppe_model_path: std::env::var("PPE_MODEL_PATH").ok(),
            ppe_labels_path: std::env::var("PPE_LABELS").ok(),
            detector_default_conf: std::env::var("DETECTOR_CONF")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_CONFIDENCE),
            media_root: std::env::var("MEDIA_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./uploads")),
            posts_base_url: std::env::var("POSTS_BASE_URL").ok(),
            posts_token: std::env::var("POSTS_TOKEN").ok(),
            llm_base_url: std::env::var("LLM_BASE_URL").ok(),
            llm_model: std::env::var("LLM_MODEL").ok(),
            alert_log_capacity: std::env::var("ALERT_LOG_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(500),
            stream_interval_ms: std::env::var("STREAM_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(100),
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Application config
    pub config: AppConfig,
    /// DetectorService (fire/PPE models)
    pub detector: Arc<DetectorService>,
    /// BroadcastHub (WebSocket viewers)
    pub hub: Arc<BroadcastHub>,
    /// AlertLog (in-memory ring buffer)
    pub alert_log: Arc<AlertLog>,
    /// FramePipeline (shared detection path)
    pub pipeline: Arc<FramePipeline>,
    /// StreamSessionManager (camera pull loop)
    pub stream: Arc<StreamSessionManager>,
    /// MediaStore (upload persistence)
    pub media: Arc<MediaStore>,
    /// PostPublisher (report sink)
    pub publisher: Arc<PostPublisher>,
    /// ReportClient (optional LLM prose)
    pub report: Arc<ReportClient>,
}

impl AppState {
    /// Wire up every service from configuration.
    pub async fn build(config: AppConfig) -> crate::Result<Self> {
        let detector = Arc::new(DetectorService::from_config(&config)?);
        let hub = Arc::new(BroadcastHub::new());
        let alert_log = Arc::new(AlertLog::new(config.alert_log_capacity));
        let pipeline = Arc::new(FramePipeline::new(
            detector.clone(),
            hub.clone(),
            alert_log.clone(),
        ));
        let stream = Arc::new(StreamSessionManager::new(
            pipeline.clone(),
            hub.clone(),
            config.stream_interval_ms,
        ));
        let media = Arc::new(MediaStore::new(config.media_root.clone()).await?);
        let publisher = Arc::new(PostPublisher::new(
            config.posts_base_url.clone(),
            config.posts_token.clone(),
        ));
        let report = Arc::new(ReportClient::new(
            config.llm_base_url.clone(),
            config.llm_model.clone(),
        ));

        Ok(Self {
            config,
            detector,
            hub,
            alert_log,
            pipeline,
            stream,
            media,
            publisher,
            report,
        })
    }
}
