//! SiteWatch Server Library
//!
//! Real-time site safety risk detection (fire/smoke + PPE)
//!
//! ## Architecture (10 Components)
//!
//! 1. DetectorService - fire/PPE model inference
//! 2. FramePipeline - shared detection path (score, overlay, broadcast)
//! 3. BroadcastHub - WebSocket viewer distribution
//! 4. StreamSession - camera pull loop lifecycle
//! 5. FrameCodec - image decode/encode and overlay drawing
//! 6. Risk - weighted scoring and level classification
//! 7. AlertLog - alert history (ring buffer)
//! 8. MediaStore - upload persistence
//! 9. PostPublisher / ReportClient - report sink + optional LLM prose
//! 10. WebAPI - REST/WebSocket endpoints
//!
//! ## Design Principles
//!
//! - One pipeline: every streaming source funnels through FramePipeline
//! - SOLID: single responsibility per module
//! - Detection models are injected, never global state

pub mod alert_log;
pub mod broadcast_hub;
pub mod detector;
pub mod frame_codec;
pub mod media_store;
pub mod pipeline;
pub mod publisher;
pub mod report;
pub mod risk;
pub mod stream_session;
pub mod web_api;
pub mod models;
pub mod error;
pub mod state;

pub use error::{Error, Result};
pub use state::AppState;
