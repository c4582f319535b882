//! API Routes

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        DefaultBodyLimit, Multipart, Query, State,
    },
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;

use crate::broadcast_hub::HubMessage;
use crate::error::Error;
use crate::frame_codec;
use crate::models::{ApiResponse, Detection, ModelKind, ModelSelector};
use crate::publisher;
use crate::risk;
use crate::state::AppState;

/// Uploaded images and base64 frames can exceed axum's 2 MB default
const BODY_LIMIT_BYTES: usize = 20 * 1024 * 1024;

/// Create API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health & Status
        .route("/healthz", get(super::health_check))
        .route("/detect/health", get(detector_health))
        // Stream control
        .route("/stream/start", post(start_stream))
        .route("/stream/stop", post(stop_stream))
        .route("/stream/status", get(stream_status))
        // Stream ingestion & viewing
        .route("/stream/ws", get(viewer_ws))
        .route("/stream/push", post(push_frame))
        .route("/stream/push-ws", get(push_ws))
        // One-shot analysis
        .route("/detect/image", post(detect_image))
        // Alerts
        .route("/alerts", get(list_alerts))
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .with_state(state)
}

// ========================================
// Stream Control Handlers
// ========================================

#[derive(Debug, Deserialize)]
struct StartStreamRequest {
    url: String,
    kind: Option<String>,
}

async fn start_stream(
    State(state): State<AppState>,
    Json(req): Json<StartStreamRequest>,
) -> Result<impl IntoResponse, crate::Error> {
    let kind = ModelSelector::parse(req.kind.as_deref().unwrap_or("both"));
    state.stream.start(req.url, kind).await?;
    Ok(Json(json!({"ok": true})))
}

async fn stop_stream(State(state): State<AppState>) -> impl IntoResponse {
    state.stream.stop().await;
    Json(json!({"ok": true}))
}

async fn stream_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.stream.status().await)
}

// ========================================
// Frame Push Handlers
// ========================================

#[derive(Debug, Deserialize)]
struct PushFrameRequest {
    image: String,
    kind: Option<String>,
}

async fn push_frame(
    State(state): State<AppState>,
    Json(req): Json<PushFrameRequest>,
) -> Result<impl IntoResponse, crate::Error> {
    let kind = ModelSelector::parse(req.kind.as_deref().unwrap_or("both"));
    let bytes = frame_codec::parse_data_url(&req.image)?;
    let outcome = state.pipeline.process_bytes(&bytes, kind, "push").await?;
    Ok(Json(json!({"ok": true, "risk": outcome.risk})))
}

/// WebSocket upgrade handler for frame producers
async fn push_ws(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_push_socket(socket, state))
}

/// Persistent producer connection: binary messages are frames. A frame
/// that fails decode or inference is skipped without closing the
/// connection; processed frames are echoed back to the producer in
/// addition to the regular viewer broadcast.
async fn handle_push_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    tracing::info!("Push producer connected");

    while let Some(result) = receiver.next().await {
        let bytes = match result {
            Ok(Message::Binary(bytes)) => bytes,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                tracing::warn!(error = %e, "Push producer socket error");
                break;
            }
        };

        let outcome = match state
            .pipeline
            .process_bytes(&bytes, ModelSelector::Both, "push-ws")
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::debug!(error = %e, "Pushed frame rejected");
                continue;
            }
        };

        let echo = HubMessage::Frame {
            image: outcome.image_data_url,
            detections: outcome.detections,
            risk: outcome.risk,
        };
        match serde_json::to_string(&echo) {
            Ok(payload) => {
                if sender.send(Message::Text(payload)).await.is_err() {
                    break;
                }
            }
            Err(e) => tracing::error!(error = %e, "Failed to serialize echo frame"),
        }
    }

    tracing::info!("Push producer disconnected");
}

// ========================================
// Viewer WebSocket Handler
// ========================================

/// WebSocket upgrade handler for viewers
async fn viewer_ws(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_viewer_socket(socket, state))
}

/// Handle a viewer connection
async fn handle_viewer_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    let (viewer_id, mut rx) = state.hub.register().await;

    // Forward hub messages to the socket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg)).await.is_err() {
                break;
            }
        }
    });

    // Inbound viewer traffic is drained and discarded
    let recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Close(_)) | Err(_) => break,
                _ => {}
            }
        }
        viewer_id
    });

    let viewer_id = tokio::select! {
        _ = send_task => viewer_id,
        result = recv_task => result.unwrap_or(viewer_id),
    };

    state.hub.unregister(&viewer_id).await;
}

// ========================================
// One-shot Analysis Handlers
// ========================================

async fn detector_health(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.detector.health())
}

/// POST /detect/image - multipart upload analysis
///
/// Fields: `file` (required), `model` (fire|ppe|both), `publish`,
/// `title`. The original and per-model annotated copies are persisted;
/// nothing is broadcast to stream viewers.
async fn detect_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, crate::Error> {
    let mut file_bytes: Option<Vec<u8>> = None;
    let mut file_name = String::from("upload.jpg");
    let mut selector = ModelSelector::Both;
    let mut publish = false;
    let mut title: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::InvalidInput(format!("malformed multipart body: {}", e)))?
    {
        match field.name().unwrap_or("") {
            "file" => {
                if let Some(name) = field.file_name() {
                    file_name = name.to_string();
                }
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| Error::InvalidInput(format!("failed to read file: {}", e)))?;
                file_bytes = Some(data.to_vec());
            }
            "model" => {
                selector = ModelSelector::parse(&read_text_field(field).await?);
            }
            "publish" => {
                publish = parse_flag(&read_text_field(field).await?);
            }
            "title" => {
                let value = read_text_field(field).await?;
                if !value.trim().is_empty() {
                    title = Some(value);
                }
            }
            _ => {}
        }
    }

    let file_bytes =
        file_bytes.ok_or_else(|| Error::InvalidInput("file field is required".to_string()))?;

    state.detector.ensure_available(selector)?;

    let saved = state.media.save_original(&file_bytes, &file_name).await?;
    let frame = frame_codec::decode_image(&file_bytes)?;

    let results = state.detector.infer(&frame, selector).await?;

    let mut annotated: BTreeMap<String, String> = BTreeMap::new();
    let mut detections: BTreeMap<String, Vec<Detection>> = BTreeMap::new();
    let mut all_detections: Vec<Detection> = Vec::new();

    for (kind, dets) in results {
        let color = match kind {
            ModelKind::Fire => frame_codec::FIRE_COLOR,
            ModelKind::Ppe => frame_codec::PPE_COLOR,
        };
        let view = frame_codec::draw_overlay(&frame, &dets, color);
        let url = state.media.save_annotated(&view, &saved.stem, kind).await?;

        annotated.insert(kind.as_str().to_string(), url);
        all_detections.extend(dets.iter().cloned());
        detections.insert(kind.as_str().to_string(), dets);
    }

    let assessment = risk::assess(&all_detections);

    let mut published = false;
    if publish {
        let summary = publisher::summarize_detections(&all_detections);
        let prose = state.report.detection_report(&summary, &assessment).await;
        let content =
            publisher::build_report_markdown(&summary, selector, &assessment, prose.as_deref());
        let title = title.unwrap_or_else(publisher::default_title);
        published = state.publisher.publish_report(&title, &content).await;
    }

    tracing::info!(
        file = %saved.file_name,
        model = %selector,
        detections = all_detections.len(),
        score = assessment.score,
        published = published,
        "Image analyzed"
    );

    Ok(Json(json!({
        "ok": true,
        "original_url": saved.url,
        "annotated": annotated,
        "detections": detections,
        "model": selector.as_str(),
        "risk": assessment,
        "published": published,
    })))
}

async fn read_text_field(field: axum::extract::multipart::Field<'_>) -> crate::Result<String> {
    field
        .text()
        .await
        .map_err(|e| Error::InvalidInput(format!("failed to read field: {}", e)))
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

// ========================================
// Alert Handlers
// ========================================

#[derive(Debug, Deserialize)]
struct AlertQuery {
    limit: Option<usize>,
    source: Option<String>,
}

async fn list_alerts(
    State(state): State<AppState>,
    Query(query): Query<AlertQuery>,
) -> impl IntoResponse {
    let limit = query.limit.unwrap_or(100);

    let alerts = if let Some(source) = query.source {
        state.alert_log.recent_by_source(&source, limit).await
    } else {
        state.alert_log.recent(limit).await
    };

    Json(ApiResponse::success(alerts))
}
