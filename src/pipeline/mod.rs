//! FramePipeline - Shared risk detection path
//!
//! ## Responsibilities
//! - Run detection over one frame and combine fire + PPE results
//! - Score the combined detections and classify the risk level
//! - Draw the combined overlay, encode it and broadcast to viewers
//! - Record High/Critical events in the alert log
//!
//! Every streaming ingestion source (camera pull loop, HTTP push,
//! push WebSocket) funnels frames through here so overlay colors,
//! wire shapes and alert behavior stay identical regardless of how a
//! frame arrived. One-shot uploads bypass the pipeline on purpose:
//! they annotate per model and never broadcast.

use crate::alert_log::{AlertEntry, AlertLog};
use crate::broadcast_hub::{BroadcastHub, HubMessage};
use crate::detector::DetectorService;
use crate::error::Result;
use crate::frame_codec;
use crate::models::{Detection, ModelKind, ModelSelector};
use crate::risk::{self, RiskAssessment};
use image::RgbImage;
use std::sync::Arc;

/// Streaming paths show only PPE violations ("NO-" labels); compliant
/// gear would bury the warnings at a glance.
const PPE_WARNINGS_ONLY: bool = true;

const ALERT_MESSAGE: &str = "risk detected";

/// What one pipeline run produced, for callers that respond over HTTP
#[derive(Debug)]
pub struct PipelineOutcome {
    pub risk: RiskAssessment,
    pub detections: Vec<Detection>,
    /// Annotated frame as a `data:image/jpeg;base64,` payload
    pub image_data_url: String,
}

pub struct FramePipeline {
    detector: Arc<DetectorService>,
    hub: Arc<BroadcastHub>,
    alert_log: Arc<AlertLog>,
}

impl FramePipeline {
    pub fn new(
        detector: Arc<DetectorService>,
        hub: Arc<BroadcastHub>,
        alert_log: Arc<AlertLog>,
    ) -> Self {
        Self {
            detector,
            hub,
            alert_log,
        }
    }

    /// Decode compressed image bytes, then run the frame pipeline.
    pub async fn process_bytes(
        &self,
        bytes: &[u8],
        selector: ModelSelector,
        source: &str,
    ) -> Result<PipelineOutcome> {
        let frame = frame_codec::decode_image(bytes)?;
        self.process_frame(&frame, selector, source).await
    }

    /// Run detection, risk scoring, overlay and broadcast for one frame.
    ///
    /// The frame message always goes out first; an alert follows only for
    /// High/Critical assessments. Errors propagate to the caller without
    /// broadcasting anything.
    pub async fn process_frame(
        &self,
        frame: &RgbImage,
        selector: ModelSelector,
        source: &str,
    ) -> Result<PipelineOutcome> {
        let mut results = self.detector.infer(frame, selector).await?;

        let fire_dets = results.remove(&ModelKind::Fire).unwrap_or_default();
        let mut ppe_dets = results.remove(&ModelKind::Ppe).unwrap_or_default();
        if PPE_WARNINGS_ONLY {
            ppe_dets.retain(|d| d.label.to_ascii_lowercase().starts_with("no-"));
        }

        let mut detections = Vec::with_capacity(fire_dets.len() + ppe_dets.len());
        detections.extend(fire_dets.iter().cloned());
        detections.extend(ppe_dets.iter().cloned());

        let assessment = risk::assess(&detections);

        let mut view = frame.clone();
        frame_codec::draw_detections(&mut view, &fire_dets, frame_codec::FIRE_COLOR);
        frame_codec::draw_detections(&mut view, &ppe_dets, frame_codec::PPE_COLOR);

        let jpeg = frame_codec::encode_jpeg(&view)?;
        let image_data_url = frame_codec::to_data_url(&jpeg);

        self.hub
            .broadcast(&HubMessage::Frame {
                image: image_data_url.clone(),
                detections: detections.clone(),
                risk: assessment,
            })
            .await;

        if assessment.is_alert() {
            self.hub
                .broadcast(&HubMessage::Alert {
                    severity: assessment.level,
                    message: ALERT_MESSAGE.to_string(),
                    risk: assessment,
                    detections: detections.clone(),
                })
                .await;

            let labels = detections.iter().map(|d| d.label.clone()).collect();
            self.alert_log
                .append(AlertEntry::new(
                    assessment.level,
                    assessment.score,
                    ALERT_MESSAGE,
                    labels,
                    source,
                ))
                .await;

            tracing::warn!(
                source = %source,
                level = %assessment.level,
                score = assessment.score,
                "Risk alert raised"
            );
        }

        Ok(PipelineOutcome {
            risk: assessment,
            detections,
            image_data_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::{ModelHandle, ModelMeta, RawDetection, StubBackend};
    use crate::error::Error;
    use crate::risk::RiskLevel;
    use tokio::sync::mpsc::error::TryRecvError;

    fn raw(class_id: usize, conf: f32) -> RawDetection {
        RawDetection {
            class_id,
            conf,
            bbox: [10.0, 10.0, 60.0, 60.0],
        }
    }

    fn fire_service(dets: Vec<RawDetection>) -> Arc<DetectorService> {
        Arc::new(DetectorService::new(
            Some(ModelHandle::new(
                Box::new(StubBackend::with_detections(dets).with_labels(&["fire", "smoke"])),
                ModelMeta::empty(),
                "fire.onnx",
            )),
            None,
        ))
    }

    fn ppe_service(dets: Vec<RawDetection>) -> Arc<DetectorService> {
        Arc::new(DetectorService::new(
            None,
            Some(ModelHandle::new(
                Box::new(
                    StubBackend::with_detections(dets).with_labels(&["NO-helmet", "Hardhat"]),
                ),
                ModelMeta::empty(),
                "ppe.onnx",
            )),
        ))
    }

    fn pipeline(detector: Arc<DetectorService>) -> (FramePipeline, Arc<BroadcastHub>, Arc<AlertLog>)
    {
        let hub = Arc::new(BroadcastHub::new());
        let log = Arc::new(AlertLog::new(10));
        (
            FramePipeline::new(detector, hub.clone(), log.clone()),
            hub,
            log,
        )
    }

    fn frame() -> RgbImage {
        RgbImage::from_pixel(100, 100, image::Rgb([40, 40, 40]))
    }

    #[tokio::test]
    async fn fire_detection_broadcasts_frame_then_alert() {
        let (pipeline, hub, log) = pipeline(fire_service(vec![raw(0, 0.9)]));
        let (_id, mut rx) = hub.register().await;

        let outcome = pipeline
            .process_frame(&frame(), ModelSelector::Both, "camera")
            .await
            .unwrap();

        assert_eq!(outcome.risk.score, 40);
        assert_eq!(outcome.risk.level, RiskLevel::High);
        assert!(outcome.image_data_url.starts_with("data:image/jpeg;base64,"));

        let first: serde_json::Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(first["type"], "frame");
        assert_eq!(first["detections"][0]["label"], "fire");

        let second: serde_json::Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(second["type"], "alert");
        assert_eq!(second["severity"], "High");
        assert_eq!(second["message"], "risk detected");

        assert_eq!(log.count().await, 1);
        let entry = &log.recent(1).await[0];
        assert_eq!(entry.source, "camera");
        assert_eq!(entry.labels, vec!["fire"]);
    }

    #[tokio::test]
    async fn clean_frame_broadcasts_without_alert() {
        let (pipeline, hub, log) = pipeline(fire_service(vec![]));
        let (_id, mut rx) = hub.register().await;

        let outcome = pipeline
            .process_frame(&frame(), ModelSelector::Both, "push")
            .await
            .unwrap();

        assert_eq!(outcome.risk.score, 0);
        assert_eq!(outcome.risk.level, RiskLevel::Normal);
        assert!(outcome.detections.is_empty());

        let first: serde_json::Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(first["type"], "frame");
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
        assert_eq!(log.count().await, 0);
    }

    #[tokio::test]
    async fn compliant_ppe_detections_are_hidden() {
        // class 0 = NO-helmet (violation), class 1 = Hardhat (compliant)
        let (pipeline, hub, log) = pipeline(ppe_service(vec![raw(0, 0.8), raw(1, 0.9)]));
        let (_id, mut rx) = hub.register().await;

        let outcome = pipeline
            .process_frame(&frame(), ModelSelector::Both, "push")
            .await
            .unwrap();

        assert_eq!(outcome.detections.len(), 1);
        assert_eq!(outcome.detections[0].label, "NO-helmet");
        assert_eq!(outcome.risk.score, 10);
        assert_eq!(outcome.risk.level, RiskLevel::Warning);

        let first: serde_json::Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(first["detections"].as_array().unwrap().len(), 1);
        // Warning does not alert
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
        assert_eq!(log.count().await, 0);
    }

    #[tokio::test]
    async fn decode_failure_broadcasts_nothing() {
        let (pipeline, hub, log) = pipeline(fire_service(vec![raw(0, 0.9)]));
        let (_id, mut rx) = hub.register().await;

        let err = pipeline
            .process_bytes(b"not an image", ModelSelector::Both, "push")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::InvalidImage(_)));
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
        assert_eq!(log.count().await, 0);
    }

    #[tokio::test]
    async fn broadcast_frame_round_trips_as_jpeg() {
        let (pipeline, _hub, _log) = pipeline(fire_service(vec![raw(0, 0.9)]));

        let outcome = pipeline
            .process_frame(&frame(), ModelSelector::Both, "camera")
            .await
            .unwrap();

        let jpeg = frame_codec::parse_data_url(&outcome.image_data_url).unwrap();
        let decoded = frame_codec::decode_image(&jpeg).unwrap();
        assert_eq!(decoded.dimensions(), (100, 100));
    }
}
