//! ReportClient - Optional LLM Prose Generation
//!
//! ## Responsibilities
//!
//! - Turn a detection summary into short incident-report prose via an
//!   OpenAI-compatible chat completions endpoint
//! - Degrade to `None` when no endpoint is configured or the call fails
//!
//! Publishing never depends on this client succeeding; callers fall
//! back to the tabular summary.

use crate::risk::RiskAssessment;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Chat-completions client; inert unless a base URL is configured
pub struct ReportClient {
    client: reqwest::Client,
    base_url: Option<String>,
    model: String,
}

impl ReportClient {
    pub fn new(base_url: Option<String>, model: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: base_url.filter(|u| !u.is_empty()),
            model: model
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.base_url.is_some()
    }

    /// Generate incident-report prose for a detection summary.
    ///
    /// Returns `None` when unconfigured or on any transport/shape
    /// failure; the caller's flow must not depend on prose.
    pub async fn detection_report(
        &self,
        summary: &str,
        risk: &RiskAssessment,
    ) -> Option<String> {
        let base_url = self.base_url.as_ref()?;

        let prompt = format!(
            "You are a site safety officer. Write a short incident report \
             (2-3 paragraphs, markdown) for the following image analysis.\n\n\
             Detections:\n{}\n\nRisk score: {} ({})",
            summary, risk.score, risk.level
        );

        match self.request(base_url, &prompt).await {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::warn!(error = %e, "LLM report generation failed");
                None
            }
        }
    }

    async fn request(&self, base_url: &str, prompt: &str) -> crate::Result<String> {
        let url = format!("{}/v1/chat/completions", base_url);
        let body = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: 0.3,
        };

        let resp = self.client.post(&url).json(&body).send().await?;

        if !resp.status().is_success() {
            return Err(crate::Error::Upstream(format!(
                "chat completions returned {}",
                resp.status()
            )));
        }

        let parsed: ChatResponse = resp.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| crate::Error::Upstream("chat completions returned no choices".to_string()))
    }
}
