//! PostPublisher - Report Publishing Sink
//!
//! ## Responsibilities
//!
//! - Build the tabular detection summary and report markdown
//! - Create posts on the configured CMS (`POST {base}/posts`)
//! - Swallow sink failures: publishing is strictly best-effort and
//!   never fails the request that triggered it

use crate::models::{Detection, ModelSelector};
use crate::risk::RiskAssessment;
use chrono::Utc;
use serde::Serialize;
use std::time::Duration;

const REPORT_CATEGORY: &str = "reports";

#[derive(Debug, Serialize)]
struct PostBody<'a> {
    category: &'a str,
    title: &'a str,
    content_md: &'a str,
}

/// CMS client; inert unless a base URL is configured
pub struct PostPublisher {
    client: reqwest::Client,
    base_url: Option<String>,
    token: Option<String>,
}

impl PostPublisher {
    pub fn new(base_url: Option<String>, token: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: base_url.filter(|u| !u.is_empty()),
            token: token.filter(|t| !t.is_empty()),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.base_url.is_some()
    }

    /// Create a report post. Returns whether the post was accepted;
    /// unconfigured and failed publishes both come back `false`.
    pub async fn publish_report(&self, title: &str, content_md: &str) -> bool {
        let Some(base_url) = self.base_url.as_ref() else {
            tracing::debug!("Post publishing not configured, skipping");
            return false;
        };

        let url = format!("{}/posts", base_url);
        let body = PostBody {
            category: REPORT_CATEGORY,
            title,
            content_md,
        };

        let mut req = self.client.post(&url).json(&body);
        if let Some(token) = self.token.as_ref() {
            req = req.bearer_auth(token);
        }

        match req.send().await {
            Ok(resp) if resp.status().is_success() => {
                tracing::info!(title = %title, "Report published");
                true
            }
            Ok(resp) => {
                tracing::warn!(status = %resp.status(), "Report publish rejected");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "Report publish failed");
                false
            }
        }
    }
}

/// Default report title, stamped with the current time.
pub fn default_title() -> String {
    format!("Image analysis {}", Utc::now().format("%Y-%m-%d %H:%M"))
}

/// Per-label counts as markdown bullets, most frequent first (ties keep
/// first-seen order). Empty input yields a single `No detections` line.
pub fn summarize_detections(detections: &[Detection]) -> String {
    if detections.is_empty() {
        return "- No detections".to_string();
    }

    let mut counts: Vec<(String, usize)> = Vec::new();
    for det in detections {
        match counts.iter_mut().find(|(label, _)| *label == det.label) {
            Some((_, n)) => *n += 1,
            None => counts.push((det.label.clone(), 1)),
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));

    counts
        .iter()
        .map(|(label, n)| format!("- {}: {}", label, n))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Assemble the post body. Optional prose (from the LLM) leads; the
/// tabular block always follows so the raw numbers survive.
pub fn build_report_markdown(
    summary: &str,
    selector: ModelSelector,
    risk: &RiskAssessment,
    prose: Option<&str>,
) -> String {
    let block = format!(
        "## Detection Summary\n{}\n\n**Model**: {}\n**Risk**: {} ({})",
        summary, selector, risk.score, risk.level
    );

    match prose {
        Some(text) => format!("{}\n\n{}", text.trim(), block),
        None => block,
    }
}
