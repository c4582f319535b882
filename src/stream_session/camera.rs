//! HTTP snapshot capture for the camera pull loop.

use crate::error::{Error, Result};
use std::time::Duration;

/// Fetches single frames from a camera's HTTP snapshot URL.
pub struct CameraSource {
    client: reqwest::Client,
}

impl CameraSource {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");
        Self { client }
    }

    /// GET one compressed frame from the snapshot URL.
    pub async fn fetch_frame(&self, url: &str) -> Result<Vec<u8>> {
        let resp = self.client.get(url).send().await?;

        if !resp.status().is_success() {
            return Err(Error::Upstream(format!(
                "camera returned {}",
                resp.status()
            )));
        }

        let bytes = resp.bytes().await?;
        tracing::debug!(url = %url, size = bytes.len(), "Frame fetched");
        Ok(bytes.to_vec())
    }
}

impl Default for CameraSource {
    fn default() -> Self {
        Self::new()
    }
}
