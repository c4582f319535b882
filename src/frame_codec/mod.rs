//! Frame Codec - Image decode/encode and detection overlay
//!
//! ## Responsibilities
//! - Decode inbound compressed bytes (JPEG/PNG) to an RGB pixel buffer
//! - Encode annotated buffers back to JPEG for transport
//! - Parse and format `data:image/jpeg;base64,` payloads
//! - Draw detection overlays (per-category colors)
//!
//! Overlay drawing is non-destructive: callers keep the original buffer,
//! annotation happens on a working copy.

mod overlay;

pub use overlay::{draw_detections, draw_text};

use crate::error::{Error, Result};
use crate::models::Detection;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};
use std::io::Cursor;

/// Box/label color for fire & smoke detections (blue)
pub const FIRE_COLOR: Rgb<u8> = Rgb([0, 0, 255]);
/// Box/label color for PPE detections (yellow)
pub const PPE_COLOR: Rgb<u8> = Rgb([255, 255, 0]);

/// Outbound frame payload prefix
pub const DATA_URL_PREFIX: &str = "data:image/jpeg;base64,";

/// JPEG quality for encoded broadcast/overlay frames
const JPEG_QUALITY: u8 = 80;

/// Decode compressed image bytes into an RGB buffer.
pub fn decode_image(bytes: &[u8]) -> Result<RgbImage> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| Error::InvalidImage(format!("image decode failed: {}", e)))?;
    Ok(img.to_rgb8())
}

/// Encode an RGB buffer as JPEG.
pub fn encode_jpeg(frame: &RgbImage) -> Result<Vec<u8>> {
    if frame.width() == 0 || frame.height() == 0 {
        return Err(Error::Codec("cannot encode zero-sized frame".to_string()));
    }
    let mut buf = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY)
        .encode_image(frame)
        .map_err(|e| Error::Codec(format!("jpeg encode failed: {}", e)))?;
    Ok(buf.into_inner())
}

/// Draw one detection set onto a working copy of `frame`.
pub fn draw_overlay(frame: &RgbImage, detections: &[Detection], color: Rgb<u8>) -> RgbImage {
    let mut view = frame.clone();
    draw_detections(&mut view, detections, color);
    view
}

/// Extract the JPEG bytes from a `data:image/jpeg;base64,` payload.
/// The prefix match is case-insensitive.
pub fn parse_data_url(data_url: &str) -> Result<Vec<u8>> {
    let prefix_len = DATA_URL_PREFIX.len();
    if data_url.len() <= prefix_len
        || !data_url[..prefix_len].eq_ignore_ascii_case(DATA_URL_PREFIX)
    {
        return Err(Error::InvalidInput("invalid dataURL".to_string()));
    }
    BASE64
        .decode(&data_url[prefix_len..])
        .map_err(|_| Error::InvalidInput("invalid dataURL".to_string()))
}

/// Format JPEG bytes as a `data:image/jpeg;base64,` payload.
pub fn to_data_url(jpeg: &[u8]) -> String {
    format!("{}{}", DATA_URL_PREFIX, BASE64.encode(jpeg))
}
