//! MediaStore - Upload Persistence
//!
//! ## Responsibilities
//!
//! - Own the upload directory layout (`orig/` and `annot/`)
//! - Save original uploads under a fresh opaque name
//! - Save per-model annotated copies next to them
//!
//! Files are served back by the static file layer; this module only
//! writes them and hands out the public URLs.

use crate::error::{Error, Result};
use crate::frame_codec;
use crate::models::ModelKind;
use image::RgbImage;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

/// Route prefix the static file layer serves the media root under
pub const PUBLIC_ROUTE: &str = "/uploads";

const ORIG_DIR: &str = "orig";
const ANNOT_DIR: &str = "annot";

/// A saved original upload
#[derive(Debug, Clone)]
pub struct StoredOriginal {
    /// Opaque name stem, shared by the annotated copies
    pub stem: String,
    pub file_name: String,
    /// Public URL, e.g. `/uploads/orig/<stem>.jpg`
    pub url: String,
    pub path: PathBuf,
}

/// MediaStore instance
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    /// Create the store, ensuring the directory layout exists.
    pub async fn new(root: PathBuf) -> Result<Self> {
        fs::create_dir_all(root.join(ORIG_DIR)).await?;
        fs::create_dir_all(root.join(ANNOT_DIR)).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persist an uploaded original under a fresh uuid name, keeping a
    /// sanitized version of the client's file extension.
    pub async fn save_original(&self, bytes: &[u8], client_name: &str) -> Result<StoredOriginal> {
        if bytes.is_empty() {
            return Err(Error::InvalidInput("empty file".to_string()));
        }

        let stem = Uuid::new_v4().simple().to_string();
        let ext = sanitize_extension(client_name);
        let file_name = format!("{}.{}", stem, ext);
        let path = self.root.join(ORIG_DIR).join(&file_name);

        fs::write(&path, bytes).await?;
        tracing::debug!(
            path = %path.display(),
            size = bytes.len(),
            "Saved original upload"
        );

        Ok(StoredOriginal {
            url: format!("{}/{}/{}", PUBLIC_ROUTE, ORIG_DIR, file_name),
            stem,
            file_name,
            path,
        })
    }

    /// Persist a model's annotated copy as JPEG, returning its public URL.
    pub async fn save_annotated(
        &self,
        frame: &RgbImage,
        stem: &str,
        kind: ModelKind,
    ) -> Result<String> {
        let jpeg = frame_codec::encode_jpeg(frame)?;
        let file_name = format!("{}_{}.jpg", stem, kind.as_str());
        let path = self.root.join(ANNOT_DIR).join(&file_name);

        fs::write(&path, &jpeg).await?;
        tracing::debug!(
            path = %path.display(),
            size = jpeg.len(),
            "Saved annotated upload"
        );

        Ok(format!("{}/{}/{}", PUBLIC_ROUTE, ANNOT_DIR, file_name))
    }
}

/// Lowercased alphanumeric extension from the client file name; falls
/// back to `jpg` for anything missing or suspicious.
fn sanitize_extension(client_name: &str) -> String {
    let ext = Path::new(client_name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    if ext.is_empty() || ext.len() > 5 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        "jpg".to_string()
    } else {
        ext
    }
}
