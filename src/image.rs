//! Cover image selection: validation rules and data-URI previews.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use tracing::{debug, error};
use uuid::Uuid;

use crate::error::EditorError;

/// 5 MB.
pub const MAX_IMAGE_BYTES: u64 = 5_242_880;

pub const ACCEPTED_IMAGE_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/gif", "image/webp"];

/// Size and type limits applied when an image is selected.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ImageRules {
  pub max_bytes: u64,
  pub accepted_types: Vec<String>,
}

impl Default for ImageRules {
  fn default() -> Self {
    Self {
      max_bytes: MAX_IMAGE_BYTES,
      accepted_types: ACCEPTED_IMAGE_TYPES.iter().map(|s| s.to_string()).collect(),
    }
  }
}

impl ImageRules {
  /// Size is checked first, then the declared MIME type (exact match).
  pub fn check(&self, file: &ImageFile) -> Result<(), EditorError> {
    let size = file.size();
    if size > self.max_bytes {
      return Err(EditorError::ImageTooLarge { size, max: self.max_bytes });
    }
    if !self.accepted_types.iter().any(|t| t == &file.mime) {
      return Err(EditorError::UnsupportedImageType(file.mime.clone()));
    }
    Ok(())
  }
}

/// A file as picked by the user: name, declared MIME type, raw bytes.
#[derive(Clone, Debug)]
pub struct ImageFile {
  pub file_name: String,
  pub mime: String,
  pub bytes: Arc<[u8]>,
}

impl ImageFile {
  pub fn new(file_name: impl Into<String>, mime: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
    Self { file_name: file_name.into(), mime: mime.into(), bytes: bytes.into() }
  }

  pub fn size(&self) -> u64 {
    self.bytes.len() as u64
  }
}

/// The selected image. `key` changes on every selection so late previews can be matched.
#[derive(Clone, Debug)]
pub struct ImageAsset {
  pub key: Uuid,
  pub file: ImageFile,
  pub preview: Option<String>,
}

/// Work item for rendering a preview off the editor.
#[derive(Clone, Debug)]
pub struct PreviewJob {
  pub key: Uuid,
  pub mime: String,
  pub bytes: Arc<[u8]>,
}

pub fn data_uri(mime: &str, bytes: &[u8]) -> String {
  format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// Encode on the blocking pool; a 5 MB image is too much for a runtime worker.
pub async fn render_preview(job: PreviewJob) -> Option<String> {
  let key = job.key;
  match tokio::task::spawn_blocking(move || data_uri(&job.mime, &job.bytes)).await {
    Ok(uri) => {
      debug!(target: "draft", %key, preview_len = uri.len(), "Image preview rendered");
      Some(uri)
    }
    Err(e) => {
      error!(target: "draft", %key, error = %e, "Image preview task failed");
      None
    }
  }
}
