//! File picker collaborator and local file handles for attachment uploads.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::ApiError;

/// A file chosen on the device, ready to be uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    pub path: PathBuf,
    pub name: String,
    pub mime: String,
}

impl LocalFile {
    /// Build a handle from a path, inferring the name and MIME type.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("file")
            .to_string();
        let mime = mime_for_path(&path).to_string();
        Self { path, name, mime }
    }

    pub async fn read_bytes(&self) -> Result<Vec<u8>, ApiError> {
        tokio::fs::read(&self.path)
            .await
            .map_err(|e| ApiError::Attachment {
                name: self.name.clone(),
                reason: e.to_string(),
            })
    }
}

/// MIME type from the file extension. Documents are images or PDFs.
pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("heic") => "image/heic",
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}

/// Device file picker. `None` means the user cancelled.
#[async_trait]
pub trait FilePicker: Send + Sync {
    async fn pick(&self) -> Option<LocalFile>;
}

/// Picker that hands out pre-selected paths in order.
///
/// Used by the command-line driver, where attachments come from the
/// application file rather than a dialog.
#[derive(Debug, Default)]
pub struct PathQueuePicker {
    queue: Mutex<VecDeque<PathBuf>>,
}

impl PathQueuePicker {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push(&self, path: impl Into<PathBuf>) {
        self.queue.lock().await.push_back(path.into());
    }
}

#[async_trait]
impl FilePicker for PathQueuePicker {
    async fn pick(&self) -> Option<LocalFile> {
        self.queue.lock().await.pop_front().map(LocalFile::from_path)
    }
}
