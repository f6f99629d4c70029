//! Audio clip acquisition.
//!
//! The pipeline never branches on where audio comes from; it only
//! consumes the `AudioCapture` capability. Implementations here are
//! file-based: a single clip read from disk, and a drop-folder watcher
//! for continuous ingestion.

pub mod watcher;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use thiserror::Error;

pub use watcher::{DropFolderWatcher, DroppedClip, WatchHandle, WatcherConfig};

/// Errors raised while acquiring a clip.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// No audio payload; rejected before any processing
    #[error("Audio clip is empty")]
    EmptyClip,

    #[error("Audio file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A captured audio clip ready for upload.
#[derive(Debug, Clone)]
pub struct AudioClip {
    /// Short content fingerprint (SHA256, 12 chars); used in logs and
    /// as the multipart filename stem
    pub id: String,

    /// Raw clip bytes
    pub bytes: Vec<u8>,

    /// MIME type guessed from the source extension
    pub mime: String,

    /// Filename presented to the transcription service
    pub file_name: String,
}

impl AudioClip {
    /// Wrap raw bytes. An empty payload is rejected immediately.
    pub fn from_bytes(bytes: Vec<u8>, mime: &str, extension: &str) -> Result<Self, CaptureError> {
        if bytes.is_empty() {
            return Err(CaptureError::EmptyClip);
        }
        let id = fingerprint(&bytes);
        Ok(Self {
            file_name: format!("{}.{}", id, extension),
            id,
            bytes,
            mime: mime.to_string(),
        })
    }

    /// Read a clip from disk.
    pub async fn from_file(path: &Path) -> Result<Self, CaptureError> {
        if !path.exists() {
            return Err(CaptureError::FileNotFound(path.to_path_buf()));
        }
        let bytes = tokio::fs::read(path).await?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("bin")
            .to_lowercase();
        Self::from_bytes(bytes, mime_for_extension(&extension), &extension)
    }
}

/// Short SHA256 content hash (12 hex chars).
pub fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(&hasher.finalize()[..6])
}

/// MIME type for the audio extensions we accept.
pub fn mime_for_extension(extension: &str) -> &'static str {
    match extension {
        "m4a" | "mp4" => "audio/mp4",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "webm" => "audio/webm",
        _ => "application/octet-stream",
    }
}

/// Opaque token tying a `stop` to its `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureHandle(pub u64);

/// Capability interface for recording audio.
#[async_trait]
pub trait AudioCapture: Send + Sync {
    /// Begin a recording session.
    async fn start(&self) -> Result<CaptureHandle, CaptureError>;

    /// Finish the session and return the captured clip.
    async fn stop(&self, handle: CaptureHandle) -> Result<AudioClip, CaptureError>;
}

/// Capture backed by a file already on disk (the CLI path: recording
/// happened elsewhere, the file stands in for the microphone).
pub struct FileCapture {
    path: PathBuf,
}

impl FileCapture {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl AudioCapture for FileCapture {
    async fn start(&self) -> Result<CaptureHandle, CaptureError> {
        Ok(CaptureHandle(0))
    }

    async fn stop(&self, _handle: CaptureHandle) -> Result<AudioClip, CaptureError> {
        AudioClip::from_file(&self.path).await
    }
}
