//! Drop-folder watcher.
//!
//! Watches a directory for new audio files and emits them once stable
//! (fully written or synced). Files are deduplicated by content
//! fingerprint for the lifetime of the watch session; there is no
//! persistent queue.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Result;
use notify::RecursiveMode;
use notify_debouncer_mini::new_debouncer;
use thiserror::Error;
use tokio::sync::mpsc;

use super::fingerprint;

/// Errors that can occur with the watcher
#[derive(Debug, Error)]
pub enum WatcherError {
    #[error("Watch directory does not exist: {0}")]
    DirectoryNotFound(PathBuf),

    #[error("Notify error: {0}")]
    Notify(#[from] notify::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration for the watcher
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Directory to watch for dropped clips
    pub watch_path: PathBuf,

    /// How long a file must be stable before it is emitted (seconds)
    pub stability_delay_secs: u64,

    /// File extensions to pick up
    pub extensions: Vec<String>,
}

impl WatcherConfig {
    pub fn new(watch_path: impl Into<PathBuf>) -> Self {
        Self {
            watch_path: watch_path.into(),
            stability_delay_secs: 3,
            extensions: vec![
                "m4a".to_string(),
                "mp3".to_string(),
                "wav".to_string(),
                "ogg".to_string(),
            ],
        }
    }

    pub fn validate(&self) -> Result<(), WatcherError> {
        if !self.watch_path.exists() {
            return Err(WatcherError::DirectoryNotFound(self.watch_path.clone()));
        }
        Ok(())
    }

    fn is_audio_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
            .unwrap_or(false)
    }
}

/// A new stable audio file in the drop folder
#[derive(Debug, Clone)]
pub struct DroppedClip {
    /// Path to the audio file
    pub path: PathBuf,

    /// Content fingerprint (12 chars)
    pub fingerprint: String,

    /// File size in bytes
    pub size: u64,
}

/// Drop-folder watcher with stability checking
pub struct DropFolderWatcher {
    config: WatcherConfig,
}

impl DropFolderWatcher {
    pub fn new(config: WatcherConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WatcherConfig {
        &self.config
    }

    /// Scan the directory once and return every audio file present.
    pub async fn scan_once(&self) -> Result<Vec<DroppedClip>> {
        self.config.validate()?;

        let mut clips = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.config.watch_path).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !self.config.is_audio_file(&path) {
                continue;
            }
            let metadata = match tokio::fs::metadata(&path).await {
                Ok(m) if m.is_file() && m.len() > 0 => m,
                _ => continue,
            };
            let bytes = tokio::fs::read(&path).await?;
            clips.push(DroppedClip {
                fingerprint: fingerprint(&bytes),
                size: metadata.len(),
                path,
            });
        }

        Ok(clips)
    }

    /// Watch the directory and emit events for new stable files.
    /// Runs until stopped through the returned handle.
    pub fn watch(&self) -> Result<(mpsc::Receiver<DroppedClip>, WatchHandle)> {
        self.config.validate()?;

        let (event_tx, event_rx) = mpsc::channel::<DroppedClip>(100);
        let (stop_tx, mut stop_rx) = mpsc::channel::<()>(1);
        let config = self.config.clone();

        let task = tokio::spawn(async move {
            if let Err(e) = run_watcher(config, event_tx, &mut stop_rx).await {
                tracing::error!("Watcher error: {}", e);
            }
        });

        Ok((event_rx, WatchHandle { stop_tx, task }))
    }
}

/// Handle to stop the watcher
pub struct WatchHandle {
    stop_tx: mpsc::Sender<()>,
    task: tokio::task::JoinHandle<()>,
}

impl WatchHandle {
    pub async fn stop(self) -> Result<()> {
        let _ = self.stop_tx.send(()).await;
        self.task.await?;
        Ok(())
    }
}

/// Internal watcher loop
async fn run_watcher(
    config: WatcherConfig,
    event_tx: mpsc::Sender<DroppedClip>,
    stop_rx: &mut mpsc::Receiver<()>,
) -> Result<()> {
    // Files being stabilized (path -> (size, last change))
    let mut pending: HashMap<PathBuf, (u64, Instant)> = HashMap::new();
    // Fingerprints already emitted this session
    let mut seen: HashSet<String> = HashSet::new();

    let (tx, rx) = std::sync::mpsc::channel();
    let mut debouncer = new_debouncer(Duration::from_secs(1), tx)?;
    debouncer
        .watcher()
        .watch(&config.watch_path, RecursiveMode::NonRecursive)?;

    let stability_delay = Duration::from_secs(config.stability_delay_secs);
    tracing::info!("Watching {} for audio clips", config.watch_path.display());

    loop {
        if stop_rx.try_recv().is_ok() {
            tracing::info!("Watcher stopping...");
            break;
        }

        match rx.recv_timeout(Duration::from_millis(500)) {
            Ok(Ok(events)) => {
                for event in events {
                    let path = event.path;
                    if !config.is_audio_file(&path) {
                        continue;
                    }
                    if let Ok(metadata) = std::fs::metadata(&path) {
                        if metadata.is_file() {
                            pending.insert(path, (metadata.len(), Instant::now()));
                        }
                    }
                }
            }
            Ok(Err(e)) => {
                tracing::warn!("Watcher error: {:?}", e);
            }
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {
                // Expected - continue to stability check
            }
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => {
                tracing::error!("Watcher channel disconnected");
                break;
            }
        }

        // Promote files whose size held steady for the stability delay
        let now = Instant::now();
        let mut stable = Vec::new();
        for (path, (last_size, last_seen)) in pending.iter() {
            if now.duration_since(*last_seen) < stability_delay {
                continue;
            }
            if let Ok(metadata) = std::fs::metadata(path) {
                if metadata.len() == *last_size && metadata.len() > 0 {
                    stable.push(path.clone());
                }
            }
        }

        for path in stable {
            pending.remove(&path);
            let bytes = match tokio::fs::read(&path).await {
                Ok(b) => b,
                Err(e) => {
                    tracing::warn!("Failed to read {}: {}", path.display(), e);
                    continue;
                }
            };
            let print = fingerprint(&bytes);
            if !seen.insert(print.clone()) {
                tracing::debug!("Already handled clip {}", path.display());
                continue;
            }

            tracing::info!("New audio clip: {} ({})", path.display(), print);
            let clip = DroppedClip {
                path,
                fingerprint: print,
                size: bytes.len() as u64,
            };
            if event_tx.send(clip).await.is_err() {
                break;
            }
        }

        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    Ok(())
}
