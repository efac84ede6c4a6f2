mod ytdlp;

use std::path::PathBuf;

use thiserror::Error;

use crate::domain::{DownloadItem, FormatChoice, PlaylistInfo};

pub use ytdlp::YtDlpEngine;

/// Errors surfaced by the extraction engine. The payload is the engine's own
/// message, passed through unmodified.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// Resolving a URL failed; nothing was downloaded.
    #[error("{0}")]
    Extraction(String),

    /// A single item's fetch or transcode failed.
    #[error("{0}")]
    Download(String),
}

/// Per-item option set, derived deterministically from the batch job.
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    pub format: FormatChoice,
    pub destination: PathBuf,
}

/// Stage of a single item's transfer as reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressPhase {
    Downloading,
    Finished,
}

/// Capability injected into a per-item download call. The engine reports raw
/// byte counters; translating them into a percentage is the caller's job.
pub trait ProgressSink {
    fn on_progress(&self, downloaded: u64, total: Option<u64>, phase: ProgressPhase);
}

/// The seam to the external media engine: metadata-only resolution and
/// blocking per-item downloads. Both calls are slow, I/O-bound operations and
/// must never run on a thread that has to stay responsive.
pub trait MediaEngine: Send + Sync {
    /// Ask the engine whether `url` is a single item or a collection, without
    /// fetching any media bytes.
    fn resolve(&self, url: &str) -> Result<PlaylistInfo, EngineError>;

    /// Fetch and transcode one item, reporting transfer progress through
    /// `progress`. Blocks until the engine is done with the item.
    fn download(
        &self,
        item: &DownloadItem,
        options: &DownloadOptions,
        progress: &dyn ProgressSink,
    ) -> Result<(), EngineError>;
}
