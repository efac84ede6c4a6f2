use std::fmt;
use std::path::PathBuf;

/// One downloadable unit (a single video or audio track) within a batch.
///
/// Produced by the playlist resolver; identity is the URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadItem {
    pub id: String,
    pub title: String,
    pub url: String,
}

/// Output format selected by the user. Drives the engine's option set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatChoice {
    Mp3,
    Flac,
    Mp4,
}

impl FormatChoice {
    pub const ALL: [FormatChoice; 3] = [FormatChoice::Mp3, FormatChoice::Flac, FormatChoice::Mp4];
}

impl Default for FormatChoice {
    fn default() -> Self {
        Self::Mp3
    }
}

impl fmt::Display for FormatChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FormatChoice::Mp3 => "MP3",
            FormatChoice::Flac => "FLAC (Lossless)",
            FormatChoice::Mp4 => "MP4",
        })
    }
}

/// Result of resolving a URL: either a single item or a whole collection.
#[derive(Debug, Clone)]
pub struct PlaylistInfo {
    pub is_collection: bool,
    pub title: String,
    pub items: Vec<DownloadItem>,
}

/// Everything one worker run consumes. The item list is never empty and never
/// mutated after the worker starts.
#[derive(Debug, Clone)]
pub struct BatchJob {
    pub items: Vec<DownloadItem>,
    pub format: FormatChoice,
    pub destination: PathBuf,
}

impl BatchJob {
    /// Returns `None` for an empty selection; callers must reject that case
    /// before a job exists at all.
    pub fn new(items: Vec<DownloadItem>, format: FormatChoice, destination: PathBuf) -> Option<Self> {
        if items.is_empty() {
            return None;
        }
        Some(Self {
            items,
            format,
            destination,
        })
    }
}

/// One failed item, with the engine's message verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
    pub item: DownloadItem,
    pub message: String,
}

/// Outcome of a whole batch run, produced exactly once after every item has
/// been attempted.
#[derive(Debug, Clone)]
pub struct BatchResult {
    pub succeeded: usize,
    pub failures: Vec<ItemFailure>,
}

/// Failure lines quoted in the summary before the overflow count kicks in.
const MAX_REPORTED_FAILURES: usize = 5;

impl BatchResult {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// User-facing summary: a success line naming the count, or the first
    /// five "title: error" lines plus an overflow count.
    pub fn summary(&self) -> String {
        if self.failures.is_empty() {
            return format!("Downloaded {} video(s) successfully!", self.succeeded);
        }

        let mut msg = format!("Completed with {} error(s):", self.failures.len());
        for failure in self.failures.iter().take(MAX_REPORTED_FAILURES) {
            msg.push('\n');
            msg.push_str(&failure.item.title);
            msg.push_str(": ");
            msg.push_str(&failure.message);
        }
        if self.failures.len() > MAX_REPORTED_FAILURES {
            msg.push_str(&format!(
                "\n... and {} more errors",
                self.failures.len() - MAX_REPORTED_FAILURES
            ));
        }
        msg
    }
}
