use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};
use std::thread;

use log::{debug, warn};
use regex::Regex;
use serde_json::Value;
use url::Url;

use super::{DownloadOptions, EngineError, MediaEngine, ProgressPhase, ProgressSink};
use crate::domain::{DownloadItem, FormatChoice, PlaylistInfo};

const WATCH_URL_BASE: &str = "https://www.youtube.com/watch?v=";

/// Progress reporting requested from yt-dlp. The leading `download:` selects
/// the template type; the rest is printed verbatim once per update, so stdout
/// carries self-identifying lines like
/// `progress downloading 1048576 52428800 NA`.
const PROGRESS_TEMPLATE: &str = "download:progress %(progress.status)s \
     %(progress.downloaded_bytes)s %(progress.total_bytes)s \
     %(progress.total_bytes_estimate)s";

/// Media engine backed by the `yt-dlp` binary.
///
/// The binary is looked up on `PATH`, overridable through `YT2MPEG_YTDLP`
/// (read once at construction).
pub struct YtDlpEngine {
    binary: PathBuf,
    progress_line: Regex,
    error_line: Regex,
}

impl Default for YtDlpEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl YtDlpEngine {
    pub fn new() -> Self {
        let binary = std::env::var_os("YT2MPEG_YTDLP")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("yt-dlp"));

        Self {
            binary,
            progress_line: Regex::new(r"^progress (\S+) (\S+) (\S+) (\S+)$").unwrap(),
            error_line: Regex::new(r"(?m)^ERROR:\s*(.+)$").unwrap(),
        }
    }

    /// Parse one stdout line emitted by [`PROGRESS_TEMPLATE`]. Counters yt-dlp
    /// does not know yet render as `NA`; the estimate stands in for a missing
    /// total.
    fn parse_progress(&self, line: &str) -> Option<(ProgressPhase, u64, Option<u64>)> {
        let caps = self.progress_line.captures(line.trim())?;
        let phase = match &caps[1] {
            "downloading" => ProgressPhase::Downloading,
            "finished" => ProgressPhase::Finished,
            _ => return None,
        };
        let downloaded = parse_counter(&caps[2]).unwrap_or(0);
        let total = parse_counter(&caps[3]).or_else(|| parse_counter(&caps[4]));
        Some((phase, downloaded, total))
    }

    /// The engine's own message for a failed invocation: the last `ERROR:`
    /// line of stderr, falling back to the last non-empty line, then to the
    /// exit status.
    fn engine_message(&self, stderr: &str, status: ExitStatus) -> String {
        self.last_error_line(stderr)
            .unwrap_or_else(|| format!("yt-dlp exited with {}", status))
    }

    fn last_error_line(&self, stderr: &str) -> Option<String> {
        if let Some(caps) = self.error_line.captures_iter(stderr).last() {
            return Some(caps[1].to_string());
        }
        stderr
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string)
    }
}

impl MediaEngine for YtDlpEngine {
    fn resolve(&self, url: &str) -> Result<PlaylistInfo, EngineError> {
        if Url::parse(url).is_err() {
            return Err(EngineError::Extraction(format!("not a valid URL: {}", url)));
        }

        debug!("resolving {} via {}", url, self.binary.display());
        let output = Command::new(&self.binary)
            .args(["--dump-single-json", "--flat-playlist", "--no-warnings"])
            .arg(url)
            .output()
            .map_err(|e| {
                EngineError::Extraction(format!("failed to start {}: {}", self.binary.display(), e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EngineError::Extraction(
                self.engine_message(&stderr, output.status),
            ));
        }

        let info: Value = serde_json::from_slice(&output.stdout)
            .map_err(|e| EngineError::Extraction(format!("unreadable metadata: {}", e)))?;
        Ok(parse_playlist_info(url, &info))
    }

    fn download(
        &self,
        item: &DownloadItem,
        options: &DownloadOptions,
        progress: &dyn ProgressSink,
    ) -> Result<(), EngineError> {
        let args = build_download_args(options);
        debug!("downloading {} with args {:?}", item.url, args);

        let mut child = Command::new(&self.binary)
            .args(&args)
            .arg(&item.url)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                EngineError::Download(format!("failed to start {}: {}", self.binary.display(), e))
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::Download("failed to capture yt-dlp stdout".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| EngineError::Download("failed to capture yt-dlp stderr".to_string()))?;

        // Drain stderr on the side so a chatty process can't deadlock us.
        let stderr_handle = thread::spawn(move || {
            let mut lines = Vec::new();
            for line in BufReader::new(stderr).lines().map_while(Result::ok) {
                lines.push(line);
            }
            lines.join("\n")
        });

        for line in BufReader::new(stdout).lines().map_while(Result::ok) {
            if let Some((phase, downloaded, total)) = self.parse_progress(&line) {
                progress.on_progress(downloaded, total, phase);
            }
        }

        let status = child
            .wait()
            .map_err(|e| EngineError::Download(format!("yt-dlp process error: {}", e)))?;
        let stderr_text = stderr_handle.join().unwrap_or_default();

        if status.success() {
            Ok(())
        } else {
            let message = self.engine_message(&stderr_text, status);
            warn!("yt-dlp failed for {}: {}", item.url, message);
            Err(EngineError::Download(message))
        }
    }
}

/// The exact per-item argument vector for a format and destination. The
/// format-specific rows encode codec and quality choices that determine
/// output correctness, not just structure.
fn build_download_args(options: &DownloadOptions) -> Vec<String> {
    let mut args: Vec<String> = [
        "--no-playlist",
        "--no-warnings",
        "--newline",
        "--quiet",
        "--progress",
        "--progress-template",
        PROGRESS_TEMPLATE,
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    let format_args: &[&str] = match options.format {
        FormatChoice::Mp3 => &[
            "-f",
            "bestaudio/best",
            "--extract-audio",
            "--audio-format",
            "mp3",
            "--audio-quality",
            "320K",
        ],
        FormatChoice::Flac => &[
            "-f",
            "bestaudio/best",
            "--extract-audio",
            "--audio-format",
            "flac",
        ],
        FormatChoice::Mp4 => &[
            "-f",
            "bv*[vcodec^=avc1]+ba[acodec^=mp4a]/b[ext=mp4]",
            "--merge-output-format",
            "mp4",
        ],
    };
    args.extend(format_args.iter().map(|s| s.to_string()));

    args.push("-P".to_string());
    args.push(options.destination.display().to_string());
    args.push("-o".to_string());
    args.push("%(title)s.%(ext)s".to_string());

    args
}

/// Normalize the flat-playlist JSON into an ordered item list. Entries that
/// are null or carry no id (no watch URL can be synthesized) are skipped.
fn parse_playlist_info(url: &str, info: &Value) -> PlaylistInfo {
    if let Some(entries) = info["entries"].as_array() {
        let items = entries.iter().filter_map(entry_to_item).collect();
        PlaylistInfo {
            is_collection: true,
            title: info["title"].as_str().unwrap_or("Unknown Playlist").to_string(),
            items,
        }
    } else {
        let title = info["title"].as_str().unwrap_or("Unknown").to_string();
        PlaylistInfo {
            is_collection: false,
            title: title.clone(),
            items: vec![DownloadItem {
                id: info["id"].as_str().unwrap_or_default().to_string(),
                title,
                url: url.to_string(),
            }],
        }
    }
}

fn entry_to_item(entry: &Value) -> Option<DownloadItem> {
    let id = entry["id"].as_str()?;
    Some(DownloadItem {
        id: id.to_string(),
        title: entry["title"].as_str().unwrap_or("Unknown").to_string(),
        url: format!("{}{}", WATCH_URL_BASE, id),
    })
}

/// yt-dlp renders unknown counters as `NA`; estimates may arrive as floats.
fn parse_counter(field: &str) -> Option<u64> {
    field
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| v as u64)
}
