//! YouTube backend, powered by the yt-dlp extractor binary.
//!
//! Search uses `--dump-json --flat-playlist` over a `ytsearchN:` query and
//! parses one JSON object per stdout line. Download runs the fetch fallback
//! policy (client-identity escalation + URL-variant rotation) inside
//! `spawn_blocking`, so the extractor's CPU+I/O work never sits on the
//! interaction loop. Each download gets its own scratch directory that is
//! removed on every exit path.

use crate::core::config;
use crate::core::error::{FetchError, SourceError};
use crate::source::fallback::{FetchAttempt, FetchPolicy};
use crate::source::{format_duration, FoundTrack, MusicSource, SourceKind};
use async_trait::async_trait;
use std::process::{Child, Command, Stdio};
use std::time::Duration;
use tokio::process::Command as TokioCommand;
use tokio::time::timeout;

/// Audio container extensions yt-dlp may leave in the scratch dir, in the
/// order we prefer them.
const AUDIO_EXTENSIONS: &[&str] = &["m4a", "webm", "opus", "mp3", "mp4"];

pub struct YouTubeSource {
    bin: String,
    proxy: Option<String>,
    policy: FetchPolicy,
}

impl YouTubeSource {
    pub fn new() -> Self {
        Self {
            bin: config::YTDL_BIN.clone(),
            proxy: config::PROXY.clone(),
            policy: FetchPolicy::new()
                .max_attempts(*config::fetch::MAX_ATTEMPTS)
                .backoff_base(Duration::from_secs(*config::fetch::BACKOFF_BASE_SECS)),
        }
    }

    /// Overrides the fetch fallback policy (tests, tuning).
    #[must_use]
    pub fn with_policy(mut self, policy: FetchPolicy) -> Self {
        self.policy = policy;
        self
    }

    fn parse_search_line(line: &str) -> Option<FoundTrack> {
        let entry: serde_json::Value = serde_json::from_str(line).ok()?;

        let title = entry
            .get("title")
            .and_then(|v| v.as_str())
            .unwrap_or("Unknown title")
            .to_string();
        let artist = entry
            .get("uploader")
            .or_else(|| entry.get("channel"))
            .and_then(|v| v.as_str())
            .unwrap_or("Unknown artist")
            .to_string();
        let duration = format_duration(entry.get("duration").and_then(|v| v.as_f64()));

        let locator = entry
            .get("url")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .or_else(|| {
                entry
                    .get("id")
                    .and_then(|v| v.as_str())
                    .map(|id| format!("https://www.youtube.com/watch?v={}", id))
            })?;

        Some(FoundTrack {
            title,
            artist,
            duration,
            locator,
        })
    }
}

impl Default for YouTubeSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MusicSource for YouTubeSource {
    fn kind(&self) -> SourceKind {
        SourceKind::YouTube
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<FoundTrack>, SourceError> {
        // "audio" steers the ranking toward music uploads
        let search_arg = format!("ytsearch{}:{} audio", limit, query);
        log::info!("yt-dlp search: {}", search_arg);

        let mut cmd = TokioCommand::new(&self.bin);
        cmd.args(["--dump-json", "--flat-playlist", "--no-warnings", "--skip-download"])
            .args(["--socket-timeout", "30"])
            .arg("--no-check-certificate");
        if let Some(proxy) = &self.proxy {
            cmd.args(["--proxy", proxy]);
        }
        cmd.arg(&search_arg)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = timeout(config::search::source_timeout(), cmd.output())
            .await
            .map_err(|_| SourceError::Extractor("yt-dlp search timed out".to_string()))??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SourceError::Extractor(format!(
                "yt-dlp search exited with {:?}: {}",
                output.status.code(),
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let tracks: Vec<FoundTrack> = stdout
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(Self::parse_search_line)
            .take(limit)
            .collect();

        log::info!("yt-dlp search returned {} tracks for '{}'", tracks.len(), query);
        Ok(tracks)
    }

    async fn fetch(&self, locator: &str) -> Result<Vec<u8>, FetchError> {
        let bin = self.bin.clone();
        let proxy = self.proxy.clone();
        let policy = self.policy.clone();
        let locator = locator.to_string();

        // The whole attempt loop is blocking (process waits + backoff
        // sleeps), so it runs on the blocking pool.
        let handle = tokio::task::spawn_blocking(move || {
            policy.run(&locator, |attempt| download_once(&bin, proxy.as_deref(), attempt))
        });

        handle
            .await
            .map_err(|e| FetchError::Io(std::io::Error::other(format!("download task failed: {}", e))))?
    }
}

/// One blocking yt-dlp download attempt into a scratch dir. Returns the
/// audio bytes, or the extractor's error text for the policy to classify.
/// The scratch dir is dropped (and removed) on every path out.
fn download_once(bin: &str, proxy: Option<&str>, attempt: &FetchAttempt<'_>) -> Result<Vec<u8>, String> {
    let scratch = tempfile::TempDir::new().map_err(|e| format!("failed to create scratch dir: {}", e))?;
    let template = scratch.path().join("%(id)s.%(ext)s");

    let mut cmd = Command::new(bin);
    cmd.args([
        "-f",
        "bestaudio[ext=m4a]/bestaudio[ext=webm]/bestaudio/best",
        "--no-playlist",
        "--no-warnings",
        "--no-check-certificate",
        "--socket-timeout",
        "60",
    ])
    .arg("--extractor-args")
    .arg(format!("youtube:player_client={}", attempt.config.player_client))
    .arg("-o")
    .arg(template.to_string_lossy().into_owned());
    if let Some(proxy) = proxy {
        cmd.args(["--proxy", proxy]);
    }
    cmd.arg(&attempt.url).stdout(Stdio::piped()).stderr(Stdio::piped());

    let child = cmd.spawn().map_err(|e| format!("failed to spawn {}: {}", bin, e))?;
    let output = wait_with_output_timeout(child, config::fetch::ytdlp_timeout())?;

    if !output.status.success() {
        return Err(String::from_utf8_lossy(&output.stderr).into_owned());
    }

    let path = find_downloaded_file(scratch.path()).ok_or_else(|| "no output file after download".to_string())?;

    std::fs::read(&path).map_err(|e| format!("failed to read {}: {}", path.display(), e))
}

/// Locate the file yt-dlp produced, preferring known audio extensions.
fn find_downloaded_file(dir: &std::path::Path) -> Option<std::path::PathBuf> {
    let entries: Vec<std::path::PathBuf> = std::fs::read_dir(dir)
        .ok()?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .collect();

    for ext in AUDIO_EXTENSIONS {
        if let Some(path) = entries
            .iter()
            .find(|p| p.extension().and_then(|e| e.to_str()) == Some(*ext))
        {
            return Some(path.clone());
        }
    }
    entries.into_iter().next()
}

/// Wait for a child process with a timeout. Kills the child on timeout so a
/// wedged extractor doesn't pin the blocking pool forever.
fn wait_with_output_timeout(mut child: Child, timeout: Duration) -> Result<std::process::Output, String> {
    let deadline = std::time::Instant::now() + timeout;

    loop {
        match child.try_wait() {
            Ok(Some(_status)) => {
                return child.wait_with_output().map_err(|e| format!("wait failed: {}", e));
            }
            Ok(None) => {
                if std::time::Instant::now() >= deadline {
                    log::error!("yt-dlp timed out after {}s, killing", timeout.as_secs());
                    let _ = child.kill();
                    let _ = child.wait(); // Reap the zombie
                    return Err(format!("yt-dlp process timed out after {}s", timeout.as_secs()));
                }
                std::thread::sleep(Duration::from_millis(500));
            }
            Err(e) => return Err(format!("wait failed: {}", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search_line_full_entry() {
        let line = r#"{"id":"abc123","title":"Test Song","uploader":"Test Artist","duration":213.0,"url":"https://www.youtube.com/watch?v=abc123"}"#;
        let track = YouTubeSource::parse_search_line(line).unwrap();
        assert_eq!(track.title, "Test Song");
        assert_eq!(track.artist, "Test Artist");
        assert_eq!(track.duration, "3:33");
        assert_eq!(track.locator, "https://www.youtube.com/watch?v=abc123");
    }

    #[test]
    fn test_parse_search_line_builds_url_from_id() {
        let line = r#"{"id":"xyz","title":"T","channel":"C"}"#;
        let track = YouTubeSource::parse_search_line(line).unwrap();
        assert_eq!(track.locator, "https://www.youtube.com/watch?v=xyz");
        assert_eq!(track.artist, "C");
        assert_eq!(track.duration, "N/A");
    }

    #[test]
    fn test_parse_search_line_rejects_entry_without_reference() {
        let line = r#"{"title":"No id or url"}"#;
        assert!(YouTubeSource::parse_search_line(line).is_none());
    }

    #[test]
    fn test_parse_search_line_rejects_garbage() {
        assert!(YouTubeSource::parse_search_line("not json").is_none());
    }

    #[test]
    fn test_find_downloaded_file_prefers_audio_extension() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("v.part"), b"x").unwrap();
        std::fs::write(dir.path().join("v.m4a"), b"x").unwrap();
        let found = find_downloaded_file(dir.path()).unwrap();
        assert_eq!(found.extension().and_then(|e| e.to_str()), Some("m4a"));
    }
}
