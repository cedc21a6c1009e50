//! Multi-source music search/fetch abstraction layer.
//!
//! Provides the `MusicSource` trait implemented by every backend and the
//! track types flowing between backends and the aggregator. Built-in
//! backends:
//! - `YouTubeSource` — search + download via the yt-dlp extractor
//! - `Mp3wrSource`, `SefonSource` — HTML-scraped music sites

pub mod fallback;
pub mod mp3wr;
pub mod scrape;
pub mod sefon;
pub mod youtube;
pub mod ytdlp_errors;

use crate::core::error::{FetchError, SourceError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Provenance tag: which backend produced a track. Set by the aggregator,
/// never by a backend itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    YouTube,
    Mp3wr,
    Sefon,
}

impl SourceKind {
    /// Stable identifier used in logs and callback data.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::YouTube => "youtube",
            SourceKind::Mp3wr => "mp3wr",
            SourceKind::Sefon => "sefon",
        }
    }

    /// Emoji shown next to results from this source.
    pub fn emoji(&self) -> &'static str {
        match self {
            SourceKind::YouTube => "📺",
            SourceKind::Mp3wr => "🎵",
            SourceKind::Sefon => "🎶",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A search hit as a backend reports it, before provenance is attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundTrack {
    pub title: String,
    pub artist: String,
    /// Preformatted "m:ss", or "N/A" when the site doesn't expose it
    pub duration: String,
    /// Opaque, backend-specific reference used to fetch the audio later
    pub locator: String,
}

/// A search hit after the aggregator tagged it with its origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub title: String,
    pub artist: String,
    pub duration: String,
    pub locator: String,
    pub source: SourceKind,
}

impl Track {
    /// Attach provenance to a backend's raw hit.
    pub fn tagged(found: FoundTrack, source: SourceKind) -> Self {
        Self {
            title: found.title,
            artist: found.artist,
            duration: found.duration,
            locator: found.locator,
            source,
        }
    }

    /// "Artist - Title" display form used in captions and filenames.
    pub fn full_name(&self) -> String {
        format!("{} - {}", self.artist, self.title)
    }
}

/// Trait implemented by every music backend.
///
/// `search` must swallow expected failure modes (no results, non-200,
/// unparseable markup) and return an empty list; only genuinely unexpected
/// conditions (binary missing, client construction failure) surface as
/// `SourceError`. The aggregator catches those too; one broken source
/// never aborts the others.
#[async_trait]
pub trait MusicSource: Send + Sync {
    /// The provenance tag this backend's tracks will carry.
    fn kind(&self) -> SourceKind;

    /// Find up to `limit` tracks matching the query.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<FoundTrack>, SourceError>;

    /// Retrieve the raw audio bytes for a locator previously returned by
    /// this backend's `search`.
    async fn fetch(&self, locator: &str) -> Result<Vec<u8>, FetchError>;
}

/// Format a duration in seconds as "m:ss", or "N/A" for unknown/zero.
pub fn format_duration(seconds: Option<f64>) -> String {
    match seconds {
        Some(secs) if secs > 0.0 => {
            let secs = secs as u64;
            format!("{}:{:02}", secs / 60, secs % 60)
        }
        _ => "N/A".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration_basic() {
        assert_eq!(format_duration(Some(213.0)), "3:33");
        assert_eq!(format_duration(Some(59.9)), "0:59");
        assert_eq!(format_duration(Some(600.0)), "10:00");
    }

    #[test]
    fn test_format_duration_unknown() {
        assert_eq!(format_duration(None), "N/A");
        assert_eq!(format_duration(Some(0.0)), "N/A");
    }

    #[test]
    fn test_track_tagging_preserves_fields() {
        let found = FoundTrack {
            title: "Lose Yourself".to_string(),
            artist: "Eminem".to_string(),
            duration: "5:26".to_string(),
            locator: "https://youtube.com/watch?v=abc".to_string(),
        };
        let track = Track::tagged(found, SourceKind::YouTube);
        assert_eq!(track.source, SourceKind::YouTube);
        assert_eq!(track.full_name(), "Eminem - Lose Yourself");
        assert_eq!(track.locator, "https://youtube.com/watch?v=abc");
    }

    #[test]
    fn test_source_kind_display() {
        assert_eq!(SourceKind::YouTube.to_string(), "youtube");
        assert_eq!(SourceKind::Mp3wr.emoji(), "🎵");
    }
}
