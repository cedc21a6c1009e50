//! Multi-source search aggregation and fetch routing.
//!
//! One query fans out to every registered backend concurrently (per-backend
//! timeout, failures isolated), the hits are provenance-tagged and merged in
//! a fixed priority order, and a later fetch for a selected track is routed
//! back to the backend that produced it.

use crate::core::config;
use crate::core::error::FetchError;
use crate::source::{MusicSource, SourceKind, Track};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Process-scoped availability state shared between the aggregator and
/// whoever wants to reset it (admin command, periodic probe).
///
/// When a YouTube search fails outright, later searches skip it instead of
/// paying its failure latency every time. Soft optimization only: `reset`
/// lifts the flag, nothing is permanent.
#[derive(Debug)]
pub struct SourceHealth {
    primary_available: AtomicBool,
}

impl SourceHealth {
    pub fn new() -> Self {
        Self {
            primary_available: AtomicBool::new(true),
        }
    }

    pub fn primary_available(&self) -> bool {
        self.primary_available.load(Ordering::Relaxed)
    }

    pub fn mark_primary_unavailable(&self) {
        self.primary_available.store(false, Ordering::Relaxed);
    }

    /// Lifts the degradation flag so the next search tries YouTube again.
    pub fn reset(&self) {
        self.primary_available.store(true, Ordering::Relaxed);
    }
}

impl Default for SourceHealth {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-backend result budgets. YouTube gets roughly half the overall
/// budget; the scraped sites a smaller fixed share each.
#[derive(Debug, Clone)]
pub struct SearchLimits {
    pub youtube: usize,
    pub mp3wr: usize,
    pub sefon: usize,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            youtube: config::search::YOUTUBE_LIMIT,
            mp3wr: config::search::MP3WR_LIMIT,
            sefon: config::search::SEFON_LIMIT,
        }
    }
}

impl SearchLimits {
    fn sub_limit(&self, kind: SourceKind) -> usize {
        match kind {
            SourceKind::YouTube => self.youtube,
            SourceKind::Mp3wr => self.mp3wr,
            SourceKind::Sefon => self.sefon,
        }
    }
}

/// What one search produced. `failed_sources` lets the caller distinguish
/// "truly nothing found" from "nothing found, but some sources were down".
#[derive(Debug, Clone)]
pub struct SearchResults {
    pub tracks: Vec<Track>,
    pub failed_sources: Vec<SourceKind>,
}

impl SearchResults {
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// True when at least one source failed or was skipped as unavailable.
    pub fn degraded(&self) -> bool {
        !self.failed_sources.is_empty()
    }
}

pub struct Aggregator {
    sources: Vec<Arc<dyn MusicSource>>,
    limits: SearchLimits,
    source_timeout: Duration,
    health: Arc<SourceHealth>,
}

impl Aggregator {
    /// Backends are tried and merged in the order given, which is the
    /// priority order.
    pub fn new(sources: Vec<Arc<dyn MusicSource>>, health: Arc<SourceHealth>) -> Self {
        Self {
            sources,
            limits: SearchLimits::default(),
            source_timeout: config::search::source_timeout(),
            health,
        }
    }

    #[must_use]
    pub fn with_limits(mut self, limits: SearchLimits) -> Self {
        self.limits = limits;
        self
    }

    #[must_use]
    pub fn with_source_timeout(mut self, timeout: Duration) -> Self {
        self.source_timeout = timeout;
        self
    }

    pub fn health(&self) -> &Arc<SourceHealth> {
        &self.health
    }

    /// Queries every available backend concurrently and merges the hits.
    ///
    /// A backend failure (error or timeout) is logged, contributes zero
    /// results, and never prevents the other backends from being queried.
    /// The merged list preserves each backend's internal ordering, keeps
    /// backends in priority order, and is truncated to `overall_limit`.
    pub async fn search(&self, query: &str, overall_limit: usize) -> SearchResults {
        let mut failed_sources = Vec::new();

        let enabled: Vec<&Arc<dyn MusicSource>> = self
            .sources
            .iter()
            .filter(|s| {
                if s.kind() == SourceKind::YouTube && !self.health.primary_available() {
                    log::warn!("YouTube flagged unavailable, skipping for '{}'", query);
                    failed_sources.push(SourceKind::YouTube);
                    false
                } else {
                    true
                }
            })
            .collect();

        let searches = enabled.iter().map(|source| {
            let kind = source.kind();
            let sub_limit = self.limits.sub_limit(kind).min(overall_limit);
            async move {
                log::info!("Searching {} for '{}' (limit {})", kind, query, sub_limit);
                let outcome = match tokio::time::timeout(self.source_timeout, source.search(query, sub_limit)).await {
                    Ok(Ok(found)) => Ok(found),
                    Ok(Err(e)) => Err(e.to_string()),
                    Err(_) => Err(format!("timed out after {:?}", self.source_timeout)),
                };
                (kind, outcome)
            }
        });

        let outcomes = futures_util::future::join_all(searches).await;

        let mut tracks: Vec<Track> = Vec::new();
        for (kind, outcome) in outcomes {
            match outcome {
                Ok(found) => {
                    log::info!("{}: {} tracks", kind, found.len());
                    tracks.extend(found.into_iter().map(|f| Track::tagged(f, kind)));
                }
                Err(message) => {
                    log::error!("Search failed in {} for '{}': {}", kind, query, message);
                    if kind == SourceKind::YouTube {
                        self.health.mark_primary_unavailable();
                        log::warn!("Flagging YouTube unavailable for subsequent searches");
                    }
                    failed_sources.push(kind);
                }
            }
        }

        tracks.truncate(overall_limit);
        log::info!("Search '{}': {} tracks total from all sources", query, tracks.len());

        SearchResults {
            tracks,
            failed_sources,
        }
    }

    /// Probes every backend with a one-result search. Used by the admin
    /// status command to see which sources are currently usable.
    pub async fn probe_sources(&self) -> Vec<(SourceKind, bool)> {
        let probes = self.sources.iter().map(|source| async move {
            let kind = source.kind();
            let usable = matches!(
                tokio::time::timeout(self.source_timeout, source.search("test", 1)).await,
                Ok(Ok(ref tracks)) if !tracks.is_empty()
            );
            (kind, usable)
        });
        futures_util::future::join_all(probes).await
    }

    /// Routes a fetch to the backend named by the track's provenance tag.
    ///
    /// The locator is opaque here; only the owning backend interprets it.
    /// A tag without a registered backend is a contract violation, reported
    /// loudly and without any network call.
    pub async fn fetch(&self, track: &Track) -> Result<Vec<u8>, FetchError> {
        let Some(source) = self.sources.iter().find(|s| s.kind() == track.source) else {
            log::error!(
                "No backend registered for source '{}' (track '{}'): provenance contract violation",
                track.source,
                track.title
            );
            return Err(FetchError::UnknownSource(track.source));
        };

        log::info!("Fetching '{}' via {}", track.full_name(), track.source);
        source.fetch(&track.locator).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_flag_round_trip() {
        let health = SourceHealth::new();
        assert!(health.primary_available());
        health.mark_primary_unavailable();
        assert!(!health.primary_available());
        health.reset();
        assert!(health.primary_available());
    }

    #[test]
    fn test_default_limits_match_config() {
        let limits = SearchLimits::default();
        assert_eq!(limits.sub_limit(SourceKind::YouTube), 8);
        assert_eq!(limits.sub_limit(SourceKind::Mp3wr), 4);
        assert_eq!(limits.sub_limit(SourceKind::Sefon), 3);
    }

    #[test]
    fn test_search_results_shapes() {
        let empty = SearchResults {
            tracks: vec![],
            failed_sources: vec![],
        };
        assert!(empty.is_empty());
        assert!(!empty.degraded());

        let degraded = SearchResults {
            tracks: vec![],
            failed_sources: vec![SourceKind::YouTube],
        };
        assert!(degraded.degraded());
    }
}
