//! Aggregator behavior against scripted fake backends: merge order,
//! truncation, failure isolation, provenance routing, degradation flag.

use async_trait::async_trait;
use muzacore::{
    Aggregator, FetchError, FoundTrack, MusicSource, SearchLimits, SourceError, SourceHealth, SourceKind, Track,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A backend with a canned result set and failure switches, recording how
/// often it was asked to do anything.
struct FakeSource {
    kind: SourceKind,
    tracks: Vec<FoundTrack>,
    fail_search: bool,
    search_calls: AtomicU32,
    fetch_calls: AtomicU32,
}

impl FakeSource {
    fn with_tracks(kind: SourceKind, count: usize) -> Self {
        let tracks = (0..count)
            .map(|n| FoundTrack {
                title: format!("{} track {}", kind, n),
                artist: "Fake Artist".to_string(),
                duration: "3:00".to_string(),
                locator: format!("https://{}.example/{}", kind, n),
            })
            .collect();
        Self {
            kind,
            tracks,
            fail_search: false,
            search_calls: AtomicU32::new(0),
            fetch_calls: AtomicU32::new(0),
        }
    }

    fn failing(kind: SourceKind) -> Self {
        Self {
            fail_search: true,
            ..Self::with_tracks(kind, 0)
        }
    }
}

#[async_trait]
impl MusicSource for FakeSource {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn search(&self, _query: &str, limit: usize) -> Result<Vec<FoundTrack>, SourceError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_search {
            return Err(SourceError::Extractor("simulated outage".to_string()));
        }
        Ok(self.tracks.iter().take(limit).cloned().collect())
    }

    async fn fetch(&self, _locator: &str) -> Result<Vec<u8>, FetchError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![self.kind.as_str().len() as u8])
    }
}

fn aggregator_with(sources: Vec<Arc<FakeSource>>) -> Aggregator {
    let dyn_sources: Vec<Arc<dyn MusicSource>> = sources.into_iter().map(|s| s as Arc<dyn MusicSource>).collect();
    Aggregator::new(dyn_sources, Arc::new(SourceHealth::new())).with_source_timeout(Duration::from_secs(5))
}

fn standard_trio() -> (Arc<FakeSource>, Arc<FakeSource>, Arc<FakeSource>) {
    (
        Arc::new(FakeSource::with_tracks(SourceKind::YouTube, 8)),
        Arc::new(FakeSource::with_tracks(SourceKind::Mp3wr, 4)),
        Arc::new(FakeSource::with_tracks(SourceKind::Sefon, 3)),
    )
}

#[tokio::test]
async fn search_merges_in_priority_order() {
    let (yt, mp3wr, sefon) = standard_trio();
    let aggregator = aggregator_with(vec![yt, mp3wr, sefon]);

    let results = aggregator.search("test song", 15).await;

    assert_eq!(results.tracks.len(), 15);
    assert!(results.failed_sources.is_empty());
    assert!(results.tracks[..8].iter().all(|t| t.source == SourceKind::YouTube));
    assert!(results.tracks[8..12].iter().all(|t| t.source == SourceKind::Mp3wr));
    assert!(results.tracks[12..].iter().all(|t| t.source == SourceKind::Sefon));
    // Each backend's internal ordering survives the merge
    assert_eq!(results.tracks[0].title, "youtube track 0");
    assert_eq!(results.tracks[8].title, "mp3wr track 0");
}

#[tokio::test]
async fn search_never_exceeds_overall_limit() {
    let (yt, mp3wr, sefon) = standard_trio();
    let aggregator = aggregator_with(vec![yt, mp3wr, sefon]);

    let results = aggregator.search("test song", 10).await;
    assert_eq!(results.tracks.len(), 10);

    let results = aggregator.search("test song", 1).await;
    assert_eq!(results.tracks.len(), 1);
    assert_eq!(results.tracks[0].source, SourceKind::YouTube);
}

#[tokio::test]
async fn one_failing_source_does_not_abort_the_others() {
    let yt = Arc::new(FakeSource::with_tracks(SourceKind::YouTube, 2));
    let mp3wr = Arc::new(FakeSource::failing(SourceKind::Mp3wr));
    let sefon = Arc::new(FakeSource::with_tracks(SourceKind::Sefon, 2));
    let aggregator = aggregator_with(vec![yt, mp3wr.clone(), sefon]);

    let results = aggregator.search("test song", 15).await;

    assert_eq!(results.tracks.len(), 4);
    assert_eq!(results.failed_sources, vec![SourceKind::Mp3wr]);
    assert_eq!(results.tracks[0].source, SourceKind::YouTube);
    assert_eq!(results.tracks[2].source, SourceKind::Sefon);
    assert_eq!(mp3wr.search_calls.load(Ordering::SeqCst), 1);
    // A secondary-source failure must not flag the primary
    assert!(aggregator.health().primary_available());
}

#[tokio::test]
async fn all_sources_failing_yields_empty_not_panic() {
    let aggregator = aggregator_with(vec![
        Arc::new(FakeSource::failing(SourceKind::YouTube)),
        Arc::new(FakeSource::failing(SourceKind::Mp3wr)),
        Arc::new(FakeSource::failing(SourceKind::Sefon)),
    ]);

    let results = aggregator.search("test song", 15).await;

    assert!(results.is_empty());
    assert!(results.degraded());
    assert_eq!(results.failed_sources.len(), 3);
}

#[tokio::test]
async fn primary_failure_flags_and_skips_until_reset() {
    let yt = Arc::new(FakeSource::failing(SourceKind::YouTube));
    let mp3wr = Arc::new(FakeSource::with_tracks(SourceKind::Mp3wr, 2));
    let aggregator = aggregator_with(vec![yt.clone(), mp3wr]);

    let first = aggregator.search("test song", 15).await;
    assert!(first.failed_sources.contains(&SourceKind::YouTube));
    assert!(!aggregator.health().primary_available());
    assert_eq!(yt.search_calls.load(Ordering::SeqCst), 1);

    // Second search skips YouTube entirely but still reports the degradation
    let second = aggregator.search("test song", 15).await;
    assert_eq!(yt.search_calls.load(Ordering::SeqCst), 1);
    assert!(second.failed_sources.contains(&SourceKind::YouTube));
    assert_eq!(second.tracks.len(), 2);

    // No permanent lockout: after a reset YouTube is tried again
    aggregator.health().reset();
    let _ = aggregator.search("test song", 15).await;
    assert_eq!(yt.search_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn search_is_idempotent_with_stable_sources() {
    let (yt, mp3wr, sefon) = standard_trio();
    let aggregator = aggregator_with(vec![yt, mp3wr, sefon]);

    let first = aggregator.search("test song", 15).await;
    let second = aggregator.search("test song", 15).await;

    assert_eq!(first.tracks, second.tracks);
}

#[tokio::test]
async fn fetch_routes_to_owning_source() {
    let (yt, mp3wr, sefon) = standard_trio();
    let aggregator = aggregator_with(vec![yt.clone(), mp3wr.clone(), sefon.clone()]);

    let results = aggregator.search("test song", 15).await;
    for track in &results.tracks {
        aggregator.fetch(track).await.unwrap();
    }

    assert_eq!(yt.fetch_calls.load(Ordering::SeqCst), 8);
    assert_eq!(mp3wr.fetch_calls.load(Ordering::SeqCst), 4);
    assert_eq!(sefon.fetch_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn fetch_with_unregistered_source_is_a_hard_error_without_network() {
    let mp3wr = Arc::new(FakeSource::with_tracks(SourceKind::Mp3wr, 1));
    let sefon = Arc::new(FakeSource::with_tracks(SourceKind::Sefon, 1));
    let aggregator = aggregator_with(vec![mp3wr.clone(), sefon.clone()]);

    // A track whose provenance tag points at a backend this aggregator
    // doesn't own (e.g. tampered callback data).
    let tampered = Track {
        title: "Ghost".to_string(),
        artist: "Nobody".to_string(),
        duration: "N/A".to_string(),
        locator: "https://youtube.com/watch?v=ghost".to_string(),
        source: SourceKind::YouTube,
    };

    let result = aggregator.fetch(&tampered).await;
    assert!(matches!(result, Err(FetchError::UnknownSource(SourceKind::YouTube))));
    assert_eq!(mp3wr.fetch_calls.load(Ordering::SeqCst), 0);
    assert_eq!(sefon.fetch_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn slow_source_is_timed_out_and_isolated() {
    struct SlowSource;

    #[async_trait]
    impl MusicSource for SlowSource {
        fn kind(&self) -> SourceKind {
            SourceKind::Sefon
        }

        async fn search(&self, _query: &str, _limit: usize) -> Result<Vec<FoundTrack>, SourceError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Vec::new())
        }

        async fn fetch(&self, _locator: &str) -> Result<Vec<u8>, FetchError> {
            Ok(Vec::new())
        }
    }

    let mp3wr = Arc::new(FakeSource::with_tracks(SourceKind::Mp3wr, 2));
    let sources: Vec<Arc<dyn MusicSource>> = vec![mp3wr, Arc::new(SlowSource)];
    let aggregator =
        Aggregator::new(sources, Arc::new(SourceHealth::new())).with_source_timeout(Duration::from_millis(50));

    let results = aggregator.search("test song", 15).await;

    assert_eq!(results.tracks.len(), 2);
    assert_eq!(results.failed_sources, vec![SourceKind::Sefon]);
}

#[tokio::test]
async fn probe_reports_per_source_usability() {
    let aggregator = aggregator_with(vec![
        Arc::new(FakeSource::with_tracks(SourceKind::YouTube, 1)),
        Arc::new(FakeSource::failing(SourceKind::Mp3wr)),
        Arc::new(FakeSource::with_tracks(SourceKind::Sefon, 0)),
    ]);

    let statuses = aggregator.probe_sources().await;

    assert_eq!(
        statuses,
        vec![
            (SourceKind::YouTube, true),
            (SourceKind::Mp3wr, false),
            // A source that answers but has nothing is reported unusable too
            (SourceKind::Sefon, false),
        ]
    );
}

#[tokio::test]
async fn sub_limits_are_configurable() {
    let (yt, mp3wr, sefon) = standard_trio();
    let aggregator = aggregator_with(vec![yt, mp3wr, sefon]).with_limits(SearchLimits {
        youtube: 2,
        mp3wr: 1,
        sefon: 1,
    });

    let results = aggregator.search("test song", 15).await;

    assert_eq!(results.tracks.len(), 4);
    assert_eq!(results.tracks[0].source, SourceKind::YouTube);
    assert_eq!(results.tracks[2].source, SourceKind::Mp3wr);
    assert_eq!(results.tracks[3].source, SourceKind::Sefon);
}
