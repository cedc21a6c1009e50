//! Shared engine for the HTML-scraped music sites.
//!
//! The sites don't publish an API, so search results come from best-effort
//! structural heuristics over markup we don't control. The heuristics are an
//! ordered list of named extraction strategies tried in sequence, with the
//! class/href patterns kept as data, so when a site's markup drifts the
//! fix is a pattern change, not new code.

use crate::core::config;
use crate::core::error::{FetchError, SourceError};
use crate::source::FoundTrack;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use select::document::Document;
use select::node::Node;
use select::predicate::{Any, Name};
use url::Url;

/// Container elements that look like one search result.
static BLOCK_CLASS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)track|song|music|item|result").expect("block class regex"));

/// Hrefs that look like a download reference.
static DOWNLOAD_HREF_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"/download/|/get/|\.mp3").expect("href regex"));

/// Nested elements carrying the track title.
static TITLE_CLASS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)title|name").expect("title class regex"));

/// Nested elements carrying the artist.
static ARTIST_CLASS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)artist|author").expect("artist class regex"));

static DOWNLOAD_BTN_CLASS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)download").expect("download class regex"));

pub const UNKNOWN_TITLE: &str = "Unknown title";
pub const UNKNOWN_ARTIST: &str = "Unknown artist";

/// A named extraction strategy: document in, best-effort tracks out.
pub type ExtractionStrategy = fn(&Document, &Url, usize) -> Vec<FoundTrack>;

/// Strategies in the order they are tried; the first one that yields
/// anything wins.
pub const EXTRACTION_STRATEGIES: &[(&str, ExtractionStrategy)] = &[
    ("track-blocks", extract_from_track_blocks),
    ("download-anchors", extract_from_download_anchors),
];

fn class_matches(node: &Node<'_>, re: &Regex) -> bool {
    node.attr("class").is_some_and(|c| re.is_match(c))
}

fn href_matches(node: &Node<'_>) -> bool {
    node.attr("href").is_some_and(|h| DOWNLOAD_HREF_RE.is_match(h))
}

/// Resolve a possibly-relative href against the site origin.
fn resolve_href(base: &Url, href: &str) -> Option<String> {
    base.join(href).ok().map(|u| u.to_string())
}

/// Parse search-results HTML into tracks, trying each strategy in order.
pub fn extract_tracks(html: &str, base: &Url, limit: usize) -> Vec<FoundTrack> {
    let doc = Document::from(html);
    for (name, strategy) in EXTRACTION_STRATEGIES {
        let tracks = strategy(&doc, base, limit);
        if !tracks.is_empty() {
            log::debug!("Extraction strategy '{}' matched {} tracks", name, tracks.len());
            return tracks;
        }
    }
    log::debug!("No extraction strategy matched anything");
    Vec::new()
}

/// Strategy 1: result-looking container blocks (div/li/article with a
/// track/song/music/item/result class), fields pulled from nested elements.
fn extract_from_track_blocks(doc: &Document, base: &Url, limit: usize) -> Vec<FoundTrack> {
    let mut tracks = Vec::new();

    let blocks = doc
        .find(Any)
        .filter(|n| matches!(n.name(), Some("div" | "li" | "article")))
        .filter(|n| class_matches(n, &BLOCK_CLASS_RE));

    for block in blocks {
        if tracks.len() >= limit {
            break;
        }

        let mut title = block
            .find(Any)
            .filter(|n| matches!(n.name(), Some("h2" | "h3" | "h4" | "span" | "div")))
            .find(|n| class_matches(n, &TITLE_CLASS_RE))
            .map(|n| n.text().trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| UNKNOWN_TITLE.to_string());

        let artist = block
            .find(Any)
            .filter(|n| matches!(n.name(), Some("span" | "div" | "p")))
            .find(|n| class_matches(n, &ARTIST_CLASS_RE))
            .map(|n| n.text().trim().to_string())
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| UNKNOWN_ARTIST.to_string());

        let link = block.find(Name("a")).find(href_matches);

        if let Some(link) = link {
            // No titled element in the block, so the anchor text is the
            // next best guess.
            if title == UNKNOWN_TITLE {
                let link_text = link.text().trim().to_string();
                if link_text.len() > 3 {
                    title = link_text;
                }
            }

            if let Some(locator) = link.attr("href").and_then(|h| resolve_href(base, h)) {
                tracks.push(FoundTrack {
                    title,
                    artist,
                    duration: "N/A".to_string(),
                    locator,
                });
            }
        }
        // Blocks without a resolvable download reference are dropped.
    }

    tracks
}

/// Strategy 2 (fallback): any anchor whose target looks like a download.
fn extract_from_download_anchors(doc: &Document, base: &Url, limit: usize) -> Vec<FoundTrack> {
    doc.find(Name("a"))
        .filter(href_matches)
        .filter_map(|a| {
            let locator = a.attr("href").and_then(|h| resolve_href(base, h))?;
            let text = a.text().trim().to_string();
            let title = if text.len() > 3 { text } else { UNKNOWN_TITLE.to_string() };
            Some(FoundTrack {
                title,
                artist: UNKNOWN_ARTIST.to_string(),
                duration: "N/A".to_string(),
                locator,
            })
        })
        .take(limit)
        .collect()
}

/// Pull the real media URL out of an HTML wrapper page, in priority order:
/// an embedded audio element's source, a download-classed anchor, the first
/// anchor ending in `.mp3`. Relative URLs are resolved against the origin.
pub fn resolve_audio_url(html: &str, base: &Url) -> Option<Url> {
    let doc = Document::from(html);

    let raw = doc
        .find(Name("audio"))
        .filter_map(|audio| {
            audio
                .find(Name("source"))
                .filter_map(|s| s.attr("src").map(str::to_string))
                .next()
        })
        .next()
        .or_else(|| {
            doc.find(Name("a"))
                .filter(|a| class_matches(a, &DOWNLOAD_BTN_CLASS_RE))
                .filter_map(|a| a.attr("href").map(str::to_string))
                .next()
        })
        .or_else(|| {
            doc.find(Name("a"))
                .filter_map(|a| a.attr("href"))
                .find(|h| h.ends_with(".mp3"))
                .map(str::to_string)
        })?;

    base.join(&raw).ok()
}

/// HTTP layer shared by the scraped-site backends: one client with a
/// browser-looking identity, search-page retrieval and the two-step
/// fetch-and-resolve download.
pub struct ScrapedSite {
    name: &'static str,
    base: Url,
    client: reqwest::Client,
}

impl ScrapedSite {
    pub fn new(name: &'static str, base_url: &str) -> Result<Self, SourceError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8"),
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("ru-RU,ru;q=0.9,en-US;q=0.8,en;q=0.7"),
        );

        let client = reqwest::Client::builder()
            .user_agent(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
            )
            .default_headers(headers)
            .timeout(config::network::timeout())
            .connect_timeout(config::network::connect_timeout())
            .build()?;

        let base = Url::parse(base_url)?;

        Ok(Self { name, base, client })
    }

    /// Fetch a search page and run the extraction strategies over it.
    /// Non-200 responses and transport trouble are expected failure modes
    /// here and yield an empty list, not an error.
    pub async fn search(&self, search_url: &str, limit: usize) -> Result<Vec<FoundTrack>, SourceError> {
        let response = match self.client.get(search_url).send().await {
            Ok(r) => r,
            Err(e) => {
                log::warn!("{}: search request failed: {}", self.name, e);
                return Ok(Vec::new());
            }
        };

        if !response.status().is_success() {
            log::warn!("{}: search returned status {}", self.name, response.status());
            return Ok(Vec::new());
        }

        let html = match response.text().await {
            Ok(html) => html,
            Err(e) => {
                log::warn!("{}: failed to read search page: {}", self.name, e);
                return Ok(Vec::new());
            }
        };

        Ok(extract_tracks(&html, &self.base, limit))
    }

    /// Download a track. When the locator serves an HTML wrapper instead of
    /// audio, resolve the real media URL out of it and fetch that.
    pub async fn fetch(&self, locator: &str) -> Result<Vec<u8>, FetchError> {
        log::info!("{}: downloading {}", self.name, locator);

        let response = self.client.get(locator).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::Status(response.status()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        if content_type.contains("text/html") {
            let html = response.text().await?;
            let Some(media_url) = resolve_audio_url(&html, &self.base) else {
                return Err(FetchError::NoAudioFound(format!(
                    "{}: no media reference in wrapper page {}",
                    self.name, locator
                )));
            };

            log::info!("{}: resolved media url {}", self.name, media_url);

            let media_response = self.client.get(media_url).send().await?;
            if !media_response.status().is_success() {
                return Err(FetchError::Status(media_response.status()));
            }
            return Ok(media_response.bytes().await?.to_vec());
        }

        if content_type.contains("audio") || content_type.contains("octet-stream") {
            return Ok(response.bytes().await?.to_vec());
        }

        Err(FetchError::NoAudioFound(format!(
            "{}: unexpected content type '{}' for {}",
            self.name, content_type, locator
        )))
    }
}
