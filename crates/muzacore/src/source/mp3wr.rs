//! mp3wr.com backend — scraped search plus direct/wrapped mp3 download.

use crate::core::error::{FetchError, SourceError};
use crate::source::scrape::ScrapedSite;
use crate::source::{FoundTrack, MusicSource, SourceKind};
use async_trait::async_trait;

const BASE_URL: &str = "https://mp3wr.com";

pub struct Mp3wrSource {
    site: ScrapedSite,
}

impl Mp3wrSource {
    pub fn new() -> Result<Self, SourceError> {
        Ok(Self {
            site: ScrapedSite::new("mp3wr", BASE_URL)?,
        })
    }

    /// mp3wr uses path-style search URLs.
    fn search_url(query: &str) -> String {
        format!("{}/search/{}", BASE_URL, urlencoding::encode(query))
    }
}

#[async_trait]
impl MusicSource for Mp3wrSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Mp3wr
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<FoundTrack>, SourceError> {
        self.site.search(&Self::search_url(query), limit).await
    }

    async fn fetch(&self, locator: &str) -> Result<Vec<u8>, FetchError> {
        self.site.fetch(locator).await
    }
}
