//! sefon.pro backend.
//!
//! Same scraping policy as mp3wr, but search is query-style and result
//! locators are track pages that always need the secondary resolution step.

use crate::core::error::{FetchError, SourceError};
use crate::source::scrape::ScrapedSite;
use crate::source::{FoundTrack, MusicSource, SourceKind};
use async_trait::async_trait;

const BASE_URL: &str = "https://sefon.pro";

pub struct SefonSource {
    site: ScrapedSite,
}

impl SefonSource {
    pub fn new() -> Result<Self, SourceError> {
        Ok(Self {
            site: ScrapedSite::new("sefon", BASE_URL)?,
        })
    }

    fn search_url(query: &str) -> String {
        format!("{}/search/?q={}", BASE_URL, urlencoding::encode(query))
    }
}

#[async_trait]
impl MusicSource for SefonSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Sefon
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<FoundTrack>, SourceError> {
        self.site.search(&Self::search_url(query), limit).await
    }

    async fn fetch(&self, locator: &str) -> Result<Vec<u8>, FetchError> {
        self.site.fetch(locator).await
    }
}
