//! Fetch fallback policy for the YouTube backend.
//!
//! YouTube actively detects and blocks automated access, so a single
//! download attempt is not enough: each attempt presents a different client
//! identity (access configuration) and a different URL form for the same
//! video, with backoff in between. This is resilience against one
//! adversarial upstream, not a general retry utility. The scraped sources
//! don't get it and shouldn't.

use crate::core::error::FetchError;
use crate::source::ytdlp_errors::{classify_extractor_error, ExtractorFailure};
use std::time::Duration;

/// A client identity presented to the extractor for one attempt.
/// `player_client` goes into yt-dlp's `youtube:player_client` extractor arg.
#[derive(Debug, Clone)]
pub struct AccessConfig {
    pub name: String,
    pub player_client: String,
}

impl AccessConfig {
    pub fn new(name: &str, player_client: &str) -> Self {
        Self {
            name: name.to_string(),
            player_client: player_client.to_string(),
        }
    }
}

/// Ordered from most to least reliable against the current bot checks.
fn default_access_configs() -> Vec<AccessConfig> {
    vec![
        AccessConfig::new("android-creator", "android_creator"),
        AccessConfig::new("android-music", "android_music"),
        AccessConfig::new("android", "android"),
    ]
}

/// One attempt's parameters, handed to the attempt executor.
#[derive(Debug)]
pub struct FetchAttempt<'a> {
    /// 0-based attempt index
    pub index: u32,
    pub config: &'a AccessConfig,
    /// URL variant selected for this attempt
    pub url: String,
}

/// Retry/fallback configuration for one logical download.
#[derive(Debug, Clone)]
pub struct FetchPolicy {
    configs: Vec<AccessConfig>,
    max_attempts: u32,
    backoff_base: Duration,
    backoff_step: Duration,
    auth_jitter: bool,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            configs: default_access_configs(),
            max_attempts: 3,
            backoff_base: Duration::from_secs(2),
            backoff_step: Duration::from_secs(1),
            auth_jitter: true,
        }
    }
}

impl FetchPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the attempt budget.
    #[must_use]
    pub fn max_attempts(mut self, max: u32) -> Self {
        self.max_attempts = max.max(1);
        self
    }

    /// Sets the base for the linear backoff between attempts.
    #[must_use]
    pub fn backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    /// Sets the per-attempt backoff increment.
    #[must_use]
    pub fn backoff_step(mut self, step: Duration) -> Self {
        self.backoff_step = step;
        self
    }

    /// Replaces the ordered access-configuration list.
    #[must_use]
    pub fn access_configs(mut self, configs: Vec<AccessConfig>) -> Self {
        if !configs.is_empty() {
            self.configs = configs;
        }
        self
    }

    /// Disables the randomized delay after auth challenges (tests).
    #[must_use]
    pub fn no_jitter(mut self) -> Self {
        self.auth_jitter = false;
        self
    }

    /// Backoff before the attempt following `attempt` (0-based): base plus
    /// one step per attempt already made, so delays strictly increase.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.backoff_base + self.backoff_step * attempt
    }

    /// Access configuration for a given attempt; the last one is reused when
    /// attempts outnumber configurations.
    fn config_for_attempt(&self, attempt: u32) -> &AccessConfig {
        let idx = (attempt as usize).min(self.configs.len() - 1);
        &self.configs[idx]
    }

    /// Drives the attempt loop for one download.
    ///
    /// Blocking (sleeps between attempts); callers run it inside
    /// `spawn_blocking`. The executor receives the attempt parameters and
    /// returns either the audio bytes or the extractor's error text, which
    /// is classified here:
    /// - auth challenge → escalate to the next access configuration, with a
    ///   short randomized delay to avoid rapid-fire retries
    /// - unavailable/private → terminal, no further attempts
    /// - anything else → retry until the budget is exhausted
    pub fn run<F>(&self, locator: &str, mut attempt_fn: F) -> Result<Vec<u8>, FetchError>
    where
        F: FnMut(&FetchAttempt<'_>) -> Result<Vec<u8>, String>,
    {
        let variants = url_variants(locator);
        let mut last_error = String::new();

        for attempt in 0..self.max_attempts {
            let config = self.config_for_attempt(attempt);
            let url = variants[attempt as usize % variants.len()].clone();
            let params = FetchAttempt {
                index: attempt,
                config,
                url,
            };

            log::info!(
                "Fetch attempt {}/{} via '{}': {}",
                attempt + 1,
                self.max_attempts,
                config.name,
                params.url
            );

            match attempt_fn(&params) {
                Ok(bytes) => return Ok(bytes),
                Err(err_text) => {
                    match classify_extractor_error(&err_text) {
                        ExtractorFailure::Unavailable => {
                            log::error!("Track unavailable, aborting: {}", err_text);
                            return Err(FetchError::Unavailable(err_text));
                        }
                        ExtractorFailure::AuthChallenge => {
                            log::warn!("Auth challenge on attempt {}, switching client identity", attempt + 1);
                            if self.auth_jitter {
                                let jitter = 1.0 + rand::random::<f64>() * 2.0;
                                std::thread::sleep(Duration::from_secs_f64(jitter));
                            }
                        }
                        ExtractorFailure::Network | ExtractorFailure::Unknown => {
                            log::warn!("Attempt {} failed: {}", attempt + 1, err_text);
                        }
                    }
                    last_error = err_text;
                }
            }

            if attempt + 1 < self.max_attempts {
                let delay = self.delay_for_attempt(attempt);
                log::info!("Waiting {:?} before next attempt", delay);
                std::thread::sleep(delay);
            }
        }

        log::error!("All {} fetch attempts exhausted for {}", self.max_attempts, locator);
        Err(FetchError::AttemptsExhausted {
            attempts: self.max_attempts,
            last_error,
        })
    }
}

/// Extract the video id from a youtube.com / youtu.be URL.
fn video_id(locator: &str) -> Option<&str> {
    if let Some(pos) = locator.find("v=") {
        let id = &locator[pos + 2..];
        return Some(id.split('&').next().unwrap_or(id));
    }
    if locator.contains("youtu.be/") {
        let id = locator.rsplit('/').next()?;
        return Some(id.split('?').next().unwrap_or(id));
    }
    None
}

/// URL forms for the same logical video, tried in rotation across attempts:
/// canonical, short, mobile. Non-YouTube locators get a single variant.
pub fn url_variants(locator: &str) -> Vec<String> {
    match video_id(locator) {
        Some(id) if !id.is_empty() => vec![
            format!("https://www.youtube.com/watch?v={}", id),
            format!("https://youtu.be/{}", id),
            format!("https://m.youtube.com/watch?v={}", id),
        ],
        _ => vec![locator.to_string()],
    }
}
