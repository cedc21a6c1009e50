use once_cell::sync::Lazy;
use std::env;
use std::time::Duration;

/// Cached yt-dlp binary path
/// Read once at startup from YTDL_BIN environment variable or defaults to "yt-dlp"
pub static YTDL_BIN: Lazy<String> = Lazy::new(|| env::var("YTDL_BIN").unwrap_or_else(|_| "yt-dlp".to_string()));

/// Outbound proxy URL for yt-dlp traffic (e.g. socks5://host:1080)
/// Read from PROXY environment variable
/// Optional: without it YouTube may be unreachable from some regions; the
/// startup report logs a reduced-capability warning when unset.
pub static PROXY: Lazy<Option<String>> = Lazy::new(|| {
    env::var("PROXY")
        .ok()
        .and_then(|s| if s.trim().is_empty() { None } else { Some(s) })
});

/// Bot token
/// Read from BOT_TOKEN or TELOXIDE_TOKEN environment variable
pub static BOT_TOKEN: Lazy<String> = Lazy::new(|| {
    env::var("BOT_TOKEN")
        .or_else(|_| env::var("TELOXIDE_TOKEN"))
        .unwrap_or_else(|_| String::new())
});

/// Log file path
/// Read from LOG_FILE_PATH environment variable
/// Default: muza.log
pub static LOG_FILE_PATH: Lazy<String> =
    Lazy::new(|| env::var("LOG_FILE_PATH").unwrap_or_else(|_| "muza.log".to_string()));

/// Port for the keep-alive HTTP server
/// Read from PORT environment variable (the hosting platform sets it)
/// Default: 8080
pub static PORT: Lazy<u16> = Lazy::new(|| env::var("PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(8080));

/// Search configuration
pub mod search {
    use once_cell::sync::Lazy;
    use std::env;
    use std::time::Duration;

    /// Overall cap on merged results returned by one search
    pub const OVERALL_LIMIT: usize = 15;

    /// Per-source result budgets. YouTube gets roughly half the overall
    /// budget, the scraped sites a smaller fixed share each.
    pub const YOUTUBE_LIMIT: usize = 8;
    pub const MP3WR_LIMIT: usize = 4;
    pub const SEFON_LIMIT: usize = 3;

    /// Tracks shown per results page in the bot keyboard
    pub const TRACKS_PER_PAGE: usize = 5;

    /// Timeout for a single source's search call, so one slow site cannot
    /// stall the aggregate response
    /// Read from SEARCH_SOURCE_TIMEOUT_SECS environment variable
    /// Default: 20 seconds
    pub static SOURCE_TIMEOUT_SECS: Lazy<u64> = Lazy::new(|| {
        env::var("SEARCH_SOURCE_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(20)
    });

    /// Per-source search timeout duration
    pub fn source_timeout() -> Duration {
        Duration::from_secs(*SOURCE_TIMEOUT_SECS)
    }
}

/// Fetch / retry configuration for the YouTube download path
pub mod fetch {
    use once_cell::sync::Lazy;
    use std::env;
    use std::time::Duration;

    /// Attempt budget for one track download before giving up.
    /// Tracks youtube.com's current anti-automation behavior; a starting
    /// default, not a contract.
    /// Read from FETCH_MAX_ATTEMPTS environment variable
    /// Default: 3
    pub static MAX_ATTEMPTS: Lazy<u32> = Lazy::new(|| {
        env::var("FETCH_MAX_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3)
    });

    /// Base for the linear backoff between retryable attempts (seconds);
    /// attempt i waits base + i seconds
    /// Read from FETCH_BACKOFF_BASE_SECS environment variable
    /// Default: 2
    pub static BACKOFF_BASE_SECS: Lazy<u64> = Lazy::new(|| {
        env::var("FETCH_BACKOFF_BASE_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(2)
    });

    /// Timeout for one yt-dlp invocation (in seconds)
    pub const YTDLP_TIMEOUT_SECS: u64 = 240;

    /// yt-dlp command timeout duration
    pub fn ytdlp_timeout() -> Duration {
        Duration::from_secs(YTDLP_TIMEOUT_SECS)
    }
}

/// Network configuration
pub mod network {
    use super::Duration;

    /// Request timeout for scraped-site HTTP requests (in seconds)
    pub const REQUEST_TIMEOUT_SECS: u64 = 30;

    /// Connect timeout (in seconds)
    pub const CONNECT_TIMEOUT_SECS: u64 = 10;

    /// Telegram API request timeout (in seconds). Generous because audio
    /// uploads close to the 50 MB cap take a while on slow links.
    pub const UPLOAD_TIMEOUT_SECS: u64 = 900;

    /// Request timeout duration
    pub fn timeout() -> Duration {
        Duration::from_secs(REQUEST_TIMEOUT_SECS)
    }

    /// Telegram upload timeout duration
    pub fn upload_timeout() -> Duration {
        Duration::from_secs(UPLOAD_TIMEOUT_SECS)
    }

    /// Connect timeout duration
    pub fn connect_timeout() -> Duration {
        Duration::from_secs(CONNECT_TIMEOUT_SECS)
    }
}

/// Validation configuration
pub mod validation {
    /// Maximum file size Telegram accepts from a bot (50MB in bytes).
    /// The delivery layer checks fetched payloads against this before
    /// attempting to send.
    pub const MAX_AUDIO_SIZE_BYTES: u64 = 50 * 1024 * 1024;
}

/// Admin configuration
pub mod admin {
    use once_cell::sync::Lazy;
    use std::env;

    pub(crate) fn parse_admin_ids(raw: &str) -> Vec<i64> {
        raw.split([',', ' ', '\n', '\t'])
            .filter_map(|part| part.trim().parse::<i64>().ok())
            .collect()
    }

    /// Admin user IDs (comma-separated)
    /// Read from ADMIN_IDS environment variable
    pub static ADMIN_IDS: Lazy<Vec<i64>> = Lazy::new(|| {
        env::var("ADMIN_IDS")
            .ok()
            .map(|raw| parse_admin_ids(&raw))
            .unwrap_or_default()
    });

    /// Returns true if the given user id is an admin.
    pub fn is_admin(user_id: i64) -> bool {
        ADMIN_IDS.contains(&user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_admin_ids_mixed_separators() {
        assert_eq!(admin::parse_admin_ids("1, 2\n3\t4"), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_parse_admin_ids_garbage_skipped() {
        assert_eq!(admin::parse_admin_ids("7850455999, nope, 42"), vec![7850455999, 42]);
    }

    #[test]
    fn test_parse_admin_ids_empty() {
        assert!(admin::parse_admin_ids("").is_empty());
    }

    #[test]
    fn test_sub_limits_fit_overall_budget() {
        assert!(search::YOUTUBE_LIMIT + search::MP3WR_LIMIT + search::SEFON_LIMIT <= search::OVERALL_LIMIT);
    }
}
