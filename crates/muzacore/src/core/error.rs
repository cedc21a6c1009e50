use crate::source::SourceKind;
use thiserror::Error;

/// A source's search failed entirely (not "no results", which is an empty
/// list). The aggregator catches this at its boundary, logs it, and treats
/// the source as having contributed zero results.
#[derive(Debug, Error)]
pub enum SourceError {
    /// HTTP client construction or transport failure
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The extractor binary could not be spawned or exited abnormally
    #[error("extractor error: {0}")]
    Extractor(String),

    /// IO failure talking to the extractor process
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A configured base URL failed to parse
    #[error("invalid base url: {0}")]
    BaseUrl(#[from] url::ParseError),
}

/// Failure to retrieve the bytes of a selected track.
///
/// `UnknownSource` is the odd one out: it means a `Track` carried a
/// provenance tag no registered adapter owns: a contract violation between
/// adapter and aggregator, not an upstream problem. The aggregator logs it
/// loudly and performs no network call.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Track provenance tag has no registered adapter
    #[error("no adapter registered for source {0}")]
    UnknownSource(SourceKind),

    /// The upstream says the resource cannot be served (private, removed);
    /// retrying cannot help
    #[error("track unavailable: {0}")]
    Unavailable(String),

    /// All configured fetch attempts were exhausted
    #[error("fetch failed after {attempts} attempts: {last_error}")]
    AttemptsExhausted { attempts: u32, last_error: String },

    /// HTTP transport failure
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status from the site
    #[error("http request failed with status: {0}")]
    Status(reqwest::StatusCode),

    /// The page was fetched but no playable audio reference was found in it
    #[error("no audio found: {0}")]
    NoAudioFound(String),

    /// IO failure reading the downloaded file
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl FetchError {
    /// True when no further attempt against this track can succeed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, FetchError::Unavailable(_) | FetchError::UnknownSource(_))
    }
}
