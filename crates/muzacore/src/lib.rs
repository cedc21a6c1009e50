//! Muza core — the engine behind the Muza music bot.
//!
//! Searches several independent music sources (yt-dlp-driven YouTube plus
//! HTML-scraped sites), merges the hits into one provenance-tagged list,
//! and fetches a selected track's audio with a per-source fallback policy.
//! No Telegram types in here; the bot crate owns the user-facing layer.

pub mod aggregator;
pub mod core;
pub mod source;

pub use aggregator::{Aggregator, SearchLimits, SearchResults, SourceHealth};
pub use core::error::{FetchError, SourceError};
pub use core::session::{SearchSession, SessionStore};
pub use core::users::{UserRecord, UserRegistry};
pub use source::{FoundTrack, MusicSource, SourceKind, Track};
