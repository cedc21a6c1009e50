//! Per-chat search sessions and paging math.
//!
//! A session is the ephemeral result set of one search: it lives until the
//! user cancels, downloads a track, or starts a new search that supersedes
//! it. Nothing here is persisted.

use crate::core::config::search::TRACKS_PER_PAGE;
use crate::source::Track;
use dashmap::DashMap;

/// One user's in-progress interaction: the query, its results, and the
/// currently visible page.
#[derive(Debug, Clone)]
pub struct SearchSession {
    pub query: String,
    pub tracks: Vec<Track>,
    pub page: usize,
}

impl SearchSession {
    pub fn new(query: &str, tracks: Vec<Track>) -> Self {
        Self {
            query: query.to_string(),
            tracks,
            page: 0,
        }
    }

    pub fn total_pages(&self) -> usize {
        self.tracks.len().div_ceil(TRACKS_PER_PAGE)
    }

    /// Global index of the first track on the current page.
    pub fn page_start(&self) -> usize {
        self.page * TRACKS_PER_PAGE
    }

    /// The tracks visible on the current page.
    pub fn page_tracks(&self) -> &[Track] {
        let start = self.page_start().min(self.tracks.len());
        let end = (start + TRACKS_PER_PAGE).min(self.tracks.len());
        &self.tracks[start..end]
    }

    /// Moves to `page`, clamped to the valid range.
    pub fn set_page(&mut self, page: usize) {
        self.page = page.min(self.total_pages().saturating_sub(1));
    }
}

/// Process-wide map of chat id → active session. Passed by reference into
/// the handlers; no ambient global.
pub struct SessionStore {
    sessions: DashMap<i64, SearchSession>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Stores a fresh session, superseding any previous one for this chat.
    pub fn start(&self, chat_id: i64, session: SearchSession) {
        self.sessions.insert(chat_id, session);
    }

    /// Snapshot of the chat's session, if any.
    pub fn get(&self, chat_id: i64) -> Option<SearchSession> {
        self.sessions.get(&chat_id).map(|s| s.clone())
    }

    /// The track at a global index within the chat's session.
    pub fn track(&self, chat_id: i64, index: usize) -> Option<Track> {
        self.sessions.get(&chat_id).and_then(|s| s.tracks.get(index).cloned())
    }

    /// Turns to `page` and returns the updated snapshot.
    pub fn set_page(&self, chat_id: i64, page: usize) -> Option<SearchSession> {
        let mut session = self.sessions.get_mut(&chat_id)?;
        session.set_page(page);
        Some(session.clone())
    }

    /// Discards the chat's session (cancel, completed download).
    pub fn clear(&self, chat_id: i64) -> bool {
        self.sessions.remove(&chat_id).is_some()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
