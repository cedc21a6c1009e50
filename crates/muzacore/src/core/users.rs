//! In-memory user registry.
//!
//! Keeps who has talked to the bot and when, for the admin /stats view.
//! Process-lifetime only: the hosting plan has no persistent disk, so this
//! is rebuilt from scratch on every restart.

use chrono::{DateTime, Utc};
use dashmap::DashMap;

#[derive(Debug, Clone)]
pub struct UserRecord {
    pub user_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub joined: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

/// Shared registry, passed by reference into handlers and the stats
/// endpoint.
pub struct UserRegistry {
    users: DashMap<i64, UserRecord>,
}

impl UserRegistry {
    pub fn new() -> Self {
        Self { users: DashMap::new() }
    }

    /// Records contact from a user. Returns true for a first-time user,
    /// false for an update of an existing record.
    pub fn touch(&self, user_id: i64, username: Option<&str>, first_name: Option<&str>) -> bool {
        let now = Utc::now();

        if let Some(mut record) = self.users.get_mut(&user_id) {
            record.last_seen = now;
            if let Some(username) = username {
                record.username = Some(username.to_string());
            }
            if let Some(first_name) = first_name {
                record.first_name = Some(first_name.to_string());
            }
            return false;
        }

        self.users.insert(
            user_id,
            UserRecord {
                user_id,
                username: username.map(str::to_string),
                first_name: first_name.map(str::to_string),
                joined: now,
                last_seen: now,
            },
        );
        true
    }

    pub fn count(&self) -> usize {
        self.users.len()
    }

    /// The most recently joined users, newest first.
    pub fn recent(&self, limit: usize) -> Vec<UserRecord> {
        let mut records: Vec<UserRecord> = self.users.iter().map(|r| r.clone()).collect();
        records.sort_by(|a, b| b.joined.cmp(&a.joined).then(b.user_id.cmp(&a.user_id)));
        records.truncate(limit);
        records
    }
}

impl Default for UserRegistry {
    fn default() -> Self {
        Self::new()
    }
}
