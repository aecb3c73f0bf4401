//! Typing indicator state.

use chrono::{DateTime, Utc};

use crate::domain::entities::UserId;

/// One user currently typing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypingEntry {
    /// The typing user.
    pub user_id: UserId,
    /// Name rendered in the indicator.
    pub name: String,
    /// Last TypingStart for this user.
    pub started_at: DateTime<Utc>,
}

/// Tracks who is typing in a channel.
///
/// Entries expire after the configured timeout without a refresh, or
/// immediately when the user's message arrives.
#[derive(Debug)]
pub struct TypingTracker {
    entries: Vec<TypingEntry>,
    timeout: chrono::Duration,
}

impl TypingTracker {
    /// Creates a tracker with the given expiry.
    #[must_use]
    pub fn new(timeout: std::time::Duration) -> Self {
        Self {
            entries: Vec::new(),
            timeout: chrono::Duration::from_std(timeout)
                .unwrap_or_else(|_| chrono::Duration::seconds(10)),
        }
    }

    /// Inserts or refreshes a typing entry, keeping start order.
    pub fn upsert(&mut self, user_id: UserId, name: String, at: DateTime<Utc>) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.user_id == user_id) {
            entry.started_at = at;
            entry.name = name;
        } else {
            self.entries.push(TypingEntry {
                user_id,
                name,
                started_at: at,
            });
        }
    }

    /// Removes a user's entry, used when their message arrives.
    pub fn remove(&mut self, user_id: UserId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.user_id != user_id);
        self.entries.len() != before
    }

    /// Drops expired entries. Returns whether anything changed.
    pub fn sweep(&mut self, now: DateTime<Utc>) -> bool {
        let timeout = self.timeout;
        let before = self.entries.len();
        self.entries.retain(|e| now - e.started_at <= timeout);
        self.entries.len() != before
    }

    /// Returns whether nobody is typing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the current entries in start order.
    #[must_use]
    pub fn entries(&self) -> &[TypingEntry] {
        &self.entries
    }

    /// Renders the indicator from the first three entries.
    #[must_use]
    pub fn indicator_text(&self) -> Option<String> {
        let names: Vec<&str> = self.entries.iter().map(|e| e.name.as_str()).collect();
        match names.as_slice() {
            [] => None,
            [a] => Some(format!("{a} is typing\u{2026}")),
            [a, b] => Some(format!("{a} and {b} are typing\u{2026}")),
            [a, b, c] => Some(format!("{a}, {b} and {c} are typing\u{2026}")),
            _ => Some("Several people are typing\u{2026}".to_string()),
        }
    }
}
