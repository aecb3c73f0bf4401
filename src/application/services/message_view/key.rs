//! Row identity: server id, local nonce, or summary id.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entities::{MessageId, SummaryId};

/// Client-generated correlation nonce for optimistic sends. Unique within a
/// channel for the lifetime of the view.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Nonce(String);

impl Nonce {
    /// Generates a fresh random nonce.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Returns the nonce string placed on the outgoing request.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Nonce {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Nonce {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl std::fmt::Display for Nonce {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of a row in the view.
///
/// Server-confirmed rows are keyed by message id, optimistic rows by their
/// nonce until the echo re-keys them, and summary rows by summary id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MessageKey {
    /// A server-confirmed message.
    Event(MessageId),
    /// An optimistic local row awaiting its echo.
    Local(Nonce),
    /// An inline conversation summary.
    Summary(SummaryId),
}

impl MessageKey {
    /// Returns whether this key is a server-confirmed message.
    #[must_use]
    pub const fn is_event(&self) -> bool {
        matches!(self, Self::Event(_))
    }

    /// Returns whether this key is an optimistic local row.
    #[must_use]
    pub const fn is_local(&self) -> bool {
        matches!(self, Self::Local(_))
    }

    /// Returns whether this key is a summary row.
    #[must_use]
    pub const fn is_summary(&self) -> bool {
        matches!(self, Self::Summary(_))
    }

    /// Returns the message id for server-confirmed rows.
    #[must_use]
    pub const fn event_id(&self) -> Option<MessageId> {
        match self {
            Self::Event(id) => Some(*id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_nonces_are_unique() {
        let a = Nonce::generate();
        let b = Nonce::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 32);
    }

    #[test]
    fn test_key_predicates() {
        assert!(MessageKey::Event(MessageId(1)).is_event());
        assert!(MessageKey::Local(Nonce::from("n")).is_local());
        assert!(MessageKey::Summary(SummaryId(1)).is_summary());
        assert_eq!(MessageKey::Event(MessageId(7)).event_id(), Some(MessageId(7)));
        assert_eq!(MessageKey::Local(Nonce::from("n")).event_id(), None);
    }
}
