//! Conversation summary entity.

use serde::{Deserialize, Serialize};

use super::{ChannelId, MessageId};

/// Unique identifier for a conversation summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SummaryId(pub u64);

impl SummaryId {
    /// Returns the underlying u64 value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SummaryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for SummaryId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// A platform-generated summary of a stretch of conversation, anchored to
/// the message it ends at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSummary {
    /// Summary ID.
    pub id: SummaryId,
    /// Channel the summary belongs to.
    pub channel_id: ChannelId,
    /// First message covered.
    pub start_id: MessageId,
    /// Last message covered; the summary row is seated after this row.
    pub end_id: MessageId,
    /// Short topic line.
    pub topic: String,
    /// Summary body.
    pub summary: String,
}
