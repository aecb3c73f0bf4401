//! Read state entity.

use serde::{Deserialize, Serialize};

use super::{ChannelId, MessageId};

/// Displayed unread indication of a channel. Ordered so that aggregation
/// up the channel tree is a plain `max`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub enum UnreadIndication {
    /// All messages acknowledged.
    #[default]
    Read,
    /// Unacknowledged messages present.
    Unread,
    /// Unacknowledged messages mentioning the user.
    Mentioned,
}

/// Read state for a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadState {
    /// Channel ID.
    pub channel_id: ChannelId,
    /// ID of the last acknowledged message.
    pub last_read_message_id: Option<MessageId>,
    /// Number of unacknowledged mentions.
    #[serde(default)]
    pub mention_count: u32,
}

impl ReadState {
    /// Creates a new read state.
    #[must_use]
    pub const fn new(channel_id: ChannelId, last_read_message_id: Option<MessageId>) -> Self {
        Self {
            channel_id,
            last_read_message_id,
            mention_count: 0,
        }
    }

    /// Sets the mention count.
    #[must_use]
    pub const fn with_mention_count(mut self, count: u32) -> Self {
        self.mention_count = count;
        self
    }

    /// Returns the unread indication implied by this read state against
    /// the channel's latest message.
    #[must_use]
    pub fn indication(&self, last_message_id: Option<MessageId>) -> UnreadIndication {
        if self.mention_count > 0 {
            return UnreadIndication::Mentioned;
        }
        match (self.last_read_message_id, last_message_id) {
            (Some(read), Some(last)) if read >= last => UnreadIndication::Read,
            (_, None) => UnreadIndication::Read,
            _ => UnreadIndication::Unread,
        }
    }
}
