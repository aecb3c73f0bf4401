//! Async request boundary to the platform's REST client.

use std::io::Read;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::domain::entities::{
    Channel, ChannelId, Guild, GuildId, Member, Message, MessageId, MessageReference,
    ReactionEmoji, User, UserId,
};
use crate::domain::errors::ModelError;

/// Readable payload produced by opening an [`OutgoingFile`].
pub type FileReader = Box<dyn Read + Send>;

/// A file queued for upload. The opener is asserted to succeed at most
/// once; a second open returns [`ModelError::FileConsumed`] so a failed
/// upload never closes the file twice.
pub struct OutgoingFile {
    name: String,
    mime: String,
    size: u64,
    opener: Mutex<Option<Box<dyn FnOnce() -> std::io::Result<FileReader> + Send>>>,
}

impl OutgoingFile {
    /// Creates a new outgoing file from a one-shot opener.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        mime: impl Into<String>,
        size: u64,
        opener: impl FnOnce() -> std::io::Result<FileReader> + Send + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            size,
            opener: Mutex::new(Some(Box::new(opener))),
        }
    }

    /// Returns the file name as queued.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the MIME type.
    #[must_use]
    pub fn mime(&self) -> &str {
        &self.mime
    }

    /// Returns the file size in bytes.
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size
    }

    /// Opens the file. Succeeds at most once.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::FileConsumed`] on a second call, or the I/O
    /// error from the opener.
    pub fn open(&self) -> Result<FileReader, ModelError> {
        let opener = self
            .opener
            .lock()
            .take()
            .ok_or_else(|| ModelError::FileConsumed {
                name: self.name.clone(),
            })?;
        Ok(opener()?)
    }
}

impl std::fmt::Debug for OutgoingFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutgoingFile")
            .field("name", &self.name)
            .field("mime", &self.mime)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

/// Mention parsing behaviour attached to an outgoing message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AllowedMentions {
    /// Whether the author of the replied-to message is pinged.
    pub replied_user: bool,
}

impl AllowedMentions {
    /// Creates allowed-mentions for a reply.
    #[must_use]
    pub const fn replying(mention: bool) -> Self {
        Self {
            replied_user: mention,
        }
    }
}

/// Outgoing message payload. The nonce placed here is echoed verbatim on
/// the resulting gateway MessageCreate.
#[derive(Debug)]
pub struct SendMessageRequest {
    /// Target channel.
    pub channel_id: ChannelId,
    /// Message content.
    pub content: String,
    /// Reply reference, if any.
    pub reference: Option<MessageReference>,
    /// Client-generated correlation nonce.
    pub nonce: Option<String>,
    /// Mention behaviour.
    pub allowed_mentions: Option<AllowedMentions>,
    /// Files to upload alongside the message.
    pub files: Vec<OutgoingFile>,
}

impl SendMessageRequest {
    /// Creates a request with content only.
    #[must_use]
    pub fn new(channel_id: ChannelId, content: impl Into<String>) -> Self {
        Self {
            channel_id,
            content: content.into(),
            reference: None,
            nonce: None,
            allowed_mentions: None,
            files: Vec::new(),
        }
    }

    /// Sets the reply reference.
    #[must_use]
    pub const fn with_reference(mut self, reference: MessageReference) -> Self {
        self.reference = Some(reference);
        self
    }

    /// Sets the nonce.
    #[must_use]
    pub fn with_nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    /// Sets the allowed-mentions behaviour.
    #[must_use]
    pub const fn with_allowed_mentions(mut self, mentions: AllowedMentions) -> Self {
        self.allowed_mentions = Some(mentions);
        self
    }

    /// Attaches files.
    #[must_use]
    pub fn with_files(mut self, files: Vec<OutgoingFile>) -> Self {
        self.files = files;
        self
    }
}

/// Async request interface to the platform. Implementations own transport,
/// auth, and rate limiting; the model only sees these operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClientPort: Send + Sync {
    /// Fetches the latest messages in a channel, most recent last.
    async fn messages(
        &self,
        channel_id: ChannelId,
        limit: u8,
    ) -> Result<Vec<Message>, ModelError>;

    /// Fetches up to `limit` messages strictly before `before`.
    async fn messages_before(
        &self,
        channel_id: ChannelId,
        before: MessageId,
        limit: u8,
    ) -> Result<Vec<Message>, ModelError>;

    /// Sends a message.
    async fn send_message(&self, request: SendMessageRequest) -> Result<Message, ModelError>;

    /// Edits an existing message.
    async fn edit_message(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
        content: String,
    ) -> Result<Message, ModelError>;

    /// Deletes a message.
    async fn delete_message(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
    ) -> Result<(), ModelError>;

    /// Adds a reaction to a message.
    async fn react(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
        emoji: ReactionEmoji,
    ) -> Result<(), ModelError>;

    /// Removes the current user's reaction from a message.
    async fn unreact(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
        emoji: ReactionEmoji,
    ) -> Result<(), ModelError>;

    /// Lists users who reacted with an emoji.
    async fn reactions(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
        emoji: ReactionEmoji,
        limit: u8,
    ) -> Result<Vec<User>, ModelError>;

    /// Acknowledges a message as read.
    async fn mark_read(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
    ) -> Result<(), ModelError>;

    /// Fetches a channel.
    async fn channel(&self, channel_id: ChannelId) -> Result<Channel, ModelError>;

    /// Fetches all channels of a guild.
    async fn channels(&self, guild_id: GuildId) -> Result<Vec<Channel>, ModelError>;

    /// Fetches a guild member.
    async fn member(&self, guild_id: GuildId, user_id: UserId) -> Result<Member, ModelError>;

    /// Fetches all members of a guild.
    async fn members(&self, guild_id: GuildId) -> Result<Vec<Member>, ModelError>;

    /// Fetches a guild.
    async fn guild(&self, guild_id: GuildId) -> Result<Guild, ModelError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outgoing_file_opens_once() {
        let file = OutgoingFile::new("note.txt", "text/plain", 4, || {
            Ok(Box::new(std::io::Cursor::new(b"text".to_vec())) as FileReader)
        });

        assert!(file.open().is_ok());
        assert!(matches!(
            file.open(),
            Err(ModelError::FileConsumed { .. })
        ));
    }
}
