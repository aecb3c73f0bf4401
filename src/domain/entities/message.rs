//! Discord message entity.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::{ChannelId, EmojiId, GuildId, User, UserId};

/// Milliseconds since the Unix epoch at which the Discord snowflake epoch
/// starts (2015-01-01T00:00:00Z).
const DISCORD_EPOCH_MS: i64 = 1_420_070_400_000;

/// Unique identifier for a Discord message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageId(pub u64);

impl MessageId {
    /// Returns the underlying u64 value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns the creation time encoded in the snowflake's top bits.
    #[must_use]
    pub fn timestamp(self) -> DateTime<Utc> {
        let ms = DISCORD_EPOCH_MS + i64::try_from(self.0 >> 22).unwrap_or(0);
        Utc.timestamp_millis_opt(ms).single().unwrap_or_default()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for MessageId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

bitflags::bitflags! {
    /// Message flags as defined by the platform.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct MessageFlags: u32 {
        /// Published to subscribed channels.
        const CROSSPOSTED = 1 << 0;
        /// Originated from another channel.
        const IS_CROSSPOST = 1 << 1;
        /// Embeds suppressed.
        const SUPPRESS_EMBEDS = 1 << 2;
        /// Source message deleted.
        const SOURCE_MESSAGE_DELETED = 1 << 3;
        /// Urgent system message.
        const URGENT = 1 << 4;
        /// Ephemeral interaction response.
        const EPHEMERAL = 1 << 6;
        /// Notifications suppressed.
        const SUPPRESS_NOTIFICATIONS = 1 << 12;
    }
}

/// Discord message attachment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Attachment {
    id: String,
    filename: String,
    size: u64,
    url: String,
    content_type: Option<String>,
}

impl Attachment {
    /// Creates a new attachment.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        filename: impl Into<String>,
        size: u64,
        url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            filename: filename.into(),
            size,
            url: url.into(),
            content_type: None,
        }
    }

    /// Sets the MIME type.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Returns the attachment filename.
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Returns the attachment size in bytes.
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size
    }

    /// Returns the attachment URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the MIME type, if known.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }
}

/// A message embed, kept minimal because rendering is out of scope.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Embed {
    /// Embed title.
    pub title: Option<String>,
    /// Embed description.
    pub description: Option<String>,
    /// Embed URL.
    pub url: Option<String>,
}

/// A message sticker item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Sticker {
    /// Sticker ID.
    pub id: u64,
    /// Sticker name.
    pub name: String,
}

/// Emoji attached to a reaction; either unicode (no id) or a custom guild
/// emoji.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ReactionEmoji {
    /// Custom emoji ID, absent for unicode emoji.
    pub id: Option<EmojiId>,
    /// Emoji name or unicode codepoints.
    pub name: String,
}

impl ReactionEmoji {
    /// Creates a unicode reaction emoji.
    #[must_use]
    pub fn unicode(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
        }
    }

    /// Creates a custom reaction emoji.
    #[must_use]
    pub fn custom(id: impl Into<EmojiId>, name: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            name: name.into(),
        }
    }

    /// Returns the API form of the emoji: raw codepoints for unicode,
    /// `name:id` for custom emoji.
    #[must_use]
    pub fn api_format(&self) -> String {
        match self.id {
            Some(id) => format!("{}:{}", self.name, id),
            None => self.name.clone(),
        }
    }
}

/// Aggregated reaction on a message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Reaction {
    /// The emoji reacted with.
    pub emoji: ReactionEmoji,
    /// Total reaction count.
    pub count: u32,
    /// Whether the current user reacted.
    #[serde(default)]
    pub me: bool,
}

/// Reference to another message (for replies).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageReference {
    /// Channel of the referenced message.
    pub channel_id: ChannelId,
    /// The referenced message.
    pub message_id: Option<MessageId>,
    /// Guild of the referenced message.
    pub guild_id: Option<GuildId>,
}

impl MessageReference {
    /// Creates a reference to a message in a channel.
    #[must_use]
    pub const fn new(channel_id: ChannelId, message_id: MessageId) -> Self {
        Self {
            channel_id,
            message_id: Some(message_id),
            guild_id: None,
        }
    }

    /// Sets the guild ID.
    #[must_use]
    pub const fn with_guild(mut self, guild_id: GuildId) -> Self {
        self.guild_id = Some(guild_id);
        self
    }
}

/// Author of a Discord message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageAuthor {
    id: UserId,
    username: String,
    discriminator: String,
    #[serde(default)]
    bot: bool,
}

impl MessageAuthor {
    /// Creates a new message author.
    #[must_use]
    pub fn new(
        id: impl Into<UserId>,
        username: impl Into<String>,
        discriminator: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            discriminator: discriminator.into(),
            bot: false,
        }
    }

    /// Returns the author's user ID.
    #[must_use]
    pub const fn id(&self) -> UserId {
        self.id
    }

    /// Returns the author's username.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the author's tag.
    #[must_use]
    pub fn tag(&self) -> String {
        if self.discriminator == "0" {
            self.username.clone()
        } else {
            format!("{}#{}", self.username, self.discriminator)
        }
    }

    /// Returns whether the author is a bot.
    #[must_use]
    pub const fn is_bot(&self) -> bool {
        self.bot
    }
}

impl From<&User> for MessageAuthor {
    fn from(user: &User) -> Self {
        Self {
            id: user.id(),
            username: user.username().to_string(),
            discriminator: user.discriminator().to_string(),
            bot: user.is_bot(),
        }
    }
}

/// Discord message entity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    id: MessageId,
    channel_id: ChannelId,
    guild_id: Option<GuildId>,
    author: MessageAuthor,
    content: String,
    timestamp: DateTime<Utc>,
    edited_timestamp: Option<DateTime<Utc>>,
    reference: Option<MessageReference>,
    #[serde(default)]
    attachments: Vec<Attachment>,
    #[serde(default)]
    embeds: Vec<Embed>,
    #[serde(default)]
    stickers: Vec<Sticker>,
    #[serde(default)]
    reactions: Vec<Reaction>,
    #[serde(default)]
    flags: MessageFlags,
    /// Set only on locally-originated messages and their gateway echoes.
    #[serde(default)]
    nonce: Option<String>,
}

impl Message {
    /// Creates a new message.
    #[must_use]
    pub fn new(
        id: impl Into<MessageId>,
        channel_id: impl Into<ChannelId>,
        author: MessageAuthor,
        content: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            channel_id: channel_id.into(),
            guild_id: None,
            author,
            content: content.into(),
            timestamp,
            edited_timestamp: None,
            reference: None,
            attachments: Vec::new(),
            embeds: Vec::new(),
            stickers: Vec::new(),
            reactions: Vec::new(),
            flags: MessageFlags::empty(),
            nonce: None,
        }
    }

    /// Sets the guild ID.
    #[must_use]
    pub fn with_guild(mut self, guild_id: impl Into<GuildId>) -> Self {
        self.guild_id = Some(guild_id.into());
        self
    }

    /// Sets the reply reference.
    #[must_use]
    pub const fn with_reference(mut self, reference: MessageReference) -> Self {
        self.reference = Some(reference);
        self
    }

    /// Sets the attachments.
    #[must_use]
    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = attachments;
        self
    }

    /// Sets the edited timestamp.
    #[must_use]
    pub const fn with_edited_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.edited_timestamp = Some(timestamp);
        self
    }

    /// Sets the nonce.
    #[must_use]
    pub fn with_nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    /// Sets the message flags.
    #[must_use]
    pub const fn with_flags(mut self, flags: MessageFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Returns the message ID.
    #[must_use]
    pub const fn id(&self) -> MessageId {
        self.id
    }

    /// Returns the channel ID.
    #[must_use]
    pub const fn channel_id(&self) -> ChannelId {
        self.channel_id
    }

    /// Returns the guild ID, if any.
    #[must_use]
    pub const fn guild_id(&self) -> Option<GuildId> {
        self.guild_id
    }

    /// Returns the message author.
    #[must_use]
    pub const fn author(&self) -> &MessageAuthor {
        &self.author
    }

    /// Returns the message content.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Replaces the message content.
    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Returns the edited timestamp, if the message was edited.
    #[must_use]
    pub const fn edited_timestamp(&self) -> Option<DateTime<Utc>> {
        self.edited_timestamp
    }

    /// Returns the reply reference, if any.
    #[must_use]
    pub const fn reference(&self) -> Option<&MessageReference> {
        self.reference.as_ref()
    }

    /// Returns the attachments.
    #[must_use]
    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    /// Returns the embeds.
    #[must_use]
    pub fn embeds(&self) -> &[Embed] {
        &self.embeds
    }

    /// Returns the stickers.
    #[must_use]
    pub fn stickers(&self) -> &[Sticker] {
        &self.stickers
    }

    /// Returns the reactions.
    #[must_use]
    pub fn reactions(&self) -> &[Reaction] {
        &self.reactions
    }

    /// Returns the message flags.
    #[must_use]
    pub const fn flags(&self) -> MessageFlags {
        self.flags
    }

    /// Returns the nonce, set only on locally-originated messages.
    #[must_use]
    pub fn nonce(&self) -> Option<&str> {
        self.nonce.as_deref()
    }

    /// Returns whether the message was edited.
    #[must_use]
    pub const fn is_edited(&self) -> bool {
        self.edited_timestamp.is_some()
    }

    /// Increments the reaction count for an emoji, inserting the aggregate
    /// if it is not present.
    pub fn add_reaction(&mut self, emoji: &ReactionEmoji, me: bool) {
        if let Some(r) = self.reactions.iter_mut().find(|r| r.emoji == *emoji) {
            r.count += 1;
            r.me |= me;
        } else {
            self.reactions.push(Reaction {
                emoji: emoji.clone(),
                count: 1,
                me,
            });
        }
    }

    /// Decrements the reaction count for an emoji, removing the aggregate
    /// when it reaches zero.
    pub fn remove_reaction(&mut self, emoji: &ReactionEmoji, me: bool) {
        if let Some(i) = self.reactions.iter().position(|r| r.emoji == *emoji) {
            let r = &mut self.reactions[i];
            r.count = r.count.saturating_sub(1);
            if me {
                r.me = false;
            }
            if r.count == 0 {
                self.reactions.remove(i);
            }
        }
    }

    /// Removes every reaction.
    pub fn clear_reactions(&mut self) {
        self.reactions.clear();
    }

    /// Removes all reactions with the given emoji.
    pub fn clear_reaction_emoji(&mut self, emoji: &ReactionEmoji) {
        self.reactions.retain(|r| r.emoji != *emoji);
    }
}
