//! Discord channel entity.

use serde::{Deserialize, Serialize};

use super::{GuildId, MessageId, User};

/// Unique identifier for a Discord channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChannelId(pub u64);

impl ChannelId {
    /// Returns the underlying u64 value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ChannelId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Discord channel type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum ChannelKind {
    /// Text channel.
    #[default]
    Text = 0,
    /// Direct message channel.
    DirectMessage = 1,
    /// Voice channel.
    Voice = 2,
    /// Group direct message channel.
    GroupDm = 3,
    /// Category channel.
    Category = 4,
    /// Announcement channel.
    Announcement = 5,
    /// Announcement thread channel.
    AnnouncementThread = 10,
    /// Public thread channel.
    PublicThread = 11,
    /// Private thread channel.
    PrivateThread = 12,
    /// Stage voice channel.
    StageVoice = 13,
    /// Forum channel.
    Forum = 15,
}

impl ChannelKind {
    /// Returns true if this channel type carries text messages.
    #[must_use]
    pub const fn is_text_based(self) -> bool {
        matches!(
            self,
            Self::Text
                | Self::DirectMessage
                | Self::GroupDm
                | Self::Announcement
                | Self::AnnouncementThread
                | Self::PublicThread
                | Self::PrivateThread
        )
    }

    /// Returns true if this is a category channel.
    #[must_use]
    pub const fn is_category(self) -> bool {
        matches!(self, Self::Category)
    }

    /// Returns true if this is a thread channel.
    #[must_use]
    pub const fn is_thread(self) -> bool {
        matches!(
            self,
            Self::AnnouncementThread | Self::PublicThread | Self::PrivateThread
        )
    }

    /// Returns true if this is a voice channel.
    #[must_use]
    pub const fn is_voice(self) -> bool {
        matches!(self, Self::Voice | Self::StageVoice)
    }

    /// Returns true if channels of this kind may hold child channels.
    ///
    /// Categories hold regular channels; thread-capable guild channels hold
    /// threads.
    #[must_use]
    pub const fn allows_children(self) -> bool {
        matches!(
            self,
            Self::Category | Self::Text | Self::Announcement | Self::Forum
        )
    }

    /// Returns true if a thread may be parented to this kind.
    #[must_use]
    pub const fn allows_threads(self) -> bool {
        matches!(self, Self::Text | Self::Announcement | Self::Forum)
    }
}

impl From<u8> for ChannelKind {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::DirectMessage,
            2 => Self::Voice,
            3 => Self::GroupDm,
            4 => Self::Category,
            5 => Self::Announcement,
            10 => Self::AnnouncementThread,
            11 => Self::PublicThread,
            12 => Self::PrivateThread,
            13 => Self::StageVoice,
            15 => Self::Forum,
            _ => Self::Text,
        }
    }
}

/// Discord channel information.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Channel {
    id: ChannelId,
    guild_id: Option<GuildId>,
    name: String,
    kind: ChannelKind,
    parent_id: Option<ChannelId>,
    position: i32,
    #[serde(default)]
    nsfw: bool,
    last_message_id: Option<MessageId>,
    #[serde(default)]
    recipients: Vec<User>,
}

impl Channel {
    /// Creates a new channel with the given ID, name, and type.
    #[must_use]
    pub fn new(id: impl Into<ChannelId>, name: impl Into<String>, kind: ChannelKind) -> Self {
        Self {
            id: id.into(),
            guild_id: None,
            name: name.into(),
            kind,
            parent_id: None,
            position: 0,
            nsfw: false,
            last_message_id: None,
            recipients: Vec::new(),
        }
    }

    /// Sets the guild ID for this channel.
    #[must_use]
    pub fn with_guild(mut self, guild_id: impl Into<GuildId>) -> Self {
        self.guild_id = Some(guild_id.into());
        self
    }

    /// Sets the parent channel ID.
    #[must_use]
    pub fn with_parent(mut self, parent_id: impl Into<ChannelId>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// Sets the position of this channel in the channel list.
    #[must_use]
    pub const fn with_position(mut self, position: i32) -> Self {
        self.position = position;
        self
    }

    /// Marks the channel as NSFW.
    #[must_use]
    pub const fn with_nsfw(mut self, nsfw: bool) -> Self {
        self.nsfw = nsfw;
        self
    }

    /// Sets the ID of the last message sent in this channel.
    #[must_use]
    pub fn with_last_message(mut self, id: impl Into<MessageId>) -> Self {
        self.last_message_id = Some(id.into());
        self
    }

    /// Sets the recipients for a direct or group message channel.
    #[must_use]
    pub fn with_recipients(mut self, recipients: Vec<User>) -> Self {
        self.recipients = recipients;
        self
    }

    /// Returns the channel ID.
    #[must_use]
    pub const fn id(&self) -> ChannelId {
        self.id
    }

    /// Returns the guild ID, if this is a guild channel.
    #[must_use]
    pub const fn guild_id(&self) -> Option<GuildId> {
        self.guild_id
    }

    /// Returns the channel name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the channel type.
    #[must_use]
    pub const fn kind(&self) -> ChannelKind {
        self.kind
    }

    /// Returns the parent channel ID, if any.
    #[must_use]
    pub const fn parent_id(&self) -> Option<ChannelId> {
        self.parent_id
    }

    /// Returns the channel position in the channel list.
    #[must_use]
    pub const fn position(&self) -> i32 {
        self.position
    }

    /// Returns whether the channel is marked NSFW.
    #[must_use]
    pub const fn nsfw(&self) -> bool {
        self.nsfw
    }

    /// Returns the ID of the last message sent in this channel.
    #[must_use]
    pub const fn last_message_id(&self) -> Option<MessageId> {
        self.last_message_id
    }

    /// Updates the last-message ID.
    pub fn set_last_message_id(&mut self, id: MessageId) {
        self.last_message_id = Some(id);
    }

    /// Returns the recipients of a direct or group message channel.
    #[must_use]
    pub fn recipients(&self) -> &[User] {
        &self.recipients
    }
}
