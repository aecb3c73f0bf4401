//! Gateway event sum type and variant filters.

use chrono::{DateTime, Utc};

use crate::domain::entities::{
    Channel, ChannelId, ConversationSummary, Guild, GuildId, Member, Message, MessageId,
    ReactionEmoji, ReadState, User, UserId,
};

bitflags::bitflags! {
    /// Variant-set filter for event subscriptions. An empty filter matches
    /// every event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct EventFilter: u32 {
        /// Ready.
        const READY = 1 << 0;
        /// MessageCreate.
        const MESSAGE_CREATE = 1 << 1;
        /// MessageUpdate.
        const MESSAGE_UPDATE = 1 << 2;
        /// MessageDelete.
        const MESSAGE_DELETE = 1 << 3;
        /// MessageDeleteBulk.
        const MESSAGE_DELETE_BULK = 1 << 4;
        /// ReactionAdd.
        const REACTION_ADD = 1 << 5;
        /// ReactionRemove.
        const REACTION_REMOVE = 1 << 6;
        /// ReactionRemoveAll.
        const REACTION_REMOVE_ALL = 1 << 7;
        /// ReactionRemoveEmoji.
        const REACTION_REMOVE_EMOJI = 1 << 8;
        /// TypingStart.
        const TYPING_START = 1 << 9;
        /// GuildUpdate.
        const GUILD_UPDATE = 1 << 10;
        /// ChannelCreate.
        const CHANNEL_CREATE = 1 << 11;
        /// ChannelUpdate.
        const CHANNEL_UPDATE = 1 << 12;
        /// ChannelDelete.
        const CHANNEL_DELETE = 1 << 13;
        /// ThreadCreate.
        const THREAD_CREATE = 1 << 14;
        /// ThreadUpdate.
        const THREAD_UPDATE = 1 << 15;
        /// ThreadDelete.
        const THREAD_DELETE = 1 << 16;
        /// ThreadListSync.
        const THREAD_LIST_SYNC = 1 << 17;
        /// GuildMemberAdd.
        const GUILD_MEMBER_ADD = 1 << 18;
        /// GuildMemberUpdate.
        const GUILD_MEMBER_UPDATE = 1 << 19;
        /// GuildMemberRemove.
        const GUILD_MEMBER_REMOVE = 1 << 20;
        /// GuildMembersChunk.
        const GUILD_MEMBERS_CHUNK = 1 << 21;
        /// ReadStateUpdate.
        const READ_STATE_UPDATE = 1 << 22;
        /// ConversationSummaryUpdate.
        const CONVERSATION_SUMMARY_UPDATE = 1 << 23;

        /// Every message lifecycle variant.
        const MESSAGES = Self::MESSAGE_CREATE.bits()
            | Self::MESSAGE_UPDATE.bits()
            | Self::MESSAGE_DELETE.bits()
            | Self::MESSAGE_DELETE_BULK.bits();
        /// Every reaction variant.
        const REACTIONS = Self::REACTION_ADD.bits()
            | Self::REACTION_REMOVE.bits()
            | Self::REACTION_REMOVE_ALL.bits()
            | Self::REACTION_REMOVE_EMOJI.bits();
        /// Every member variant.
        const MEMBERS = Self::GUILD_MEMBER_ADD.bits()
            | Self::GUILD_MEMBER_UPDATE.bits()
            | Self::GUILD_MEMBER_REMOVE.bits()
            | Self::GUILD_MEMBERS_CHUNK.bits();
    }
}

impl EventFilter {
    /// Returns whether the filter matches the given event. An empty filter
    /// matches everything.
    #[must_use]
    pub fn matches(self, event: &Event) -> bool {
        self.is_empty() || self.intersects(event.kind())
    }
}

/// Events delivered by the platform gateway, already decoded from the wire.
#[derive(Debug, Clone)]
#[allow(clippy::large_enum_variant)]
pub enum Event {
    /// Session established.
    Ready {
        /// The current user.
        user: User,
        /// Read states for every known channel.
        read_states: Vec<ReadState>,
    },
    /// A message was posted. Carries the echoed nonce for local sends.
    MessageCreate {
        /// The new message.
        message: Message,
        /// Resolved member of the author, when available.
        member: Option<Member>,
    },
    /// A message was edited.
    MessageUpdate {
        /// The updated message.
        message: Message,
    },
    /// A message was deleted.
    MessageDelete {
        /// Channel of the deleted message.
        channel_id: ChannelId,
        /// The deleted message.
        message_id: MessageId,
        /// Guild, if any.
        guild_id: Option<GuildId>,
    },
    /// Several messages were deleted at once.
    MessageDeleteBulk {
        /// Channel of the deleted messages.
        channel_id: ChannelId,
        /// The deleted messages.
        message_ids: Vec<MessageId>,
        /// Guild, if any.
        guild_id: Option<GuildId>,
    },
    /// A reaction was added.
    ReactionAdd {
        /// Channel of the message.
        channel_id: ChannelId,
        /// The reacted message.
        message_id: MessageId,
        /// Reacting user.
        user_id: UserId,
        /// The emoji.
        emoji: ReactionEmoji,
    },
    /// A reaction was removed.
    ReactionRemove {
        /// Channel of the message.
        channel_id: ChannelId,
        /// The message.
        message_id: MessageId,
        /// Un-reacting user.
        user_id: UserId,
        /// The emoji.
        emoji: ReactionEmoji,
    },
    /// All reactions were removed from a message.
    ReactionRemoveAll {
        /// Channel of the message.
        channel_id: ChannelId,
        /// The message.
        message_id: MessageId,
    },
    /// All reactions with one emoji were removed from a message.
    ReactionRemoveEmoji {
        /// Channel of the message.
        channel_id: ChannelId,
        /// The message.
        message_id: MessageId,
        /// The emoji.
        emoji: ReactionEmoji,
    },
    /// A user started typing.
    TypingStart {
        /// Channel being typed in.
        channel_id: ChannelId,
        /// Guild, if any.
        guild_id: Option<GuildId>,
        /// Typing user.
        user_id: UserId,
        /// Resolved member, when available.
        member: Option<Member>,
        /// When typing started.
        timestamp: DateTime<Utc>,
    },
    /// Guild metadata changed.
    GuildUpdate {
        /// The updated guild.
        guild: Guild,
    },
    /// A channel was created.
    ChannelCreate {
        /// The new channel.
        channel: Channel,
    },
    /// A channel changed.
    ChannelUpdate {
        /// The updated channel.
        channel: Channel,
    },
    /// A channel was deleted.
    ChannelDelete {
        /// The deleted channel.
        channel_id: ChannelId,
        /// Guild, if any.
        guild_id: Option<GuildId>,
    },
    /// A thread was created.
    ThreadCreate {
        /// The new thread.
        channel: Channel,
    },
    /// A thread changed.
    ThreadUpdate {
        /// The updated thread.
        channel: Channel,
    },
    /// A thread was deleted.
    ThreadDelete {
        /// The deleted thread.
        channel_id: ChannelId,
        /// Parent channel of the thread.
        parent_id: Option<ChannelId>,
        /// Guild, if any.
        guild_id: Option<GuildId>,
    },
    /// Active threads synced for a guild.
    ThreadListSync {
        /// The guild.
        guild_id: GuildId,
        /// Active threads.
        threads: Vec<Channel>,
    },
    /// A member joined.
    GuildMemberAdd {
        /// The new member.
        member: Member,
    },
    /// A member changed.
    GuildMemberUpdate {
        /// The updated member.
        member: Member,
    },
    /// A member left.
    GuildMemberRemove {
        /// The guild.
        guild_id: GuildId,
        /// The departed user.
        user_id: UserId,
    },
    /// A requested chunk of members arrived.
    GuildMembersChunk {
        /// The guild.
        guild_id: GuildId,
        /// The members.
        members: Vec<Member>,
    },
    /// A channel's read cursor moved.
    ReadStateUpdate {
        /// The new read state.
        read_state: ReadState,
    },
    /// Conversation summaries were generated or revised.
    ConversationSummaryUpdate {
        /// Channel the summaries belong to.
        channel_id: ChannelId,
        /// The summaries.
        summaries: Vec<ConversationSummary>,
    },
}

impl Event {
    /// Returns the single-bit filter for this event's variant.
    #[must_use]
    pub const fn kind(&self) -> EventFilter {
        match self {
            Self::Ready { .. } => EventFilter::READY,
            Self::MessageCreate { .. } => EventFilter::MESSAGE_CREATE,
            Self::MessageUpdate { .. } => EventFilter::MESSAGE_UPDATE,
            Self::MessageDelete { .. } => EventFilter::MESSAGE_DELETE,
            Self::MessageDeleteBulk { .. } => EventFilter::MESSAGE_DELETE_BULK,
            Self::ReactionAdd { .. } => EventFilter::REACTION_ADD,
            Self::ReactionRemove { .. } => EventFilter::REACTION_REMOVE,
            Self::ReactionRemoveAll { .. } => EventFilter::REACTION_REMOVE_ALL,
            Self::ReactionRemoveEmoji { .. } => EventFilter::REACTION_REMOVE_EMOJI,
            Self::TypingStart { .. } => EventFilter::TYPING_START,
            Self::GuildUpdate { .. } => EventFilter::GUILD_UPDATE,
            Self::ChannelCreate { .. } => EventFilter::CHANNEL_CREATE,
            Self::ChannelUpdate { .. } => EventFilter::CHANNEL_UPDATE,
            Self::ChannelDelete { .. } => EventFilter::CHANNEL_DELETE,
            Self::ThreadCreate { .. } => EventFilter::THREAD_CREATE,
            Self::ThreadUpdate { .. } => EventFilter::THREAD_UPDATE,
            Self::ThreadDelete { .. } => EventFilter::THREAD_DELETE,
            Self::ThreadListSync { .. } => EventFilter::THREAD_LIST_SYNC,
            Self::GuildMemberAdd { .. } => EventFilter::GUILD_MEMBER_ADD,
            Self::GuildMemberUpdate { .. } => EventFilter::GUILD_MEMBER_UPDATE,
            Self::GuildMemberRemove { .. } => EventFilter::GUILD_MEMBER_REMOVE,
            Self::GuildMembersChunk { .. } => EventFilter::GUILD_MEMBERS_CHUNK,
            Self::ReadStateUpdate { .. } => EventFilter::READ_STATE_UPDATE,
            Self::ConversationSummaryUpdate { .. } => {
                EventFilter::CONVERSATION_SUMMARY_UPDATE
            }
        }
    }

    /// Returns the channel the event concerns, if any.
    #[must_use]
    pub fn channel_id(&self) -> Option<ChannelId> {
        match self {
            Self::MessageCreate { message, .. } | Self::MessageUpdate { message } => {
                Some(message.channel_id())
            }
            Self::ChannelCreate { channel }
            | Self::ChannelUpdate { channel }
            | Self::ThreadCreate { channel }
            | Self::ThreadUpdate { channel } => Some(channel.id()),
            Self::MessageDelete { channel_id, .. }
            | Self::MessageDeleteBulk { channel_id, .. }
            | Self::ReactionAdd { channel_id, .. }
            | Self::ReactionRemove { channel_id, .. }
            | Self::ReactionRemoveAll { channel_id, .. }
            | Self::ReactionRemoveEmoji { channel_id, .. }
            | Self::TypingStart { channel_id, .. }
            | Self::ChannelDelete { channel_id, .. }
            | Self::ThreadDelete { channel_id, .. }
            | Self::ConversationSummaryUpdate { channel_id, .. } => Some(*channel_id),
            Self::ReadStateUpdate { read_state } => Some(read_state.channel_id),
            _ => None,
        }
    }

    /// Returns the guild the event concerns, if any.
    #[must_use]
    pub fn guild_id(&self) -> Option<GuildId> {
        match self {
            Self::MessageCreate { message, .. } | Self::MessageUpdate { message } => {
                message.guild_id()
            }
            Self::ChannelCreate { channel }
            | Self::ChannelUpdate { channel }
            | Self::ThreadCreate { channel }
            | Self::ThreadUpdate { channel } => channel.guild_id(),
            Self::MessageDelete { guild_id, .. }
            | Self::MessageDeleteBulk { guild_id, .. }
            | Self::TypingStart { guild_id, .. }
            | Self::ChannelDelete { guild_id, .. }
            | Self::ThreadDelete { guild_id, .. } => *guild_id,
            Self::GuildUpdate { guild } => Some(guild.id()),
            Self::GuildMemberAdd { member } | Self::GuildMemberUpdate { member } => {
                Some(member.guild_id())
            }
            Self::GuildMemberRemove { guild_id, .. }
            | Self::GuildMembersChunk { guild_id, .. }
            | Self::ThreadListSync { guild_id, .. } => Some(*guild_id),
            _ => None,
        }
    }
}
