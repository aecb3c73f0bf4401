//! Offline cache boundary.

use crate::domain::entities::{
    Channel, ChannelId, GuildEmoji, GuildId, Member, Message, MessageId, PremiumTier, User,
    UserId,
};

/// Read-through offline snapshot store.
///
/// The cabinet is populated by the gateway adapter outside this crate and
/// consulted by the models, possibly from background tasks. Readers never
/// observe torn writes; every call returns a consistent snapshot value.
pub trait Cabinet: Send + Sync {
    /// Returns the cached message, if present.
    fn message(&self, channel_id: ChannelId, message_id: MessageId) -> Option<Message>;

    /// Returns the cached messages of a channel, newest first.
    fn messages(&self, channel_id: ChannelId) -> Vec<Message>;

    /// Returns the cached channel, if present.
    fn channel(&self, channel_id: ChannelId) -> Option<Channel>;

    /// Returns the current user.
    fn me(&self) -> Option<User>;

    /// Returns the cached member, if present.
    fn member(&self, guild_id: GuildId, user_id: UserId) -> Option<Member>;

    /// Returns every cached member of a guild, used by the autocomplete
    /// member source.
    fn members(&self, guild_id: GuildId) -> Vec<Member>;

    /// Returns the custom emojis of a guild.
    fn guild_emojis(&self, guild_id: GuildId) -> Vec<GuildEmoji>;

    /// Returns custom emojis of every guild the user can see, used by the
    /// autocomplete emoji source.
    fn all_emojis(&self) -> Vec<GuildEmoji>;

    /// Returns whether the user has blocked the given author.
    fn is_blocked(&self, user_id: UserId) -> bool;

    /// Returns the account's premium entitlement.
    fn premium(&self) -> PremiumTier;
}
