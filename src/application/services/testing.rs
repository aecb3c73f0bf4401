//! Shared test doubles for the service tests.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::application::env::ModelEnv;
use crate::application::options::CoreOptions;
use crate::domain::entities::{
    Channel, ChannelId, GuildEmoji, GuildId, Member, Message, MessageId, PremiumTier, User,
    UserId,
};
use crate::domain::ports::{Cabinet, ClientPort, MockClientPort};
use crate::runtime::Scheduler;

#[derive(Default)]
struct State {
    me: Option<User>,
    premium: PremiumTier,
    channels: HashMap<ChannelId, Channel>,
    messages: HashMap<ChannelId, Vec<Message>>,
    members: HashMap<(GuildId, UserId), Member>,
    emojis: Vec<GuildEmoji>,
    blocked: HashSet<UserId>,
}

/// In-memory cabinet used across the service tests.
#[derive(Default)]
pub struct FakeCabinet {
    inner: RwLock<State>,
}

impl FakeCabinet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_me(&self, user: User) {
        self.inner.write().me = Some(user);
    }

    pub fn set_premium(&self, tier: PremiumTier) {
        self.inner.write().premium = tier;
    }

    pub fn put_channel(&self, channel: Channel) {
        self.inner.write().channels.insert(channel.id(), channel);
    }

    /// Stores a message, keeping the per-channel list newest first.
    pub fn add_message(&self, message: Message) {
        let mut state = self.inner.write();
        let list = state.messages.entry(message.channel_id()).or_default();
        list.retain(|m| m.id() != message.id());
        list.push(message);
        list.sort_by(|a, b| b.id().cmp(&a.id()));
    }

    pub fn add_member(&self, member: Member) {
        self.inner
            .write()
            .members
            .insert((member.guild_id(), member.user_id()), member);
    }

    pub fn add_emoji(&self, emoji: GuildEmoji) {
        self.inner.write().emojis.push(emoji);
    }

    pub fn block(&self, user_id: UserId) {
        self.inner.write().blocked.insert(user_id);
    }
}

impl Cabinet for FakeCabinet {
    fn message(&self, channel_id: ChannelId, message_id: MessageId) -> Option<Message> {
        self.inner
            .read()
            .messages
            .get(&channel_id)?
            .iter()
            .find(|m| m.id() == message_id)
            .cloned()
    }

    fn messages(&self, channel_id: ChannelId) -> Vec<Message> {
        self.inner
            .read()
            .messages
            .get(&channel_id)
            .cloned()
            .unwrap_or_default()
    }

    fn channel(&self, channel_id: ChannelId) -> Option<Channel> {
        self.inner.read().channels.get(&channel_id).cloned()
    }

    fn me(&self) -> Option<User> {
        self.inner.read().me.clone()
    }

    fn member(&self, guild_id: GuildId, user_id: UserId) -> Option<Member> {
        self.inner.read().members.get(&(guild_id, user_id)).cloned()
    }

    fn members(&self, guild_id: GuildId) -> Vec<Member> {
        self.inner
            .read()
            .members
            .values()
            .filter(|m| m.guild_id() == guild_id)
            .cloned()
            .collect()
    }

    fn guild_emojis(&self, guild_id: GuildId) -> Vec<GuildEmoji> {
        self.inner
            .read()
            .emojis
            .iter()
            .filter(|e| e.guild_id == guild_id)
            .cloned()
            .collect()
    }

    fn all_emojis(&self) -> Vec<GuildEmoji> {
        self.inner.read().emojis.clone()
    }

    fn is_blocked(&self, user_id: UserId) -> bool {
        self.inner.read().blocked.contains(&user_id)
    }

    fn premium(&self) -> PremiumTier {
        self.inner.read().premium
    }
}

/// Environment wired with a fake cabinet and an expectation-free client.
pub fn test_env(cabinet: Arc<FakeCabinet>) -> ModelEnv {
    test_env_with(cabinet, Arc::new(MockClientPort::new()), CoreOptions::default())
}

/// Environment with a caller-supplied client and options.
pub fn test_env_with(
    cabinet: Arc<FakeCabinet>,
    client: Arc<dyn ClientPort>,
    options: CoreOptions,
) -> ModelEnv {
    ModelEnv::new(cabinet, client, Rc::new(Scheduler::new()), options)
}
