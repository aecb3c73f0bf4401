//! Guild member entity.

use serde::{Deserialize, Serialize};

use super::{GuildId, User, UserId};

/// A user's membership in a guild, carrying nickname and avatar overrides.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Member {
    guild_id: GuildId,
    user: User,
    nick: Option<String>,
    #[serde(default)]
    roles: Vec<u64>,
}

impl Member {
    /// Creates a new member.
    #[must_use]
    pub fn new(guild_id: impl Into<GuildId>, user: User) -> Self {
        Self {
            guild_id: guild_id.into(),
            user,
            nick: None,
            roles: Vec::new(),
        }
    }

    /// Sets the nickname.
    #[must_use]
    pub fn with_nick(mut self, nick: impl Into<String>) -> Self {
        self.nick = Some(nick.into());
        self
    }

    /// Returns the guild this membership belongs to.
    #[must_use]
    pub const fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    /// Returns the underlying user.
    #[must_use]
    pub const fn user(&self) -> &User {
        &self.user
    }

    /// Returns the member's user ID.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.user.id()
    }

    /// Returns the nickname, if set.
    #[must_use]
    pub fn nick(&self) -> Option<&str> {
        self.nick.as_deref()
    }

    /// Returns the name displayed for this member: nickname if present,
    /// else the user tag.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.nick
            .clone()
            .unwrap_or_else(|| self.user.tag())
    }
}
