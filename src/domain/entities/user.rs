//! Discord user entity.

use serde::{Deserialize, Serialize};

/// Unique identifier for a Discord user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub u64);

impl UserId {
    /// Returns the underlying u64 value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for UserId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Premium (Nitro) tier of the account, which gates the message length
/// limit and custom emoji usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum PremiumTier {
    /// No premium subscription.
    #[default]
    None = 0,
    /// Nitro Classic.
    Classic = 1,
    /// Full Nitro.
    Nitro = 2,
    /// Nitro Basic.
    Basic = 3,
}

impl PremiumTier {
    /// Returns true if the account has any premium entitlement.
    #[must_use]
    pub const fn is_premium(self) -> bool {
        !matches!(self, Self::None)
    }

    /// Returns the maximum message length in characters for this tier.
    #[must_use]
    pub const fn message_length_limit(self) -> usize {
        match self {
            Self::None | Self::Basic => 2000,
            Self::Classic | Self::Nitro => 4000,
        }
    }
}

/// Discord user entity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    id: UserId,
    username: String,
    discriminator: String,
    #[serde(default)]
    bot: bool,
}

impl User {
    /// Creates a new user.
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

    /// Marks the user as a bot.
    #[must_use]
    pub const fn with_bot(mut self, bot: bool) -> Self {
        self.bot = bot;
        self
    }

    /// Returns the user ID.
    #[must_use]
    pub const fn id(&self) -> UserId {
        self.id
    }

    /// Returns the username.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the discriminator, `"0"` for migrated accounts.
    #[must_use]
    pub fn discriminator(&self) -> &str {
        &self.discriminator
    }

    /// Returns whether the user is a bot.
    #[must_use]
    pub const fn is_bot(&self) -> bool {
        self.bot
    }

    /// Returns the user tag, `name#1234` or just the name for migrated
    /// accounts.
    #[must_use]
    pub fn tag(&self) -> String {
        if self.discriminator == "0" {
            self.username.clone()
        } else {
            format!("{}#{}", self.username, self.discriminator)
        }
    }

    /// Returns the `<@id>` mention string for this user.
    #[must_use]
    pub fn mention(&self) -> String {
        format!("<@{}>", self.id)
    }
}
