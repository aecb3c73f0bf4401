//! Custom guild emoji entity.

use serde::{Deserialize, Serialize};

use super::GuildId;

/// Unique identifier for a custom emoji.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EmojiId(pub u64);

impl EmojiId {
    /// Returns the underlying u64 value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for EmojiId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for EmojiId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// A custom emoji uploaded to a guild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildEmoji {
    /// Emoji ID.
    pub id: EmojiId,
    /// Owning guild.
    pub guild_id: GuildId,
    /// Emoji name as typed between colons.
    pub name: String,
    /// Whether the emoji is animated.
    #[serde(default)]
    pub animated: bool,
    /// Whether the emoji is currently usable.
    #[serde(default = "default_available")]
    pub available: bool,
}

const fn default_available() -> bool {
    true
}

impl GuildEmoji {
    /// Returns the in-message markup for the emoji: `<:name:id>` or
    /// `<a:name:id>` when animated.
    #[must_use]
    pub fn markup(&self) -> String {
        if self.animated {
            format!("<a:{}:{}>", self.name, self.id)
        } else {
            format!("<:{}:{}>", self.name, self.id)
        }
    }

    /// Returns a sized CDN image URL, used as the insertion fallback when
    /// the platform would reject the emoji markup itself.
    #[must_use]
    pub fn image_url(&self, size: u16) -> String {
        let ext = if self.animated { "gif" } else { "png" };
        format!(
            "https://cdn.discordapp.com/emojis/{}.{ext}?size={size}",
            self.id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markup() {
        let emoji = GuildEmoji {
            id: EmojiId(42),
            guild_id: GuildId(1),
            name: "blob".into(),
            animated: false,
            available: true,
        };
        assert_eq!(emoji.markup(), "<:blob:42>");
        assert_eq!(
            emoji.image_url(48),
            "https://cdn.discordapp.com/emojis/42.png?size=48"
        );
    }
}
