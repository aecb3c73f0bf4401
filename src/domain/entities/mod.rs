//! Domain entity definitions.

mod channel;
mod emoji;
mod guild;
mod member;
mod message;
mod read_state;
mod summary;
mod user;

pub use channel::{Channel, ChannelId, ChannelKind};
pub use emoji::{EmojiId, GuildEmoji};
pub use guild::{Guild, GuildId};
pub use member::Member;
pub use message::{
    Attachment, Embed, Message, MessageAuthor, MessageFlags, MessageId, MessageReference,
    Reaction, ReactionEmoji, Sticker,
};
pub use read_state::{ReadState, UnreadIndication};
pub use summary::{ConversationSummary, SummaryId};
pub use user::{PremiumTier, User, UserId};
