//! UI-level message row owned by the view.

use chrono::{DateTime, Utc};

use super::key::MessageKey;
use crate::domain::entities::{
    ConversationSummary, Message, MessageId, ReactionEmoji, UserId,
};

bitflags::bitflags! {
    /// Presentation state of a row.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct RowFlags: u8 {
        /// Optimistic send in flight.
        const SENDING = 1 << 0;
        /// The row is the target of an active edit.
        const EDITING = 1 << 1;
        /// The row is the target of an active reply.
        const REPLYING = 1 << 2;
        /// The message mentions the current user.
        const MENTIONED = 1 << 3;
        /// The author is blocked but the row is shown anyway.
        const BLOCKED = 1 << 4;
        /// Dimmed while a destructive request is in flight.
        const SENSITIVE = 1 << 5;
    }
}

/// Author identity resolved at insert time, refreshed on member updates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorInfo {
    /// The author's user id.
    pub id: UserId,
    /// The author's tag.
    pub tag: String,
    /// Display name, nickname-aware when the member was resolved.
    pub display_name: String,
}

/// Action a row emits toward its owning view. Rows never hold a reference
/// back to the view; the host forwards these values instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowAction {
    /// Start replying to this row.
    Reply(MessageKey),
    /// Start editing this row.
    Edit(MessageKey),
    /// Delete this row's message.
    Delete(MessageKey),
    /// Toggle a reaction on this row's message.
    React(MessageKey, ReactionEmoji),
    /// Jump to the referenced message.
    ScrollTo(MessageId),
}

/// One display row: a message, an optimistic local send, or a summary.
#[derive(Debug, Clone)]
pub struct MessageRow {
    key: MessageKey,
    message: Option<Message>,
    summary: Option<ConversationSummary>,
    author: Option<AuthorInfo>,
    timestamp: DateTime<Utc>,
    seq: u64,
    collapsed: bool,
    flags: RowFlags,
    errors: Vec<String>,
}

impl MessageRow {
    /// Creates a row for a message.
    #[must_use]
    pub fn for_message(
        key: MessageKey,
        message: Message,
        author: AuthorInfo,
        seq: u64,
    ) -> Self {
        Self {
            key,
            timestamp: message.timestamp(),
            message: Some(message),
            summary: None,
            author: Some(author),
            seq,
            collapsed: false,
            flags: RowFlags::empty(),
            errors: Vec::new(),
        }
    }

    /// Creates a row for an inline summary, seated after its `end_id` row.
    #[must_use]
    pub fn for_summary(summary: ConversationSummary, timestamp: DateTime<Utc>, seq: u64) -> Self {
        Self {
            key: MessageKey::Summary(summary.id),
            message: None,
            summary: Some(summary),
            author: None,
            timestamp,
            seq,
            collapsed: false,
            flags: RowFlags::empty(),
            errors: Vec::new(),
        }
    }

    /// Returns the row key.
    #[must_use]
    pub const fn key(&self) -> &MessageKey {
        &self.key
    }

    /// Returns the message, absent on summary rows.
    #[must_use]
    pub const fn message(&self) -> Option<&Message> {
        self.message.as_ref()
    }

    /// Returns the summary, present on summary rows only.
    #[must_use]
    pub const fn summary(&self) -> Option<&ConversationSummary> {
        self.summary.as_ref()
    }

    /// Returns the resolved author, absent on summary rows.
    #[must_use]
    pub const fn author(&self) -> Option<&AuthorInfo> {
        self.author.as_ref()
    }

    /// Returns the author's user id, absent on summary rows.
    #[must_use]
    pub fn author_id(&self) -> Option<UserId> {
        self.author.as_ref().map(|a| a.id)
    }

    /// Returns the display sort timestamp.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Returns whether the row shares its author header with the previous
    /// row.
    #[must_use]
    pub const fn collapsed(&self) -> bool {
        self.collapsed
    }

    /// Returns the row's state flags.
    #[must_use]
    pub const fn flags(&self) -> RowFlags {
        self.flags
    }

    /// Returns the errors annotated on the row by failed sends.
    #[must_use]
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Sort key: timestamp ascending, insertion order as tiebreak.
    #[must_use]
    pub const fn sort_key(&self) -> (DateTime<Utc>, u64) {
        (self.timestamp, self.seq)
    }

    pub(super) fn set_collapsed(&mut self, collapsed: bool) {
        self.collapsed = collapsed;
    }

    pub(super) fn insert_flags(&mut self, flags: RowFlags) {
        self.flags |= flags;
    }

    pub(super) fn remove_flags(&mut self, flags: RowFlags) {
        self.flags &= !flags;
    }

    pub(super) fn set_errors(&mut self, errors: Vec<String>) {
        self.errors = errors;
    }

    /// Re-keys an optimistic row onto its server echo, replacing the local
    /// message with the canonical one.
    pub(super) fn reconcile(&mut self, key: MessageKey, message: Message, author: AuthorInfo) {
        self.key = key;
        self.timestamp = message.timestamp();
        self.message = Some(message);
        self.author = Some(author);
        self.flags.remove(RowFlags::SENDING);
        self.errors.clear();
    }

    pub(super) fn set_message(&mut self, message: Message) {
        self.message = Some(message);
    }

    pub(super) fn set_summary(&mut self, summary: ConversationSummary) {
        self.summary = Some(summary);
    }

    pub(super) fn set_author(&mut self, author: AuthorInfo) {
        self.author = Some(author);
    }

    pub(super) fn message_mut(&mut self) -> Option<&mut Message> {
        self.message.as_mut()
    }
}
