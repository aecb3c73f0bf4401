//! Per-channel message model.
//!
//! Owns the ordered, windowed row list for one channel and the protocol
//! between it, the gateway events, and the client: load and pagination,
//! event reconciliation, optimistic sends with nonce re-keying, typing,
//! read marking, collapse grouping, and the bottom-anchored soft cap.

mod key;
mod row;
mod typing;

pub use key::{MessageKey, Nonce};
pub use row::{AuthorInfo, MessageRow, RowAction, RowFlags};
pub use typing::{TypingEntry, TypingTracker};

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::application::env::ModelEnv;
use crate::domain::entities::{
    ChannelId, ConversationSummary, GuildId, Member, Message, MessageAuthor, MessageId,
    MessageReference, ReactionEmoji, SummaryId, UserId,
};
use crate::domain::errors::ModelError;
use crate::domain::ports::{AllowedMentions, Event, OutgoingFile, SendMessageRequest};
use crate::runtime::CancelToken;

/// Placeholder content for redacted rows.
const REDACTED_CONTENT: &str = "[message deleted]";

/// Preview text when a referenced message cannot be resolved.
const UNKNOWN_REFERENCE: &str = "Unknown message";

/// Loading state of the view.
#[derive(Debug)]
pub enum LoadState {
    /// Initial load in flight.
    Loading,
    /// Rows are live.
    Ready,
    /// Initial load failed; retry is explicit.
    Error(ModelError),
}

/// Where the attached list is anchored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrollAnchor {
    /// Pinned to the newest row.
    Bottom,
    /// Holding position at a row while browsing history.
    At(MessageKey),
}

/// Detects the `+<emoji>` reaction shortcut: a trimmed, single-token
/// composer buffer starting with `+`. Custom emoji markup (`<:name:id>`,
/// `<a:name:id>`) is unwrapped; anything else is treated as a unicode
/// emoji literal.
#[must_use]
pub fn reaction_shortcut(content: &str) -> Option<ReactionEmoji> {
    let rest = content.trim().strip_prefix('+')?;
    if rest.is_empty() || rest.chars().any(char::is_whitespace) {
        return None;
    }
    if let Some(inner) = rest
        .strip_prefix("<a:")
        .or_else(|| rest.strip_prefix("<:"))
    {
        let inner = inner.strip_suffix('>')?;
        let (name, id) = inner.rsplit_once(':')?;
        let id: u64 = id.parse().ok()?;
        return Some(ReactionEmoji::custom(id, name));
    }
    Some(ReactionEmoji::unicode(rest))
}

/// Results marshalled back from background tasks, applied by [`pump`].
///
/// [`pump`]: MessageView::pump
enum ViewCompletion {
    Loaded(Result<Vec<Message>, ModelError>),
    LoadedMore(Result<Vec<Message>, ModelError>),
    SendFailed { nonce: Nonce, errors: Vec<String> },
    AckFailed {
        prior: Option<MessageId>,
        attempted: MessageId,
        error: ModelError,
    },
    RequestFailed {
        what: &'static str,
        error: ModelError,
        row: Option<MessageKey>,
    },
}

/// The per-channel message model.
pub struct MessageView {
    env: ModelEnv,
    channel_id: ChannelId,
    guild_id: Option<GuildId>,
    channel_name: String,
    order: Vec<MessageKey>,
    rows: HashMap<MessageKey, MessageRow>,
    next_seq: u64,
    load_state: LoadState,
    scroll_anchor: ScrollAnchor,
    active: bool,
    typing: TypingTracker,
    summaries: HashMap<SummaryId, MessageId>,
    end_of_history: bool,
    loading_more: bool,
    last_acked: Option<MessageId>,
    lifetime: CancelToken,
    toasts: Vec<String>,
    completions_tx: mpsc::UnboundedSender<ViewCompletion>,
    completions_rx: mpsc::UnboundedReceiver<ViewCompletion>,
}

impl MessageView {
    /// Creates a view for one channel. Channel metadata is resolved from
    /// the cabinet; call [`load`](Self::load) to populate rows.
    #[must_use]
    pub fn new(env: ModelEnv, channel_id: ChannelId) -> Self {
        let channel = env.cabinet().channel(channel_id);
        let guild_id = channel.as_ref().and_then(|c| c.guild_id());
        let channel_name = channel.map_or_else(String::new, |c| c.name().to_string());
        let typing = TypingTracker::new(env.options().typing_timeout());
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Self {
            env,
            channel_id,
            guild_id,
            channel_name,
            order: Vec::new(),
            rows: HashMap::new(),
            next_seq: 0,
            load_state: LoadState::Loading,
            scroll_anchor: ScrollAnchor::Bottom,
            active: false,
            typing,
            summaries: HashMap::new(),
            end_of_history: false,
            loading_more: false,
            last_acked: None,
            lifetime: CancelToken::new(),
            toasts: Vec::new(),
            completions_tx,
            completions_rx,
        }
    }

    /// Returns the channel this view models.
    #[must_use]
    pub const fn channel_id(&self) -> ChannelId {
        self.channel_id
    }

    /// Returns the guild of the channel, if any.
    #[must_use]
    pub const fn guild_id(&self) -> Option<GuildId> {
        self.guild_id
    }

    /// Returns the resolved channel name.
    #[must_use]
    pub fn channel_name(&self) -> &str {
        &self.channel_name
    }

    /// Returns the loading state.
    #[must_use]
    pub const fn load_state(&self) -> &LoadState {
        &self.load_state
    }

    /// Returns the scroll anchor.
    #[must_use]
    pub const fn scroll_anchor(&self) -> &ScrollAnchor {
        &self.scroll_anchor
    }

    /// Returns whether history pagination has reached the beginning.
    #[must_use]
    pub const fn end_of_history(&self) -> bool {
        self.end_of_history
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns whether the view holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Returns the rows in display order.
    pub fn rows(&self) -> impl Iterator<Item = &MessageRow> + '_ {
        self.order.iter().filter_map(|key| self.rows.get(key))
    }

    /// Returns one row by key.
    #[must_use]
    pub fn row(&self, key: &MessageKey) -> Option<&MessageRow> {
        self.rows.get(key)
    }

    /// Drains toast messages produced by background failures.
    pub fn take_toasts(&mut self) -> Vec<String> {
        std::mem::take(&mut self.toasts)
    }

    /// Starts the initial load: purges rows and fetches the newest batch.
    pub fn load(&mut self) -> JoinHandle<()> {
        self.load_state = LoadState::Loading;
        self.order.clear();
        self.rows.clear();
        self.summaries.clear();
        let client = Arc::clone(self.env.client());
        let tx = self.completions_tx.clone();
        let cancel = self.lifetime.clone();
        let channel_id = self.channel_id;
        let limit = self.env.options().initial_batch;
        self.env.scheduler().spawn_background(async move {
            let result = client.messages(channel_id, limit).await;
            if cancel.is_cancelled() {
                return;
            }
            let _ = tx.send(ViewCompletion::Loaded(result));
        })
    }

    /// Requests earlier history. The cabinet is consulted first; a cache
    /// hit is applied synchronously and returns `None`. Overlapping calls
    /// coalesce, and nothing is fetched past the end of history.
    pub fn load_more(&mut self) -> Option<JoinHandle<()>> {
        if self.loading_more || self.end_of_history {
            return None;
        }
        let oldest = self.order.iter().find_map(MessageKey::event_id)?;
        let batch = usize::from(self.env.options().load_more_batch);

        let mut cached: Vec<Message> = self
            .env
            .cabinet()
            .messages(self.channel_id)
            .into_iter()
            .filter(|m| m.id() < oldest)
            .collect();
        if !cached.is_empty() {
            // Cache path: end-of-history stays untouched; only a short
            // network batch proves the channel start was reached.
            cached.truncate(batch);
            debug!(count = cached.len(), "load_more served from cabinet");
            self.prepend_batch(cached);
            return None;
        }

        self.loading_more = true;
        let client = Arc::clone(self.env.client());
        let tx = self.completions_tx.clone();
        let cancel = self.lifetime.clone();
        let channel_id = self.channel_id;
        let limit = self.env.options().load_more_batch;
        Some(self.env.scheduler().spawn_background(async move {
            let result = client.messages_before(channel_id, oldest, limit).await;
            if cancel.is_cancelled() {
                return;
            }
            let _ = tx.send(ViewCompletion::LoadedMore(result));
        }))
    }

    /// Applies completed background work. Call after awaiting a returned
    /// handle, or periodically from the owner loop.
    pub fn pump(&mut self) {
        while let Ok(completion) = self.completions_rx.try_recv() {
            match completion {
                ViewCompletion::Loaded(Ok(messages)) => self.apply_loaded(messages),
                ViewCompletion::Loaded(Err(error)) => {
                    warn!(channel = %self.channel_id, %error, "initial load failed");
                    self.load_state = LoadState::Error(error);
                }
                ViewCompletion::LoadedMore(result) => self.apply_loaded_more(result),
                ViewCompletion::SendFailed { nonce, errors } => {
                    self.apply_send_failure(&nonce, errors);
                }
                ViewCompletion::AckFailed {
                    prior,
                    attempted,
                    error,
                } => {
                    warn!(channel = %self.channel_id, %error, "read acknowledgement failed");
                    // Roll back so the next bottom or activation retries.
                    if self.last_acked == Some(attempted) {
                        self.last_acked = prior;
                    }
                }
                ViewCompletion::RequestFailed { what, error, row } => {
                    warn!(channel = %self.channel_id, %error, what, "request failed");
                    if let Some(key) = row {
                        if let Some(row) = self.rows.get_mut(&key) {
                            row.remove_flags(RowFlags::SENSITIVE);
                        }
                    }
                    self.toasts.push(format!("Failed to {what}: {error}"));
                }
            }
        }
    }

    fn apply_loaded(&mut self, mut messages: Vec<Message>) {
        messages.sort_by_key(Message::id);
        for message in &messages {
            if self.is_dropped_as_blocked(message) {
                continue;
            }
            self.upsert_message(message, None);
        }
        self.load_state = LoadState::Ready;
        self.scroll_anchor = ScrollAnchor::Bottom;
        self.enforce_soft_cap();
    }

    fn apply_loaded_more(&mut self, result: Result<Vec<Message>, ModelError>) {
        self.loading_more = false;
        match result {
            Ok(messages) => {
                if messages.len() < usize::from(self.env.options().load_more_batch) {
                    self.end_of_history = true;
                }
                self.prepend_batch(messages);
            }
            Err(error) => {
                warn!(channel = %self.channel_id, %error, "load_more failed");
                self.toasts.push(format!("Failed to load history: {error}"));
            }
        }
    }

    fn prepend_batch(&mut self, mut messages: Vec<Message>) {
        messages.sort_by_key(Message::id);
        for message in &messages {
            if self.is_dropped_as_blocked(message) {
                continue;
            }
            self.upsert_message(message, None);
        }
    }

    fn apply_send_failure(&mut self, nonce: &Nonce, errors: Vec<String>) {
        let key = MessageKey::Local(nonce.clone());
        let Some(row) = self.rows.get_mut(&key) else {
            return;
        };
        // The row stays so the user can retry; only the in-flight marker
        // goes away.
        row.remove_flags(RowFlags::SENDING);
        row.set_errors(errors);
        self.toasts.push("Message failed to send".to_string());
    }

    /// Applies one gateway event. Events for other channels are ignored.
    pub fn handle_event(&mut self, event: &Event) {
        match event {
            Event::MessageCreate { message, member } => {
                if message.channel_id() != self.channel_id {
                    return;
                }
                self.typing.remove(message.author().id());
                if let Some(nonce) = message.nonce() {
                    if self.reconcile_nonce(nonce, message) {
                        self.enforce_soft_cap();
                        return;
                    }
                }
                if self.is_dropped_as_blocked(message) {
                    return;
                }
                self.upsert_message(message, member.as_ref());
                self.enforce_soft_cap();
            }
            Event::MessageUpdate { message } => {
                if message.channel_id() != self.channel_id {
                    return;
                }
                // Prefer the cabinet's canonical copy over the partial
                // gateway payload.
                let canonical = self
                    .env
                    .cabinet()
                    .message(self.channel_id, message.id())
                    .unwrap_or_else(|| message.clone());
                if let Some(row) = self.rows.get_mut(&MessageKey::Event(message.id())) {
                    row.set_message(canonical);
                }
            }
            Event::MessageDelete {
                channel_id,
                message_id,
                ..
            } => {
                if *channel_id == self.channel_id {
                    self.apply_delete(*message_id);
                }
            }
            Event::MessageDeleteBulk {
                channel_id,
                message_ids,
                ..
            } => {
                if *channel_id == self.channel_id {
                    for id in message_ids {
                        self.apply_delete(*id);
                    }
                }
            }
            Event::ReactionAdd {
                channel_id,
                message_id,
                user_id,
                emoji,
            } => {
                if *channel_id == self.channel_id {
                    let me = self.is_me(*user_id);
                    self.mutate_message(*message_id, |m| m.add_reaction(emoji, me));
                }
            }
            Event::ReactionRemove {
                channel_id,
                message_id,
                user_id,
                emoji,
            } => {
                if *channel_id == self.channel_id {
                    let me = self.is_me(*user_id);
                    self.mutate_message(*message_id, |m| m.remove_reaction(emoji, me));
                }
            }
            Event::ReactionRemoveAll {
                channel_id,
                message_id,
            } => {
                if *channel_id == self.channel_id {
                    self.mutate_message(*message_id, Message::clear_reactions);
                }
            }
            Event::ReactionRemoveEmoji {
                channel_id,
                message_id,
                emoji,
            } => {
                if *channel_id == self.channel_id {
                    self.mutate_message(*message_id, |m| m.clear_reaction_emoji(emoji));
                }
            }
            Event::TypingStart {
                channel_id,
                user_id,
                member,
                timestamp,
                ..
            } => {
                if *channel_id == self.channel_id && !self.is_me(*user_id) {
                    let name = self.typing_name(*user_id, member.as_ref());
                    self.typing.upsert(*user_id, name, *timestamp);
                }
            }
            Event::ConversationSummaryUpdate {
                channel_id,
                summaries,
            } => {
                if *channel_id == self.channel_id {
                    for summary in summaries {
                        self.seat_summary(summary.clone());
                    }
                }
            }
            Event::GuildMemberUpdate { member } | Event::GuildMemberAdd { member } => {
                if Some(member.guild_id()) == self.guild_id {
                    self.refresh_author(member);
                }
            }
            Event::GuildMembersChunk { guild_id, members } => {
                if Some(*guild_id) == self.guild_id {
                    for member in members {
                        self.refresh_author(member);
                    }
                }
            }
            _ => {}
        }
    }

    /// Sends a message optimistically. A `+<emoji>` buffer with a valid
    /// target is reinterpreted as a reaction and creates no row. Returns
    /// the background task handle, or `None` when nothing was issued.
    pub fn send(
        &mut self,
        content: &str,
        files: Vec<OutgoingFile>,
        reply_target: Option<MessageId>,
        reply_mention: bool,
    ) -> Option<JoinHandle<()>> {
        let trimmed = content.trim();
        if files.is_empty() {
            if let Some(emoji) = reaction_shortcut(trimmed) {
                let target = reply_target.or_else(|| self.latest_event_id());
                return match target {
                    Some(target) => Some(self.react(target, emoji)),
                    None => {
                        debug!("reaction shortcut without a target message");
                        None
                    }
                };
            }
        }
        let Some(me) = self.env.cabinet().me() else {
            warn!("send without an identity");
            return None;
        };

        let nonce = Nonce::generate();
        let now = Utc::now();
        let mut local = Message::new(
            0_u64,
            self.channel_id,
            MessageAuthor::from(&me),
            trimmed,
            now,
        )
        .with_nonce(nonce.as_str());
        if let Some(target) = reply_target {
            local = local.with_reference(MessageReference::new(self.channel_id, target));
        }
        let author = self.resolve_author(&local, None);
        let key = MessageKey::Local(nonce.clone());
        let seq = self.next_seq();
        let mut row = MessageRow::for_message(key, local, author, seq);
        row.insert_flags(RowFlags::SENDING);
        self.insert_row(row);
        self.scroll_anchor = ScrollAnchor::Bottom;

        let mut request = SendMessageRequest::new(self.channel_id, trimmed)
            .with_nonce(nonce.as_str())
            .with_files(files);
        if let Some(target) = reply_target {
            request = request
                .with_reference(MessageReference::new(self.channel_id, target))
                .with_allowed_mentions(AllowedMentions::replying(reply_mention));
        }

        let client = Arc::clone(self.env.client());
        let tx = self.completions_tx.clone();
        let cancel = self.lifetime.clone();
        Some(self.env.scheduler().spawn_background(async move {
            let result = client.send_message(request).await;
            if cancel.is_cancelled() {
                return;
            }
            // Success needs no action: the gateway echo carries the nonce
            // and reconciles the row.
            if let Err(error) = result {
                let _ = tx.send(ViewCompletion::SendFailed {
                    nonce,
                    errors: vec![error.to_string()],
                });
            }
        }))
    }

    /// Edits a message; the MessageUpdate echo applies the new content.
    pub fn edit(&mut self, id: MessageId, content: String) -> JoinHandle<()> {
        self.background_request("edit message", Some(MessageKey::Event(id)), {
            let client = Arc::clone(self.env.client());
            let channel_id = self.channel_id;
            async move { client.edit_message(channel_id, id, content).await.map(|_| ()) }
        })
    }

    /// Deletes a message. The row is desensitised while the request is in
    /// flight and restored if it fails.
    pub fn delete(&mut self, id: MessageId) -> JoinHandle<()> {
        let key = MessageKey::Event(id);
        if let Some(row) = self.rows.get_mut(&key) {
            row.insert_flags(RowFlags::SENSITIVE);
        }
        self.background_request("delete message", Some(key), {
            let client = Arc::clone(self.env.client());
            let channel_id = self.channel_id;
            async move { client.delete_message(channel_id, id).await }
        })
    }

    /// Returns whether the host should confirm before calling
    /// [`delete`](Self::delete).
    #[must_use]
    pub const fn needs_delete_confirmation(&self) -> bool {
        self.env.options().ask_before_delete
    }

    /// Adds a reaction.
    pub fn react(&mut self, id: MessageId, emoji: ReactionEmoji) -> JoinHandle<()> {
        self.background_request("add reaction", None, {
            let client = Arc::clone(self.env.client());
            let channel_id = self.channel_id;
            async move { client.react(channel_id, id, emoji).await }
        })
    }

    /// Removes the current user's reaction.
    pub fn unreact(&mut self, id: MessageId, emoji: ReactionEmoji) -> JoinHandle<()> {
        self.background_request("remove reaction", None, {
            let client = Arc::clone(self.env.client());
            let channel_id = self.channel_id;
            async move { client.unreact(channel_id, id, emoji).await }
        })
    }

    /// Acknowledges the newest message as read. Gated on the view being
    /// active and anchored to bottom; re-acknowledging the same id is a
    /// no-op with no network request.
    pub fn mark_read(&mut self) -> Option<JoinHandle<()>> {
        if !self.active || self.scroll_anchor != ScrollAnchor::Bottom {
            return None;
        }
        let latest = self.latest_event_id()?;
        if self.last_acked == Some(latest) {
            return None;
        }
        let prior = self.last_acked.replace(latest);
        let client = Arc::clone(self.env.client());
        let channel_id = self.channel_id;
        let cancel = self.lifetime.clone();
        let tx = self.completions_tx.clone();
        Some(self.env.scheduler().spawn_background(async move {
            if let Err(error) = client.mark_read(channel_id, latest).await {
                if cancel.is_cancelled() {
                    return;
                }
                let _ = tx.send(ViewCompletion::AckFailed {
                    prior,
                    attempted: latest,
                    error,
                });
            }
        }))
    }

    /// Marks the view focused and mapped; activation triggers a read mark.
    pub fn set_active(&mut self, active: bool) -> Option<JoinHandle<()>> {
        self.active = active;
        if active { self.mark_read() } else { None }
    }

    /// The list reached bottom: re-anchor, trim, and mark read.
    pub fn on_scroll_bottomed(&mut self) -> Option<JoinHandle<()>> {
        self.scroll_anchor = ScrollAnchor::Bottom;
        self.enforce_soft_cap();
        self.mark_read()
    }

    /// The user scrolled away from bottom, holding position at a row.
    pub fn on_scrolled_away(&mut self, key: MessageKey) {
        self.scroll_anchor = ScrollAnchor::At(key);
    }

    /// Anchors the view at a known message. Returns false (and only logs)
    /// when the id is not in the window.
    pub fn scroll_to(&mut self, id: MessageId) -> bool {
        let key = MessageKey::Event(id);
        if self.rows.contains_key(&key) {
            self.scroll_anchor = ScrollAnchor::At(key);
            true
        } else {
            debug!(%id, "scroll_to target not in window");
            false
        }
    }

    /// Returns the id of the caller's most recent message, for the
    /// edit-last-message shortcut.
    #[must_use]
    pub fn edit_last_message(&self) -> Option<MessageId> {
        let me = self.env.cabinet().me()?.id();
        self.order.iter().rev().find_map(|key| {
            let row = self.rows.get(key)?;
            (row.author_id() == Some(me)).then(|| key.event_id()).flatten()
        })
    }

    /// Consumes a row action. React, delete, and scroll-to are handled
    /// here; reply and edit are returned for the composer to pick up.
    pub fn apply_action(&mut self, action: RowAction) -> Option<RowAction> {
        match action {
            RowAction::React(key, emoji) => {
                if let Some(id) = key.event_id() {
                    self.react(id, emoji);
                }
                None
            }
            RowAction::Delete(key) => {
                if let Some(id) = key.event_id() {
                    self.delete(id);
                }
                None
            }
            RowAction::ScrollTo(id) => {
                self.scroll_to(id);
                None
            }
            other => Some(other),
        }
    }

    /// Resolves the preview text for a reply header. Missing or blocked
    /// referenced messages render as "Unknown message".
    #[must_use]
    pub fn reply_preview(&self, reference: &MessageReference) -> String {
        let Some(id) = reference.message_id else {
            return UNKNOWN_REFERENCE.to_string();
        };
        let from_rows = self
            .rows
            .get(&MessageKey::Event(id))
            .and_then(|row| row.message().cloned());
        let message = from_rows.or_else(|| self.env.cabinet().message(reference.channel_id, id));
        match message {
            Some(m) if !self.env.cabinet().is_blocked(m.author().id()) => {
                format!("{}: {}", m.author().tag(), m.content())
            }
            _ => UNKNOWN_REFERENCE.to_string(),
        }
    }

    /// Marks the reply target row, clearing any previous one.
    pub fn set_reply_marker(&mut self, target: Option<MessageId>) {
        self.set_marker(RowFlags::REPLYING, target);
    }

    /// Marks the edit target row, clearing any previous one.
    pub fn set_edit_marker(&mut self, target: Option<MessageId>) {
        self.set_marker(RowFlags::EDITING, target);
    }

    /// Returns the typing indicator text, if anyone is typing.
    #[must_use]
    pub fn typing_indicator(&self) -> Option<String> {
        self.typing.indicator_text()
    }

    /// Periodic 1 s sweep of expired typing entries. Returns whether the
    /// indicator changed.
    pub fn sweep_typing(&mut self, now: chrono::DateTime<Utc>) -> bool {
        self.typing.sweep(now)
    }

    // ---- internals ----

    fn set_marker(&mut self, flag: RowFlags, target: Option<MessageId>) {
        for row in self.rows.values_mut() {
            row.remove_flags(flag);
        }
        if let Some(id) = target {
            if let Some(row) = self.rows.get_mut(&MessageKey::Event(id)) {
                row.insert_flags(flag);
            }
        }
    }

    fn background_request(
        &mut self,
        what: &'static str,
        row: Option<MessageKey>,
        request: impl std::future::Future<Output = Result<(), ModelError>> + Send + 'static,
    ) -> JoinHandle<()> {
        let tx = self.completions_tx.clone();
        let cancel = self.lifetime.clone();
        self.env.scheduler().spawn_background(async move {
            if let Err(error) = request.await {
                if !cancel.is_cancelled() {
                    let _ = tx.send(ViewCompletion::RequestFailed { what, error, row });
                }
            }
        })
    }

    fn next_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    fn is_me(&self, user_id: UserId) -> bool {
        self.env.cabinet().me().is_some_and(|me| me.id() == user_id)
    }

    fn latest_event_id(&self) -> Option<MessageId> {
        self.order.iter().rev().find_map(MessageKey::event_id)
    }

    fn is_dropped_as_blocked(&self, message: &Message) -> bool {
        if self.env.options().show_blocked_messages {
            return false;
        }
        if self.env.cabinet().is_blocked(message.author().id()) {
            debug!(id = %message.id(), "dropping message from blocked author");
            return true;
        }
        false
    }

    fn typing_name(&self, user_id: UserId, member: Option<&Member>) -> String {
        member
            .map(Member::display_name)
            .or_else(|| {
                self.guild_id.and_then(|guild| {
                    self.env
                        .cabinet()
                        .member(guild, user_id)
                        .map(|m| m.display_name())
                })
            })
            .unwrap_or_else(|| format!("<@{user_id}>"))
    }

    fn resolve_author(&self, message: &Message, member: Option<&Member>) -> AuthorInfo {
        let id = message.author().id();
        let resolved = member.cloned().or_else(|| {
            self.guild_id
                .and_then(|guild| self.env.cabinet().member(guild, id))
        });
        AuthorInfo {
            id,
            tag: message.author().tag(),
            display_name: resolved
                .map(|m| m.display_name())
                .unwrap_or_else(|| message.author().tag()),
        }
    }

    fn refresh_author(&mut self, member: &Member) {
        let info = AuthorInfo {
            id: member.user_id(),
            tag: member.user().tag(),
            display_name: member.display_name(),
        };
        for row in self.rows.values_mut() {
            if row.author_id() == Some(member.user_id()) {
                row.set_author(info.clone());
            }
        }
    }

    fn upsert_message(&mut self, message: &Message, member: Option<&Member>) {
        let key = MessageKey::Event(message.id());
        if let Some(row) = self.rows.get_mut(&key) {
            row.set_message(message.clone());
            return;
        }
        let author = self.resolve_author(message, member);
        let seq = self.next_seq();
        let mut row = MessageRow::for_message(key, message.clone(), author, seq);
        let mut flags = RowFlags::empty();
        if let Some(me) = self.env.cabinet().me() {
            if message.content().contains(&me.mention()) {
                flags |= RowFlags::MENTIONED;
            }
        }
        if self.env.cabinet().is_blocked(message.author().id()) {
            flags |= RowFlags::BLOCKED;
        }
        row.insert_flags(flags);
        self.insert_row(row);
    }

    /// Re-keys a `Local(nonce)` row onto its echo. Returns whether a row
    /// was reconciled.
    fn reconcile_nonce(&mut self, nonce: &str, message: &Message) -> bool {
        let Some(index) = self.order.iter().position(
            |key| matches!(key, MessageKey::Local(n) if n.as_str() == nonce),
        ) else {
            return false;
        };
        let local_key = self.order[index].clone();
        let Some(mut row) = self.rows.remove(&local_key) else {
            return false;
        };
        let new_key = MessageKey::Event(message.id());
        let author = self.resolve_author(message, None);
        row.reconcile(new_key.clone(), message.clone(), author);
        self.order[index] = new_key.clone();
        self.rows.insert(new_key, row);
        self.recompute_collapse_at(index);
        self.recompute_collapse_at(index + 1);
        debug!(id = %message.id(), "optimistic row reconciled");
        true
    }

    fn insert_row(&mut self, row: MessageRow) {
        let sort = row.sort_key();
        let mut index = self.order.len();
        while index > 0 {
            let placed_earlier = self
                .rows
                .get(&self.order[index - 1])
                .is_none_or(|r| r.sort_key() <= sort);
            if placed_earlier {
                break;
            }
            index -= 1;
        }
        self.order.insert(index, row.key().clone());
        self.rows.insert(row.key().clone(), row);
        self.recompute_collapse_at(index);
        self.recompute_collapse_at(index + 1);
    }

    fn apply_delete(&mut self, id: MessageId) {
        let key = MessageKey::Event(id);
        if !self.rows.contains_key(&key) {
            return;
        }
        if self.env.options().redact_messages {
            if let Some(row) = self.rows.get_mut(&key) {
                if let Some(message) = row.message_mut() {
                    message.set_content(REDACTED_CONTENT);
                }
            }
            return;
        }
        // Summary rows anchored to the deleted message go with it; a later
        // summary update re-seats them.
        let orphaned: Vec<SummaryId> = self
            .summaries
            .iter()
            .filter(|(_, end)| **end == id)
            .map(|(sid, _)| *sid)
            .collect();
        for sid in orphaned {
            self.summaries.remove(&sid);
            self.remove_key(&MessageKey::Summary(sid));
        }
        self.remove_key(&key);
    }

    fn remove_key(&mut self, key: &MessageKey) {
        let Some(index) = self.order.iter().position(|k| k == key) else {
            return;
        };
        self.order.remove(index);
        self.rows.remove(key);
        self.recompute_collapse_at(index);
    }

    fn seat_summary(&mut self, summary: ConversationSummary) {
        let summary_key = MessageKey::Summary(summary.id);
        if let Some(row) = self.rows.get_mut(&summary_key) {
            self.summaries.insert(summary.id, summary.end_id);
            row.set_summary(summary);
            return;
        }
        let end_key = MessageKey::Event(summary.end_id);
        let Some(end_index) = self.order.iter().position(|k| *k == end_key) else {
            debug!(summary = %summary.id, "summary end row not in window");
            return;
        };
        let timestamp = self
            .rows
            .get(&end_key)
            .map_or_else(Utc::now, MessageRow::timestamp);
        self.summaries.insert(summary.id, summary.end_id);
        let seq = self.next_seq();
        let row = MessageRow::for_summary(summary, timestamp, seq);
        self.order.insert(end_index + 1, row.key().clone());
        self.rows.insert(row.key().clone(), row);
        self.recompute_collapse_at(end_index + 2);
    }

    fn mutate_message(&mut self, id: MessageId, mutate: impl FnOnce(&mut Message)) {
        if let Some(row) = self.rows.get_mut(&MessageKey::Event(id)) {
            if let Some(message) = row.message_mut() {
                mutate(message);
            }
        }
    }

    /// Collapse rule: same author, both server-confirmed, within the
    /// collapse window.
    fn collapse_rule(&self, prev: Option<&MessageRow>, cur: &MessageRow) -> bool {
        let Some(prev) = prev else {
            return false;
        };
        if !prev.key().is_event() || !cur.key().is_event() {
            return false;
        }
        let same_author = prev
            .author_id()
            .zip(cur.author_id())
            .is_some_and(|(a, b)| a == b);
        if !same_author {
            return false;
        }
        let gap = cur.timestamp() - prev.timestamp();
        let window = chrono::Duration::from_std(self.env.options().collapse_window())
            .unwrap_or_else(|_| chrono::Duration::minutes(10));
        gap >= chrono::Duration::zero() && gap <= window
    }

    fn recompute_collapse_at(&mut self, index: usize) {
        if index >= self.order.len() {
            return;
        }
        let collapsed = {
            let Some(cur) = self.rows.get(&self.order[index]) else {
                return;
            };
            let prev = index
                .checked_sub(1)
                .and_then(|i| self.rows.get(&self.order[i]));
            self.collapse_rule(prev, cur)
        };
        if let Some(row) = self.rows.get_mut(&self.order[index]) {
            row.set_collapsed(collapsed);
        }
    }

    /// Bottom-anchored eviction: oldest rows beyond the cap go, but never
    /// while the user is browsing history.
    fn enforce_soft_cap(&mut self) {
        if self.scroll_anchor != ScrollAnchor::Bottom {
            return;
        }
        let cap = self.env.options().ideal_max_rows;
        let mut evicted = 0;
        while self.order.len() > cap {
            let key = self.order.remove(0);
            if let MessageKey::Summary(sid) = &key {
                self.summaries.remove(sid);
            }
            self.rows.remove(&key);
            evicted += 1;
        }
        if evicted > 0 {
            debug!(evicted, "trimmed rows beyond soft cap");
            self.recompute_collapse_at(0);
        }
    }
}

impl Drop for MessageView {
    fn drop(&mut self) {
        // Pending continuations are dropped without being applied.
        self.lifetime.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Duration;
    use test_case::test_case;

    use crate::application::options::CoreOptions;
    use crate::application::services::testing::{FakeCabinet, test_env_with};
    use crate::domain::entities::User;
    use crate::domain::ports::MockClientPort;

    fn me() -> User {
        User::new(1_u64, "me", "0")
    }

    fn other(id: u64, name: &str) -> User {
        User::new(id, name, "0")
    }

    fn message(id: u64, author: &User, content: &str, ts: chrono::DateTime<Utc>) -> Message {
        Message::new(id, 10_u64, MessageAuthor::from(author), content, ts)
    }

    fn quiet_client() -> MockClientPort {
        MockClientPort::new()
    }

    fn view_with(client: MockClientPort, options: CoreOptions) -> (Arc<FakeCabinet>, MessageView) {
        let cabinet = Arc::new(FakeCabinet::new());
        cabinet.set_me(me());
        let env = test_env_with(Arc::clone(&cabinet), Arc::new(client), options);
        (cabinet, MessageView::new(env, ChannelId(10)))
    }

    fn view() -> (Arc<FakeCabinet>, MessageView) {
        view_with(quiet_client(), CoreOptions::default())
    }

    fn create(view: &mut MessageView, message: Message) {
        view.handle_event(&Event::MessageCreate {
            message,
            member: None,
        });
    }

    #[tokio::test]
    async fn test_optimistic_echo_reconciles_nonce() {
        let mut client = quiet_client();
        client.expect_messages().returning(|_, _| Ok(Vec::new()));
        client.expect_send_message().returning(|request| {
            let nonce = request.nonce.clone().unwrap_or_default();
            Ok(
                Message::new(1001_u64, 10_u64, MessageAuthor::new(1_u64, "me", "0"), "hi", Utc::now())
                    .with_nonce(nonce),
            )
        });
        let (_cabinet, mut view) = view_with(client, CoreOptions::default());

        view.load().await.expect("load task");
        view.pump();
        assert!(matches!(view.load_state(), LoadState::Ready));
        assert!(view.is_empty());

        let handle = view.send("hi", Vec::new(), None, false).expect("send issued");
        assert_eq!(view.len(), 1);
        let local = view.rows().next().expect("local row");
        assert!(local.key().is_local());
        assert!(local.flags().contains(RowFlags::SENDING));
        let MessageKey::Local(nonce) = local.key().clone() else {
            panic!("expected local key");
        };
        handle.await.expect("send task");
        view.pump();

        let echo = message(1001, &me(), "hi", Utc::now()).with_nonce(nonce.as_str());
        create(&mut view, echo);

        assert_eq!(view.len(), 1);
        let row = view.rows().next().expect("reconciled row");
        assert_eq!(row.key(), &MessageKey::Event(MessageId(1001)));
        assert!(!row.flags().contains(RowFlags::SENDING));
    }

    #[tokio::test]
    async fn test_reply_ordering_survives_echo() {
        let mut client = quiet_client();
        client.expect_send_message().returning(|_| {
            Ok(Message::new(
                13_u64,
                10_u64,
                MessageAuthor::new(1_u64, "me", "0"),
                "re",
                Utc::now(),
            ))
        });
        let (_cabinet, mut view) = view_with(client, CoreOptions::default());
        // Seeded rows sit in the past so the optimistic row, stamped with
        // the current time, lands after them.
        let base = Utc::now() - Duration::minutes(30);
        for (id, minutes) in [(10_u64, 0_i64), (11, 1), (12, 2)] {
            create(
                &mut view,
                message(id, &other(5, "a"), "m", base + Duration::minutes(minutes)),
            );
        }

        let handle = view
            .send("re", Vec::new(), Some(MessageId(11)), true)
            .expect("send issued");
        let keys: Vec<MessageKey> = view.rows().map(|r| r.key().clone()).collect();
        assert_eq!(keys.len(), 4);
        assert!(keys[3].is_local());
        let reply_row = view.row(&keys[3]).expect("local row");
        assert_eq!(
            reply_row.message().and_then(|m| m.reference()).and_then(|r| r.message_id),
            Some(MessageId(11))
        );
        let MessageKey::Local(nonce) = keys[3].clone() else {
            panic!("expected local key");
        };
        handle.await.expect("send task");
        view.pump();

        let echo = message(13, &me(), "re", base + Duration::minutes(3))
            .with_nonce(nonce.as_str());
        create(&mut view, echo);

        let keys: Vec<MessageKey> = view.rows().map(|r| r.key().clone()).collect();
        assert_eq!(keys[2], MessageKey::Event(MessageId(12)));
        assert_eq!(keys[3], MessageKey::Event(MessageId(13)));
    }

    #[test]
    fn test_collapse_recomputed_after_delete() {
        let (_cabinet, mut view) = view();
        let base = Utc::now();
        let alice = other(5, "alice");
        let bob = other(6, "bob");
        create(&mut view, message(1, &alice, "one", base));
        create(&mut view, message(2, &alice, "two", base + Duration::minutes(1)));
        create(&mut view, message(3, &bob, "three", base + Duration::minutes(2)));

        let collapsed: Vec<bool> = view.rows().map(MessageRow::collapsed).collect();
        assert_eq!(collapsed, vec![false, true, false]);

        view.handle_event(&Event::MessageDelete {
            channel_id: ChannelId(10),
            message_id: MessageId(2),
            guild_id: None,
        });

        let rows: Vec<(&MessageKey, bool)> =
            view.rows().map(|r| (r.key(), r.collapsed())).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].0, &MessageKey::Event(MessageId(3)));
        assert!(!rows[1].1);
    }

    #[test]
    fn test_collapse_rule_holds_for_all_neighbours() {
        let (_cabinet, mut view) = view();
        let base = Utc::now();
        let alice = other(5, "alice");
        create(&mut view, message(1, &alice, "a", base));
        create(&mut view, message(2, &alice, "b", base + Duration::minutes(5)));
        // Past the ten-minute window: a fresh header.
        create(&mut view, message(3, &alice, "c", base + Duration::minutes(20)));

        let collapsed: Vec<bool> = view.rows().map(MessageRow::collapsed).collect();
        assert_eq!(collapsed, vec![false, true, false]);
    }

    #[tokio::test]
    async fn test_reaction_shortcut_creates_no_row() {
        let mut client = quiet_client();
        client
            .expect_react()
            .times(1)
            .withf(|channel, id, emoji| {
                *channel == ChannelId(10)
                    && *id == MessageId(77)
                    && emoji.name == "🎉"
            })
            .returning(|_, _, _| Ok(()));
        let (_cabinet, mut view) = view_with(client, CoreOptions::default());
        create(&mut view, message(77, &other(5, "a"), "hi", Utc::now()));

        let handle = view
            .send("+🎉", Vec::new(), Some(MessageId(77)), false)
            .expect("react issued");
        handle.await.expect("react task");
        view.pump();

        assert_eq!(view.len(), 1);
    }

    #[test_case("+🎉", Some(ReactionEmoji::unicode("🎉")) ; "unicode emoji")]
    #[test_case("  +<:blob:42>  ", Some(ReactionEmoji::custom(42_u64, "blob")) ; "custom markup")]
    #[test_case("+<a:wave:7>", Some(ReactionEmoji::custom(7_u64, "wave")) ; "animated markup")]
    #[test_case("+two words", None ; "multiple tokens")]
    #[test_case("plain", None ; "no leading plus")]
    #[test_case("+", None ; "bare plus")]
    fn test_reaction_shortcut_parsing(input: &str, expected: Option<ReactionEmoji>) {
        assert_eq!(reaction_shortcut(input), expected);
    }

    #[tokio::test]
    async fn test_send_failure_keeps_row_with_errors() {
        let mut client = quiet_client();
        client
            .expect_send_message()
            .returning(|_| Err(ModelError::network("boom")));
        let (_cabinet, mut view) = view_with(client, CoreOptions::default());

        let handle = view.send("hi", Vec::new(), None, false).expect("send issued");
        handle.await.expect("send task");
        view.pump();

        assert_eq!(view.len(), 1);
        let row = view.rows().next().expect("row kept");
        assert!(!row.flags().contains(RowFlags::SENDING));
        assert!(!row.errors().is_empty());
        assert!(!view.take_toasts().is_empty());
    }

    #[test]
    fn test_blocked_author_dropped_by_default() {
        let (cabinet, mut view) = view();
        cabinet.block(UserId(9));
        create(&mut view, message(1, &other(9, "spammer"), "hi", Utc::now()));
        assert!(view.is_empty());
    }

    #[test]
    fn test_blocked_author_kept_when_enabled() {
        let options = CoreOptions {
            show_blocked_messages: true,
            ..CoreOptions::default()
        };
        let (cabinet, mut view) = view_with(quiet_client(), options);
        cabinet.block(UserId(9));
        create(&mut view, message(1, &other(9, "spammer"), "hi", Utc::now()));

        assert_eq!(view.len(), 1);
        let row = view.rows().next().expect("row");
        assert!(row.flags().contains(RowFlags::BLOCKED));
    }

    #[test]
    fn test_redact_preference_keeps_row_position() {
        let options = CoreOptions {
            redact_messages: true,
            ..CoreOptions::default()
        };
        let (_cabinet, mut view) = view_with(quiet_client(), options);
        let base = Utc::now();
        create(&mut view, message(1, &other(5, "a"), "one", base));
        create(&mut view, message(2, &other(5, "a"), "two", base + Duration::seconds(5)));

        view.handle_event(&Event::MessageDelete {
            channel_id: ChannelId(10),
            message_id: MessageId(1),
            guild_id: None,
        });

        assert_eq!(view.len(), 2);
        let first = view.rows().next().expect("row");
        assert_eq!(first.message().map(Message::content), Some(REDACTED_CONTENT));
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let (_cabinet, mut view) = view();
        let m = message(1, &other(5, "a"), "hi", Utc::now());
        create(&mut view, m.clone());
        create(&mut view, m);
        assert_eq!(view.len(), 1);
    }

    #[test]
    fn test_other_channel_events_ignored() {
        let (_cabinet, mut view) = view();
        let foreign = Message::new(
            1_u64,
            999_u64,
            MessageAuthor::new(5_u64, "a", "0"),
            "hi",
            Utc::now(),
        );
        create(&mut view, foreign);
        assert!(view.is_empty());
    }

    #[test]
    fn test_soft_cap_trims_only_at_bottom() {
        let options = CoreOptions {
            ideal_max_rows: 5,
            ..CoreOptions::default()
        };
        let (_cabinet, mut view) = view_with(quiet_client(), options);
        let base = Utc::now();
        for id in 1..=8_u64 {
            create(
                &mut view,
                message(id, &other(5, "a"), "m", base + Duration::seconds(i64::try_from(id).unwrap_or(0))),
            );
        }
        assert_eq!(view.len(), 5);
        assert_eq!(
            view.rows().next().map(|r| r.key().clone()),
            Some(MessageKey::Event(MessageId(4)))
        );

        view.on_scrolled_away(MessageKey::Event(MessageId(4)));
        for id in 9..=15_u64 {
            create(
                &mut view,
                message(id, &other(5, "a"), "m", base + Duration::seconds(i64::try_from(id).unwrap_or(0))),
            );
        }
        // Browsing history: no eviction.
        assert_eq!(view.len(), 12);

        view.on_scroll_bottomed();
        assert_eq!(view.len(), 5);
    }

    #[tokio::test]
    async fn test_mark_read_is_idempotent() {
        let mut client = quiet_client();
        client
            .expect_mark_read()
            .times(1)
            .returning(|_, _| Ok(()));
        let (_cabinet, mut view) = view_with(client, CoreOptions::default());
        create(&mut view, message(42, &other(5, "a"), "hi", Utc::now()));

        let first = view.set_active(true).expect("ack issued on activation");
        first.await.expect("ack task");

        // Same id again: no second request.
        assert!(view.mark_read().is_none());
        assert!(view.on_scroll_bottomed().is_none());
    }

    #[tokio::test]
    async fn test_mark_read_retries_after_failure() {
        let mut client = quiet_client();
        client
            .expect_mark_read()
            .times(1)
            .returning(|_, _| Err(ModelError::network("offline")));
        client
            .expect_mark_read()
            .times(1)
            .returning(|_, _| Ok(()));
        let (_cabinet, mut view) = view_with(client, CoreOptions::default());
        create(&mut view, message(42, &other(5, "a"), "hi", Utc::now()));

        let failed = view.set_active(true).expect("ack issued on activation");
        failed.await.expect("ack task");
        view.pump();

        // The failed ack rolled back, so reaching bottom tries again.
        let retried = view.on_scroll_bottomed().expect("ack reissued");
        retried.await.expect("ack task");
        view.pump();
        assert!(view.mark_read().is_none());
    }

    #[test]
    fn test_mark_read_gated_on_active_and_bottom() {
        let (_cabinet, mut view) = view();
        create(&mut view, message(42, &other(5, "a"), "hi", Utc::now()));

        assert!(view.mark_read().is_none());
        view.active = true;
        view.scroll_anchor = ScrollAnchor::At(MessageKey::Event(MessageId(42)));
        assert!(view.mark_read().is_none());
    }

    #[tokio::test]
    async fn test_load_more_coalesces_inflight_requests() {
        let mut client = quiet_client();
        client
            .expect_messages_before()
            .times(1)
            .returning(|_, _, _| Ok(Vec::new()));
        let (_cabinet, mut view) = view_with(client, CoreOptions::default());
        create(&mut view, message(100, &other(5, "a"), "hi", Utc::now()));

        let first = view.load_more().expect("request issued");
        assert!(view.load_more().is_none());
        first.await.expect("task");
        view.pump();

        // Short batch ends history; further calls are no-ops.
        assert!(view.end_of_history());
        assert!(view.load_more().is_none());
    }

    #[test]
    fn test_load_more_prefers_cabinet() {
        let (cabinet, mut view) = view();
        let base = Utc::now();
        create(&mut view, message(100, &other(5, "a"), "new", base));
        cabinet.add_message(
            Message::new(50_u64, 10_u64, MessageAuthor::new(5_u64, "a", "0"), "old", base - Duration::minutes(1)),
        );

        assert!(view.load_more().is_none());
        assert_eq!(view.len(), 2);
        assert_eq!(
            view.rows().next().map(|r| r.key().clone()),
            Some(MessageKey::Event(MessageId(50)))
        );
        // Cache path never flips the end-of-history flag.
        assert!(!view.end_of_history());
    }

    #[test]
    fn test_summary_seated_after_end_row_and_dropped_with_it() {
        let (_cabinet, mut view) = view();
        let base = Utc::now();
        create(&mut view, message(1, &other(5, "a"), "one", base));
        create(&mut view, message(2, &other(6, "b"), "two", base + Duration::seconds(5)));

        view.handle_event(&Event::ConversationSummaryUpdate {
            channel_id: ChannelId(10),
            summaries: vec![ConversationSummary {
                id: SummaryId(7),
                channel_id: ChannelId(10),
                start_id: MessageId(1),
                end_id: MessageId(1),
                topic: "greetings".into(),
                summary: "people said hi".into(),
            }],
        });

        let keys: Vec<MessageKey> = view.rows().map(|r| r.key().clone()).collect();
        assert_eq!(keys[0], MessageKey::Event(MessageId(1)));
        assert_eq!(keys[1], MessageKey::Summary(SummaryId(7)));
        assert_eq!(keys[2], MessageKey::Event(MessageId(2)));

        view.handle_event(&Event::MessageDelete {
            channel_id: ChannelId(10),
            message_id: MessageId(1),
            guild_id: None,
        });
        assert_eq!(view.len(), 1);
        assert!(view.row(&MessageKey::Summary(SummaryId(7))).is_none());
    }

    #[test]
    fn test_typing_entry_removed_on_message() {
        let (_cabinet, mut view) = view();
        let now = Utc::now();
        view.handle_event(&Event::TypingStart {
            channel_id: ChannelId(10),
            guild_id: None,
            user_id: UserId(5),
            member: None,
            timestamp: now,
        });
        assert!(view.typing_indicator().is_some());

        create(&mut view, message(1, &other(5, "a"), "sent it", now));
        assert!(view.typing_indicator().is_none());
    }

    #[test]
    fn test_typing_sweep_expires_entries() {
        let (_cabinet, mut view) = view();
        let now = Utc::now();
        view.handle_event(&Event::TypingStart {
            channel_id: ChannelId(10),
            guild_id: None,
            user_id: UserId(5),
            member: None,
            timestamp: now,
        });

        assert!(!view.sweep_typing(now + Duration::seconds(5)));
        assert!(view.sweep_typing(now + Duration::seconds(11)));
        assert!(view.typing_indicator().is_none());
    }

    #[test]
    fn test_reply_preview_for_unknown_message() {
        let (cabinet, mut view) = view();
        let known = message(1, &other(5, "a"), "hello there", Utc::now());
        create(&mut view, known);

        let resolved = view.reply_preview(&MessageReference::new(ChannelId(10), MessageId(1)));
        assert_eq!(resolved, "a: hello there");

        let missing = view.reply_preview(&MessageReference::new(ChannelId(10), MessageId(999)));
        assert_eq!(missing, UNKNOWN_REFERENCE);

        cabinet.block(UserId(5));
        let blocked = view.reply_preview(&MessageReference::new(ChannelId(10), MessageId(1)));
        assert_eq!(blocked, UNKNOWN_REFERENCE);
    }

    #[test]
    fn test_reaction_events_mutate_row() {
        let (_cabinet, mut view) = view();
        create(&mut view, message(1, &other(5, "a"), "hi", Utc::now()));
        let emoji = ReactionEmoji::unicode("🎉");

        view.handle_event(&Event::ReactionAdd {
            channel_id: ChannelId(10),
            message_id: MessageId(1),
            user_id: UserId(1),
            emoji: emoji.clone(),
        });
        let row = view.row(&MessageKey::Event(MessageId(1))).expect("row");
        let reactions = row.message().map(Message::reactions).unwrap_or_default();
        assert_eq!(reactions.len(), 1);
        assert!(reactions[0].me);

        view.handle_event(&Event::ReactionRemoveAll {
            channel_id: ChannelId(10),
            message_id: MessageId(1),
        });
        let row = view.row(&MessageKey::Event(MessageId(1))).expect("row");
        assert!(row.message().map(Message::reactions).unwrap_or_default().is_empty());
    }

    #[test]
    fn test_member_update_refreshes_author_info() {
        let cabinet = Arc::new(FakeCabinet::new());
        cabinet.set_me(me());
        cabinet.put_channel(
            crate::domain::entities::Channel::new(
                10_u64,
                "general",
                crate::domain::entities::ChannelKind::Text,
            )
            .with_guild(1_u64),
        );
        let env = test_env_with(
            Arc::clone(&cabinet),
            Arc::new(quiet_client()),
            CoreOptions::default(),
        );
        let mut view = MessageView::new(env, ChannelId(10));
        create(&mut view, message(1, &other(5, "a"), "hi", Utc::now()));

        view.handle_event(&Event::GuildMemberUpdate {
            member: Member::new(1_u64, other(5, "a")).with_nick("nickname"),
        });
        let row = view.row(&MessageKey::Event(MessageId(1))).expect("row");
        assert_eq!(
            row.author().map(|a| a.display_name.as_str()),
            Some("nickname")
        );
    }

    #[test]
    fn test_edit_last_message_finds_own_row() {
        let (_cabinet, mut view) = view();
        let base = Utc::now();
        create(&mut view, message(1, &me(), "mine", base));
        create(&mut view, message(2, &other(5, "a"), "theirs", base + Duration::seconds(5)));

        assert_eq!(view.edit_last_message(), Some(MessageId(1)));
    }

    #[test]
    fn test_scroll_to_unknown_id_is_a_no_op() {
        let (_cabinet, mut view) = view();
        create(&mut view, message(1, &other(5, "a"), "hi", Utc::now()));

        assert!(view.scroll_to(MessageId(1)));
        assert!(!view.scroll_to(MessageId(404)));
        assert_eq!(
            view.scroll_anchor(),
            &ScrollAnchor::At(MessageKey::Event(MessageId(1)))
        );
    }

    #[tokio::test]
    async fn test_delete_failure_restores_row() {
        let mut client = quiet_client();
        client
            .expect_delete_message()
            .returning(|_, _| Err(ModelError::permission_denied("not yours")));
        let (_cabinet, mut view) = view_with(client, CoreOptions::default());
        create(&mut view, message(1, &other(5, "a"), "hi", Utc::now()));

        let handle = view.delete(MessageId(1));
        let row = view.row(&MessageKey::Event(MessageId(1))).expect("row");
        assert!(row.flags().contains(RowFlags::SENSITIVE));

        handle.await.expect("delete task");
        view.pump();
        let row = view.row(&MessageKey::Event(MessageId(1))).expect("row");
        assert!(!row.flags().contains(RowFlags::SENSITIVE));
        assert!(!view.take_toasts().is_empty());
    }

    #[test]
    fn test_row_order_matches_synchronous_replay() {
        // Property 1: processing a fixed event sequence yields the same
        // order as replaying it on a fresh view.
        let base = Utc::now();
        let events: Vec<Event> = (1..=6_u64)
            .map(|id| Event::MessageCreate {
                message: message(id, &other(5, "a"), "m", base + Duration::seconds(i64::try_from(id).unwrap_or(0))),
                member: None,
            })
            .collect();

        let (_c1, mut first) = view();
        let (_c2, mut second) = view();
        for event in &events {
            first.handle_event(event);
        }
        for event in &events {
            second.handle_event(event);
        }

        let a: Vec<MessageKey> = first.rows().map(|r| r.key().clone()).collect();
        let b: Vec<MessageKey> = second.rows().map(|r| r.key().clone()).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_seq_tiebreak_preserves_insertion_order() {
        let (_cabinet, mut view) = view();
        let ts = Utc::now();
        create(&mut view, message(1, &other(5, "a"), "first", ts));
        create(&mut view, message(2, &other(5, "a"), "second", ts));

        let keys: Vec<MessageKey> = view.rows().map(|r| r.key().clone()).collect();
        assert_eq!(
            keys,
            vec![
                MessageKey::Event(MessageId(1)),
                MessageKey::Event(MessageId(2))
            ]
        );
    }

    #[test]
    fn test_typing_timeout_follows_options() {
        let options = CoreOptions {
            typing_timeout_secs: 3,
            ..CoreOptions::default()
        };
        let (_cabinet, mut view) = view_with(quiet_client(), options);
        let now = Utc::now();
        view.handle_event(&Event::TypingStart {
            channel_id: ChannelId(10),
            guild_id: None,
            user_id: UserId(5),
            member: None,
            timestamp: now,
        });
        assert!(view.sweep_typing(now + Duration::seconds(4)));
    }

    #[test]
    fn test_view_uses_configured_collapse_window() {
        let options = CoreOptions {
            collapse_window_secs: 60,
            ..CoreOptions::default()
        };
        let (_cabinet, mut view) = view_with(quiet_client(), options);
        let base = Utc::now();
        create(&mut view, message(1, &other(5, "a"), "a", base));
        create(&mut view, message(2, &other(5, "a"), "b", base + Duration::seconds(59)));
        create(&mut view, message(3, &other(5, "a"), "c", base + Duration::seconds(150)));

        let collapsed: Vec<bool> = view.rows().map(MessageRow::collapsed).collect();
        assert_eq!(collapsed, vec![false, true, false]);
    }

    #[test]
    fn test_completions_cross_threads() {
        fn assert_send<T: Send>() {}
        assert_send::<ViewCompletion>();
        assert_send::<OutgoingFile>();
    }
}
