//! Compose-box state machine.
//!
//! Owns the draft buffer, the attachment tray, and the mutually exclusive
//! editing/replying modes. Sends go through the channel's
//! [`MessageView`], which handles optimistic rows and the reaction
//! shortcut.

use std::cell::RefCell;
use std::io::{Seek, SeekFrom, Write};
use std::rc::Rc;

use tokio::task::JoinHandle;
use tracing::debug;

use crate::application::env::ModelEnv;
use crate::domain::entities::MessageId;
use crate::domain::errors::ModelError;
use crate::domain::ports::{FileReader, OutgoingFile};

use super::message_view::MessageView;

/// What the composer is doing besides drafting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ComposeState {
    /// Drafting a new message.
    #[default]
    Idle,
    /// Rewriting an existing message.
    Editing(MessageId),
    /// Drafting a reply.
    Replying {
        /// The replied-to message.
        target: MessageId,
        /// Whether the reply pings its author.
        mention: bool,
    },
}

/// The compose box model for one channel.
pub struct Composer {
    env: ModelEnv,
    view: Rc<RefCell<MessageView>>,
    buffer: String,
    state: ComposeState,
    attachments: Vec<OutgoingFile>,
    /// Draft saved aside while an edit borrows the buffer.
    stash: Option<String>,
    over_limit_notice: bool,
}

impl Composer {
    /// Creates a composer bound to a channel's view.
    #[must_use]
    pub fn new(env: ModelEnv, view: Rc<RefCell<MessageView>>) -> Self {
        Self {
            env,
            view,
            buffer: String::new(),
            state: ComposeState::Idle,
            attachments: Vec::new(),
            stash: None,
            over_limit_notice: false,
        }
    }

    /// Returns the draft buffer.
    #[must_use]
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Replaces the draft buffer.
    pub fn set_buffer(&mut self, text: impl Into<String>) {
        self.buffer = text.into();
    }

    /// Returns the current mode.
    #[must_use]
    pub const fn state(&self) -> ComposeState {
        self.state
    }

    /// Returns the queued attachments.
    #[must_use]
    pub fn attachments(&self) -> &[OutgoingFile] {
        &self.attachments
    }

    /// Queues a file for the next send.
    pub fn attach(&mut self, file: OutgoingFile) {
        self.attachments.push(file);
    }

    /// Queues a pasted payload, e.g. a clipboard image. The bytes are
    /// spilled to an unlinked temporary file so a large paste does not sit
    /// in memory until the send.
    ///
    /// # Errors
    ///
    /// Returns the I/O error from writing the temporary file.
    pub fn attach_clipboard(
        &mut self,
        name: impl Into<String>,
        mime: impl Into<String>,
        data: &[u8],
    ) -> Result<(), ModelError> {
        let mut file = tempfile::tempfile()?;
        file.write_all(data)?;
        let size = data.len() as u64;
        self.attachments.push(OutgoingFile::new(name, mime, size, move || {
            let mut file = file;
            file.seek(SeekFrom::Start(0))?;
            Ok(Box::new(file) as FileReader)
        }));
        Ok(())
    }

    /// Removes one queued attachment.
    pub fn remove_attachment(&mut self, index: usize) {
        if index < self.attachments.len() {
            self.attachments.remove(index);
        }
    }

    /// Character limit for the current account tier.
    #[must_use]
    pub fn length_limit(&self) -> usize {
        self.env.cabinet().premium().message_length_limit()
    }

    /// Returns whether the draft exceeds the account's limit. Sends are
    /// refused while this holds.
    #[must_use]
    pub fn is_over_limit(&self) -> bool {
        self.buffer.chars().count() > self.length_limit()
    }

    /// Characters left before the limit; negative when over.
    #[must_use]
    pub fn remaining(&self) -> i64 {
        let limit = i64::try_from(self.length_limit()).unwrap_or(i64::MAX);
        let used = i64::try_from(self.buffer.chars().count()).unwrap_or(i64::MAX);
        limit - used
    }

    /// Returns whether a refused over-limit send is still being surfaced.
    /// Cleared by the next send that actually goes out.
    #[must_use]
    pub const fn over_limit_notice(&self) -> bool {
        self.over_limit_notice
    }

    /// Enters reply mode, leaving any edit first. The draft is kept.
    pub fn start_replying(&mut self, target: MessageId, mention: bool) {
        self.leave_current_mode();
        self.state = ComposeState::Replying { target, mention };
        self.view.borrow_mut().set_reply_marker(Some(target));
    }

    /// Flips whether the pending reply pings its author.
    pub fn toggle_reply_mention(&mut self) {
        if let ComposeState::Replying { target, mention } = self.state {
            self.state = ComposeState::Replying {
                target,
                mention: !mention,
            };
        }
    }

    /// Enters edit mode on a message, stashing the current draft and
    /// loading the message content into the buffer.
    pub fn start_editing(&mut self, target: MessageId) {
        self.leave_current_mode();
        let content = {
            let view = self.view.borrow();
            view.row(&super::message_view::MessageKey::Event(target))
                .and_then(|row| row.message().map(|m| m.content().to_string()))
        }
        .or_else(|| {
            self.env
                .cabinet()
                .message(self.view.borrow().channel_id(), target)
                .map(|m| m.content().to_string())
        });
        let Some(content) = content else {
            debug!(%target, "edit target not available");
            return;
        };
        self.stash = Some(std::mem::replace(&mut self.buffer, content));
        self.state = ComposeState::Editing(target);
        self.view.borrow_mut().set_edit_marker(Some(target));
    }

    /// Starts editing the caller's most recent message in the channel.
    pub fn edit_last(&mut self) -> bool {
        let target = self.view.borrow().edit_last_message();
        match target {
            Some(id) => {
                self.start_editing(id);
                matches!(self.state, ComposeState::Editing(_))
            }
            None => false,
        }
    }

    /// Leaves edit mode, restoring the stashed draft. No-op otherwise.
    pub fn stop_editing(&mut self) {
        if matches!(self.state, ComposeState::Editing(_)) {
            self.leave_current_mode();
        }
    }

    /// Leaves reply mode. No-op otherwise.
    pub fn stop_replying(&mut self) {
        if matches!(self.state, ComposeState::Replying { .. }) {
            self.leave_current_mode();
        }
    }

    /// Escape pressed: leaves edit or reply mode, restoring a stashed
    /// draft. Returns whether the key was consumed.
    pub fn escape(&mut self) -> bool {
        if self.state == ComposeState::Idle {
            return false;
        }
        self.leave_current_mode();
        true
    }

    /// Placeholder text for an empty compose box: the typing indicator
    /// when someone is typing, the channel name otherwise.
    #[must_use]
    pub fn placeholder_text(&self) -> String {
        let view = self.view.borrow();
        view.typing_indicator()
            .unwrap_or_else(|| format!("Message #{}", view.channel_name()))
    }

    /// Sends or applies the draft according to the current mode, then
    /// resets the composer. Returns the background task handle, or `None`
    /// when nothing was issued (empty draft, over the limit, or a
    /// reaction shortcut with no target).
    pub fn send(&mut self) -> Option<JoinHandle<()>> {
        let content = self.buffer.trim().to_string();
        if content.is_empty() && self.attachments.is_empty() {
            return None;
        }
        if self.is_over_limit() {
            debug!(limit = self.length_limit(), "draft over the length limit");
            self.over_limit_notice = true;
            return None;
        }
        self.over_limit_notice = false;

        let state = self.state;
        let handle = match state {
            ComposeState::Editing(target) => {
                Some(self.view.borrow_mut().edit(target, content))
            }
            ComposeState::Replying { target, mention } => {
                let files = std::mem::take(&mut self.attachments);
                self.view
                    .borrow_mut()
                    .send(&content, files, Some(target), mention)
            }
            ComposeState::Idle => {
                let files = std::mem::take(&mut self.attachments);
                self.view.borrow_mut().send(&content, files, None, false)
            }
        };

        // The draft is consumed even when a reaction shortcut resolved to
        // nothing; a stashed draft from edit mode comes back.
        self.buffer.clear();
        self.leave_current_mode();
        handle
    }

    fn leave_current_mode(&mut self) {
        match self.state {
            ComposeState::Editing(_) => {
                self.buffer = self.stash.take().unwrap_or_default();
                self.view.borrow_mut().set_edit_marker(None);
            }
            ComposeState::Replying { .. } => {
                self.view.borrow_mut().set_reply_marker(None);
            }
            ComposeState::Idle => {}
        }
        self.state = ComposeState::Idle;
    }
}

impl std::fmt::Debug for Composer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Composer")
            .field("state", &self.state)
            .field("buffer_len", &self.buffer.len())
            .field("attachments", &self.attachments.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::Utc;

    use crate::application::options::CoreOptions;
    use crate::application::services::message_view::{MessageKey, RowFlags};
    use crate::application::services::testing::{FakeCabinet, test_env_with};
    use crate::domain::entities::{
        ChannelId, Message, MessageAuthor, PremiumTier, User, UserId,
    };
    use crate::domain::ports::{Event, MockClientPort};

    fn setup(client: MockClientPort) -> (Arc<FakeCabinet>, ModelEnv, Rc<RefCell<MessageView>>) {
        let cabinet = Arc::new(FakeCabinet::new());
        cabinet.set_me(User::new(1_u64, "me", "0"));
        let env = test_env_with(
            Arc::clone(&cabinet),
            Arc::new(client),
            CoreOptions::default(),
        );
        let view = Rc::new(RefCell::new(MessageView::new(env.clone(), ChannelId(10))));
        (cabinet, env, view)
    }

    fn seed_message(view: &Rc<RefCell<MessageView>>, id: u64, author_id: u64, content: &str) {
        view.borrow_mut().handle_event(&Event::MessageCreate {
            message: Message::new(
                id,
                10_u64,
                MessageAuthor::new(author_id, "who", "0"),
                content,
                Utc::now(),
            ),
            member: None,
        });
    }

    #[test]
    fn test_reply_and_edit_are_mutually_exclusive() {
        let (_cabinet, env, view) = setup(MockClientPort::new());
        seed_message(&view, 5, 1, "mine");
        seed_message(&view, 6, 2, "theirs");
        let mut composer = Composer::new(env, Rc::clone(&view));

        composer.start_replying(MessageId(6), true);
        assert!(matches!(composer.state(), ComposeState::Replying { .. }));
        assert!(
            view.borrow()
                .row(&MessageKey::Event(MessageId(6)))
                .is_some_and(|r| r.flags().contains(RowFlags::REPLYING))
        );

        composer.start_editing(MessageId(5));
        assert_eq!(composer.state(), ComposeState::Editing(MessageId(5)));
        assert_eq!(composer.buffer(), "mine");
        let view_ref = view.borrow();
        let reply_row = view_ref.row(&MessageKey::Event(MessageId(6)));
        assert!(reply_row.is_some_and(|r| !r.flags().contains(RowFlags::REPLYING)));
        let edit_row = view_ref.row(&MessageKey::Event(MessageId(5)));
        assert!(edit_row.is_some_and(|r| r.flags().contains(RowFlags::EDITING)));
    }

    #[test]
    fn test_escape_restores_stashed_draft() {
        let (_cabinet, env, view) = setup(MockClientPort::new());
        seed_message(&view, 5, 1, "old content");
        let mut composer = Composer::new(env, Rc::clone(&view));

        composer.set_buffer("half-written draft");
        composer.start_editing(MessageId(5));
        assert_eq!(composer.buffer(), "old content");

        assert!(composer.escape());
        assert_eq!(composer.state(), ComposeState::Idle);
        assert_eq!(composer.buffer(), "half-written draft");

        // Nothing left to cancel.
        assert!(!composer.escape());
    }

    #[test]
    fn test_toggle_reply_mention() {
        let (_cabinet, env, view) = setup(MockClientPort::new());
        seed_message(&view, 6, 2, "theirs");
        let mut composer = Composer::new(env, Rc::clone(&view));

        composer.start_replying(MessageId(6), false);
        composer.toggle_reply_mention();
        assert_eq!(
            composer.state(),
            ComposeState::Replying {
                target: MessageId(6),
                mention: true
            }
        );
    }

    #[test]
    fn test_length_gate_follows_premium_tier() {
        let (cabinet, env, view) = setup(MockClientPort::new());
        let mut composer = Composer::new(env, Rc::clone(&view));

        composer.set_buffer("x".repeat(2001));
        assert!(composer.is_over_limit());
        assert_eq!(composer.remaining(), -1);
        assert!(composer.send().is_none());
        assert!(composer.over_limit_notice());

        cabinet.set_premium(PremiumTier::Nitro);
        assert!(!composer.is_over_limit());
    }

    #[tokio::test]
    async fn test_over_limit_notice_cleared_by_next_send() {
        let mut client = MockClientPort::new();
        client.expect_send_message().returning(|_| {
            Ok(Message::new(
                9_u64,
                10_u64,
                MessageAuthor::new(1_u64, "me", "0"),
                "ok",
                Utc::now(),
            ))
        });
        let (_cabinet, env, view) = setup(client);
        let mut composer = Composer::new(env, Rc::clone(&view));

        composer.set_buffer("x".repeat(2001));
        assert!(composer.send().is_none());
        assert!(composer.over_limit_notice());

        composer.set_buffer("ok");
        let handle = composer.send().expect("send issued");
        handle.await.expect("send task");
        assert!(!composer.over_limit_notice());
    }

    #[test]
    fn test_stop_editing_returns_to_idle_with_clear_buffer() {
        let (_cabinet, env, view) = setup(MockClientPort::new());
        seed_message(&view, 5, 1, "mine");
        let mut composer = Composer::new(env, Rc::clone(&view));

        composer.start_editing(MessageId(5));
        composer.stop_editing();
        assert_eq!(composer.state(), ComposeState::Idle);
        assert_eq!(composer.buffer(), "");

        // Not in reply mode, so this does nothing.
        composer.stop_replying();
        assert_eq!(composer.state(), ComposeState::Idle);
    }

    #[tokio::test]
    async fn test_send_resets_draft_and_mode() {
        let mut client = MockClientPort::new();
        client
            .expect_send_message()
            .times(1)
            .withf(|request| {
                request.content == "hello"
                    && request.reference.is_some()
                    && request
                        .allowed_mentions
                        .as_ref()
                        .is_some_and(|m| !m.replied_user)
            })
            .returning(|_| {
                Ok(Message::new(
                    9_u64,
                    10_u64,
                    MessageAuthor::new(1_u64, "me", "0"),
                    "hello",
                    Utc::now(),
                ))
            });
        let (_cabinet, env, view) = setup(client);
        seed_message(&view, 6, 2, "theirs");
        let mut composer = Composer::new(env, Rc::clone(&view));

        composer.start_replying(MessageId(6), false);
        composer.set_buffer("hello");
        let handle = composer.send().expect("send issued");
        handle.await.expect("send task");

        assert_eq!(composer.buffer(), "");
        assert_eq!(composer.state(), ComposeState::Idle);
    }

    #[tokio::test]
    async fn test_edit_mode_issues_edit_request() {
        let mut client = MockClientPort::new();
        client
            .expect_edit_message()
            .times(1)
            .withf(|_, id, content| *id == MessageId(5) && content == "fixed")
            .returning(|channel_id, id, content| {
                Ok(Message::new(
                    id,
                    channel_id.as_u64(),
                    MessageAuthor::new(1_u64, "me", "0"),
                    content,
                    Utc::now(),
                ))
            });
        let (_cabinet, env, view) = setup(client);
        seed_message(&view, 5, 1, "tyop");
        let mut composer = Composer::new(env, Rc::clone(&view));

        composer.start_editing(MessageId(5));
        composer.set_buffer("fixed");
        let handle = composer.send().expect("edit issued");
        handle.await.expect("edit task");

        assert_eq!(composer.state(), ComposeState::Idle);
    }

    #[test]
    fn test_empty_draft_sends_nothing() {
        let (_cabinet, env, view) = setup(MockClientPort::new());
        let mut composer = Composer::new(env, Rc::clone(&view));

        composer.set_buffer("   ");
        assert!(composer.send().is_none());
    }

    #[test]
    fn test_attach_clipboard_round_trip() {
        let (_cabinet, env, view) = setup(MockClientPort::new());
        let mut composer = Composer::new(env, Rc::clone(&view));

        composer
            .attach_clipboard("paste.png", "image/png", &[1, 2, 3])
            .expect("spill to temp file");
        assert_eq!(composer.attachments().len(), 1);
        assert_eq!(composer.attachments()[0].size(), 3);

        let mut reader = composer.attachments()[0].open().expect("opens once");
        let mut bytes = Vec::new();
        std::io::Read::read_to_end(&mut reader, &mut bytes).expect("readable");
        assert_eq!(bytes, vec![1, 2, 3]);

        composer.remove_attachment(0);
        assert!(composer.attachments().is_empty());
    }

    #[test]
    fn test_edit_last_picks_own_message() {
        let (_cabinet, env, view) = setup(MockClientPort::new());
        seed_message(&view, 5, 1, "mine");
        seed_message(&view, 6, 2, "theirs");
        let mut composer = Composer::new(env, Rc::clone(&view));

        assert!(composer.edit_last());
        assert_eq!(composer.state(), ComposeState::Editing(MessageId(5)));
    }

    #[test]
    fn test_placeholder_shows_typing_indicator() {
        let (cabinet, env, _view) = setup(MockClientPort::new());
        cabinet.put_channel(crate::domain::entities::Channel::new(
            10_u64,
            "general",
            crate::domain::entities::ChannelKind::Text,
        ));
        let view = Rc::new(RefCell::new(MessageView::new(env.clone(), ChannelId(10))));
        let composer = Composer::new(env, Rc::clone(&view));
        assert_eq!(composer.placeholder_text(), "Message #general");

        view.borrow_mut().handle_event(&Event::TypingStart {
            channel_id: ChannelId(10),
            guild_id: None,
            user_id: UserId(5),
            member: None,
            timestamp: Utc::now(),
        });
        assert_eq!(composer.placeholder_text(), "<@5> is typing…");
    }
}
