//! Rune-triggered completion engine for the composer.
//!
//! The engine watches the composer buffer, finds an active trigger rune
//! left of the cursor, and dispatches the query to the matching source
//! after a debounce. Sources own their candidate caches; the engine owns
//! the trigger state, the debounce clock, and the per-query cancellation.

mod command_source;
mod emoji_source;
mod member_source;
mod source;

pub use command_source::CommandSource;
pub use emoji_source::EmojiSource;
pub use member_source::MemberSource;
pub use source::{Completion, SearchContext, Source};

use std::ops::Range;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::trace;

use crate::application::env::ModelEnv;
use crate::domain::entities::{ChannelId, GuildId};
use crate::runtime::CancelToken;

/// Hard per-search deadline.
const SEARCH_DEADLINE: Duration = Duration::from_secs(1);

/// Buffer edit produced by committing a completion: replace `range` with
/// `text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    /// Byte range covering the trigger rune and the query.
    pub range: Range<usize>,
    /// Text to insert in its place.
    pub text: String,
}

struct ActiveTrigger {
    source_index: usize,
    anchor: usize,
    end: usize,
    query: String,
    changed_at: Instant,
    cancel: CancelToken,
    served: bool,
}

/// Completion engine bound to one composer.
pub struct AutocompleteEngine {
    env: ModelEnv,
    channel_id: ChannelId,
    guild_id: Option<GuildId>,
    sources: Vec<Box<dyn Source>>,
    active: Option<ActiveTrigger>,
}

impl AutocompleteEngine {
    /// Creates an engine with the default emoji, member, and command
    /// sources configured from the environment's options.
    #[must_use]
    pub fn new(env: ModelEnv, channel_id: ChannelId, guild_id: Option<GuildId>) -> Self {
        let options = env.options();
        let max = options.autocomplete_max_results;
        let sources: Vec<Box<dyn Source>> = vec![
            Box::new(EmojiSource::new(options.emoji_cache_ttl(), max)),
            Box::new(MemberSource::new(options.member_cache_ttl(), max)),
            Box::new(CommandSource::new(max)),
        ];
        Self {
            env,
            channel_id,
            guild_id,
            sources,
            active: None,
        }
    }

    /// Replaces the source set, for hosts that add their own providers.
    pub fn set_sources(&mut self, sources: Vec<Box<dyn Source>>) {
        self.dismiss();
        self.sources = sources;
    }

    /// Returns whether a trigger is currently anchored.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Re-anchors the engine against the buffer after any change to the
    /// text or the cursor. Returns whether a trigger is active. A query
    /// change cancels the previous in-flight search and restarts the
    /// debounce clock.
    pub fn update(&mut self, buffer: &str, cursor: usize, now: Instant) -> bool {
        let Some((source_index, anchor, query)) = self.scan(buffer, cursor) else {
            self.dismiss();
            return false;
        };
        let unchanged = self.active.as_ref().is_some_and(|a| {
            a.source_index == source_index && a.anchor == anchor && a.query == query
        });
        if unchanged {
            if let Some(active) = self.active.as_mut() {
                active.end = cursor;
            }
            return true;
        }
        if let Some(previous) = &self.active {
            previous.cancel.cancel();
        }
        trace!(anchor, query = %query, "trigger anchored");
        self.active = Some(ActiveTrigger {
            source_index,
            anchor,
            end: cursor,
            query,
            changed_at: now,
            cancel: CancelToken::new(),
            served: false,
        });
        true
    }

    /// Runs the pending search if the debounce interval has elapsed.
    /// Returns `None` while debouncing, when the query is below the
    /// source's minimum length, or when the current query was already
    /// served.
    pub fn poll(&mut self, now: Instant) -> Option<Vec<Completion>> {
        let debounce = self.env.options().autocomplete_debounce();
        let (source_index, query, cancel) = {
            let active = self.active.as_mut()?;
            let min = self.sources[active.source_index].min_query_len();
            if active.served
                || active.query.chars().count() < min
                || now.duration_since(active.changed_at) < debounce
            {
                return None;
            }
            active.served = true;
            (active.source_index, active.query.clone(), active.cancel.clone())
        };

        let ctx = SearchContext {
            cabinet: Arc::clone(self.env.cabinet()),
            guild_id: self.guild_id,
            channel_id: self.channel_id,
            premium: self.env.cabinet().premium(),
            now,
            deadline: now + SEARCH_DEADLINE,
            cancel: cancel.clone(),
        };
        let results = self.sources[source_index].search(&ctx, &query);
        if cancel.is_cancelled() {
            return None;
        }
        Some(results)
    }

    /// Drops the active trigger and cancels its in-flight search.
    pub fn dismiss(&mut self) {
        if let Some(active) = self.active.take() {
            active.cancel.cancel();
        }
    }

    /// Commits a completion: returns the buffer edit replacing the
    /// anchored trigger-and-query range, and clears the trigger.
    pub fn commit(&mut self, completion: &Completion) -> Option<Replacement> {
        let active = self.active.take()?;
        active.cancel.cancel();
        Some(Replacement {
            range: active.anchor..active.end,
            text: completion.insert.clone(),
        })
    }

    /// Finds the trigger left of the cursor: scan backwards until
    /// whitespace (no trigger) or a registered trigger rune that sits at
    /// buffer start or after whitespace. Start-anchored sources only match
    /// at offset 0.
    fn scan(&self, buffer: &str, cursor: usize) -> Option<(usize, usize, String)> {
        let head = buffer.get(..cursor)?;
        for (offset, ch) in head.char_indices().rev() {
            if ch.is_whitespace() {
                return None;
            }
            let Some(source_index) = self
                .sources
                .iter()
                .position(|source| source.trigger() == ch)
            else {
                continue;
            };
            let source = &self.sources[source_index];
            if source.anchor_to_start() && offset != 0 {
                return None;
            }
            let preceded_ok = offset == 0
                || head[..offset]
                    .chars()
                    .next_back()
                    .is_some_and(char::is_whitespace);
            if !preceded_ok {
                return None;
            }
            let query = head[offset + ch.len_utf8()..].to_string();
            return Some((source_index, offset, query));
        }
        None
    }
}
