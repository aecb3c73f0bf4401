//! Completion source abstraction.

use std::sync::Arc;
use std::time::Instant;

use crate::domain::entities::{ChannelId, GuildId, PremiumTier};
use crate::domain::ports::Cabinet;
use crate::runtime::CancelToken;

/// Everything a source may consult while searching.
pub struct SearchContext {
    /// Offline cache the source reads candidates from.
    pub cabinet: Arc<dyn Cabinet>,
    /// Guild of the composer's channel, if any.
    pub guild_id: Option<GuildId>,
    /// The composer's channel.
    pub channel_id: ChannelId,
    /// Premium entitlement of the account.
    pub premium: PremiumTier,
    /// The current time, injected for TTL decisions.
    pub now: Instant,
    /// Hard deadline for this search.
    pub deadline: Instant,
    /// Cancelled when the query changes or the trigger is dismissed.
    pub cancel: CancelToken,
}

/// One ranked completion candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Text shown in the popup row.
    pub display: String,
    /// Secondary text shown next to the display string, if any.
    pub detail: Option<String>,
    /// Text committed into the buffer when selected.
    pub insert: String,
    /// Fuzzy match score, higher first.
    pub score: i64,
}

/// A trigger-bound completion provider.
///
/// Sources own their candidate caches; `search` takes `&mut self` so a
/// source can refresh an expired cache in place.
pub trait Source {
    /// The rune that activates this source.
    fn trigger(&self) -> char;

    /// Minimum query length before a search is dispatched.
    fn min_query_len(&self) -> usize {
        1
    }

    /// Whether the trigger is only recognised at buffer offset 0.
    fn anchor_to_start(&self) -> bool {
        false
    }

    /// Searches for candidates matching `query`, ranked best first.
    fn search(&mut self, ctx: &SearchContext, query: &str) -> Vec<Completion>;
}
