//! `@`-triggered member mention completion.

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;
use lru::LruCache;
use tracing::debug;

use super::source::{Completion, SearchContext, Source};
use crate::domain::entities::GuildId;

#[derive(Clone)]
struct Candidate {
    haystack: String,
    display: String,
    mention: String,
}

/// Member completion source over the cabinet's member cache. Committing a
/// candidate inserts a `<@id>` mention.
pub struct MemberSource {
    matcher: SkimMatcherV2,
    ttl: Duration,
    max_results: usize,
    cache: LruCache<GuildId, (Instant, Vec<Candidate>)>,
}

impl MemberSource {
    /// Creates a member source with the given cache TTL and result cap.
    #[must_use]
    pub fn new(ttl: Duration, max_results: usize) -> Self {
        Self {
            matcher: SkimMatcherV2::default(),
            ttl,
            max_results,
            cache: LruCache::new(NonZeroUsize::new(8).unwrap_or(NonZeroUsize::MIN)),
        }
    }

    fn candidates(&mut self, ctx: &SearchContext, guild_id: GuildId) -> Vec<Candidate> {
        let fresh = self
            .cache
            .get(&guild_id)
            .is_some_and(|(built, _)| ctx.now.duration_since(*built) < self.ttl);
        if !fresh {
            debug!(guild = %guild_id, "rebuilding member candidates");
            let built: Vec<Candidate> = ctx
                .cabinet
                .members(guild_id)
                .into_iter()
                .map(|member| {
                    // Matched against nick and username together so either
                    // spelling finds the member.
                    let haystack = match member.nick() {
                        Some(nick) => format!("{} {}", nick, member.user().username()),
                        None => member.user().username().to_string(),
                    };
                    Candidate {
                        haystack,
                        display: member.display_name(),
                        mention: member.user().mention(),
                    }
                })
                .collect();
            self.cache.put(guild_id, (ctx.now, built));
        }
        self.cache
            .get(&guild_id)
            .map(|(_, c)| c.clone())
            .unwrap_or_default()
    }
}

impl Source for MemberSource {
    fn trigger(&self) -> char {
        '@'
    }

    fn search(&mut self, ctx: &SearchContext, query: &str) -> Vec<Completion> {
        let Some(guild_id) = ctx.guild_id else {
            // DMs have no member cache; recipients come from the channel.
            let Some(channel) = ctx.cabinet.channel(ctx.channel_id) else {
                return Vec::new();
            };
            let mut results: Vec<Completion> = channel
                .recipients()
                .iter()
                .filter_map(|user| {
                    let score = self.matcher.fuzzy_match(user.username(), query)?;
                    Some(Completion {
                        display: user.tag(),
                        detail: None,
                        insert: user.mention(),
                        score,
                    })
                })
                .collect();
            results.sort_by(|a, b| b.score.cmp(&a.score));
            results.truncate(self.max_results);
            return results;
        };

        let max_results = self.max_results;
        let candidates = self.candidates(ctx, guild_id);
        let mut results: Vec<Completion> = candidates
            .iter()
            .filter_map(|candidate| {
                let score = self.matcher.fuzzy_match(&candidate.haystack, query)?;
                Some(Completion {
                    display: candidate.display.clone(),
                    detail: None,
                    insert: candidate.mention.clone(),
                    score,
                })
            })
            .collect();
        results.sort_by(|a, b| b.score.cmp(&a.score));
        results.truncate(max_results);
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::application::services::testing::FakeCabinet;
    use crate::domain::entities::{ChannelId, Member, PremiumTier, User};
    use crate::runtime::CancelToken;

    fn ctx(cabinet: Arc<FakeCabinet>, now: Instant) -> SearchContext {
        SearchContext {
            cabinet,
            guild_id: Some(GuildId(1)),
            channel_id: ChannelId(10),
            premium: PremiumTier::None,
            now,
            deadline: now + Duration::from_secs(1),
            cancel: CancelToken::new(),
        }
    }

    #[test]
    fn test_matches_nick_and_username() {
        let cabinet = Arc::new(FakeCabinet::new());
        cabinet.add_member(
            Member::new(1_u64, User::new(7_u64, "longname", "0")).with_nick("shorty"),
        );
        let mut source = MemberSource::new(Duration::from_secs(15), 15);

        let by_nick = source.search(&ctx(Arc::clone(&cabinet), Instant::now()), "shorty");
        assert_eq!(by_nick[0].insert, "<@7>");

        let by_name = source.search(&ctx(cabinet, Instant::now()), "longname");
        assert_eq!(by_name[0].insert, "<@7>");
    }

    #[test]
    fn test_cache_expires_after_ttl() {
        let cabinet = Arc::new(FakeCabinet::new());
        let mut source = MemberSource::new(Duration::from_secs(15), 15);
        let t0 = Instant::now();

        assert!(source.search(&ctx(Arc::clone(&cabinet), t0), "late").is_empty());
        cabinet.add_member(Member::new(1_u64, User::new(8_u64, "latecomer", "0")));

        let cached = source.search(&ctx(Arc::clone(&cabinet), t0 + Duration::from_secs(10)), "late");
        assert!(cached.is_empty());

        let refreshed = source.search(&ctx(cabinet, t0 + Duration::from_secs(16)), "late");
        assert_eq!(refreshed.len(), 1);
    }
}
