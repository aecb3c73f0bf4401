//! `:`-triggered emoji completion over unicode and guild emojis.

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;
use lru::LruCache;
use tracing::debug;

use super::source::{Completion, SearchContext, Source};
use crate::domain::entities::GuildId;

/// Size requested for the CDN fallback image.
const FALLBACK_IMAGE_SIZE: u16 = 48;

/// Small built-in table of common unicode emojis keyed by their `:name:`
/// shortcodes. The full unicode set lives with the GUI's emoji picker; the
/// composer only needs the names people type inline.
const UNICODE_EMOJIS: &[(&str, &str)] = &[
    ("grinning", "😀"),
    ("smiley", "😃"),
    ("smile", "😄"),
    ("grin", "😁"),
    ("laughing", "😆"),
    ("joy", "😂"),
    ("rofl", "🤣"),
    ("slight_smile", "🙂"),
    ("upside_down", "🙃"),
    ("wink", "😉"),
    ("blush", "😊"),
    ("innocent", "😇"),
    ("heart_eyes", "😍"),
    ("kissing_heart", "😘"),
    ("yum", "😋"),
    ("stuck_out_tongue", "😛"),
    ("stuck_out_tongue_winking_eye", "😜"),
    ("zany_face", "🤪"),
    ("thinking", "🤔"),
    ("shushing_face", "🤫"),
    ("neutral_face", "😐"),
    ("expressionless", "😑"),
    ("smirk", "😏"),
    ("unamused", "😒"),
    ("roll_eyes", "🙄"),
    ("grimacing", "😬"),
    ("relieved", "😌"),
    ("pensive", "😔"),
    ("sleepy", "😪"),
    ("sleeping", "😴"),
    ("mask", "😷"),
    ("nauseated_face", "🤢"),
    ("sneezing_face", "🤧"),
    ("hot_face", "🥵"),
    ("cold_face", "🥶"),
    ("dizzy_face", "😵"),
    ("exploding_head", "🤯"),
    ("partying_face", "🥳"),
    ("sunglasses", "😎"),
    ("nerd_face", "🤓"),
    ("confused", "😕"),
    ("worried", "😟"),
    ("frowning", "😦"),
    ("astonished", "😲"),
    ("flushed", "😳"),
    ("pleading_face", "🥺"),
    ("cry", "😢"),
    ("sob", "😭"),
    ("scream", "😱"),
    ("angry", "😠"),
    ("rage", "😡"),
    ("skull", "💀"),
    ("poop", "💩"),
    ("clown", "🤡"),
    ("ghost", "👻"),
    ("alien", "👽"),
    ("robot", "🤖"),
    ("wave", "👋"),
    ("raised_hand", "✋"),
    ("ok_hand", "👌"),
    ("v", "✌️"),
    ("crossed_fingers", "🤞"),
    ("thumbsup", "👍"),
    ("thumbsdown", "👎"),
    ("fist", "✊"),
    ("clap", "👏"),
    ("raised_hands", "🙌"),
    ("handshake", "🤝"),
    ("pray", "🙏"),
    ("muscle", "💪"),
    ("eyes", "👀"),
    ("brain", "🧠"),
    ("heart", "❤️"),
    ("broken_heart", "💔"),
    ("two_hearts", "💕"),
    ("sparkling_heart", "💖"),
    ("fire", "🔥"),
    ("star", "⭐"),
    ("sparkles", "✨"),
    ("zap", "⚡"),
    ("boom", "💥"),
    ("tada", "🎉"),
    ("confetti_ball", "🎊"),
    ("balloon", "🎈"),
    ("gift", "🎁"),
    ("trophy", "🏆"),
    ("crown", "👑"),
    ("gem", "💎"),
    ("money_with_wings", "💸"),
    ("rocket", "🚀"),
    ("airplane", "✈️"),
    ("car", "🚗"),
    ("bike", "🚲"),
    ("rainbow", "🌈"),
    ("sunny", "☀️"),
    ("cloud", "☁️"),
    ("snowflake", "❄️"),
    ("umbrella", "☔"),
    ("coffee", "☕"),
    ("beer", "🍺"),
    ("wine_glass", "🍷"),
    ("pizza", "🍕"),
    ("hamburger", "🍔"),
    ("fries", "🍟"),
    ("taco", "🌮"),
    ("sushi", "🍣"),
    ("ramen", "🍜"),
    ("cake", "🍰"),
    ("cookie", "🍪"),
    ("apple", "🍎"),
    ("banana", "🍌"),
    ("avocado", "🥑"),
    ("dog", "🐶"),
    ("cat", "🐱"),
    ("mouse", "🐭"),
    ("rabbit", "🐰"),
    ("fox", "🦊"),
    ("bear", "🐻"),
    ("panda_face", "🐼"),
    ("penguin", "🐧"),
    ("frog", "🐸"),
    ("monkey", "🐒"),
    ("chicken", "🐔"),
    ("unicorn", "🦄"),
    ("bee", "🐝"),
    ("bug", "🐛"),
    ("butterfly", "🦋"),
    ("snail", "🐌"),
    ("whale", "🐳"),
    ("dolphin", "🐬"),
    ("fish", "🐟"),
    ("crab", "🦀"),
    ("octopus", "🐙"),
    ("check", "✅"),
    ("x", "❌"),
    ("warning", "⚠️"),
    ("question", "❓"),
    ("exclamation", "❗"),
    ("100", "💯"),
    ("wavy_dash", "〰️"),
    ("eyes_left_right", "👁️"),
    ("bulb", "💡"),
    ("lock", "🔒"),
    ("key", "🔑"),
    ("hammer", "🔨"),
    ("wrench", "🔧"),
    ("gear", "⚙️"),
    ("link", "🔗"),
    ("mag", "🔍"),
    ("bell", "🔔"),
    ("bookmark", "🔖"),
    ("book", "📖"),
    ("memo", "📝"),
    ("calendar", "📅"),
    ("clock", "🕐"),
    ("hourglass", "⌛"),
    ("envelope", "✉️"),
    ("phone", "📱"),
    ("computer", "💻"),
    ("keyboard", "⌨️"),
    ("camera", "📷"),
    ("movie_camera", "🎥"),
    ("musical_note", "🎵"),
    ("headphones", "🎧"),
    ("microphone", "🎤"),
    ("game_die", "🎲"),
    ("video_game", "🎮"),
    ("dart", "🎯"),
    ("soccer", "⚽"),
    ("basketball", "🏀"),
    ("football", "🏈"),
    ("tennis", "🎾"),
    ("8ball", "🎱"),
];

#[derive(Clone)]
enum Insert {
    Glyph(String),
    Custom {
        markup: String,
        fallback: String,
        available: bool,
    },
}

#[derive(Clone)]
struct Candidate {
    name: String,
    detail: Option<String>,
    insert: Insert,
    from_current_guild: bool,
}

/// Emoji completion source. Candidates are the built-in unicode table plus
/// every cached guild emoji; the per-guild candidate list is rebuilt at
/// most once per TTL.
pub struct EmojiSource {
    matcher: SkimMatcherV2,
    ttl: Duration,
    max_results: usize,
    cache: LruCache<Option<GuildId>, (Instant, Vec<Candidate>)>,
}

impl EmojiSource {
    /// Creates an emoji source with the given cache TTL and result cap.
    #[must_use]
    pub fn new(ttl: Duration, max_results: usize) -> Self {
        Self {
            matcher: SkimMatcherV2::default(),
            ttl,
            max_results,
            cache: LruCache::new(NonZeroUsize::new(8).unwrap_or(NonZeroUsize::MIN)),
        }
    }

    fn build_candidates(ctx: &SearchContext) -> Vec<Candidate> {
        let mut candidates: Vec<Candidate> = UNICODE_EMOJIS
            .iter()
            .map(|(name, glyph)| Candidate {
                name: (*name).to_string(),
                detail: Some((*glyph).to_string()),
                insert: Insert::Glyph((*glyph).to_string()),
                from_current_guild: false,
            })
            .collect();

        for emoji in ctx.cabinet.all_emojis() {
            let from_current_guild = ctx.guild_id == Some(emoji.guild_id);
            candidates.push(Candidate {
                name: emoji.name.clone(),
                detail: None,
                insert: Insert::Custom {
                    markup: emoji.markup(),
                    fallback: emoji.image_url(FALLBACK_IMAGE_SIZE),
                    available: emoji.available,
                },
                from_current_guild,
            });
        }
        candidates
    }

    fn candidates(&mut self, ctx: &SearchContext) -> Vec<Candidate> {
        let fresh = self
            .cache
            .get(&ctx.guild_id)
            .is_some_and(|(built, _)| ctx.now.duration_since(*built) < self.ttl);
        if !fresh {
            debug!(guild = ?ctx.guild_id, "rebuilding emoji candidates");
            let built = Self::build_candidates(ctx);
            self.cache.put(ctx.guild_id, (ctx.now, built));
        }
        self.cache
            .get(&ctx.guild_id)
            .map(|(_, c)| c.clone())
            .unwrap_or_default()
    }
}

impl Source for EmojiSource {
    fn trigger(&self) -> char {
        ':'
    }

    fn min_query_len(&self) -> usize {
        2
    }

    fn search(&mut self, ctx: &SearchContext, query: &str) -> Vec<Completion> {
        let premium = ctx.premium.is_premium();
        let max_results = self.max_results;
        let candidates = self.candidates(ctx);

        let mut scored: Vec<(i64, bool, Completion)> = Vec::new();
        for candidate in &candidates {
            let Some(score) = self.matcher.fuzzy_match(&candidate.name, query) else {
                continue;
            };
            // The entitlement is resolved per search, not baked into the
            // cache: custom emojis the platform would reject (foreign guild
            // without premium, or unavailable) fall back to a sized image
            // URL.
            let insert = match &candidate.insert {
                Insert::Glyph(glyph) => glyph.clone(),
                Insert::Custom {
                    markup,
                    fallback,
                    available,
                } => {
                    if *available && (premium || candidate.from_current_guild) {
                        markup.clone()
                    } else {
                        fallback.clone()
                    }
                }
            };
            scored.push((
                score,
                candidate.from_current_guild,
                Completion {
                    display: format!(":{}:", candidate.name),
                    detail: candidate.detail.clone(),
                    insert,
                    score,
                },
            ));
        }
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        if !premium {
            // Stable partition: current-guild emojis first, score order kept
            // within each half.
            scored.sort_by_key(|(_, from_current, _)| !*from_current);
        }
        scored
            .into_iter()
            .take(max_results)
            .map(|(_, _, completion)| completion)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::application::services::testing::FakeCabinet;
    use crate::domain::entities::{ChannelId, EmojiId, GuildEmoji, PremiumTier};
    use crate::runtime::CancelToken;

    fn guild_emoji(id: u64, guild: u64, name: &str) -> GuildEmoji {
        GuildEmoji {
            id: EmojiId(id),
            guild_id: GuildId(guild),
            name: name.into(),
            animated: false,
            available: true,
        }
    }

    fn ctx(cabinet: Arc<FakeCabinet>, premium: PremiumTier, now: Instant) -> SearchContext {
        SearchContext {
            cabinet,
            guild_id: Some(GuildId(1)),
            channel_id: ChannelId(10),
            premium,
            now,
            deadline: now + Duration::from_secs(1),
            cancel: CancelToken::new(),
        }
    }

    #[test]
    fn test_unicode_match() {
        let cabinet = Arc::new(FakeCabinet::new());
        let mut source = EmojiSource::new(Duration::from_secs(60), 15);
        let results = source.search(&ctx(cabinet, PremiumTier::None, Instant::now()), "tada");

        assert!(results.iter().any(|c| c.insert == "🎉"));
        assert!(results.len() <= 15);
    }

    #[test]
    fn test_non_premium_partitions_current_guild_first() {
        let cabinet = Arc::new(FakeCabinet::new());
        cabinet.add_emoji(guild_emoji(100, 2, "blobcat"));
        cabinet.add_emoji(guild_emoji(101, 1, "blobhome"));
        let mut source = EmojiSource::new(Duration::from_secs(60), 15);

        let results = source.search(
            &ctx(Arc::clone(&cabinet), PremiumTier::None, Instant::now()),
            "blob",
        );
        assert_eq!(results[0].display, ":blobhome:");
        // Foreign emoji without premium inserts the image URL fallback.
        let foreign = results
            .iter()
            .find(|c| c.display == ":blobcat:")
            .expect("foreign emoji present");
        assert!(foreign.insert.starts_with("https://"));
    }

    #[test]
    fn test_premium_inserts_markup_for_foreign_guild() {
        let cabinet = Arc::new(FakeCabinet::new());
        cabinet.add_emoji(guild_emoji(100, 2, "blobcat"));
        let mut source = EmojiSource::new(Duration::from_secs(60), 15);

        let results = source.search(
            &ctx(cabinet, PremiumTier::Nitro, Instant::now()),
            "blobcat",
        );
        assert_eq!(results[0].insert, "<:blobcat:100>");
    }

    #[test]
    fn test_entitlement_change_applies_within_ttl() {
        let cabinet = Arc::new(FakeCabinet::new());
        cabinet.add_emoji(guild_emoji(100, 2, "blobcat"));
        let mut source = EmojiSource::new(Duration::from_secs(60), 15);
        let t0 = Instant::now();

        let free = source.search(
            &ctx(Arc::clone(&cabinet), PremiumTier::None, t0),
            "blobcat",
        );
        assert!(free[0].insert.starts_with("https://"));

        // Upgraded within the cache TTL: the cached candidate must not pin
        // the fallback form.
        let upgraded = source.search(
            &ctx(cabinet, PremiumTier::Nitro, t0 + Duration::from_secs(1)),
            "blobcat",
        );
        assert_eq!(upgraded[0].insert, "<:blobcat:100>");
    }

    #[test]
    fn test_cache_expires_after_ttl() {
        let cabinet = Arc::new(FakeCabinet::new());
        let mut source = EmojiSource::new(Duration::from_secs(60), 15);
        let t0 = Instant::now();

        let before = source.search(
            &ctx(Arc::clone(&cabinet), PremiumTier::None, t0),
            "blobnew",
        );
        assert!(before.is_empty());

        // Added after the cache was built: invisible within the TTL.
        cabinet.add_emoji(guild_emoji(100, 1, "blobnew"));
        let cached = source.search(
            &ctx(Arc::clone(&cabinet), PremiumTier::None, t0 + Duration::from_secs(30)),
            "blobnew",
        );
        assert!(cached.is_empty());

        let refreshed = source.search(
            &ctx(cabinet, PremiumTier::None, t0 + Duration::from_secs(61)),
            "blobnew",
        );
        assert_eq!(refreshed.len(), 1);
    }

    #[test]
    fn test_prefix_monotonicity() {
        let cabinet = Arc::new(FakeCabinet::new());
        let mut source = EmojiSource::new(Duration::from_secs(60), 200);
        let now = Instant::now();

        let wide: Vec<String> = source
            .search(&ctx(Arc::clone(&cabinet), PremiumTier::None, now), "he")
            .into_iter()
            .map(|c| c.display)
            .collect();
        let narrow = source.search(&ctx(cabinet, PremiumTier::None, now), "heart");
        for completion in narrow {
            assert!(wide.contains(&completion.display));
        }
    }
}
