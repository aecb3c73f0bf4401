//! `/`-triggered command completion, recognised at buffer start only.

use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use super::source::{Completion, SearchContext, Source};

struct Command {
    name: &'static str,
    description: &'static str,
    insert: &'static str,
}

/// Built-in text commands. The composer replaces the whole buffer with the
/// insertion text on commit.
const COMMANDS: &[Command] = &[
    Command {
        name: "shrug",
        description: "Appends ¯\\_(ツ)_/¯ to your message.",
        insert: "¯\\_(ツ)_/¯",
    },
    Command {
        name: "tableflip",
        description: "Appends (╯°□°)╯︵ ┻━┻ to your message.",
        insert: "(╯°□°)╯︵ ┻━┻",
    },
    Command {
        name: "unflip",
        description: "Appends ┬─┬ノ( º _ ºノ) to your message.",
        insert: "┬─┬ノ( º _ ºノ)",
    },
    Command {
        name: "me",
        description: "Displays text with emphasis.",
        insert: "*",
    },
    Command {
        name: "spoiler",
        description: "Marks your message as a spoiler.",
        insert: "||",
    },
];

/// Command completion over the static registry.
pub struct CommandSource {
    matcher: SkimMatcherV2,
    max_results: usize,
}

impl CommandSource {
    /// Creates a command source with the given result cap.
    #[must_use]
    pub fn new(max_results: usize) -> Self {
        Self {
            matcher: SkimMatcherV2::default(),
            max_results,
        }
    }
}

impl Source for CommandSource {
    fn trigger(&self) -> char {
        '/'
    }

    fn anchor_to_start(&self) -> bool {
        true
    }

    fn search(&mut self, _ctx: &SearchContext, query: &str) -> Vec<Completion> {
        let mut results: Vec<Completion> = COMMANDS
            .iter()
            .filter_map(|command| {
                let score = self.matcher.fuzzy_match(command.name, query)?;
                Some(Completion {
                    display: format!("/{}", command.name),
                    detail: Some(command.description.to_string()),
                    insert: command.insert.to_string(),
                    score,
                })
            })
            .collect();
        results.sort_by(|a, b| b.score.cmp(&a.score));
        results.truncate(self.max_results);
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use crate::application::services::testing::FakeCabinet;
    use crate::domain::entities::{ChannelId, PremiumTier};
    use crate::runtime::CancelToken;

    #[test]
    fn test_shrug_lookup() {
        let now = Instant::now();
        let ctx = SearchContext {
            cabinet: Arc::new(FakeCabinet::new()),
            guild_id: None,
            channel_id: ChannelId(1),
            premium: PremiumTier::None,
            now,
            deadline: now + Duration::from_secs(1),
            cancel: CancelToken::new(),
        };
        let mut source = CommandSource::new(15);

        let results = source.search(&ctx, "shr");
        assert_eq!(results[0].display, "/shrug");
        assert!(source.anchor_to_start());
    }
}
