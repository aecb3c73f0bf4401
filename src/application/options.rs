//! Typed configuration accepted by the models.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration knobs recognised by the message view, composer,
/// autocomplete engine, and channel tree. Durations are stored as integer
/// seconds or milliseconds so the struct round-trips through plain JSON.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CoreOptions {
    /// Render messages from blocked authors instead of dropping them.
    #[serde(default)]
    pub show_blocked_messages: bool,
    /// Replace deleted rows with a redacted placeholder instead of
    /// removing them.
    #[serde(default)]
    pub redact_messages: bool,
    /// Require confirmation before deleting a message.
    #[serde(default = "default_true")]
    pub ask_before_delete: bool,
    /// Batch size for explicit history pagination.
    #[serde(default = "default_load_more_batch")]
    pub load_more_batch: u8,
    /// Number of messages fetched on initial load.
    #[serde(default = "default_initial_batch")]
    pub initial_batch: u8,
    /// Soft cap on retained rows while anchored to bottom.
    #[serde(default = "default_ideal_max_rows")]
    pub ideal_max_rows: usize,
    /// Maximum author/time gap for collapsing adjacent rows, in seconds.
    #[serde(default = "default_collapse_window_secs")]
    pub collapse_window_secs: u64,
    /// Seconds after which an unrefreshed typing entry expires.
    #[serde(default = "default_typing_timeout_secs")]
    pub typing_timeout_secs: u64,
    /// TTL of the autocomplete emoji cache, in seconds.
    #[serde(default = "default_emoji_cache_ttl_secs")]
    pub emoji_cache_ttl_secs: u64,
    /// TTL of the autocomplete member cache, in seconds.
    #[serde(default = "default_member_cache_ttl_secs")]
    pub member_cache_ttl_secs: u64,
    /// Maximum results returned by an autocomplete search.
    #[serde(default = "default_autocomplete_max_results")]
    pub autocomplete_max_results: usize,
    /// Autocomplete debounce, in milliseconds (one typing interval).
    #[serde(default = "default_autocomplete_debounce_ms")]
    pub autocomplete_debounce_ms: u64,
}

fn default_true() -> bool {
    true
}

fn default_load_more_batch() -> u8 {
    50
}

fn default_initial_batch() -> u8 {
    15
}

fn default_ideal_max_rows() -> usize {
    50
}

fn default_collapse_window_secs() -> u64 {
    600
}

fn default_typing_timeout_secs() -> u64 {
    10
}

fn default_emoji_cache_ttl_secs() -> u64 {
    60
}

fn default_member_cache_ttl_secs() -> u64 {
    15
}

fn default_autocomplete_max_results() -> usize {
    15
}

fn default_autocomplete_debounce_ms() -> u64 {
    250
}

impl Default for CoreOptions {
    fn default() -> Self {
        Self {
            show_blocked_messages: false,
            redact_messages: false,
            ask_before_delete: true,
            load_more_batch: default_load_more_batch(),
            initial_batch: default_initial_batch(),
            ideal_max_rows: default_ideal_max_rows(),
            collapse_window_secs: default_collapse_window_secs(),
            typing_timeout_secs: default_typing_timeout_secs(),
            emoji_cache_ttl_secs: default_emoji_cache_ttl_secs(),
            member_cache_ttl_secs: default_member_cache_ttl_secs(),
            autocomplete_max_results: default_autocomplete_max_results(),
            autocomplete_debounce_ms: default_autocomplete_debounce_ms(),
        }
    }
}

impl CoreOptions {
    /// Returns the collapse window as a duration.
    #[must_use]
    pub const fn collapse_window(&self) -> Duration {
        Duration::from_secs(self.collapse_window_secs)
    }

    /// Returns the typing expiry as a duration.
    #[must_use]
    pub const fn typing_timeout(&self) -> Duration {
        Duration::from_secs(self.typing_timeout_secs)
    }

    /// Returns the emoji cache TTL as a duration.
    #[must_use]
    pub const fn emoji_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.emoji_cache_ttl_secs)
    }

    /// Returns the member cache TTL as a duration.
    #[must_use]
    pub const fn member_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.member_cache_ttl_secs)
    }

    /// Returns the autocomplete debounce as a duration.
    #[must_use]
    pub const fn autocomplete_debounce(&self) -> Duration {
        Duration::from_millis(self.autocomplete_debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = CoreOptions::default();
        assert!(!options.show_blocked_messages);
        assert!(!options.redact_messages);
        assert!(options.ask_before_delete);
        assert_eq!(options.load_more_batch, 50);
        assert_eq!(options.initial_batch, 15);
        assert_eq!(options.ideal_max_rows, 50);
        assert_eq!(options.collapse_window(), Duration::from_secs(600));
        assert_eq!(options.typing_timeout(), Duration::from_secs(10));
        assert_eq!(options.autocomplete_max_results, 15);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let options: CoreOptions =
            serde_json::from_str(r#"{"redact_messages": true, "initial_batch": 30}"#)
                .expect("valid options");
        assert!(options.redact_messages);
        assert_eq!(options.initial_batch, 30);
        assert_eq!(options.load_more_batch, 50);
        assert!(options.ask_before_delete);
    }
}
