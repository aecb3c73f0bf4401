//! Model services.

/// Composer autocomplete engine and sources.
pub mod autocomplete;
/// Guild channel tree.
pub mod channel_tree;
/// Composer state machine.
pub mod composer;
/// Per-channel message view.
pub mod message_view;

#[cfg(test)]
pub(crate) mod testing;

pub use autocomplete::AutocompleteEngine;
pub use channel_tree::ChannelTreeModel;
pub use composer::Composer;
pub use message_view::MessageView;
