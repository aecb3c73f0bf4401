//! Sorted channel tree for one guild with unread propagation.

use std::cell::Cell;
use std::cmp::Ordering;
use std::collections::HashMap;

use tracing::{debug, warn};

use crate::domain::entities::{Channel, ChannelId, GuildId, MessageId, UnreadIndication};
use crate::domain::ports::Event;

/// One displayed child of a tree level.
#[derive(Debug, Clone, Copy)]
pub struct ChildRef<'a> {
    /// The channel at this position.
    pub channel: &'a Channel,
    /// Aggregated unread indication, children included.
    pub unread: UnreadIndication,
}

struct Node {
    channel: Channel,
    self_unread: UnreadIndication,
    mention_count: u32,
    // None marks the aggregate dirty; unread() recomputes and refills it.
    aggregate: Cell<Option<UnreadIndication>>,
}

impl Node {
    fn new(channel: Channel) -> Self {
        Self {
            channel,
            self_unread: UnreadIndication::Read,
            mention_count: 0,
            aggregate: Cell::new(None),
        }
    }
}

/// Projects a guild's flat channel set into a sorted, category-parented
/// tree.
///
/// Category nodes sit at depth 0, their channels at depth 1, and threads
/// at depth 2 under thread-capable parents. Channels whose parent has not
/// arrived yet park in a pending bucket and are adopted when it does.
/// Unread indications aggregate upward by `max`, recomputed lazily on read.
pub struct ChannelTreeModel {
    guild_id: GuildId,
    nodes: HashMap<ChannelId, Node>,
    children: HashMap<Option<ChannelId>, Vec<ChannelId>>,
    pending: HashMap<ChannelId, Vec<Channel>>,
}

impl ChannelTreeModel {
    /// Creates an empty tree for one guild.
    #[must_use]
    pub fn new(guild_id: GuildId) -> Self {
        Self {
            guild_id,
            nodes: HashMap::new(),
            children: HashMap::new(),
            pending: HashMap::new(),
        }
    }

    /// Returns the guild this tree belongs to.
    #[must_use]
    pub const fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    /// Returns the number of channels in the tree, pending ones excluded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns whether the tree holds no channels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Discards the tree and rebuilds it from a snapshot. Snapshot order
    /// does not matter; children arriving before their parent park until it
    /// shows up.
    pub fn rebuild(&mut self, channels: Vec<Channel>) {
        self.nodes.clear();
        self.children.clear();
        self.pending.clear();
        for channel in channels {
            self.upsert(channel);
        }
    }

    /// Inserts or updates one channel, reparenting it if `parent_id`
    /// changed. Kinds the sidebar never shows are dropped.
    pub fn upsert(&mut self, channel: Channel) {
        if !Self::admits(&channel) {
            debug!(id = %channel.id(), kind = ?channel.kind(), "kind not shown in tree, dropping");
            return;
        }
        if let Some(parent_id) = channel.parent_id() {
            match self.nodes.get(&parent_id) {
                None => {
                    debug!(id = %channel.id(), parent = %parent_id, "parent not yet known, parking");
                    // A live node moving to an unknown parent leaves the
                    // tree; its own children park under its id meanwhile.
                    if self.nodes.contains_key(&channel.id()) {
                        self.remove(channel.id());
                    }
                    let bucket = self.pending.entry(parent_id).or_default();
                    bucket.retain(|c| c.id() != channel.id());
                    bucket.push(channel);
                    return;
                }
                Some(parent) if !parent.channel.kind().allows_children() => {
                    warn!(
                        id = %channel.id(),
                        parent = %parent_id,
                        parent_kind = ?parent.channel.kind(),
                        "parent kind does not permit children, dropping"
                    );
                    return;
                }
                Some(parent)
                    if channel.kind().is_thread()
                        && !parent.channel.kind().allows_threads() =>
                {
                    warn!(
                        id = %channel.id(),
                        parent = %parent_id,
                        "thread under non-threadable parent, dropping"
                    );
                    return;
                }
                Some(_) => {}
            }
        }

        let id = channel.id();
        let parent = channel.parent_id();
        if let Some(existing) = self.nodes.get_mut(&id) {
            let old_parent = existing.channel.parent_id();
            existing.channel = channel;
            if old_parent != parent {
                self.detach(id, old_parent);
                self.attach(id, parent);
                self.invalidate_chain(old_parent);
            } else {
                self.resort(parent);
            }
        } else {
            self.nodes.insert(id, Node::new(channel));
            self.attach(id, parent);
        }
        self.invalidate_chain(parent);
        self.adopt_pending(id);
    }

    /// Removes a channel. Its children move to the pending bucket so a
    /// later re-insert of the parent restores them.
    pub fn remove(&mut self, id: ChannelId) {
        let Some(node) = self.nodes.remove(&id) else {
            return;
        };
        let parent = node.channel.parent_id();
        self.detach(id, parent);
        // Stale park entries for this id are superseded by the live children.
        self.pending.remove(&id);
        if let Some(child_ids) = self.children.remove(&Some(id)) {
            for child_id in child_ids {
                if let Some(child) = self.nodes.remove(&child_id) {
                    self.pending.entry(id).or_default().push(child.channel);
                }
            }
        }
        self.invalidate_chain(parent);
    }

    /// Returns the channel for an id, if present.
    #[must_use]
    pub fn channel(&self, id: ChannelId) -> Option<&Channel> {
        self.nodes.get(&id).map(|n| &n.channel)
    }

    /// Returns the aggregated unread indication of a node: the max of its
    /// own state and every descendant's. Unknown ids read as Read.
    #[must_use]
    pub fn unread(&self, id: ChannelId) -> UnreadIndication {
        let Some(node) = self.nodes.get(&id) else {
            return UnreadIndication::Read;
        };
        if let Some(cached) = node.aggregate.get() {
            return cached;
        }
        let mut aggregate = node.self_unread;
        if let Some(child_ids) = self.children.get(&Some(id)) {
            for child_id in child_ids {
                aggregate = aggregate.max(self.unread(*child_id));
            }
        }
        node.aggregate.set(Some(aggregate));
        aggregate
    }

    /// Returns the node's own mention count, children excluded.
    #[must_use]
    pub fn mention_count(&self, id: ChannelId) -> u32 {
        self.nodes.get(&id).map_or(0, |n| n.mention_count)
    }

    /// Sets a node's own unread level and invalidates the cached aggregate
    /// of every ancestor. Unknown ids are ignored.
    pub fn mark_unread(&mut self, id: ChannelId, level: UnreadIndication) {
        let Some(node) = self.nodes.get_mut(&id) else {
            debug!(%id, "mark_unread for unknown channel, ignoring");
            return;
        };
        node.self_unread = level;
        node.aggregate.set(None);
        if level == UnreadIndication::Read {
            node.mention_count = 0;
        }
        let parent = node.channel.parent_id();
        self.invalidate_chain(parent);
    }

    /// Returns the children of `parent` in display order. `None` yields the
    /// root level, non-categorized channels first, then categories.
    pub fn iter(&self, parent: Option<ChannelId>) -> impl Iterator<Item = ChildRef<'_>> + '_ {
        self.children
            .get(&parent)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .filter_map(|id| {
                self.nodes.get(id).map(|node| ChildRef {
                    channel: &node.channel,
                    unread: self.unread(*id),
                })
            })
    }

    /// Applies one gateway event to the tree. Events for other guilds and
    /// variants the tree does not track are ignored.
    pub fn handle_event(&mut self, event: &Event) {
        if event.guild_id().is_some_and(|g| g != self.guild_id) {
            return;
        }
        match event {
            Event::ChannelCreate { channel }
            | Event::ChannelUpdate { channel }
            | Event::ThreadCreate { channel }
            | Event::ThreadUpdate { channel } => self.upsert(channel.clone()),
            Event::ChannelDelete { channel_id, .. }
            | Event::ThreadDelete { channel_id, .. } => self.remove(*channel_id),
            Event::ThreadListSync { threads, .. } => {
                for thread in threads {
                    self.upsert(thread.clone());
                }
            }
            Event::MessageCreate { message, .. } => {
                self.note_activity(message.channel_id(), message.id());
            }
            Event::ReadStateUpdate { read_state } => {
                let last = self
                    .nodes
                    .get(&read_state.channel_id)
                    .and_then(|n| n.channel.last_message_id());
                let level = read_state.indication(last);
                self.mark_unread(read_state.channel_id, level);
                if let Some(node) = self.nodes.get_mut(&read_state.channel_id) {
                    node.mention_count = read_state.mention_count;
                }
            }
            _ => {}
        }
    }

    /// Records the latest message of a channel, keeping thread siblings
    /// sorted by activity.
    fn note_activity(&mut self, id: ChannelId, message_id: MessageId) {
        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };
        node.channel.set_last_message_id(message_id);
        if node.channel.kind().is_thread() {
            let parent = node.channel.parent_id();
            self.resort(parent);
        }
    }

    fn admits(channel: &Channel) -> bool {
        let kind = channel.kind();
        kind.is_category() || kind.is_thread() || kind.is_voice() || kind.allows_children()
    }

    fn attach(&mut self, id: ChannelId, parent: Option<ChannelId>) {
        let siblings = self.children.entry(parent).or_default();
        siblings.push(id);
        self.resort(parent);
    }

    fn detach(&mut self, id: ChannelId, parent: Option<ChannelId>) {
        if let Some(siblings) = self.children.get_mut(&parent) {
            siblings.retain(|c| *c != id);
        }
    }

    fn resort(&mut self, parent: Option<ChannelId>) {
        let Some(siblings) = self.children.get(&parent) else {
            return;
        };
        let mut sorted = siblings.clone();
        sorted.sort_by(|a, b| {
            match (self.nodes.get(a), self.nodes.get(b)) {
                (Some(a), Some(b)) => Self::sibling_order(&a.channel, &b.channel),
                _ => Ordering::Equal,
            }
        });
        self.children.insert(parent, sorted);
    }

    /// Display order among siblings: threads by last activity descending;
    /// otherwise non-categories before categories, then `(position, id)`
    /// ascending.
    fn sibling_order(a: &Channel, b: &Channel) -> Ordering {
        if a.kind().is_thread() && b.kind().is_thread() {
            return b
                .last_message_id()
                .cmp(&a.last_message_id())
                .then_with(|| b.id().cmp(&a.id()));
        }
        a.kind()
            .is_category()
            .cmp(&b.kind().is_category())
            .then_with(|| a.position().cmp(&b.position()))
            .then_with(|| a.id().cmp(&b.id()))
    }

    fn invalidate_chain(&self, mut parent: Option<ChannelId>) {
        while let Some(id) = parent {
            let Some(node) = self.nodes.get(&id) else {
                break;
            };
            node.aggregate.set(None);
            parent = node.channel.parent_id();
        }
    }

    fn adopt_pending(&mut self, parent_id: ChannelId) {
        let Some(parked) = self.pending.remove(&parent_id) else {
            return;
        };
        debug!(parent = %parent_id, adopted = parked.len(), "adopting parked children");
        for child in parked {
            self.upsert(child);
        }
    }
}
