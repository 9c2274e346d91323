//! Concurrent topic tree mapping subscription filters to feeds
//!
//! Every node carries its own lock. A creating or removing traversal holds
//! one node lock at a time, except while pruning where it locks a parent and
//! then the child being unlinked, always in that order. Matching takes read
//! locks one node at a time and never blocks creators on other branches.
//!
//! A pruned node is flagged as detached under its own write lock, and only
//! while it holds no feed and no children. Creators that land on a detached
//! node start over from the root, so a filter is only ever installed on the
//! single live path for its token sequence.

use std::collections::HashMap;
use std::sync::Arc;

use arcstr::Substr;
use parking_lot::RwLock;
use tracing::{debug, trace};

use super::topic_parser::{TopicFilter, TopicName};
use super::topic_token::TopicToken;
use crate::routing::{Feed, FeedSettings};

/// Non-terminal edge out of a node
#[derive(Debug, Clone, Copy)]
enum Branch<'a> {
	Literal(&'a Substr),
	SingleLevel,
}

impl<'a> Branch<'a> {
	/// `None` for `#`, which ends the descent in a feed slot.
	fn from_token(token: &'a TopicToken) -> Option<Self> {
		match token {
			| TopicToken::Literal(level) => Some(Branch::Literal(level)),
			| TopicToken::SingleLevel => Some(Branch::SingleLevel),
			| TopicToken::MultiLevel => None,
		}
	}
}

/// Feed slot of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FeedSlot {
	/// Filter ends exactly at this node
	Exact,
	/// Filter ends with `#` right below this node
	MultiLevel,
}

#[derive(Debug, Default)]
struct NodeState {
	/// Set once the node has been unlinked from its parent
	detached: bool,

	/// Feed for a filter that terminates at this node
	exact_feed: Option<Arc<Feed>>,

	/// Children for literal next levels
	exact_children: HashMap<Substr, Arc<TopicNode>>,

	/// Child for a `+` next level
	single_level_wildcard_node: Option<Arc<TopicNode>>,

	/// Feed for `#` as the next level. Always terminal.
	multi_level_wildcard_feed: Option<Arc<Feed>>,
}

impl NodeState {
	fn child(&self, branch: Branch<'_>) -> Option<&Arc<TopicNode>> {
		match branch {
			| Branch::Literal(level) => self.exact_children.get(level),
			| Branch::SingleLevel => self.single_level_wildcard_node.as_ref(),
		}
	}

	fn child_or_insert(&mut self, branch: Branch<'_>) -> &Arc<TopicNode> {
		match branch {
			| Branch::Literal(level) => {
				self.exact_children.entry(level.clone()).or_default()
			}
			| Branch::SingleLevel => {
				self.single_level_wildcard_node
					.get_or_insert_with(Default::default)
			}
		}
	}

	fn remove_child(&mut self, branch: Branch<'_>) {
		match branch {
			| Branch::Literal(level) => {
				self.exact_children.remove(level);
			}
			| Branch::SingleLevel => self.single_level_wildcard_node = None,
		}
	}

	fn feed(&self, slot: FeedSlot) -> &Option<Arc<Feed>> {
		match slot {
			| FeedSlot::Exact => &self.exact_feed,
			| FeedSlot::MultiLevel => &self.multi_level_wildcard_feed,
		}
	}

	fn feed_mut(&mut self, slot: FeedSlot) -> &mut Option<Arc<Feed>> {
		match slot {
			| FeedSlot::Exact => &mut self.exact_feed,
			| FeedSlot::MultiLevel => &mut self.multi_level_wildcard_feed,
		}
	}

	fn is_vacant(&self) -> bool {
		self.exact_feed.is_none()
			&& self.multi_level_wildcard_feed.is_none()
			&& self.exact_children.is_empty()
			&& self.single_level_wildcard_node.is_none()
	}
}

/// One level of the topic tree
#[derive(Debug, Default)]
struct TopicNode {
	state: RwLock<NodeState>,
}

impl TopicNode {
	fn child(&self, branch: Branch<'_>) -> Option<Arc<TopicNode>> {
		self.state.read().child(branch).cloned()
	}

	/// Returns `None` if this node was detached by a concurrent prune.
	fn get_or_create_child(&self, branch: Branch<'_>) -> Option<Arc<TopicNode>> {
		{
			let state = self.state.read();
			if state.detached {
				return None;
			}
			if let Some(child) = state.child(branch) {
				return Some(Arc::clone(child));
			}
		}
		let mut state = self.state.write();
		if state.detached {
			return None;
		}
		Some(Arc::clone(state.child_or_insert(branch)))
	}

	/// Returns `None` if this node was detached by a concurrent prune.
	fn get_or_install_feed<F>(
		&self,
		slot: FeedSlot,
		make_feed: F,
	) -> Option<(Arc<Feed>, bool)>
	where
		F: FnOnce() -> Feed,
	{
		{
			let state = self.state.read();
			if state.detached {
				return None;
			}
			if let Some(feed) = state.feed(slot) {
				return Some((Arc::clone(feed), true));
			}
		}
		let mut state = self.state.write();
		if state.detached {
			return None;
		}
		let slot = state.feed_mut(slot);
		if let Some(feed) = slot {
			return Some((Arc::clone(feed), true));
		}
		let feed = Arc::new(make_feed());
		*slot = Some(Arc::clone(&feed));
		Some((feed, false))
	}

	fn take_feed(&self, slot: FeedSlot) -> Option<Arc<Feed>> {
		self.state.write().feed_mut(slot).take()
	}

	/// Unlinks `child` if it is still linked under `branch` and is vacant.
	fn prune_child(&self, branch: Branch<'_>, child: &Arc<TopicNode>) {
		let mut state = self.state.write();
		if !state.child(branch).is_some_and(|c| Arc::ptr_eq(c, child)) {
			return;
		}
		let mut child_state = child.state.write();
		if !child_state.is_vacant() {
			return;
		}
		child_state.detached = true;
		drop(child_state);
		state.remove_child(branch);
		trace!(branch = ?branch, "Pruned vacant topic node");
	}
}

/// Concurrent index from subscription filters to their feeds.
///
/// At most one [`Feed`] exists per filter token sequence. All operations take
/// `&self` and may be called from any number of threads.
#[derive(Debug, Default)]
pub struct TopicMap {
	root: TopicNode,
	settings: FeedSettings,
}

impl TopicMap {
	/// Creates an empty map whose feeds use default settings.
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates an empty map whose feeds use `settings`.
	pub fn with_settings(settings: FeedSettings) -> Self {
		Self {
			root: TopicNode::default(),
			settings,
		}
	}

	/// Settings copied into every feed this map creates
	pub fn settings(&self) -> &FeedSettings {
		&self.settings
	}

	/// Returns the feed for `filter`, creating it if needed.
	///
	/// The flag is `true` when the feed already existed. Concurrent callers
	/// for the same filter all receive the same `Arc`, and exactly one of
	/// them sees `false`.
	pub fn init_feed(&self, filter: &TopicFilter) -> (Arc<Feed>, bool) {
		loop {
			if let Some((feed, already_existed)) = self.try_init_feed(filter) {
				if !already_existed {
					debug!(filter = %filter, "Created feed");
				}
				return (feed, already_existed);
			}
			trace!(filter = %filter, "Filter path pruned concurrently, retrying");
		}
	}

	fn try_init_feed(&self, filter: &TopicFilter) -> Option<(Arc<Feed>, bool)> {
		let make_feed = || Feed::new(filter.filter(), self.settings.clone());

		let mut node: Option<Arc<TopicNode>> = None;
		for token in filter.tokens() {
			let current = node.as_deref().unwrap_or(&self.root);
			match Branch::from_token(token) {
				| Some(branch) => {
					node = Some(current.get_or_create_child(branch)?);
				}
				| None => {
					return current
						.get_or_install_feed(FeedSlot::MultiLevel, make_feed);
				}
			}
		}
		let terminal = node.as_deref().unwrap_or(&self.root);
		terminal.get_or_install_feed(FeedSlot::Exact, make_feed)
	}

	/// Returns the feed registered for `filter` without creating anything.
	pub fn get_feed(&self, filter: &TopicFilter) -> Option<Arc<Feed>> {
		let mut node: Option<Arc<TopicNode>> = None;
		for token in filter.tokens() {
			let current = node.as_deref().unwrap_or(&self.root);
			match Branch::from_token(token) {
				| Some(branch) => node = Some(current.child(branch)?),
				| None => {
					return current
						.state
						.read()
						.feed(FeedSlot::MultiLevel)
						.clone();
				}
			}
		}
		let terminal = node.as_deref().unwrap_or(&self.root);
		let feed = terminal.state.read().feed(FeedSlot::Exact).clone();
		feed
	}

	/// Detaches and returns the feed registered for `filter`.
	///
	/// Nodes left without feeds or children are pruned on the way back up.
	/// A concurrent [`matching_feeds`](Self::matching_feeds) may still return
	/// the feed while its removal is in flight.
	pub fn remove_feed(&self, filter: &TopicFilter) -> Option<Arc<Feed>> {
		let removed = Self::remove_from(&self.root, filter.tokens());
		if removed.is_some() {
			debug!(filter = %filter, "Removed feed");
		}
		removed
	}

	fn remove_from(node: &TopicNode, tokens: &[TopicToken]) -> Option<Arc<Feed>> {
		let Some((token, rest)) = tokens.split_first() else {
			return node.take_feed(FeedSlot::Exact);
		};
		let Some(branch) = Branch::from_token(token) else {
			return node.take_feed(FeedSlot::MultiLevel);
		};
		let child = node.child(branch)?;
		let removed = Self::remove_from(&child, rest);
		if removed.is_some() {
			node.prune_child(branch, &child);
		}
		removed
	}

	/// Collects every feed whose filter matches `topic`.
	///
	/// The result holds no duplicates and has no particular order.
	pub fn matching_feeds(&self, topic: &TopicName) -> Vec<Arc<Feed>> {
		let mut feeds = Vec::new();
		Self::collect_matching(&self.root, topic.levels(), &mut feeds);
		trace!(topic = %topic, matched = feeds.len(), "Matched feeds");
		feeds
	}

	fn collect_matching(
		node: &TopicNode,
		levels: &[Substr],
		feeds: &mut Vec<Arc<Feed>>,
	) {
		let (literal_child, wildcard_child) = {
			let state = node.state.read();
			// '#' matches whatever is left, including nothing
			if let Some(feed) = &state.multi_level_wildcard_feed {
				feeds.push(Arc::clone(feed));
			}
			match levels.first() {
				| None => {
					if let Some(feed) = &state.exact_feed {
						feeds.push(Arc::clone(feed));
					}
					return;
				}
				| Some(level) => (
					state.exact_children.get(level).cloned(),
					state.single_level_wildcard_node.clone(),
				),
			}
		};

		let rest = &levels[1 ..];
		if let Some(child) = literal_child {
			Self::collect_matching(&child, rest, feeds);
		}
		if let Some(child) = wildcard_child {
			Self::collect_matching(&child, rest, feeds);
		}
	}

	/// Returns true if no feed is registered and every node has been pruned.
	pub fn is_empty(&self) -> bool {
		self.root.state.read().is_vacant()
	}

	#[cfg(test)]
	fn collect_filters_internal(
		node: &TopicNode,
		current_path: &mut Vec<TopicToken>,
		result: &mut Vec<String>,
	) {
		use super::topic_token::render_tokens;

		let state = node.state.read();
		if state.exact_feed.is_some() {
			result.push(render_tokens(current_path));
		}
		if state.multi_level_wildcard_feed.is_some() {
			current_path.push(TopicToken::MultiLevel);
			result.push(render_tokens(current_path));
			current_path.pop();
		}
		if let Some(plus_node) = &state.single_level_wildcard_node {
			current_path.push(TopicToken::SingleLevel);
			Self::collect_filters_internal(plus_node, current_path, result);
			current_path.pop();
		}
		for (level, child) in &state.exact_children {
			current_path.push(TopicToken::Literal(level.clone()));
			Self::collect_filters_internal(child, current_path, result);
			current_path.pop();
		}
	}

	/// Renders every registered filter, sorted.
	#[cfg(test)]
	pub(crate) fn collect_filters(&self) -> Vec<String> {
		let mut result = Vec::new();
		Self::collect_filters_internal(&self.root, &mut Vec::new(), &mut result);
		result.sort();
		result
	}
}
