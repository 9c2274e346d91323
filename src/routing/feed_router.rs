//! Subscribe / unsubscribe / publish entry points for a session layer
//!
//! [`FeedRouter`] strings the tokenizers, the topic map and the feeds
//! together the way a protocol layer drives them: filters are parsed and
//! resolved to a feed that the connection's sink joins, publishes are parsed
//! as topic names and fanned out to every matching feed.

use std::sync::Arc;

use bytes::Bytes;
use futures::stream::FuturesUnordered;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::feed::{Feed, Sink, SubscribeOutcome};
use super::publish_event::PublishEvent;
use super::settings::FeedSettings;
use crate::topic::{TopicFilter, TopicMap, TopicName, TopicResult};

/// Topic map plus the subscribe/unsubscribe/publish flow around it
#[derive(Debug, Default)]
pub struct FeedRouter {
	topic_map: TopicMap,
}

impl FeedRouter {
	/// Creates a router whose feeds use default settings.
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a router whose feeds use `settings`.
	pub fn with_settings(settings: FeedSettings) -> Self {
		Self {
			topic_map: TopicMap::with_settings(settings),
		}
	}

	/// Underlying topic map
	///
	/// Feeds removed directly through it skip the router's retirement step.
	pub fn topic_map(&self) -> &TopicMap {
		&self.topic_map
	}

	/// Attaches `sink` to the feed for `filter`, creating the feed if needed.
	pub fn subscribe(&self, filter: &str, sink: Sink) -> TopicResult<Arc<Feed>> {
		let filter = TopicFilter::parse(filter)?;
		Ok(self.attach(&filter, sink))
	}

	fn attach(&self, filter: &TopicFilter, sink: Sink) -> Arc<Feed> {
		loop {
			let (feed, already_existed) = self.topic_map.init_feed(filter);
			match feed.subscribe(sink.clone()) {
				| SubscribeOutcome::Subscribed
				| SubscribeOutcome::AlreadySubscribed => {
					debug!(
						filter = %filter,
						new_feed = !already_existed,
						subscribers = feed.subscriber_count(),
						"Sink attached to feed"
					);
					return feed;
				}
				// Retired but not yet unlinked. The releaser unlinks it right
				// after retiring, with no await in between, so this spin is
				// bounded by one map removal.
				| SubscribeOutcome::Retired => std::thread::yield_now(),
			}
		}
	}

	/// Detaches `sink` from the feed for `filter`.
	///
	/// The feed is removed from the topic map once its last sink leaves,
	/// either here or when a publish evicts its last closed sink.
	/// Returns false if the sink was not subscribed to that filter.
	pub fn unsubscribe(&self, filter: &str, sink: &Sink) -> TopicResult<bool> {
		let filter = TopicFilter::parse(filter)?;
		let Some(feed) = self.topic_map.get_feed(&filter) else {
			return Ok(false);
		};
		let removed = feed.unsubscribe(sink);
		if feed.is_empty() {
			self.release_if_empty(&filter, &feed);
		}
		Ok(removed)
	}

	fn release_if_empty(&self, filter: &TopicFilter, feed: &Feed) {
		// only the caller that retires the feed unlinks it
		if !feed.retire_if_empty() {
			return;
		}
		if self.topic_map.remove_feed(filter).is_some() {
			debug!(filter = %filter, "Released feed without subscribers");
		}
	}

	/// Publishes `payload` under `topic` to every matching feed.
	///
	/// Feeds are served concurrently. Returns the total number of sinks that
	/// accepted the event.
	pub async fn publish(
		&self,
		cancel: &CancellationToken,
		topic: &str,
		payload: impl Into<Bytes>,
	) -> TopicResult<usize> {
		let topic = TopicName::parse(topic)?;
		let event = PublishEvent::for_topic(&topic, payload);
		Ok(self.publish_event(cancel, &topic, event).await)
	}

	/// Publishes an already built event to the feeds matching `topic`.
	pub async fn publish_event(
		&self,
		cancel: &CancellationToken,
		topic: &TopicName,
		event: PublishEvent,
	) -> usize {
		let feeds = self.topic_map.matching_feeds(topic);
		let mut deliveries: FuturesUnordered<_> = feeds
			.iter()
			.map(|feed| {
				let event = event.clone();
				async move { (feed, feed.fan_out(cancel, event).await) }
			})
			.collect();

		let mut sent = 0;
		while let Some((feed, fan_out)) = deliveries.next().await {
			sent += fan_out.sent;
			if fan_out.emptied {
				self.release_evicted(feed);
			}
		}
		debug!(topic = %topic, feeds = feeds.len(), sent, "Published event");
		sent
	}

	/// Releases a feed whose last sink was evicted during a publish.
	fn release_evicted(&self, feed: &Feed) {
		match TopicFilter::parse(feed.filter()) {
			| Ok(filter) => self.release_if_empty(&filter, feed),
			| Err(err) => {
				warn!(
					filter = feed.filter(),
					error = %err,
					"Feed filter does not parse, feed left in place"
				);
			}
		}
	}
}
