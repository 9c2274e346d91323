//! Per-filter subscriber registry and fan-out delivery

use arcstr::ArcStr;
use parking_lot::RwLock;
use smallvec::SmallVec;
use tokio::sync::mpsc::error::{SendTimeoutError, TrySendError};
use tokio::sync::mpsc::Sender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::publish_event::PublishEvent;
use super::settings::{DeliveryPolicy, FeedSettings};

/// Consumer end a feed delivers events into
pub type Sink = Sender<PublishEvent>;

/// Result of [`Feed::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeOutcome {
	/// The sink was added
	Subscribed,
	/// The sink was already registered; nothing changed
	AlreadySubscribed,
	/// The feed lost its last sink and is being removed from its topic map.
	/// It accepts no sinks. Look the filter up again.
	Retired,
}

/// Result of one fan-out pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FanOut {
	pub(crate) sent: usize,
	/// Closed sinks were evicted and none is left
	pub(crate) emptied: bool,
}

#[derive(Debug)]
enum Delivery {
	Sent,
	Dropped,
	Closed,
	Cancelled,
}

#[derive(Debug, Default)]
struct SinkSet {
	sinks: Vec<Sink>,
	retired: bool,
}

/// Subscriber sinks registered for one exact filter.
///
/// A sink is identified by its channel, so subscribing a clone of an already
/// registered sender is a no-op.
///
/// # Backpressure
///
/// With [`DeliveryPolicy::WaitForCapacity`] a full sink is awaited until it
/// has room, the configured send timeout elapses (the event is dropped for
/// that sink) or the cancellation token fires (delivery stops). With
/// [`DeliveryPolicy::DropWhenFull`] a full sink simply misses the event.
/// A token that is already cancelled never blocks.
#[derive(Debug)]
pub struct Feed {
	filter: ArcStr,
	settings: FeedSettings,
	sinks: RwLock<SinkSet>,
}

impl Feed {
	/// Creates a feed without subscribers for `filter`.
	pub fn new(filter: impl Into<ArcStr>, settings: FeedSettings) -> Self {
		Self {
			filter: filter.into(),
			settings,
			sinks: RwLock::new(SinkSet::default()),
		}
	}

	/// Filter this feed was created for
	pub fn filter(&self) -> &str {
		&self.filter
	}

	/// Delivery settings inherited from the topic map
	pub fn settings(&self) -> &FeedSettings {
		&self.settings
	}

	/// Registers a sink.
	pub fn subscribe(&self, sink: Sink) -> SubscribeOutcome {
		let mut set = self.sinks.write();
		if set.retired {
			return SubscribeOutcome::Retired;
		}
		if set.sinks.iter().any(|s| s.same_channel(&sink)) {
			return SubscribeOutcome::AlreadySubscribed;
		}
		set.sinks.push(sink);
		SubscribeOutcome::Subscribed
	}

	/// Removes a sink. Returns false if it was not registered.
	pub fn unsubscribe(&self, sink: &Sink) -> bool {
		let mut set = self.sinks.write();
		let before = set.sinks.len();
		set.sinks.retain(|s| !s.same_channel(sink));
		set.sinks.len() != before
	}

	/// Number of registered sinks
	pub fn subscriber_count(&self) -> usize {
		self.sinks.read().sinks.len()
	}

	/// Returns true if no sink is registered.
	pub fn is_empty(&self) -> bool {
		self.sinks.read().sinks.is_empty()
	}

	/// Refuses further subscriptions if no sink is registered.
	///
	/// Returns false, leaving the feed usable, when a sink is present.
	pub(crate) fn retire_if_empty(&self) -> bool {
		let mut set = self.sinks.write();
		if !set.sinks.is_empty() {
			return false;
		}
		let newly_retired = !set.retired;
		set.retired = true;
		newly_retired
	}

	/// Delivers `event` to a snapshot of the registered sinks.
	///
	/// Returns how many sinks accepted the event. Once `cancel` fires no
	/// further sink is tried. Sinks whose receiver was dropped are removed.
	pub async fn publish(
		&self,
		cancel: &CancellationToken,
		event: PublishEvent,
	) -> usize {
		self.fan_out(cancel, event).await.sent
	}

	/// [`publish`](Self::publish) that also reports whether evicting closed
	/// sinks left the feed without any.
	pub(crate) async fn fan_out(
		&self,
		cancel: &CancellationToken,
		event: PublishEvent,
	) -> FanOut {
		let sinks = self.sinks.read().sinks.clone();
		let mut sent = 0;
		let mut closed: SmallVec<[Sink; 2]> = SmallVec::new();

		for sink in &sinks {
			if cancel.is_cancelled() {
				break;
			}
			match self.deliver(cancel, sink, event.clone()).await {
				| Delivery::Sent => sent += 1,
				| Delivery::Dropped => {}
				| Delivery::Closed => closed.push(sink.clone()),
				| Delivery::Cancelled => break,
			}
		}
		if cancel.is_cancelled() {
			debug!(
				filter = %self.filter,
				topic = %event.topic(),
				sent,
				subscribers = sinks.len(),
				"Publish cancelled"
			);
		}

		let mut emptied = false;
		if !closed.is_empty() {
			let mut set = self.sinks.write();
			set.sinks.retain(|s| !closed.iter().any(|c| c.same_channel(s)));
			emptied = set.sinks.is_empty();
			drop(set);
			debug!(
				filter = %self.filter,
				closed = closed.len(),
				emptied,
				"Removed sinks with dropped receivers"
			);
		}
		FanOut { sent, emptied }
	}

	async fn deliver(
		&self,
		cancel: &CancellationToken,
		sink: &Sink,
		event: PublishEvent,
	) -> Delivery {
		let event = match sink.try_send(event) {
			| Ok(()) => return Delivery::Sent,
			| Err(TrySendError::Closed(_)) => return Delivery::Closed,
			| Err(TrySendError::Full(event)) => event,
		};

		if self.settings.delivery == DeliveryPolicy::DropWhenFull {
			warn!(
				filter = %self.filter,
				topic = %event.topic(),
				"Sink is full, event dropped"
			);
			return Delivery::Dropped;
		}

		match self.settings.send_timeout {
			| Some(timeout) => {
				tokio::select! {
					biased;
					_ = cancel.cancelled() => Delivery::Cancelled,
					res = sink.send_timeout(event, timeout) => match res {
						| Ok(()) => Delivery::Sent,
						| Err(SendTimeoutError::Closed(_)) => Delivery::Closed,
						| Err(SendTimeoutError::Timeout(event)) => {
							warn!(
								filter = %self.filter,
								topic = %event.topic(),
								timeout = ?timeout,
								"Send timeout for sink, event dropped"
							);
							Delivery::Dropped
						}
					},
				}
			}
			| None => {
				tokio::select! {
					biased;
					_ = cancel.cancelled() => Delivery::Cancelled,
					res = sink.send(event) => match res {
						| Ok(()) => Delivery::Sent,
						| Err(_) => Delivery::Closed,
					},
				}
			}
		}
	}
}
