//! Delivery settings shared by the feeds of a topic map

use std::time::Duration;

/// What a feed does when a sink's channel is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryPolicy {
	/// Wait for room until the send timeout elapses or the publish is
	/// cancelled
	#[default]
	WaitForCapacity,
	/// Skip the full sink for this event
	DropWhenFull,
}

/// Feed-level delivery behaviour
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSettings {
	/// Backpressure policy for full sinks
	pub delivery: DeliveryPolicy,
	/// Upper bound on waiting for one full sink under
	/// [`DeliveryPolicy::WaitForCapacity`]. `None` waits until the publish
	/// is cancelled.
	pub send_timeout: Option<Duration>,
}

impl Default for FeedSettings {
	fn default() -> Self {
		Self {
			delivery: DeliveryPolicy::WaitForCapacity,
			send_timeout: None,
		}
	}
}

impl FeedSettings {
	/// Settings that skip full sinks instead of waiting
	pub fn drop_when_full() -> Self {
		Self {
			delivery: DeliveryPolicy::DropWhenFull,
			send_timeout: None,
		}
	}

	/// Sets the per-sink send timeout
	pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
		self.send_timeout = Some(timeout);
		self
	}
}
