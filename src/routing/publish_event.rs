#![allow(missing_docs)]

use arcstr::ArcStr;
use bytes::Bytes;

use crate::topic::TopicName;

/// Message handed to every sink of every matching feed.
///
/// Immutable once built. Cloning only bumps reference counts, so all sinks
/// share the same topic and payload buffers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishEvent {
	topic: ArcStr,
	payload: Bytes,
}

impl PublishEvent {
	pub fn new(topic: impl Into<ArcStr>, payload: impl Into<Bytes>) -> Self {
		Self {
			topic: topic.into(),
			payload: payload.into(),
		}
	}

	pub fn for_topic(topic: &TopicName, payload: impl Into<Bytes>) -> Self {
		Self::new(topic.name(), payload)
	}

	/// Concrete topic the event was published under
	pub fn topic(&self) -> &str {
		&self.topic
	}

	pub fn payload(&self) -> &Bytes {
		&self.payload
	}
}
