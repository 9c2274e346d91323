//! # MQTT Topic Feeds
//!
//! Topic matching and subscription registry core for MQTT-style brokers.
//!
//! ## Features
//!
//! - **Exact tokenizers**: Separate parsing for subscription filters (with
//!   `+` and `#`) and publish topic names (wildcards rejected)
//! - **Concurrent topic map**: Per-node locking, one feed per filter no matter
//!   how many callers race to create it
//! - **Wildcard matching**: Cost follows the explored branches, not the number
//!   of registered filters
//! - **Fan-out with cancellation**: Feeds deliver to `tokio` channels and stop
//!   as soon as a `CancellationToken` fires
//! - **Wire strings**: 2-byte length-prefixed string codec
//!
//! ## Quick Start
//!
//! ```rust
//! use mqtt_topic_feeds::{FeedRouter, PublishEvent};
//! use tokio::sync::mpsc;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let router = FeedRouter::new();
//!     let (sink, mut events) = mpsc::channel::<PublishEvent>(16);
//!
//!     router.subscribe("sensors/+/temperature", sink.clone())?;
//!     router.subscribe("sensors/#", sink.clone())?;
//!
//!     let cancel = CancellationToken::new();
//!     let sent = router
//!         .publish(&cancel, "sensors/kitchen/temperature", "21.5")
//!         .await?;
//!     assert_eq!(sent, 2);
//!
//!     let event = events.recv().await.unwrap();
//!     assert_eq!(event.topic(), "sensors/kitchen/temperature");
//!     Ok(())
//! }
//! ```
//!
//! ## Pattern Matching
//!
//! - `+` matches exactly one level (e.g., `sensors/+/temperature`)
//! - `#` matches zero or more trailing levels (e.g., `sensors/#` also matches
//!   `sensors`)
//! - A trailing `/` adds an empty level, so `a/b/` and `a/b` are different
//!   filters
//!
//! ## Lower-level API
//!
//! ```rust
//! use mqtt_topic_feeds::{TopicFilter, TopicMap, TopicName};
//!
//! let map = TopicMap::new();
//! let filter = TopicFilter::parse("foo/+/quz").unwrap();
//! let (feed, already_existed) = map.init_feed(&filter);
//! assert!(!already_existed);
//!
//! let topic = TopicName::parse("foo/bar/quz").unwrap();
//! let matched = map.matching_feeds(&topic);
//! assert!(std::sync::Arc::ptr_eq(&matched[0], &feed));
//! ```

#![warn(missing_docs)]

pub mod codec;
pub mod routing;
pub mod topic;

// === Core Public API ===
pub use codec::{CodecError, CodecResult};
pub use routing::{
	DeliveryPolicy, Feed, FeedRouter, FeedSettings, PublishEvent, Sink,
	SubscribeOutcome,
};
pub use topic::{
	parse_filter, parse_name, InvalidTopicReason, TopicError, TopicFilter,
	TopicMap, TopicName, TopicResult, TopicToken,
};

/// Prelude module for convenient imports
///
/// ```rust
/// use mqtt_topic_feeds::prelude::*;
/// ```
pub mod prelude {
	pub use tokio_util::sync::CancellationToken;

	pub use crate::{
		Feed, FeedRouter, FeedSettings, InvalidTopicReason, PublishEvent, Sink,
		TopicError, TopicFilter, TopicMap, TopicName,
	};
}
