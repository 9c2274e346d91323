//! Feed registry and event fan-out
//!
//! This module holds the per-filter [`Feed`] with its subscriber sinks, the
//! [`PublishEvent`] envelope delivered to them, and the [`FeedRouter`] that
//! drives subscribe/unsubscribe/publish on top of a topic map.

pub mod feed;
pub mod feed_router;
pub mod publish_event;
pub mod settings;


// Re-export commonly used types for convenience
pub use feed::{Feed, Sink, SubscribeOutcome};
pub use feed_router::FeedRouter;
pub use publish_event::PublishEvent;
pub use settings::{DeliveryPolicy, FeedSettings};
