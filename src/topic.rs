//! Topic handling module
//!
//! This module provides the tokenizers for topic names and subscription
//! filters, and the concurrent topic map that resolves filters to feeds and
//! published topics to every matching feed.

// Submodules
pub mod error;
pub mod topic_map;
pub mod topic_parser;
pub mod topic_token;


// Re-export commonly used types for convenience
pub use error::{limits, InvalidTopicReason, TopicError, TopicResult};
pub use topic_map::TopicMap;
pub use topic_parser::{parse_filter, parse_name, TopicFilter, TopicName};
pub use topic_token::{render_tokens, TopicToken};
