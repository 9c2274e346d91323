//! Error types and limits for the topic module
//!
//! Both tokenizers report every rejection as [`TopicError::InvalidTopicName`];
//! the attached [`InvalidTopicReason`] says which rule the input broke.

use thiserror::Error;

/// Why a topic name or filter was rejected
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidTopicReason {
	/// Topic names and filters must contain at least one character
	#[error("topic is empty")]
	Empty,

	/// NUL is not allowed anywhere in a topic
	#[error("NUL character at byte {position}")]
	NulCharacter {
		/// Byte offset of the offending character
		position: usize,
	},

	/// `#` must be the last character and occupy a whole level
	#[error("'#' at byte {position} is not a whole trailing level")]
	MisplacedMultiLevel {
		/// Byte offset of the offending character
		position: usize,
	},

	/// `+` must occupy a whole level
	#[error("'+' at byte {position} does not occupy a whole level")]
	MisplacedSingleLevel {
		/// Byte offset of the offending character
		position: usize,
	},

	/// Topic names used for publishing cannot contain wildcards
	#[error("wildcard at byte {position} is not allowed in a topic name")]
	WildcardInName {
		/// Byte offset of the offending character
		position: usize,
	},
}

/// Errors raised while tokenizing topic names and filters
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TopicError {
	/// The input is not a valid topic name or filter
	#[error("invalid topic name/filter '{topic}': {reason}")]
	InvalidTopicName {
		/// The rejected input, NUL characters escaped
		topic: String,
		/// The rule that was broken
		reason: InvalidTopicReason,
	},
}

impl TopicError {
	/// Creates a new InvalidTopicName error
	pub fn invalid_topic_name(
		topic: &str,
		reason: InvalidTopicReason,
	) -> Self {
		Self::InvalidTopicName {
			topic: topic.escape_debug().to_string(),
			reason,
		}
	}

	/// Returns the rule the rejected input broke
	pub fn reason(&self) -> InvalidTopicReason {
		match self {
			| Self::InvalidTopicName { reason, .. } => *reason,
		}
	}
}

/// Convenient Result type for topic operations
pub type TopicResult<T> = Result<T, TopicError>;

/// Topic processing limits and constants
pub mod limits {
	/// Level separator
	pub const LEVEL_SEPARATOR: u8 = b'/';

	/// Single-level wildcard marker
	pub const SINGLE_LEVEL_WILDCARD: u8 = b'+';

	/// Multi-level wildcard marker
	pub const MULTI_LEVEL_WILDCARD: u8 = b'#';

	/// Longest topic that fits the 2-byte length prefix of the wire format
	pub const MAX_TOPIC_LENGTH: usize = u16::MAX as usize;
}
