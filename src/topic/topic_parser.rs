//! Topic tokenizers
//!
//! [`parse_filter`] accepts subscription filters, which may contain the `+`
//! and `#` wildcards. [`parse_name`] accepts concrete topic names used for
//! publishing and rejects any wildcard. Both split on `/` and keep empty
//! levels, so `"a/b/"` yields a trailing empty literal and is distinct from
//! `"a/b"`.

use std::convert::TryFrom;
use std::fmt;

use arcstr::{ArcStr, Substr};
use smallvec::SmallVec;

use super::error::limits::{
	LEVEL_SEPARATOR, MULTI_LEVEL_WILDCARD, SINGLE_LEVEL_WILDCARD,
};
use super::error::{InvalidTopicReason, TopicError, TopicResult};
use super::topic_token::TopicToken;

pub(crate) type Tokens = SmallVec<[TopicToken; 8]>;
pub(crate) type Levels = SmallVec<[Substr; 8]>;

/// Parsed subscription filter
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TopicFilter {
	filter: ArcStr,
	tokens: Tokens,
	has_wildcard: bool,
}

impl TopicFilter {
	/// Parses a subscription filter.
	pub fn parse(filter: impl Into<ArcStr>) -> TopicResult<Self> {
		let filter = filter.into();
		let bytes = filter.as_bytes();
		if bytes.is_empty() {
			return Err(TopicError::invalid_topic_name(
				&filter,
				InvalidTopicReason::Empty,
			));
		}

		let last = bytes.len() - 1;
		let mut tokens = Tokens::new();
		let mut has_wildcard = false;
		let mut from = 0;
		let mut i = 0;
		while i < bytes.len() {
			match bytes[i] {
				| 0 => {
					return Err(TopicError::invalid_topic_name(
						&filter,
						InvalidTopicReason::NulCharacter { position: i },
					));
				}
				| MULTI_LEVEL_WILDCARD => {
					if i != last || (i != 0 && bytes[i - 1] != LEVEL_SEPARATOR)
					{
						return Err(TopicError::invalid_topic_name(
							&filter,
							InvalidTopicReason::MisplacedMultiLevel {
								position: i,
							},
						));
					}
					tokens.push(TopicToken::MultiLevel);
					return Ok(Self {
						filter,
						tokens,
						has_wildcard: true,
					});
				}
				| SINGLE_LEVEL_WILDCARD => {
					if (i != last && bytes[i + 1] != LEVEL_SEPARATOR)
						|| (i != 0 && bytes[i - 1] != LEVEL_SEPARATOR)
					{
						return Err(TopicError::invalid_topic_name(
							&filter,
							InvalidTopicReason::MisplacedSingleLevel {
								position: i,
							},
						));
					}
					tokens.push(TopicToken::SingleLevel);
					has_wildcard = true;
					// the separator after '+' is consumed with it
					i += 2;
					from = i;
					continue;
				}
				| LEVEL_SEPARATOR => {
					tokens.push(TopicToken::Literal(filter.substr(from .. i)));
					from = i + 1;
				}
				| _ => {}
			}
			i += 1;
		}
		if from < bytes.len() || bytes[last] == LEVEL_SEPARATOR {
			tokens.push(TopicToken::Literal(filter.substr(from ..)));
		}

		Ok(Self {
			filter,
			tokens,
			has_wildcard,
		})
	}

	/// Returns the filter text as it was parsed.
	pub fn as_str(&self) -> &str {
		&self.filter
	}

	/// Returns the filter text as a shared string.
	pub fn filter(&self) -> ArcStr {
		self.filter.clone()
	}

	/// Returns the level tokens in order.
	pub fn tokens(&self) -> &[TopicToken] {
		&self.tokens
	}

	/// Returns true if any token is a wildcard.
	pub fn has_wildcard(&self) -> bool {
		self.has_wildcard
	}

	/// Returns the number of levels.
	pub fn len(&self) -> usize {
		self.tokens.len()
	}

	/// Always false for a successfully parsed filter.
	pub fn is_empty(&self) -> bool {
		self.tokens.is_empty()
	}
}

impl fmt::Display for TopicFilter {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.filter)
	}
}

impl TryFrom<&str> for TopicFilter {
	type Error = TopicError;

	fn try_from(value: &str) -> Result<Self, Self::Error> {
		Self::parse(value)
	}
}

impl TryFrom<String> for TopicFilter {
	type Error = TopicError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		Self::parse(value)
	}
}

impl TryFrom<ArcStr> for TopicFilter {
	type Error = TopicError;

	fn try_from(value: ArcStr) -> Result<Self, Self::Error> {
		Self::parse(value)
	}
}

/// Parsed concrete topic name, free of wildcards
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TopicName {
	name: ArcStr,
	levels: Levels,
}

impl TopicName {
	/// Parses a topic name used for publishing.
	pub fn parse(name: impl Into<ArcStr>) -> TopicResult<Self> {
		let name = name.into();
		let bytes = name.as_bytes();
		if bytes.is_empty() {
			return Err(TopicError::invalid_topic_name(
				&name,
				InvalidTopicReason::Empty,
			));
		}

		let mut levels = Levels::new();
		let mut from = 0;
		for (i, byte) in bytes.iter().enumerate() {
			match *byte {
				| 0 => {
					return Err(TopicError::invalid_topic_name(
						&name,
						InvalidTopicReason::NulCharacter { position: i },
					));
				}
				| SINGLE_LEVEL_WILDCARD | MULTI_LEVEL_WILDCARD => {
					return Err(TopicError::invalid_topic_name(
						&name,
						InvalidTopicReason::WildcardInName { position: i },
					));
				}
				| LEVEL_SEPARATOR => {
					levels.push(name.substr(from .. i));
					from = i + 1;
				}
				| _ => {}
			}
		}
		// a trailing separator leaves an empty last level
		levels.push(name.substr(from ..));

		Ok(Self { name, levels })
	}

	/// Returns the topic text as it was parsed.
	pub fn as_str(&self) -> &str {
		&self.name
	}

	/// Returns the topic text as a shared string.
	pub fn name(&self) -> ArcStr {
		self.name.clone()
	}

	/// Returns the literal levels in order.
	pub fn levels(&self) -> &[Substr] {
		&self.levels
	}

	/// Returns the number of levels.
	pub fn len(&self) -> usize {
		self.levels.len()
	}

	/// Always false for a successfully parsed name.
	pub fn is_empty(&self) -> bool {
		self.levels.is_empty()
	}
}

impl fmt::Display for TopicName {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.name)
	}
}

impl TryFrom<&str> for TopicName {
	type Error = TopicError;

	fn try_from(value: &str) -> Result<Self, Self::Error> {
		Self::parse(value)
	}
}

impl TryFrom<String> for TopicName {
	type Error = TopicError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		Self::parse(value)
	}
}

impl TryFrom<ArcStr> for TopicName {
	type Error = TopicError;

	fn try_from(value: ArcStr) -> Result<Self, Self::Error> {
		Self::parse(value)
	}
}

/// Parses a subscription filter, see [`TopicFilter::parse`].
pub fn parse_filter(filter: impl Into<ArcStr>) -> TopicResult<TopicFilter> {
	TopicFilter::parse(filter)
}

/// Parses a publish topic name, see [`TopicName::parse`].
pub fn parse_name(name: impl Into<ArcStr>) -> TopicResult<TopicName> {
	TopicName::parse(name)
}
