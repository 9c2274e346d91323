//! Level tokens produced by the topic tokenizers

use arcstr::Substr;

/// One level of a topic filter: literal text or a wildcard
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TopicToken {
	/// Literal level text, possibly empty
	Literal(Substr),
	/// Single-level wildcard `+`
	SingleLevel,
	/// Multi-level wildcard `#`, always the last token of a filter
	MultiLevel,
}

impl TopicToken {
	/// Returns the level value. Wildcards render as their marker.
	pub fn as_str(&self) -> &str {
		match self {
			| TopicToken::Literal(s) => s,
			| TopicToken::SingleLevel => "+",
			| TopicToken::MultiLevel => "#",
		}
	}
}

impl std::fmt::Display for TopicToken {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Joins token values with the level separator.
pub fn render_tokens(tokens: &[TopicToken]) -> String {
	let capacity = tokens.iter().map(|t| t.as_str().len() + 1).sum();
	let mut rendered = String::with_capacity(capacity);
	for (i, token) in tokens.iter().enumerate() {
		if i > 0 {
			rendered.push('/');
		}
		rendered.push_str(token.as_str());
	}
	rendered
}
