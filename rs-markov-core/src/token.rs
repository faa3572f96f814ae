use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;

use serde::{Deserialize, Serialize};

/// Kind of a token.
///
/// Variant order is part of the persisted snapshot layout
/// (0 = sentence start, 1 = sentence end, 2 = word) and must not change.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenType {
	SentenceStart,
	SentenceEnd,
	Word,
}

impl fmt::Display for TokenType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			TokenType::SentenceStart => "SentenceStartType",
			TokenType::SentenceEnd => "SentenceEndType",
			TokenType::Word => "WordType",
		};
		f.write_str(name)
	}
}

/// A single unit of a sentence.
///
/// Sentence markers carry an empty value. Two tokens are equal when both
/// their type and their value match.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Token {
	kind: TokenType,
	value: String,
}

impl Token {
	/// Creates a sentence start marker.
	pub fn sentence_start() -> Self {
		Self { kind: TokenType::SentenceStart, value: String::new() }
	}

	/// Creates a sentence end marker.
	pub fn sentence_end() -> Self {
		Self { kind: TokenType::SentenceEnd, value: String::new() }
	}

	/// Creates a word token.
	pub fn word(value: impl Into<String>) -> Self {
		Self { kind: TokenType::Word, value: value.into() }
	}

	/// Returns the token's kind.
	pub fn kind(&self) -> TokenType {
		self.kind
	}

	/// Returns the text payload (empty for sentence markers).
	pub fn value(&self) -> &str {
		&self.value
	}

	/// True for the sentence end marker.
	pub fn is_sentence_end(&self) -> bool {
		self.kind == TokenType::SentenceEnd
	}
}

impl fmt::Display for Token {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.kind {
			TokenType::Word => write!(f, "[{}] {:?}", self.kind, self.value),
			_ => write!(f, "[{}]", self.kind),
		}
	}
}

/// An ordered sequence of tokens.
///
/// The `Display` form is the canonical text rendering: token values joined
/// with single spaces, surrounding whitespace trimmed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Sentence(Vec<Token>);

impl Sentence {
	pub fn new() -> Self {
		Self(Vec::new())
	}

	pub fn with_capacity(capacity: usize) -> Self {
		Self(Vec::with_capacity(capacity))
	}

	pub fn push(&mut self, token: Token) {
		self.0.push(token);
	}

	/// Returns the last `n` tokens (or all of them if the sentence is shorter).
	pub fn tail(&self, n: usize) -> &[Token] {
		&self.0[self.0.len().saturating_sub(n)..]
	}
}

impl Deref for Sentence {
	type Target = [Token];

	fn deref(&self) -> &[Token] {
		&self.0
	}
}

impl From<Vec<Token>> for Sentence {
	fn from(tokens: Vec<Token>) -> Self {
		Self(tokens)
	}
}

impl FromIterator<Token> for Sentence {
	fn from_iter<I: IntoIterator<Item = Token>>(iter: I) -> Self {
		Self(iter.into_iter().collect())
	}
}

impl fmt::Display for Sentence {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let joined = self.0.iter().map(Token::value).collect::<Vec<_>>().join(" ");
		f.write_str(joined.trim())
	}
}

/// Structural key addressing the transition table: exactly `order` tokens.
///
/// Hashes and compares like the underlying token slice, so the table can be
/// queried with a borrowed `&[Token]` window without allocating.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ContextKey(Vec<Token>);

impl ContextKey {
	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

impl From<&[Token]> for ContextKey {
	fn from(window: &[Token]) -> Self {
		Self(window.to_vec())
	}
}

impl Borrow<[Token]> for ContextKey {
	fn borrow(&self) -> &[Token] {
		&self.0
	}
}

/// Type-qualified rendering joined with `|`, for diagnostics only.
impl fmt::Display for ContextKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for (i, token) in self.0.iter().enumerate() {
			if i > 0 {
				f.write_str("|")?;
			}
			write!(f, "{token}")?;
		}
		Ok(())
	}
}
