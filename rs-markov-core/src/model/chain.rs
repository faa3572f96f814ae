use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::MarkovError;
use crate::token::{ContextKey, Token};
use crate::tokenizer::Tokenizer;

/// Largest supported context width.
pub const MAX_ORDER: usize = 32;

/// Transition table of a Markov model, and its persisted snapshot.
///
/// Maps each context of exactly `order` tokens to every successor observed
/// after it, in observation order. Successor lists are not deduplicated:
/// a token's multiplicity is its empirical frequency.
///
/// ## Invariants
/// - `1 <= order <= MAX_ORDER`, fixed at construction
/// - Every key holds exactly `order` tokens
/// - Every successor list is non-empty
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Chain {
	order: usize,
	transitions: HashMap<ContextKey, Vec<Token>>,
}

impl Chain {
	pub(crate) fn new(order: usize) -> Result<Self, MarkovError> {
		if order == 0 || order > MAX_ORDER {
			return Err(MarkovError::InvalidOrder(order));
		}
		Ok(Self { order, transitions: HashMap::new() })
	}

	/// Builds a chain from corpus lines, one sentence per line.
	pub(crate) fn from_lines(order: usize, lines: &[String]) -> Result<Self, MarkovError> {
		let mut chain = Self::new(order)?;
		let mut text = lines.join("\n");
		text.push('\n');
		for sentence in Tokenizer::from_text(&text, order)? {
			chain.train(&sentence);
		}
		Ok(chain)
	}

	/// Context width of every key.
	pub fn order(&self) -> usize {
		self.order
	}

	/// Number of distinct contexts.
	pub fn len(&self) -> usize {
		self.transitions.len()
	}

	pub fn is_empty(&self) -> bool {
		self.transitions.is_empty()
	}

	/// Observed successors of a context window of exactly `order` tokens.
	pub fn successors(&self, window: &[Token]) -> Option<&[Token]> {
		self.transitions.get(window).map(Vec::as_slice)
	}

	pub(crate) fn insert(&mut self, key: ContextKey, successor: Token) {
		self.transitions.entry(key).or_default().push(successor);
	}

	/// Records every (`order` tokens, next token) window of `tokens`.
	pub(crate) fn train(&mut self, tokens: &[Token]) {
		let Some(width) = self.order.checked_add(1) else {
			return;
		};
		if tokens.len() < width {
			return;
		}
		for window in tokens.windows(width) {
			let (context, successor) = window.split_at(self.order);
			self.insert(ContextKey::from(context), successor[0].clone());
		}
	}

	/// Appends every successor list of `other` to the matching list here.
	///
	/// # Errors
	/// Returns an error if the orders do not match.
	pub(crate) fn merge(&mut self, other: &Self) -> Result<(), MarkovError> {
		if self.order != other.order {
			return Err(MarkovError::OrderMismatch { expected: self.order, found: other.order });
		}
		for (key, successors) in &other.transitions {
			self.transitions.entry(key.clone()).or_default().extend(successors.iter().cloned());
		}
		Ok(())
	}

	/// Checks the invariants of a chain decoded from an untrusted snapshot.
	pub(crate) fn validate(&self) -> Result<(), MarkovError> {
		if self.order == 0 || self.order > MAX_ORDER {
			return Err(MarkovError::CorruptSnapshot(format!(
				"order {} outside 1..={MAX_ORDER}",
				self.order
			)));
		}
		for (key, successors) in &self.transitions {
			if key.len() != self.order {
				return Err(MarkovError::CorruptSnapshot(format!(
					"context {key} has {} tokens, expected {}",
					key.len(),
					self.order
				)));
			}
			if successors.is_empty() {
				return Err(MarkovError::CorruptSnapshot(format!("context {key} has no successors")));
			}
		}
		Ok(())
	}
}
