use thiserror::Error;

/// The only way a tokenizer fails: the underlying stream has no more lines.
///
/// Raised only after the last sentence end marker has been delivered.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TokenizerError {
	#[error("token stream exhausted")]
	Exhausted,
}

#[derive(Debug, Error)]
pub enum MarkovError {
	#[error("order must be between 1 and {max}, got {0}", max = crate::model::chain::MAX_ORDER)]
	InvalidOrder(usize),

	#[error("order mismatch: expected {expected}, found {found}")]
	OrderMismatch { expected: usize, found: usize },

	#[error("candidate count must be >= 1")]
	InvalidCandidates,

	#[error("corrupt model snapshot: {0}")]
	CorruptSnapshot(String),

	#[error("generation exceeded {0} tokens without reaching a sentence end")]
	GenerationLimit(usize),

	#[error("training worker panicked")]
	WorkerPanicked,

	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	Codec(#[from] postcard::Error),
}
