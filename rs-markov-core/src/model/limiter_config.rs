use crate::error::MarkovError;

/// Refresh parameters of a [`Limiter`](super::limiter::Limiter).
///
/// # Invariants
/// - `candidates >= 1`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LimiterConfig {
	/// Number of sentences generated per refresh; the best one is cached.
	candidates: usize,

	/// Optional hard bound on each candidate's token count (start markers
	/// included). Candidates that reach it are discarded. `None` generates
	/// without bound.
	pub max_len: Option<usize>,
}

impl LimiterConfig {
	/// Creates a configuration with `candidates` sentences per refresh.
	///
	/// # Errors
	/// Returns an error if `candidates` is 0.
	pub fn new(candidates: usize) -> Result<Self, MarkovError> {
		let mut config = Self::default();
		config.set_candidates(candidates)?;
		Ok(config)
	}

	/// Returns the number of sentences generated per refresh.
	pub fn candidates(&self) -> usize {
		self.candidates
	}

	/// Sets the number of sentences generated per refresh.
	///
	/// # Errors
	/// Returns an error if `candidates` is 0; the previous value is kept.
	pub fn set_candidates(&mut self, candidates: usize) -> Result<(), MarkovError> {
		if candidates == 0 {
			return Err(MarkovError::InvalidCandidates);
		}
		self.candidates = candidates;
		Ok(())
	}

	/// Bounds each candidate to `max_len` tokens, start markers included.
	pub fn with_max_len(mut self, max_len: usize) -> Self {
		self.max_len = Some(max_len);
		self
	}
}

impl Default for LimiterConfig {
	fn default() -> Self {
		Self { candidates: 100, max_len: None }
	}
}
