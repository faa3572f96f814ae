use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::thread;

use log::{debug, info, warn};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::chain::Chain;
use crate::error::MarkovError;
use crate::io::{build_output_path, get_filename, read_file};
use crate::token::{ContextKey, Sentence, Token};
use crate::tokenizer::Tokenizer;

/// Surprisal (in bits) charged for a successor never observed after a
/// trained context, in place of `-log2(0)`.
pub const UNSEEN_SUCCESSOR_SURPRISAL: f64 = 1000.0;

/// Added to the sentence length when normalizing a score so that short
/// sentences are penalized.
const SCORE_LENGTH_OFFSET: usize = 7;

/// Corpus chunks per CPU for parallel training.
const CHUNK_FACTOR: usize = 8;

/// A word-level Markov model of fixed order.
///
/// The model maps every run of `order` tokens seen during training to the
/// tokens that followed it, and uses that table to sample new sentences and
/// to score existing ones.
///
/// # Concurrency
/// Training takes `&mut self` and must finish before the model is shared.
/// Generation and scoring take `&self`; the random source sits behind a
/// lock so a model behind an `Arc` can serve several readers.
#[derive(Debug)]
pub struct Model {
	chain: Chain,
	rng: Mutex<StdRng>,
}

impl Model {
	/// Creates an empty model seeded from OS entropy.
	///
	/// # Errors
	/// Returns an error if `order` is 0 or above
	/// [`MAX_ORDER`](crate::model::chain::MAX_ORDER).
	pub fn new(order: usize) -> Result<Self, MarkovError> {
		Self::with_rng(order, StdRng::from_os_rng())
	}

	/// Creates an empty model with a deterministic random source.
	pub fn with_seed(order: usize, seed: u64) -> Result<Self, MarkovError> {
		Self::with_rng(order, StdRng::seed_from_u64(seed))
	}

	/// Creates an empty model drawing from the given random source.
	pub fn with_rng(order: usize, rng: StdRng) -> Result<Self, MarkovError> {
		Ok(Self { chain: Chain::new(order)?, rng: Mutex::new(rng) })
	}

	/// Loads a model for `corpus`, training it if no cache exists.
	///
	/// - Looks for `<corpus stem>.bin` next to the corpus and loads it
	/// - Otherwise reads the corpus lines, trains in parallel and writes the cache
	///
	/// A cache built with a different order is ignored and rebuilt.
	pub fn from_corpus_file<P: AsRef<Path>>(corpus: P, order: usize) -> Result<Self, MarkovError> {
		let cache_path = build_output_path(&corpus, "bin")?;
		let name = get_filename(&corpus)?;

		if cache_path.exists() {
			let model = Self::load(File::open(&cache_path)?)?;
			if model.order() == order {
				info!("Loaded model '{name}' ({} contexts) from {}", model.len(), cache_path.display());
				return Ok(model);
			}
			warn!(
				"Cached model '{name}' has order {}, expected {order}; retraining",
				model.order()
			);
		}

		let lines = read_file(&corpus)?;
		let mut model = Self::new(order)?;
		model.train_parallel(&lines)?;
		model.save(File::create(&cache_path)?)?;
		info!(
			"Trained model '{name}' on {} lines ({} contexts), cached to {}",
			lines.len(),
			model.len(),
			cache_path.display()
		);
		Ok(model)
	}

	/// Restores a model from a snapshot written by [`Model::save`].
	pub fn load<R: Read>(reader: R) -> Result<Self, MarkovError> {
		Self::load_with_rng(reader, StdRng::from_os_rng())
	}

	/// Restores a model from a snapshot, drawing from the given random source.
	///
	/// # Errors
	/// I/O and decode errors propagate unchanged. A snapshot whose order is
	/// outside `1..=MAX_ORDER` or whose keys are not `order` tokens wide is
	/// rejected with [`MarkovError::CorruptSnapshot`].
	pub fn load_with_rng<R: Read>(mut reader: R, rng: StdRng) -> Result<Self, MarkovError> {
		let mut bytes = Vec::new();
		reader.read_to_end(&mut bytes)?;
		let chain: Chain = postcard::from_bytes(&bytes)?;
		chain.validate()?;
		Ok(Self { chain, rng: Mutex::new(rng) })
	}

	/// Writes the order and the full transition table.
	///
	/// The random source is not part of the snapshot.
	pub fn save<W: Write>(&self, mut writer: W) -> Result<(), MarkovError> {
		let bytes = postcard::to_stdvec(&self.chain)?;
		writer.write_all(&bytes)?;
		writer.flush()?;
		Ok(())
	}

	/// Number of tokens in every context.
	pub fn order(&self) -> usize {
		self.chain.order()
	}

	/// Number of distinct contexts.
	pub fn len(&self) -> usize {
		self.chain.len()
	}

	pub fn is_empty(&self) -> bool {
		self.chain.is_empty()
	}

	/// The transition table, as persisted by [`Model::save`].
	pub fn chain(&self) -> &Chain {
		&self.chain
	}

	/// Observed successors of `window`, duplicates included.
	///
	/// Returns `None` if the context was never trained on.
	pub fn successors(&self, window: &[Token]) -> Option<&[Token]> {
		self.chain.successors(window)
	}

	/// Appends `successor` to the list observed after `key`.
	pub fn insert(&mut self, key: ContextKey, successor: Token) {
		self.chain.insert(key, successor);
	}

	/// Records every (`order` tokens, next token) pair of a sentence.
	///
	/// Sentences shorter than `order + 1` tokens contribute nothing.
	pub fn train(&mut self, sentence: &[Token]) {
		self.chain.train(sentence);
	}

	/// Trains on every remaining sentence of a tokenizer.
	///
	/// Returns the number of sentences consumed.
	pub fn train_all<R: Read>(&mut self, tokenizer: &mut Tokenizer<R>) -> usize {
		let mut count = 0;
		for sentence in tokenizer {
			self.chain.train(&sentence);
			count += 1;
		}
		debug!("Trained on {count} sentences, {} contexts", self.len());
		count
	}

	/// Trains on corpus lines (one sentence per line) using scoped workers.
	///
	/// Lines are split into `cpus * 8` chunks, each chunk is trained into a
	/// partial chain, and the partial chains are merged back in chunk order,
	/// so the result is identical to training the lines sequentially.
	pub fn train_parallel(&mut self, lines: &[String]) -> Result<(), MarkovError> {
		if lines.is_empty() {
			return Ok(());
		}
		let chunks = num_cpus::get() * CHUNK_FACTOR;
		let chunk_size = lines.len().div_ceil(chunks);
		let order = self.order();

		let partials = thread::scope(|scope| {
			let handles: Vec<_> = lines
				.chunks(chunk_size)
				.map(|chunk| scope.spawn(move || Chain::from_lines(order, chunk)))
				.collect();
			debug!("Spawned {} training workers", handles.len());

			handles
				.into_iter()
				.map(|handle| handle.join().map_err(|_| MarkovError::WorkerPanicked).and_then(|partial| partial))
				.collect::<Result<Vec<_>, _>>()
		})?;

		for partial in &partials {
			self.chain.merge(partial)?;
		}
		Ok(())
	}

	/// Merges another model's transitions into this one.
	///
	/// # Errors
	/// Returns an error if the orders do not match.
	pub fn merge(&mut self, other: &Self) -> Result<(), MarkovError> {
		self.chain.merge(&other.chain)
	}

	/// Samples the token following the last `order` tokens of `prefix`.
	///
	/// An unknown context yields a sentence end marker rather than an error.
	/// Otherwise every stored successor is equally likely, so frequent
	/// successors win proportionally more often.
	pub fn next(&self, prefix: &[Token]) -> Token {
		if prefix.len() < self.order() {
			return Token::sentence_end();
		}
		let window = &prefix[prefix.len() - self.order()..];
		match self.chain.successors(window) {
			Some(successors) if !successors.is_empty() => {
				let index = self.rng.lock().random_range(0..successors.len());
				successors[index].clone()
			}
			_ => Token::sentence_end(),
		}
	}

	fn seed(&self) -> Sentence {
		std::iter::repeat_with(Token::sentence_start).take(self.order()).collect()
	}

	/// Generates a sentence starting from `order` sentence start markers.
	///
	/// The result always ends with exactly one sentence end marker.
	///
	/// # Notes
	/// Does not terminate if the chain reachable from the start context
	/// contains a cycle with no path to a sentence end. Use
	/// [`Model::generate_within`] when a hard bound is needed.
	pub fn generate(&self) -> Sentence {
		let mut sentence = self.seed();
		loop {
			let next = self.next(&sentence);
			let end = next.is_sentence_end();
			sentence.push(next);
			if end {
				return sentence;
			}
		}
	}

	/// Like [`Model::generate`], but gives up once the sentence (start
	/// markers included) reaches `max_len` tokens without ending.
	pub fn generate_within(&self, max_len: usize) -> Result<Sentence, MarkovError> {
		let mut sentence = self.seed();
		while sentence.len() < max_len {
			let next = self.next(&sentence);
			let end = next.is_sentence_end();
			sentence.push(next);
			if end {
				return Ok(sentence);
			}
		}
		Err(MarkovError::GenerationLimit(max_len))
	}

	/// Length-normalized surprisal of a sentence under this model.
	///
	/// For each window of `order` tokens followed by a successor, adds
	/// `-log2(count(successor) / len(successors))`. Untrained contexts add 0,
	/// an untrained successor of a trained context adds
	/// [`UNSEEN_SUCCESSOR_SURPRISAL`]. The sum is divided by `len + 7`.
	pub fn score(&self, sentence: &[Token]) -> f64 {
		let order = self.order();
		let Some(width) = order.checked_add(1) else {
			return 0.0;
		};
		let total: f64 = sentence
			.windows(width)
			.map(|window| {
				let (context, successor) = window.split_at(order);
				self.surprisal(context, &successor[0])
			})
			.sum();
		total / (sentence.len() + SCORE_LENGTH_OFFSET) as f64
	}

	fn surprisal(&self, context: &[Token], successor: &Token) -> f64 {
		let Some(successors) = self.chain.successors(context) else {
			return 0.0;
		};
		let count = successors.iter().filter(|t| *t == successor).count();
		if count == 0 {
			return UNSEEN_SUCCESSOR_SURPRISAL;
		}
		-(count as f64 / successors.len() as f64).log2()
	}

	/// Generates `n` sentences and returns the highest scoring one.
	///
	/// Ties go to the most recently generated candidate. Returns an empty
	/// sentence when `n` is 0.
	pub fn generate_n(&self, n: usize) -> Sentence {
		self.best_of(n, None).unwrap_or_default()
	}

	/// Best-of-`n` selection over candidates, optionally bounded in length.
	///
	/// Candidates hitting `max_len` are dropped. Returns `None` when no
	/// candidate survives.
	pub(crate) fn best_of(&self, n: usize, max_len: Option<usize>) -> Option<Sentence> {
		if n == 0 {
			warn!("Best-of selection requested with 0 candidates");
			return None;
		}
		let scored = (0..n)
			.filter_map(|_| match max_len {
				None => Some(self.generate()),
				Some(limit) => match self.generate_within(limit) {
					Ok(sentence) => Some(sentence),
					Err(e) => {
						debug!("Dropping candidate: {e}");
						None
					}
				},
			})
			.map(|candidate| (self.score(&candidate), candidate));
		pick_best(scored)
	}
}

/// Keeps the highest scoring candidate; a later candidate replaces the
/// current best when its score is greater or equal.
fn pick_best<I>(scored: I) -> Option<Sentence>
where
	I: IntoIterator<Item = (f64, Sentence)>,
{
	scored
		.into_iter()
		.fold(None, |best: Option<(f64, Sentence)>, (score, candidate)| match best {
			Some((best_score, _)) if score < best_score => best,
			_ => Some((score, candidate)),
		})
		.map(|(_, sentence)| sentence)
}
