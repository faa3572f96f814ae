use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use log::{debug, warn};
use parking_lot::RwLock;

use super::limiter_config::LimiterConfig;
use super::markov_model::Model;
use crate::token::Sentence;

/// Anything able to produce a best-of-N sentence.
///
/// Implemented by [`Model`]; the limiter only depends on this seam.
pub trait SentenceSource: Send + Sync + 'static {
	/// Generates `candidates` sentences and returns the best one, or `None`
	/// if no candidate could be produced within `max_len`.
	fn best_of(&self, candidates: usize, max_len: Option<usize>) -> Option<Sentence>;
}

impl SentenceSource for Model {
	fn best_of(&self, candidates: usize, max_len: Option<usize>) -> Option<Sentence> {
		Model::best_of(self, candidates, max_len)
	}
}

impl<S: SentenceSource> SentenceSource for Arc<S> {
	fn best_of(&self, candidates: usize, max_len: Option<usize>) -> Option<Sentence> {
		S::best_of(self, candidates, max_len)
	}
}

/// Non-blocking cache in front of a sentence source.
///
/// [`Limiter::get`] always answers from the cache immediately. When no
/// refresh is running it also starts one on a background thread; calls made
/// while a refresh is running do not start another. A refresh always runs to
/// completion and then swaps the cached sentence.
///
/// Cloning a limiter shares the same cache and refresh gate.
pub struct Limiter<S: SentenceSource = Model> {
	shared: Arc<Shared<S>>,
}

struct Shared<S> {
	source: S,
	config: LimiterConfig,
	cached: RwLock<Arc<Sentence>>,
	/// Single-slot admission gate: true while a refresh is in flight.
	refreshing: AtomicBool,
}

/// Reopens the gate when a refresh finishes, even by unwinding.
struct GateRelease<'a>(&'a AtomicBool);

impl Drop for GateRelease<'_> {
	fn drop(&mut self) {
		self.0.store(false, Ordering::Release);
	}
}

impl<S: SentenceSource> Shared<S> {
	fn generate(&self) -> Option<Sentence> {
		self.source.best_of(self.config.candidates(), self.config.max_len)
	}

	fn refresh(&self) {
		let _release = GateRelease(&self.refreshing);
		match self.generate() {
			Some(sentence) => {
				debug!("Refreshed cached sentence ({} tokens)", sentence.len());
				*self.cached.write() = Arc::new(sentence);
			}
			None => warn!("Refresh produced no sentence, keeping previous one"),
		}
	}
}

impl<S: SentenceSource> Limiter<S> {
	/// Wraps `source`, filling the cache synchronously with one best-of-N
	/// generation so the first [`Limiter::get`] has something to return.
	pub fn new(source: S, config: LimiterConfig) -> Self {
		let shared = Shared {
			source,
			config,
			cached: RwLock::new(Arc::new(Sentence::new())),
			refreshing: AtomicBool::new(false),
		};
		match shared.generate() {
			Some(sentence) => *shared.cached.write() = Arc::new(sentence),
			None => warn!("Initial generation produced no sentence, starting empty"),
		}
		Self { shared: Arc::new(shared) }
	}

	/// Returns the cached sentence without waiting, starting a background
	/// refresh unless one is already running.
	pub fn get(&self) -> Arc<Sentence> {
		let current = self.peek();
		self.try_refresh();
		current
	}

	/// [`Limiter::get`] rendered as plain text.
	pub fn get_text(&self) -> String {
		self.get().to_string()
	}

	/// Returns the cached sentence without triggering a refresh.
	pub fn peek(&self) -> Arc<Sentence> {
		Arc::clone(&self.shared.cached.read())
	}

	/// True while a background refresh is running.
	pub fn refresh_in_progress(&self) -> bool {
		self.shared.refreshing.load(Ordering::Acquire)
	}

	/// Returns the wrapped sentence source.
	pub fn source(&self) -> &S {
		&self.shared.source
	}

	fn try_refresh(&self) {
		if self
			.shared
			.refreshing
			.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
			.is_err()
		{
			return;
		}

		let shared = Arc::clone(&self.shared);
		let spawned = thread::Builder::new()
			.name("markov-refresh".to_owned())
			.spawn(move || shared.refresh());
		if let Err(e) = spawned {
			warn!("Failed to start refresh thread: {e}");
			self.shared.refreshing.store(false, Ordering::Release);
		}
	}
}

impl<S: SentenceSource> Clone for Limiter<S> {
	fn clone(&self) -> Self {
		Self { shared: Arc::clone(&self.shared) }
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::token::Token;
	use crate::tokenizer::Tokenizer;
	use std::sync::Mutex;
	use std::sync::atomic::AtomicUsize;
	use std::sync::mpsc::{self, Receiver, Sender};
	use std::time::{Duration, Instant};

	/// Answers the first call at once; every later call waits for a release
	/// signal. Call `k` returns the single word `s<k>`.
	struct GatedSource {
		calls: AtomicUsize,
		release: Mutex<Receiver<()>>,
	}

	impl GatedSource {
		fn new() -> (Self, Sender<()>) {
			let (tx, rx) = mpsc::channel();
			(Self { calls: AtomicUsize::new(0), release: Mutex::new(rx) }, tx)
		}
	}

	impl SentenceSource for GatedSource {
		fn best_of(&self, _candidates: usize, _max_len: Option<usize>) -> Option<Sentence> {
			let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
			if call > 1 {
				let _ = self.release.lock().unwrap().recv_timeout(Duration::from_secs(10));
			}
			Some(vec![Token::sentence_start(), Token::word(format!("s{call}")), Token::sentence_end()].into())
		}
	}

	fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
		let deadline = Instant::now() + Duration::from_secs(10);
		while Instant::now() < deadline {
			if condition() {
				return true;
			}
			thread::sleep(Duration::from_millis(5));
		}
		false
	}

	#[test]
	fn cache_is_seeded_at_construction() {
		let (source, _tx) = GatedSource::new();
		let limiter = Limiter::new(source, LimiterConfig::new(1).unwrap());
		assert_eq!(limiter.peek().to_string(), "s1");
		assert!(!limiter.refresh_in_progress());
	}

	#[test]
	fn get_does_not_wait_and_coalesces_refreshes() {
		let (source, release) = GatedSource::new();
		let limiter = Limiter::new(source, LimiterConfig::new(1).unwrap());

		let started = Instant::now();
		let first = limiter.get();
		let second = limiter.get();
		assert!(started.elapsed() < Duration::from_secs(1));

		assert_eq!(first.to_string(), "s1");
		assert_eq!(first, second);
		assert!(limiter.refresh_in_progress());

		release.send(()).unwrap();
		assert!(wait_until(|| limiter.peek().to_string() == "s2"));
		assert!(wait_until(|| !limiter.refresh_in_progress()));

		// Two gets, one refresh.
		assert_eq!(limiter.source().calls.load(Ordering::SeqCst), 2);
	}

	#[test]
	fn clones_share_the_gate() {
		let (source, release) = GatedSource::new();
		let limiter = Limiter::new(source, LimiterConfig::new(1).unwrap());
		let other = limiter.clone();

		limiter.get();
		other.get();
		release.send(()).unwrap();
		assert!(wait_until(|| !other.refresh_in_progress()));
		assert_eq!(other.peek().to_string(), "s2");
		assert_eq!(limiter.source().calls.load(Ordering::SeqCst), 2);
	}

	/// Answers the first call with `first`, then gives up on every later call.
	struct OneShotSource {
		calls: AtomicUsize,
		first: Option<Sentence>,
	}

	impl SentenceSource for OneShotSource {
		fn best_of(&self, _candidates: usize, _max_len: Option<usize>) -> Option<Sentence> {
			if self.calls.fetch_add(1, Ordering::SeqCst) == 0 { self.first.clone() } else { None }
		}
	}

	#[test]
	fn failed_refresh_keeps_previous_sentence() {
		let first: Sentence = vec![Token::sentence_start(), Token::word("kept"), Token::sentence_end()].into();
		let source = OneShotSource { calls: AtomicUsize::new(0), first: Some(first) };
		let limiter = Limiter::new(source, LimiterConfig::new(1).unwrap());

		assert_eq!(limiter.get_text(), "kept");
		assert!(wait_until(|| limiter.source().calls.load(Ordering::SeqCst) == 2 && !limiter.refresh_in_progress()));
		assert_eq!(limiter.peek().to_string(), "kept");

		// The gate reopened, so the next get starts another refresh.
		assert_eq!(limiter.get_text(), "kept");
		assert!(wait_until(|| limiter.source().calls.load(Ordering::SeqCst) == 3 && !limiter.refresh_in_progress()));
		assert_eq!(limiter.peek().to_string(), "kept");
	}

	#[test]
	fn failed_initial_generation_starts_empty() {
		let source = OneShotSource { calls: AtomicUsize::new(0), first: None };
		let limiter = Limiter::new(source, LimiterConfig::new(1).unwrap());

		assert!(limiter.get().is_empty());
		assert!(wait_until(|| !limiter.refresh_in_progress()));
		assert_eq!(limiter.peek().to_string(), "");
	}

	#[test]
	fn serves_sentences_from_a_model() {
		let mut model = Model::with_seed(2, 17).unwrap();
		model.train_all(&mut Tokenizer::from_text("the cat sat\nthe dog ran\n", 2).unwrap());

		let limiter = Limiter::new(model, LimiterConfig::new(5).unwrap().with_max_len(50));
		let text = limiter.get_text();
		assert!(text == "the cat sat" || text == "the dog ran", "unexpected sentence {text:?}");
		assert!(wait_until(|| !limiter.refresh_in_progress()));
	}
}
