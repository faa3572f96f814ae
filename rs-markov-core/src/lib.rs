//! Word-level Markov chain text generation.
//!
//! This crate provides:
//! - A streaming, line-oriented tokenizer framing each line as a sentence
//! - A fixed-order Markov model with likelihood scoring and best-of-N sampling
//! - Compact persistence of trained models
//! - A non-blocking cache serving freshly generated sentences
//!
//! ```no_run
//! use rs_markov_core::model::limiter::Limiter;
//! use rs_markov_core::model::limiter_config::LimiterConfig;
//! use rs_markov_core::model::markov_model::Model;
//! use rs_markov_core::tokenizer::Tokenizer;
//!
//! let mut model = Model::new(2)?;
//! model.train_all(&mut Tokenizer::from_text("the cat sat\nthe dog ran\n", 2)?);
//!
//! let limiter = Limiter::new(model, LimiterConfig::new(10)?);
//! println!("{}", limiter.get_text());
//! # Ok::<(), rs_markov_core::error::MarkovError>(())
//! ```

/// Error types.
pub mod error;

/// Tokens, sentences and context keys.
pub mod token;

/// Line-oriented tokenizer state machine.
pub mod tokenizer;

/// Markov model, snapshot and serving cache.
pub mod model;

/// File helpers (corpus reading, cache paths).
///
/// Not exposed
pub(crate) mod io;

pub use error::{MarkovError, TokenizerError};
pub use model::limiter::{Limiter, SentenceSource};
pub use model::limiter_config::LimiterConfig;
pub use model::markov_model::Model;
pub use token::{ContextKey, Sentence, Token, TokenType};
pub use tokenizer::Tokenizer;
