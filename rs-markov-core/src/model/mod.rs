//! Markov model and serving layer.
//!
//! - Fixed-order word transition model (`Model`)
//! - Persisted transition table (`Chain`)
//! - Non-blocking best-of-N cache (`Limiter`)
//! - Refresh configuration (`LimiterConfig`)

/// Word-level Markov model: training, sampling, scoring, persistence.
pub mod markov_model;

/// Transition table keyed by `order`-token contexts.
///
/// Also the serialized snapshot of a model.
pub mod chain;

/// Single-flight background refresh of a cached best-of-N sentence.
pub mod limiter;

/// Refresh parameters for `Limiter`.
pub mod limiter_config;
