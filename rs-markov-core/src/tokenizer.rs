use std::io::{self, BufRead, BufReader, Read};

use log::warn;

use crate::error::{MarkovError, TokenizerError};
use crate::model::chain::MAX_ORDER;
use crate::token::{Sentence, Token};

/// Tokenizer states. Each call to [`Tokenizer::next_token`] runs the machine
/// until exactly one token is produced (or the terminal state is hit).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
	/// Emit one sentence start marker; after `order` of them, read a line.
	StartOfSentence,
	/// Pull the next line from the stream. Emits nothing.
	GrabSentence,
	/// Emit the next whitespace-delimited word of the current line.
	HasSentence,
	/// Emit the sentence end marker.
	EndOfSentence,
	/// Terminal.
	Eof,
}

/// Line-oriented streaming tokenizer.
///
/// Every input line becomes one sentence framed by `order` sentence start
/// markers and exactly one sentence end marker:
///
/// ```text
/// "a b\n" (order 2) -> [Start] [Start] "a" "b" [End]
/// ```
///
/// Words are split on ASCII spaces and tabs only, then trimmed; the line
/// terminator is dropped. Any other whitespace inside a line (a lone `\r`,
/// vertical tab, non-ASCII spaces) stays part of the word around it.
/// Consecutive spaces produce empty words, and an empty line produces a
/// sentence holding a single empty word.
pub struct Tokenizer<R> {
	reader: BufReader<R>,
	state: State,
	order: usize,
	/// Start markers emitted for the sentence being framed.
	start_emitted: usize,
	/// Set once the stream has no more complete lines.
	exhausted: bool,
	line: Vec<u8>,
	cursor: usize,
}

impl<R: Read> Tokenizer<R> {
	/// Creates a tokenizer over any byte stream.
	///
	/// # Errors
	/// Returns [`MarkovError::InvalidOrder`] if `order` is 0 or above [`MAX_ORDER`].
	pub fn new(reader: R, order: usize) -> Result<Self, MarkovError> {
		if order == 0 || order > MAX_ORDER {
			return Err(MarkovError::InvalidOrder(order));
		}
		Ok(Self {
			reader: BufReader::new(reader),
			state: State::StartOfSentence,
			order,
			start_emitted: 0,
			exhausted: false,
			line: Vec::new(),
			cursor: 0,
		})
	}

	/// Number of sentence start markers framing each sentence.
	pub fn order(&self) -> usize {
		self.order
	}

	/// Advances the state machine by one token.
	///
	/// # Errors
	/// [`TokenizerError::Exhausted`] once every sentence has been delivered.
	/// The error is sticky: every later call fails the same way.
	pub fn next_token(&mut self) -> Result<Token, TokenizerError> {
		loop {
			match self.state {
				State::StartOfSentence => {
					if self.start_emitted == 0 && self.at_end_of_input() {
						self.state = State::Eof;
						continue;
					}
					self.start_emitted += 1;
					if self.start_emitted == self.order {
						self.start_emitted = 0;
						self.state = State::GrabSentence;
					}
					return Ok(Token::sentence_start());
				}
				State::GrabSentence => {
					self.read_line();
					self.state = State::HasSentence;
				}
				State::HasSentence => {
					let rest = &self.line[self.cursor..];
					return match rest.iter().position(|b| *b == b' ' || *b == b'\t') {
						Some(boundary) => {
							let word = trimmed(&rest[..boundary]);
							self.cursor += boundary + 1;
							Ok(Token::word(word))
						}
						None => {
							let word = trimmed(rest);
							self.state = State::EndOfSentence;
							Ok(Token::word(word))
						}
					};
				}
				State::EndOfSentence => {
					self.state = if self.exhausted { State::Eof } else { State::StartOfSentence };
					return Ok(Token::sentence_end());
				}
				State::Eof => return Err(TokenizerError::Exhausted),
			}
		}
	}

	/// Collects tokens up to and including the next sentence end marker.
	///
	/// The exhausted condition is only ever raised between sentences, so an
	/// `Err` never discards a partially built sentence.
	pub fn sentence(&mut self) -> Result<Sentence, TokenizerError> {
		let mut sentence = Sentence::with_capacity(self.order + 2);
		loop {
			let token = self.next_token()?;
			let end = token.is_sentence_end();
			sentence.push(token);
			if end {
				return Ok(sentence);
			}
		}
	}

	fn read_line(&mut self) {
		self.line.clear();
		self.cursor = 0;
		match self.reader.read_until(b'\n', &mut self.line) {
			Ok(_) if self.line.last() == Some(&b'\n') => {}
			Ok(_) => self.exhausted = true,
			Err(e) => {
				warn!("Tokenizer read failed, treating stream as exhausted: {e}");
				self.exhausted = true;
			}
		}
	}

	fn at_end_of_input(&mut self) -> bool {
		if self.exhausted {
			return true;
		}
		loop {
			match self.reader.fill_buf() {
				Ok(buf) => return buf.is_empty(),
				Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
				Err(e) => {
					warn!("Tokenizer read failed, treating stream as exhausted: {e}");
					self.exhausted = true;
					return true;
				}
			}
		}
	}
}

impl<'a> Tokenizer<&'a [u8]> {
	/// Creates a tokenizer over an in-memory string.
	pub fn from_text(data: &'a str, order: usize) -> Result<Self, MarkovError> {
		Self::new(data.as_bytes(), order)
	}
}

/// Yields sentences until the stream is exhausted.
impl<R: Read> Iterator for Tokenizer<R> {
	type Item = Sentence;

	fn next(&mut self) -> Option<Sentence> {
		self.sentence().ok()
	}
}

fn trimmed(bytes: &[u8]) -> String {
	String::from_utf8_lossy(bytes).trim().to_owned()
}
