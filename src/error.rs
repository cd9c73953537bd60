//! Error taxonomy for the core subsystems.
//!
//! Transport and decode failures are indistinguishable for retry purposes:
//! a syntactically valid response with the wrong shape is just as useless as
//! an unreachable endpoint. Only `ExhaustedRetries` is terminal on the
//! remote-call paths; `ResourceNotFound` degrades to an absent-corpus state
//! instead of failing requests.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MentorError {
  /// The corpus file (or another required resource) is absent.
  #[error("resource not found: {0}")]
  ResourceNotFound(String),

  /// The remote response did not contain a decodable JSON object of the
  /// expected shape. Counts as a failed attempt.
  #[error("decode failure: {0}")]
  Decode(String),

  /// The remote capability could not be reached or answered with a
  /// protocol-level failure. Counts as a failed attempt.
  #[error("transport failure: {0}")]
  Transport(String),

  /// All retry attempts failed; carries the last underlying failure.
  #[error("exhausted {attempts} attempts, last error: {last}")]
  ExhaustedRetries {
    attempts: u32,
    #[source]
    last: Box<MentorError>,
  },

  /// No API key configured. Generation, grading and chat surface this
  /// instead of silently degrading.
  #[error("no generation capability configured (OPENAI_API_KEY missing)")]
  Unconfigured,

  /// The client request violated a caller contract (e.g. a trivially short
  /// submission). Never retried, mapped to a 400 at the HTTP layer.
  #[error("invalid request: {0}")]
  InvalidRequest(String),
}

impl MentorError {
  /// Decode and transport failures are retried; everything else is final.
  pub fn is_retryable(&self) -> bool {
    matches!(self, MentorError::Decode(_) | MentorError::Transport(_))
  }
}
