//! Bounded retry with randomized exponential backoff.
//!
//! Every remote-generation call goes through [`with_retry`]. Decode and
//! transport failures are retried; after the attempt ceiling the last
//! failure surfaces as `ExhaustedRetries` and nothing is returned silently.
//! Attempts are strictly sequential; there is no cancellation mid-flight.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use crate::error::MentorError;

#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
  pub max_attempts: u32,
  pub min_delay: Duration,
  pub max_delay: Duration,
}

/// Case generation and grading: 3 attempts, 1-20s backoff window.
pub const CASE_PIPELINE_RETRY: RetryPolicy = RetryPolicy {
  max_attempts: 3,
  min_delay: Duration::from_secs(1),
  max_delay: Duration::from_secs(20),
};

/// Chat-answer path: 2 attempts, 1-10s backoff window.
pub const CHAT_RETRY: RetryPolicy = RetryPolicy {
  max_attempts: 2,
  min_delay: Duration::from_secs(1),
  max_delay: Duration::from_secs(10),
};

impl RetryPolicy {
  /// Randomized exponential backoff: a uniform sample from
  /// [min_delay, min_delay * 2^(attempt-1)], capped at max_delay.
  pub fn backoff_delay(&self, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(16);
    let ceiling = self
      .min_delay
      .saturating_mul(1u32 << exponent)
      .min(self.max_delay);
    let min_ms = self.min_delay.as_millis() as u64;
    let max_ms = (ceiling.as_millis() as u64).max(min_ms);
    let ms = rand::thread_rng().gen_range(min_ms..=max_ms);
    Duration::from_millis(ms)
  }
}

/// Run `op` until it succeeds or the policy's attempt ceiling is reached.
///
/// Non-retryable errors propagate immediately. The backoff sleep only
/// happens between attempts, never after the last one.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, MentorError>
where
  F: FnMut() -> Fut,
  Fut: Future<Output = Result<T, MentorError>>,
{
  let mut last_err: Option<MentorError> = None;
  for attempt in 1..=policy.max_attempts {
    match op().await {
      Ok(v) => return Ok(v),
      Err(e) if e.is_retryable() => {
        warn!(target: "juramentor", attempt, max = policy.max_attempts, error = %e, "Attempt failed");
        last_err = Some(e);
        if attempt < policy.max_attempts {
          let delay = policy.backoff_delay(attempt);
          tokio::time::sleep(delay).await;
        }
      }
      Err(e) => return Err(e),
    }
  }
  Err(MentorError::ExhaustedRetries {
    attempts: policy.max_attempts,
    last: Box::new(last_err.unwrap_or(MentorError::Unconfigured)),
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicU32, Ordering};

  /// Millisecond-scale policy so tests don't actually wait.
  const FAST: RetryPolicy = RetryPolicy {
    max_attempts: 3,
    min_delay: Duration::from_millis(1),
    max_delay: Duration::from_millis(5),
  };

  #[tokio::test]
  async fn succeeds_after_transient_failures() {
    let calls = AtomicU32::new(0);
    let out = with_retry(&FAST, || {
      let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
      async move {
        if n < 3 {
          Err(MentorError::Transport("flaky".into()))
        } else {
          Ok(42u32)
        }
      }
    })
    .await
    .unwrap();
    assert_eq!(out, 42);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
  }

  #[tokio::test]
  async fn exhausts_after_exactly_max_attempts() {
    let calls = AtomicU32::new(0);
    let err = with_retry(&FAST, || {
      calls.fetch_add(1, Ordering::SeqCst);
      async { Err::<u32, _>(MentorError::Decode("kein JSON".into())) }
    })
    .await
    .unwrap_err();

    assert_eq!(calls.load(Ordering::SeqCst), FAST.max_attempts);
    match err {
      MentorError::ExhaustedRetries { attempts, last } => {
        assert_eq!(attempts, FAST.max_attempts);
        assert!(matches!(*last, MentorError::Decode(_)));
      }
      other => panic!("expected ExhaustedRetries, got {other:?}"),
    }
  }

  #[tokio::test]
  async fn non_retryable_error_short_circuits() {
    let calls = AtomicU32::new(0);
    let err = with_retry(&FAST, || {
      calls.fetch_add(1, Ordering::SeqCst);
      async { Err::<u32, _>(MentorError::Unconfigured) }
    })
    .await
    .unwrap_err();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(matches!(err, MentorError::Unconfigured));
  }

  #[test]
  fn backoff_stays_inside_the_configured_window() {
    let policy = RetryPolicy {
      max_attempts: 3,
      min_delay: Duration::from_secs(1),
      max_delay: Duration::from_secs(20),
    };
    for attempt in 1..=8 {
      for _ in 0..50 {
        let d = policy.backoff_delay(attempt);
        assert!(d >= policy.min_delay, "attempt {attempt}: {d:?} below min");
        assert!(d <= policy.max_delay, "attempt {attempt}: {d:?} above max");
      }
    }
    // First attempt has no room to widen yet.
    assert_eq!(policy.backoff_delay(1), policy.min_delay);
  }

  #[test]
  fn backoff_window_widens_with_attempts() {
    let policy = RetryPolicy {
      max_attempts: 5,
      min_delay: Duration::from_secs(1),
      max_delay: Duration::from_secs(20),
    };
    // By attempt 6 the exponential ceiling 1*2^5=32s is clamped to 20s.
    let mut saw_above_four = false;
    for _ in 0..200 {
      if policy.backoff_delay(6) > Duration::from_secs(4) {
        saw_above_four = true;
        break;
      }
    }
    assert!(saw_above_four, "widened window never sampled above 4s");
  }
}
