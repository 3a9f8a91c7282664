use std::future::Future;
use std::time::Duration;
use tracing::debug;

use crate::core::config::RetryConfig;

/// Classifies an error as transient (worth another attempt) or terminal.
pub trait Retryable {
    fn is_transient(&self) -> bool;
}

/// Pure retry decision: bounded attempts with exponential backoff clamped
/// to a floor and a ceiling. Deterministic, no jitter.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub multiplier: Duration,
    pub floor: Duration,
    pub ceiling: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, multiplier: Duration, floor: Duration, ceiling: Duration) -> Self {
        Self {
            max_attempts,
            multiplier,
            floor,
            ceiling,
        }
    }

    /// Transient failures are retried until the attempt bound; terminal
    /// failures never are.
    pub fn should_retry(&self, attempt: u32, transient: bool) -> bool {
        transient && attempt < self.max_attempts
    }

    /// `clamp(multiplier * 2^(attempt-1), floor, ceiling)`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self.multiplier.as_secs_f64() * 2f64.powi(attempt.saturating_sub(1) as i32);
        Duration::from_secs_f64(exp).clamp(self.floor, self.ceiling)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(
            3,
            Duration::from_millis(800),
            Duration::from_millis(500),
            Duration::from_secs(4),
        )
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(
            config.max_attempts,
            config.backoff_multiplier,
            config.backoff_min,
            config.backoff_max,
        )
    }
}

/// Drives an async operation under a retry policy.
///
/// # Parameters
/// - `operation`: Closure returning a future for one attempt
/// - `policy`: Decides retry eligibility and the delay between attempts
///
/// # Returns
/// The first success, or the last error once the policy gives up.
pub async fn with_retry<F, Fut, T, E>(policy: &RetryPolicy, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + std::fmt::Display,
{
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(val) => return Ok(val),
            Err(err) => {
                if !policy.should_retry(attempt, err.is_transient()) {
                    return Err(err);
                }
                let delay = policy.delay_for(attempt);
                debug!(
                    "Attempt {}/{} failed: {}. Retrying in {:?}",
                    attempt, policy.max_attempts, err, delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct TestError {
        transient: bool,
    }

    impl fmt::Display for TestError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "test error (transient: {})", self.transient)
        }
    }

    impl Retryable for TestError {
        fn is_transient(&self) -> bool {
            self.transient
        }
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy::new(
            3,
            Duration::from_millis(1),
            Duration::from_millis(1),
            Duration::from_millis(4),
        )
    }

    #[test]
    fn delays_grow_exponentially_up_to_the_ceiling() {
        let policy = RetryPolicy::default();
        let delays: Vec<_> = (1..=5).map(|a| policy.delay_for(a)).collect();
        assert_eq!(delays[0], Duration::from_millis(800));
        assert_eq!(delays[1], Duration::from_millis(1600));
        assert_eq!(delays[2], Duration::from_millis(3200));
        assert_eq!(delays[3], Duration::from_secs(4));
        assert_eq!(delays[4], Duration::from_secs(4));
        assert!(delays.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn small_delays_are_raised_to_the_floor() {
        let policy = RetryPolicy::new(
            3,
            Duration::from_millis(100),
            Duration::from_millis(500),
            Duration::from_secs(4),
        );
        assert_eq!(policy.delay_for(1), Duration::from_millis(500));
        assert_eq!(policy.delay_for(2), Duration::from_millis(500));
        assert_eq!(policy.delay_for(3), Duration::from_millis(500));
    }

    #[test]
    fn retry_decision_honours_error_class_and_bound() {
        let policy = RetryPolicy::default();
        assert!(policy.should_retry(1, true));
        assert!(policy.should_retry(2, true));
        assert!(!policy.should_retry(3, true));
        assert!(!policy.should_retry(1, false));
    }

    #[tokio::test]
    async fn transient_failures_exhaust_the_attempt_bound() {
        let calls = AtomicUsize::new(0);
        let result: Result<(), TestError> = with_retry(&fast_policy(), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(TestError { transient: true })
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn terminal_failures_are_not_retried() {
        let calls = AtomicUsize::new(0);
        let result: Result<(), TestError> = with_retry(&fast_policy(), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(TestError { transient: false })
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn success_after_a_transient_failure_is_returned() {
        let calls = AtomicUsize::new(0);
        let result: Result<u32, TestError> = with_retry(&fast_policy(), || async {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(TestError { transient: true })
            } else {
                Ok(42)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
