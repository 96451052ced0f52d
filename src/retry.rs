use std::thread;
use std::time::Duration;

use log::warn;

use crate::stats::error::FetchError;

/// Bounded retry for transient fetch failures. The delay doubles on every
/// attempt: backoff, 2*backoff, 4*backoff, ...
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn delay(&self, attempt: u32) -> Duration {
        self.backoff * (1u32 << (attempt - 1).min(16))
    }
}

/// Run `op` until it succeeds, fails permanently, or exhausts the attempt
/// budget. Only errors marked transient are retried.
pub fn with_retry<T, F>(policy: &RetryPolicy, label: &str, mut op: F) -> Result<T, FetchError>
where
    F: FnMut() -> Result<T, FetchError>,
{
    let mut attempt = 1;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < policy.max_attempts => {
                let delay = policy.delay(attempt);
                warn!(
                    "{}: attempt {}/{} failed ({}), retrying in {:.1}s",
                    label,
                    attempt,
                    policy.max_attempts,
                    e,
                    delay.as_secs_f64()
                );
                thread::sleep(delay);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            backoff: Duration::ZERO,
        }
    }

    #[test]
    fn transient_error_is_retried_until_success() {
        let mut calls = 0;
        let result = with_retry(&policy(5), "item", || {
            calls += 1;
            if calls < 3 {
                Err(FetchError::RateLimited)
            } else {
                Ok(42)
            }
        });
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls, 3);
    }

    #[test]
    fn attempts_are_bounded() {
        let mut calls = 0;
        let result: Result<(), _> = with_retry(&policy(3), "item", || {
            calls += 1;
            Err(FetchError::Status(503))
        });
        assert!(matches!(result, Err(FetchError::Status(503))));
        assert_eq!(calls, 3);
    }

    #[test]
    fn permanent_error_is_not_retried() {
        let mut calls = 0;
        let result: Result<(), _> = with_retry(&policy(5), "item", || {
            calls += 1;
            Err(FetchError::PlayerNotFound("Nobody".to_string()))
        });
        assert!(matches!(result, Err(FetchError::PlayerNotFound(_))));
        assert_eq!(calls, 1);
    }

    #[test]
    fn delays_double() {
        let policy = RetryPolicy {
            max_attempts: 4,
            backoff: Duration::from_secs(5),
        };
        assert_eq!(policy.delay(1), Duration::from_secs(5));
        assert_eq!(policy.delay(2), Duration::from_secs(10));
        assert_eq!(policy.delay(3), Duration::from_secs(20));
    }
}
