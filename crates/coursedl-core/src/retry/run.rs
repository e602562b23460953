//! Retry loop: run a closure until success or the policy says stop.

use super::policy::{RetryDecision, RetryPolicy};

/// Runs `f` until it succeeds, fails with a non-retryable error, or the
/// policy's attempt bound is hit. `retryable` classifies errors; anything it
/// rejects is surfaced immediately.
pub fn run_with_retry<T, E, F, C>(policy: &RetryPolicy, mut retryable: C, mut f: F) -> Result<T, E>
where
    F: FnMut() -> Result<T, E>,
    C: FnMut(&E) -> bool,
{
    let mut attempt = 1u32;
    loop {
        match f() {
            Ok(value) => return Ok(value),
            Err(e) => {
                if !retryable(&e) {
                    return Err(e);
                }
                match policy.decide(attempt) {
                    RetryDecision::NoRetry => return Err(e),
                    RetryDecision::RetryAfter(delay) => {
                        std::thread::sleep(delay);
                        attempt += 1;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn quick_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            delay: Duration::from_millis(0),
        }
    }

    #[test]
    fn succeeds_after_transient_failures() {
        let mut calls = 0;
        let result: Result<u32, &str> = run_with_retry(
            &quick_policy(5),
            |_| true,
            || {
                calls += 1;
                if calls < 3 {
                    Err("stale")
                } else {
                    Ok(42)
                }
            },
        );
        assert_eq!(result, Ok(42));
        assert_eq!(calls, 3);
    }

    #[test]
    fn stops_at_attempt_bound() {
        let mut calls = 0;
        let result: Result<(), &str> = run_with_retry(
            &quick_policy(4),
            |_| true,
            || {
                calls += 1;
                Err("stale")
            },
        );
        assert_eq!(result, Err("stale"));
        assert_eq!(calls, 4);
    }

    #[test]
    fn non_retryable_errors_surface_immediately() {
        let mut calls = 0;
        let result: Result<(), &str> = run_with_retry(
            &quick_policy(10),
            |e: &&str| *e == "stale",
            || {
                calls += 1;
                Err("timeout")
            },
        );
        assert_eq!(result, Err("timeout"));
        assert_eq!(calls, 1);
    }
}
