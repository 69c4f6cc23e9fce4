//! Generic exponential-backoff retry helper shared by every outbound HTTP
//! collaborator (Dropbox, the AI vendor, the orchestrator).

use std::future::Future;
use std::time::Duration;

const INITIAL_BACKOFF: Duration = Duration::from_millis(100);
const MAX_BACKOFF: Duration = Duration::from_millis(5000);

/// Retry `f` up to `max_attempts` times with exponential backoff (doubling
/// from 100ms, capped at 5s). `should_retry` decides whether a given error
/// is worth retrying at all (e.g. a 401 from an expired token is not,
/// assuming the caller refreshes and retries at a higher level instead).
pub async fn retry_with_backoff<F, Fut, T, E>(
    max_attempts: u32,
    mut f: F,
    should_retry: impl Fn(&E) -> bool,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut backoff = INITIAL_BACKOFF;
    let mut attempt = 0;
    loop {
        attempt += 1;
        match f().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < max_attempts && should_retry(&err) => {
                tracing::debug!(attempt, backoff_ms = backoff.as_millis() as u64, "retrying after failure");
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(MAX_BACKOFF);
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retries_until_success() {
        let attempts = AtomicU32::new(0);
        let result: Result<u32, &'static str> = retry_with_backoff(
            5,
            || {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                async move { if n < 2 { Err("transient") } else { Ok(n) } }
            },
            |_| true,
        )
        .await;
        assert_eq!(result, Ok(2));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn stops_retrying_when_should_retry_is_false() {
        let attempts = AtomicU32::new(0);
        let result: Result<u32, &'static str> = retry_with_backoff(
            5,
            || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err("auth") }
            },
            |e| *e != "auth",
        )
        .await;
        assert_eq!(result, Err("auth"));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stops_after_max_attempts() {
        let attempts = AtomicU32::new(0);
        let result: Result<u32, &'static str> = retry_with_backoff(
            3,
            || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err("transient") }
            },
            |_| true,
        )
        .await;
        assert_eq!(result, Err("transient"));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }
}
