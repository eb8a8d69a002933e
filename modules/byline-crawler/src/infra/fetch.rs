// Retrying, polite wrapper around a PageSource.
//
// Every attempt is followed by the politeness delay. Failed attempts back off
// exponentially (backoff_base * 2^n); rate-limit signals wait at least
// rate_limit_backoff, or the server's Retry-After if longer. Jitter is added
// to every wait.

use std::sync::Arc;
use std::time::Duration;

use byline_common::FetchPolicy;
use rand::Rng;
use tracing::{debug, warn};

use crate::error::FetchError;
use crate::traits::PageSource;

pub struct Fetcher {
    source: Arc<dyn PageSource>,
    policy: FetchPolicy,
}

impl Fetcher {
    pub fn new(source: Arc<dyn PageSource>, policy: FetchPolicy) -> Self {
        Self { source, policy }
    }

    pub fn source(&self) -> &Arc<dyn PageSource> {
        &self.source
    }

    /// Fetch with bounded retries. Returns the last error once attempts run out.
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let result = self.source.fetch(url).await;
            self.pause(self.policy.politeness_delay).await;

            let err = match result {
                Ok(body) => {
                    debug!(url, attempt, bytes = body.len(), source = self.source.name(), "Fetched");
                    return Ok(body);
                }
                Err(err) => err,
            };

            if attempt >= max_attempts {
                warn!(url, attempt, error = %err, "Fetch attempts exhausted");
                return Err(err);
            }

            let backoff = self.backoff_for(&err, attempt);
            warn!(
                url,
                attempt,
                backoff_ms = backoff.as_millis() as u64,
                rate_limited = err.is_rate_limited(),
                error = %err,
                "Fetch failed, retrying after backoff"
            );
            self.pause(backoff).await;
        }
    }

    /// Wait before retry number `attempt` (1-based).
    pub fn backoff_for(&self, err: &FetchError, attempt: u32) -> Duration {
        match err {
            FetchError::RateLimited { retry_after, .. } => {
                let floor = self
                    .policy
                    .rate_limit_backoff
                    .checked_mul(attempt)
                    .unwrap_or(Duration::MAX);
                retry_after.map_or(floor, |server| server.max(floor))
            }
            _ => 2u32
                .checked_pow(attempt.saturating_sub(1))
                .and_then(|factor| self.policy.backoff_base.checked_mul(factor))
                .unwrap_or(Duration::MAX),
        }
    }

    async fn pause(&self, base: Duration) {
        let jitter_ms = self.policy.jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::rng().random_range(0..=jitter_ms))
        };
        let total = base.saturating_add(jitter);
        if !total.is_zero() {
            tokio::time::sleep(total).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockPageSource;

    fn policy() -> FetchPolicy {
        FetchPolicy {
            backoff_base: Duration::from_secs(2),
            rate_limit_backoff: Duration::from_secs(30),
            ..FetchPolicy::without_delays()
        }
    }

    #[test]
    fn generic_failures_back_off_exponentially() {
        let fetcher = Fetcher::new(Arc::new(MockPageSource::new()), policy());
        let err = FetchError::Failed {
            url: "u".into(),
            reason: "timeout".into(),
        };
        assert_eq!(fetcher.backoff_for(&err, 1), Duration::from_secs(2));
        assert_eq!(fetcher.backoff_for(&err, 2), Duration::from_secs(4));
        assert_eq!(fetcher.backoff_for(&err, 3), Duration::from_secs(8));
    }

    #[test]
    fn rate_limits_back_off_longer_and_honor_retry_after() {
        let fetcher = Fetcher::new(Arc::new(MockPageSource::new()), policy());
        let plain = FetchError::RateLimited {
            url: "u".into(),
            retry_after: None,
        };
        assert_eq!(fetcher.backoff_for(&plain, 1), Duration::from_secs(30));
        let server = FetchError::RateLimited {
            url: "u".into(),
            retry_after: Some(Duration::from_secs(90)),
        };
        assert_eq!(fetcher.backoff_for(&server, 1), Duration::from_secs(90));
    }

    #[test]
    fn extreme_backoff_settings_saturate() {
        let fetcher = Fetcher::new(
            Arc::new(MockPageSource::new()),
            FetchPolicy {
                backoff_base: Duration::MAX,
                rate_limit_backoff: Duration::MAX,
                ..FetchPolicy::without_delays()
            },
        );
        let failed = FetchError::Failed {
            url: "u".into(),
            reason: "timeout".into(),
        };
        let limited = FetchError::RateLimited {
            url: "u".into(),
            retry_after: None,
        };
        assert_eq!(fetcher.backoff_for(&failed, 2), Duration::MAX);
        assert_eq!(fetcher.backoff_for(&failed, 40), Duration::MAX);
        assert_eq!(fetcher.backoff_for(&limited, 3), Duration::MAX);
    }

    #[tokio::test]
    async fn retries_until_success() {
        let source = Arc::new(
            MockPageSource::new()
                .on_failure("https://site.test/a-1")
                .then_page("https://site.test/a-1", "<p>ok</p>"),
        );
        let fetcher = Fetcher::new(source.clone(), FetchPolicy::without_delays());
        let body = fetcher.fetch("https://site.test/a-1").await.unwrap();
        assert_eq!(body, "<p>ok</p>");
        assert_eq!(source.fetch_count("https://site.test/a-1"), 2);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let source = Arc::new(MockPageSource::new().on_failure("https://site.test/a-1"));
        let fetcher = Fetcher::new(source.clone(), FetchPolicy::without_delays());
        let err = fetcher.fetch("https://site.test/a-1").await.unwrap_err();
        assert!(matches!(err, FetchError::Failed { .. }));
        assert_eq!(source.fetch_count("https://site.test/a-1"), 3);
    }

    #[tokio::test]
    async fn rate_limit_then_success() {
        let source = Arc::new(
            MockPageSource::new()
                .on_rate_limit("https://site.test/t/saas")
                .then_page("https://site.test/t/saas", "<p>listing</p>"),
        );
        let fetcher = Fetcher::new(source.clone(), FetchPolicy::without_delays());
        assert!(fetcher.fetch("https://site.test/t/saas").await.is_ok());
        assert_eq!(source.fetch_count("https://site.test/t/saas"), 2);
    }
}
