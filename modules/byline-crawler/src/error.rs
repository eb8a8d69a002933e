use std::time::Duration;

use thiserror::Error;

/// Why a single page fetch failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// Timeout, connection error, empty body.
    #[error("Fetch failed for {url}: {reason}")]
    Failed { url: String, reason: String },

    /// Non-success HTTP status.
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    /// Explicit throttling signal (429, or 503 with Retry-After).
    #[error("Rate limited fetching {url}")]
    RateLimited {
        url: String,
        retry_after: Option<Duration>,
    },
}

impl FetchError {
    pub fn url(&self) -> &str {
        match self {
            FetchError::Failed { url, .. }
            | FetchError::Status { url, .. }
            | FetchError::RateLimited { url, .. } => url,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, FetchError::RateLimited { .. })
    }
}

/// Errors surfaced to the caller of a crawl run.
///
/// Unit-level failures (one source, one page, one profile) are logged and
/// counted in `RunProgress`; only these abort or fail a run.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Page source '{source_name}' could not be started: {reason}")]
    Initialization { source_name: String, reason: String },

    #[error("State store error: {0:#}")]
    Store(anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_error_exposes_url() {
        let err = FetchError::RateLimited {
            url: "https://site.test/a-1".into(),
            retry_after: None,
        };
        assert_eq!(err.url(), "https://site.test/a-1");
        assert!(err.is_rate_limited());
    }

    #[test]
    fn initialization_error_names_source() {
        let err = CrawlError::Initialization {
            source_name: "browserless".into(),
            reason: "connection refused".into(),
        };
        assert!(err.to_string().contains("browserless"));
    }
}
