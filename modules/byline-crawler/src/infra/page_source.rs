use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use browserless_client::{BrowserlessClient, BrowserlessError};
use reqwest::header::HeaderMap;
use reqwest::StatusCode;

use crate::error::FetchError;
use crate::traits::PageSource;

// ---------------------------------------------------------------------------
// Browserless (rendered DOM)
// ---------------------------------------------------------------------------

/// Fetches rendered markup through a Browserless instance. Use this for sites
/// that build their listings client-side.
pub struct BrowserlessPageSource {
    client: BrowserlessClient,
}

impl BrowserlessPageSource {
    pub fn new(base_url: &str, token: Option<&str>, timeout: Duration) -> Result<Self> {
        let client = BrowserlessClient::with_timeout(base_url, token, timeout)
            .context("Failed to build Browserless client")?;
        Ok(Self { client })
    }

    pub fn from_client(client: BrowserlessClient) -> Self {
        Self { client }
    }

    /// Let client-side rendering settle for `ms` before the DOM is captured.
    pub fn with_render_wait(mut self, ms: u64) -> Self {
        self.client = self.client.wait_for(ms);
        self
    }
}

#[async_trait]
impl PageSource for BrowserlessPageSource {
    async fn start(&self) -> Result<()> {
        self.client
            .ping()
            .await
            .context("Browserless instance is not reachable")
    }

    async fn fetch(&self, url: &str) -> std::result::Result<String, FetchError> {
        self.client
            .content(url)
            .await
            .map_err(|e| map_browserless_error(url, e))
    }

    fn name(&self) -> &str {
        "browserless"
    }
}

fn map_browserless_error(url: &str, err: BrowserlessError) -> FetchError {
    match err {
        BrowserlessError::RateLimited { retry_after, .. } => FetchError::RateLimited {
            url: url.to_string(),
            retry_after,
        },
        BrowserlessError::Api { status, .. } => FetchError::Status {
            url: url.to_string(),
            status,
        },
        other => FetchError::Failed {
            url: url.to_string(),
            reason: other.to_string(),
        },
    }
}

// ---------------------------------------------------------------------------
// Plain HTTP
// ---------------------------------------------------------------------------

/// Plain GET with reqwest. Sufficient for server-rendered sites.
pub struct HttpPageSource {
    client: reqwest::Client,
}

impl HttpPageSource {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("byline/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn fetch(&self, url: &str) -> std::result::Result<String, FetchError> {
        let resp = self.client.get(url).send().await.map_err(|e| FetchError::Failed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(status_error(url, status, resp.headers()));
        }

        let body = resp.text().await.map_err(|e| FetchError::Failed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        if body.trim().is_empty() {
            return Err(FetchError::Failed {
                url: url.to_string(),
                reason: "empty body".to_string(),
            });
        }
        Ok(body)
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// 429, and 503 with a `Retry-After`, are throttling; anything else is a plain status failure.
fn status_error(url: &str, status: StatusCode, headers: &HeaderMap) -> FetchError {
    let retry_after = browserless_client::retry_after(headers);
    if status == StatusCode::TOO_MANY_REQUESTS
        || (status == StatusCode::SERVICE_UNAVAILABLE && retry_after.is_some())
    {
        FetchError::RateLimited {
            url: url.to_string(),
            retry_after,
        }
    } else {
        FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        }
    }
}
