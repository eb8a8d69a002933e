pub mod error;

pub use error::{BrowserlessError, Result};

use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;
use tracing::debug;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct BrowserlessClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    wait_for_ms: Option<u64>,
}

impl BrowserlessClient {
    pub fn new(base_url: &str, token: Option<&str>) -> Result<Self> {
        Self::with_timeout(base_url, token, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, token: Option<&str>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BrowserlessError::Setup(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
            wait_for_ms: None,
        })
    }

    /// Give client-side rendering extra time after navigation before the DOM is captured.
    pub fn wait_for(mut self, ms: u64) -> Self {
        self.wait_for_ms = Some(ms);
        self
    }

    fn endpoint(&self, path: &str) -> String {
        let mut endpoint = format!("{}{path}", self.base_url);
        if let Some(ref token) = self.token {
            endpoint.push_str(&format!("?token={token}"));
        }
        endpoint
    }

    /// Check that the Browserless instance is reachable and accepting requests.
    pub async fn ping(&self) -> Result<()> {
        let resp = self.client.get(self.endpoint("/json/version")).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(BrowserlessError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }

    fn content_body(&self, url: &str) -> serde_json::Value {
        let mut body = serde_json::json!({ "url": url });
        if let Some(ms) = self.wait_for_ms {
            body["waitForTimeout"] = serde_json::json!(ms);
        }
        body
    }

    /// Fetch fully-rendered HTML content for a URL via Browserless /content endpoint.
    pub async fn content(&self, url: &str) -> Result<String> {
        let body = self.content_body(url);

        debug!(url, "Requesting rendered content");

        let resp = self
            .client
            .post(self.endpoint("/content"))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let retry_after = retry_after(resp.headers());
            if status == StatusCode::TOO_MANY_REQUESTS
                || (status == StatusCode::SERVICE_UNAVAILABLE && retry_after.is_some())
            {
                return Err(BrowserlessError::RateLimited {
                    status: status.as_u16(),
                    retry_after,
                });
            }
            let message = resp.text().await.unwrap_or_default();
            return Err(BrowserlessError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(resp.text().await?)
    }
}

/// Parse a `Retry-After` header given in whole seconds.
pub fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn retry_after_seconds_parsed() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("12"));
        assert_eq!(retry_after(&headers), Some(Duration::from_secs(12)));
    }

    #[test]
    fn retry_after_http_date_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        assert_eq!(retry_after(&headers), None);
    }

    #[test]
    fn token_is_appended_to_endpoint() {
        let client = BrowserlessClient::new("https://chrome.example.com/", Some("abc")).unwrap();
        assert_eq!(
            client.endpoint("/content"),
            "https://chrome.example.com/content?token=abc"
        );
    }

    #[test]
    fn render_wait_is_sent_only_when_set() {
        let client = BrowserlessClient::new("https://chrome.example.com", None).unwrap();
        let body = client.content_body("https://site.test/a-1");
        assert_eq!(body["url"], "https://site.test/a-1");
        assert!(body.get("waitForTimeout").is_none());

        let client = client.wait_for(1500);
        assert_eq!(client.content_body("https://site.test/a-1")["waitForTimeout"], 1500);
    }
}
