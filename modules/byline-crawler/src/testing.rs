// Test doubles and HTML fixtures for the crawler.
//
// - MockPageSource (PageSource): URL→markup map with scripted failures,
//   status codes and rate limits; records every fetched URL.
// - Fixture builders for listing, article, profile and sitemap markup.
// - test_site() / test_config(): a site at https://site.test with no fetch delays.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;

use byline_common::{CrawlConfig, FetchPolicy, SitePolicy};

use crate::error::FetchError;
use crate::traits::PageSource;

// ---------------------------------------------------------------------------
// Site
// ---------------------------------------------------------------------------

pub const TEST_BASE: &str = "https://site.test";

pub fn test_site() -> SitePolicy {
    SitePolicy {
        base_url: TEST_BASE.to_string(),
        ..SitePolicy::default()
    }
}

/// Default crawl config against `test_site()`, no sources, no delays.
pub fn test_config() -> CrawlConfig {
    CrawlConfig::builder()
        .site(test_site())
        .fetch(FetchPolicy::without_delays())
        .build()
}

/// Absolute test-site URL for a root-relative path.
pub fn site_url(path: &str) -> String {
    format!("{TEST_BASE}{path}")
}

// ---------------------------------------------------------------------------
// MockPageSource
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Scripted {
    Page(String),
    Failure,
    Status(u16),
    RateLimit(Option<Duration>),
}

/// HashMap-based page source. Unregistered URLs answer 404.
///
/// Builder pattern: `.on_page()` registers markup served on every fetch;
/// `.on_failure()`, `.on_status()`, `.on_rate_limit()` and `.then_page()`
/// script a per-URL sequence whose last entry repeats.
pub struct MockPageSource {
    pages: HashMap<String, String>,
    scripts: Mutex<HashMap<String, VecDeque<Scripted>>>,
    fetched: Mutex<Vec<String>>,
    fail_start: bool,
}

impl Default for MockPageSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPageSource {
    pub fn new() -> Self {
        Self {
            pages: HashMap::new(),
            scripts: Mutex::new(HashMap::new()),
            fetched: Mutex::new(Vec::new()),
            fail_start: false,
        }
    }

    pub fn on_page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }

    pub fn on_failure(self, url: &str) -> Self {
        self.script(url, Scripted::Failure)
    }

    pub fn on_status(self, url: &str, status: u16) -> Self {
        self.script(url, Scripted::Status(status))
    }

    pub fn on_rate_limit(self, url: &str) -> Self {
        self.script(url, Scripted::RateLimit(None))
    }

    pub fn on_rate_limit_after(self, url: &str, retry_after: Duration) -> Self {
        self.script(url, Scripted::RateLimit(Some(retry_after)))
    }

    /// Serve `html` once the earlier scripted responses for `url` are used up.
    pub fn then_page(self, url: &str, html: &str) -> Self {
        self.script(url, Scripted::Page(html.to_string()))
    }

    /// Make `start()` fail, as an unreachable browser service would.
    pub fn fail_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    fn script(self, url: &str, response: Scripted) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(response);
        self
    }

    /// Every fetched URL, in order, including retries.
    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }

    pub fn fetch_count(&self, url: &str) -> usize {
        self.fetched.lock().unwrap().iter().filter(|u| *u == url).count()
    }

    fn next_scripted(&self, url: &str) -> Option<Scripted> {
        let mut scripts = self.scripts.lock().unwrap();
        let queue = scripts.get_mut(url)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl PageSource for MockPageSource {
    async fn start(&self) -> Result<()> {
        if self.fail_start {
            bail!("MockPageSource: configured to fail on start");
        }
        Ok(())
    }

    async fn fetch(&self, url: &str) -> std::result::Result<String, FetchError> {
        self.fetched.lock().unwrap().push(url.to_string());

        let url_owned = url.to_string();
        match self.next_scripted(url) {
            Some(Scripted::Page(html)) => Ok(html),
            Some(Scripted::Failure) => Err(FetchError::Failed {
                url: url_owned,
                reason: "MockPageSource: scripted failure".into(),
            }),
            Some(Scripted::Status(status)) => Err(FetchError::Status { url: url_owned, status }),
            Some(Scripted::RateLimit(retry_after)) => Err(FetchError::RateLimited {
                url: url_owned,
                retry_after,
            }),
            None => self.pages.get(url).cloned().ok_or(FetchError::Status {
                url: url_owned,
                status: 404,
            }),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Listing page with one card per `(href, title)`, title in an `<h2>` around the link.
pub fn listing_page(items: &[(&str, &str)]) -> String {
    let cards: String = items
        .iter()
        .map(|(href, title)| {
            format!(
                r#"<article class="card"><h2><a href="{href}">{title}</a></h2><a href="/@someone">someone</a></article>"#
            )
        })
        .collect();
    format!(
        r#"<html><body><nav><a href="/">Home</a><a href="/login">Log in</a></nav><main>{cards}</main></body></html>"#
    )
}

/// Article whose only author signal is a `/@handle` byline link.
pub fn article_page(handle: &str, name: &str, title: &str) -> String {
    format!(
        r#"<html><head><title>{title}</title></head><body>
<article><h1>{title}</h1><p class="byline">by <a href="/@{handle}">{name}</a></p>
<p>Body text.</p></article></body></html>"#
    )
}

/// Article with a JSON-LD author block and a tag list.
pub fn article_with_ld(handle: &str, name: &str, title: &str, bio: &str, tags: &[&str]) -> String {
    let ld = serde_json::json!({
        "@context": "https://schema.org",
        "@type": "Article",
        "headline": title,
        "author": {
            "@type": "Person",
            "name": name,
            "url": format!("{TEST_BASE}/@{handle}"),
            "description": bio,
        }
    });
    let tag_links: String = tags
        .iter()
        .map(|t| format!(r#"<a href="/t/{t}">#{t}</a>"#))
        .collect();
    format!(
        r#"<html><head><script type="application/ld+json">{ld}</script></head>
<body><h1>{title}</h1><div class="tags">{tag_links}</div></body></html>"#
    )
}

/// Article with no identifiable author.
pub fn anonymous_article(title: &str) -> String {
    format!(r#"<html><body><h1>{title}</h1><p>No byline here.</p></body></html>"#)
}

/// Profile page linking out to each URL in order.
pub fn profile_page(links: &[&str]) -> String {
    let anchors: String = links
        .iter()
        .map(|href| format!(r#"<li><a href="{href}">{href}</a></li>"#))
        .collect();
    format!(
        r#"<html><body><a href="/">Home</a><ul class="links">{anchors}</ul></body></html>"#
    )
}

pub fn sitemap_index(feeds: &[&str]) -> String {
    let entries: String = feeds
        .iter()
        .map(|f| format!("<sitemap><loc>{f}</loc></sitemap>"))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{entries}</sitemapindex>"#
    )
}

pub fn urlset(urls: &[&str]) -> String {
    let entries: String = urls
        .iter()
        .map(|u| format!("<url><loc>{u}</loc></url>"))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{entries}</urlset>"#
    )
}
