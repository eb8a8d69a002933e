use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;
use typed_builder::TypedBuilder;

use crate::error::BylineError;
use crate::types::{SourceDescriptor, SourceKind};

// ---------------------------------------------------------------------------
// Deployment config (env)
// ---------------------------------------------------------------------------

/// Deployment settings loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Page source
    pub browserless_url: Option<String>,
    pub browserless_token: Option<String>,

    // Files
    pub config_path: PathBuf,
    pub state_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            browserless_url: optional_env("BROWSERLESS_URL"),
            browserless_token: optional_env("BROWSERLESS_TOKEN"),
            config_path: optional_env("BYLINE_CONFIG")
                .unwrap_or_else(|| "byline.toml".to_string())
                .into(),
            state_path: optional_env("BYLINE_STATE_PATH")
                .unwrap_or_else(|| "byline-state.json".to_string())
                .into(),
        }
    }

    /// Log the effective settings with secrets masked.
    pub fn log_redacted(&self) {
        info!(
            browserless_url = self.browserless_url.as_deref().unwrap_or("(none)"),
            browserless_token = if self.browserless_token.is_some() { "***" } else { "(none)" },
            config_path = %self.config_path.display(),
            state_path = %self.state_path.display(),
            "Configuration loaded"
        );
    }
}

fn optional_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

// ---------------------------------------------------------------------------
// Crawl config (runtime)
// ---------------------------------------------------------------------------

/// Everything a crawl run needs to know. Pure data.
#[derive(Debug, Clone, TypedBuilder)]
pub struct CrawlConfig {
    #[builder(default)]
    pub site: SitePolicy,
    #[builder(default)]
    pub keywords: Vec<String>,
    #[builder(default)]
    pub tags: Vec<String>,
    /// `None` disables the sitemap source.
    #[builder(default, setter(strip_option))]
    pub sitemap: Option<SitemapPolicy>,
    #[builder(default = 20)]
    pub max_refs_per_source: usize,
    /// Listing pages fetched per keyword/tag source.
    #[builder(default = 1)]
    pub load_depth: u32,
    #[builder(default = 5)]
    pub sample_cap: usize,
    /// 0 = no limit.
    #[builder(default)]
    pub max_profiles_per_run: usize,
    /// Save state every N processed units when a store is attached. 0 disables.
    #[builder(default = 25)]
    pub checkpoint_every: usize,
    #[builder(default)]
    pub relevance: RelevanceModes,
    #[builder(default)]
    pub fetch: FetchPolicy,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl CrawlConfig {
    /// Sources in run order: keywords, then tags, then the sitemap.
    pub fn sources(&self) -> Vec<SourceDescriptor> {
        let mut sources: Vec<SourceDescriptor> = self
            .keywords
            .iter()
            .map(|k| SourceDescriptor::Keyword(k.clone()))
            .collect();
        sources.extend(self.tags.iter().map(|t| SourceDescriptor::Tag(t.clone())));
        if self.sitemap.is_some() {
            sources.push(SourceDescriptor::Sitemap(self.site.sitemap_index_url()));
        }
        sources
    }

    pub fn validate(&self) -> Result<(), BylineError> {
        url::Url::parse(&self.site.base_url).map_err(|e| BylineError::InvalidUrl {
            url: self.site.base_url.clone(),
            reason: e.to_string(),
        })?;
        if !self.site.search_path.contains("{query}") {
            return Err(BylineError::Config("site.search_path must contain {query}".into()));
        }
        if !self.site.tag_path.contains("{tag}") {
            return Err(BylineError::Config("site.tag_path must contain {tag}".into()));
        }
        if !self.site.profile_path.contains("{handle}") {
            return Err(BylineError::Config("site.profile_path must contain {handle}".into()));
        }
        if self.sample_cap == 0 {
            return Err(BylineError::Config("limits.sample_cap must be at least 1".into()));
        }
        if self.fetch.max_attempts == 0 {
            return Err(BylineError::Config("fetch.max_attempts must be at least 1".into()));
        }
        if self.site.title_min_len > self.site.title_max_len {
            return Err(BylineError::Config(
                "site.title_min_len must not exceed site.title_max_len".into(),
            ));
        }
        Ok(())
    }
}

// --- Site ---

/// URL layout of the crawled site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitePolicy {
    pub base_url: String,
    pub search_path: String,
    pub tag_path: String,
    pub profile_path: String,
    pub sitemap_url: String,
    /// First-segment prefixes that never name a content page.
    pub excluded_prefixes: Vec<String>,
    pub title_min_len: usize,
    pub title_max_len: usize,
    /// Extra hosts treated as platforms when picking a generic website link.
    pub extra_platform_domains: Vec<String>,
}

impl Default for SitePolicy {
    fn default() -> Self {
        Self {
            base_url: "https://example.com".to_string(),
            search_path: "/search?q={query}".to_string(),
            tag_path: "/t/{tag}".to_string(),
            profile_path: "/@{handle}".to_string(),
            sitemap_url: "/sitemap.xml".to_string(),
            excluded_prefixes: [
                "@", "tag", "tags", "search", "login", "sign-in", "signup", "sign-up", "auth",
                "editor", "settings", "dashboard",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            title_min_len: 10,
            title_max_len: 200,
            extra_platform_domains: Vec::new(),
        }
    }
}

impl SitePolicy {
    fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Host of the crawled site, without a leading `www.`.
    pub fn host(&self) -> Option<String> {
        let parsed = url::Url::parse(&self.base_url).ok()?;
        let host = parsed.host_str()?;
        Some(host.trim_start_matches("www.").to_ascii_lowercase())
    }

    /// Resolve a root-relative path or pass an absolute URL through.
    pub fn absolute(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{path}", self.base())
        } else {
            format!("{}/{path}", self.base())
        }
    }

    pub fn search_url(&self, query: &str) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(query.as_bytes()).collect();
        self.absolute(&self.search_path.replace("{query}", &encoded))
    }

    pub fn tag_url(&self, tag: &str) -> String {
        self.absolute(&self.tag_path.replace("{tag}", &urlencoding::encode(tag)))
    }

    pub fn profile_url(&self, handle: &str) -> String {
        self.absolute(&self.profile_path.replace("{handle}", handle))
    }

    pub fn sitemap_index_url(&self) -> String {
        self.absolute(&self.sitemap_url)
    }

    /// Path prefix preceding the handle in profile links, e.g. `/@`.
    pub fn profile_prefix(&self) -> &str {
        self.profile_path
            .split("{handle}")
            .next()
            .unwrap_or(&self.profile_path)
    }

    /// Path prefix preceding the tag slug in tag links, e.g. `/t/`.
    pub fn tag_prefix(&self) -> &str {
        self.tag_path.split("{tag}").next().unwrap_or(&self.tag_path)
    }
}

// --- Sitemap ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SitemapPolicy {
    /// Number of sub-feeds read per run.
    pub count: usize,
    /// Take sub-feeds from the end of the index (most sites append new feeds last).
    pub newest_first: bool,
}

impl Default for SitemapPolicy {
    fn default() -> Self {
        Self {
            count: 3,
            newest_first: true,
        }
    }
}

// --- Relevance ---

/// Whether a source kind's pages must re-prove topical relevance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelevanceMode {
    /// The source was chosen for its topic; every page counts.
    Implicit,
    /// Title, excerpt or tags must match the vocabulary.
    RequireMatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelevanceModes {
    pub keyword: RelevanceMode,
    pub tag: RelevanceMode,
    pub sitemap: RelevanceMode,
}

impl Default for RelevanceModes {
    fn default() -> Self {
        Self {
            keyword: RelevanceMode::Implicit,
            tag: RelevanceMode::Implicit,
            sitemap: RelevanceMode::RequireMatch,
        }
    }
}

impl RelevanceModes {
    pub fn for_kind(&self, kind: SourceKind) -> RelevanceMode {
        match kind {
            SourceKind::Keyword => self.keyword,
            SourceKind::Tag => self.tag,
            SourceKind::Sitemap => self.sitemap,
        }
    }
}

// --- Fetch ---

/// Retry, backoff and politeness timings for every page fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPolicy {
    pub max_attempts: u32,
    /// Backoff before retry n is `backoff_base * 2^n`.
    pub backoff_base: Duration,
    /// Minimum wait after a rate-limit signal.
    pub rate_limit_backoff: Duration,
    /// Pause after every fetch, successful or not.
    pub politeness_delay: Duration,
    /// Upper bound of random jitter added to every wait.
    pub jitter: Duration,
    pub timeout: Duration,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_secs(2),
            rate_limit_backoff: Duration::from_secs(30),
            politeness_delay: Duration::from_millis(1500),
            jitter: Duration::from_millis(500),
            timeout: Duration::from_secs(30),
        }
    }
}

impl FetchPolicy {
    /// Same attempt budget, no waiting. For dry runs against local fixtures.
    pub fn without_delays() -> Self {
        Self {
            backoff_base: Duration::ZERO,
            rate_limit_backoff: Duration::ZERO,
            politeness_delay: Duration::ZERO,
            jitter: Duration::ZERO,
            ..Self::default()
        }
    }
}
