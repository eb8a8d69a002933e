use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::config::{CrawlConfig, FetchPolicy, RelevanceModes, SitePolicy, SitemapPolicy};

/// TOML-backed crawl configuration. Secrets (Browserless token) stay as env vars.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct FileConfig {
    pub site: SiteConfig,
    pub vocabulary: VocabularyConfig,
    pub sources: SourcesConfig,
    pub limits: LimitsConfig,
    pub fetch: FetchConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct SiteConfig {
    pub base_url: String,
    pub search_path: String,
    pub tag_path: String,
    pub profile_path: String,
    pub sitemap_url: String,
    pub excluded_prefixes: Vec<String>,
    pub title_min_len: usize,
    pub title_max_len: usize,
    pub extra_platform_domains: Vec<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        let site = SitePolicy::default();
        Self {
            base_url: site.base_url,
            search_path: site.search_path,
            tag_path: site.tag_path,
            profile_path: site.profile_path,
            sitemap_url: site.sitemap_url,
            excluded_prefixes: site.excluded_prefixes,
            title_min_len: site.title_min_len,
            title_max_len: site.title_max_len,
            extra_platform_domains: site.extra_platform_domains,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct VocabularyConfig {
    pub keywords: Vec<String>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct SourcesConfig {
    pub max_refs_per_source: usize,
    pub load_depth: u32,
    /// Omit the table to skip sitemap enumeration.
    pub sitemap: Option<SitemapPolicy>,
    pub relevance: RelevanceModes,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            max_refs_per_source: 20,
            load_depth: 1,
            sitemap: None,
            relevance: RelevanceModes::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct LimitsConfig {
    pub sample_cap: usize,
    pub max_profiles_per_run: usize,
    pub checkpoint_every: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            sample_cap: 5,
            max_profiles_per_run: 0,
            checkpoint_every: 25,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct FetchConfig {
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    pub rate_limit_backoff_ms: u64,
    pub politeness_delay_ms: u64,
    pub jitter_ms: u64,
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        let policy = FetchPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            backoff_base_ms: policy.backoff_base.as_millis() as u64,
            rate_limit_backoff_ms: policy.rate_limit_backoff.as_millis() as u64,
            politeness_delay_ms: policy.politeness_delay.as_millis() as u64,
            jitter_ms: policy.jitter.as_millis() as u64,
            timeout_secs: policy.timeout.as_secs(),
        }
    }
}

impl FileConfig {
    pub fn into_crawl_config(self) -> CrawlConfig {
        let site = SitePolicy {
            base_url: self.site.base_url,
            search_path: self.site.search_path,
            tag_path: self.site.tag_path,
            profile_path: self.site.profile_path,
            sitemap_url: self.site.sitemap_url,
            excluded_prefixes: self.site.excluded_prefixes,
            title_min_len: self.site.title_min_len,
            title_max_len: self.site.title_max_len,
            extra_platform_domains: self.site.extra_platform_domains,
        };
        let fetch = FetchPolicy {
            max_attempts: self.fetch.max_attempts,
            backoff_base: Duration::from_millis(self.fetch.backoff_base_ms),
            rate_limit_backoff: Duration::from_millis(self.fetch.rate_limit_backoff_ms),
            politeness_delay: Duration::from_millis(self.fetch.politeness_delay_ms),
            jitter: Duration::from_millis(self.fetch.jitter_ms),
            timeout: Duration::from_secs(self.fetch.timeout_secs),
        };

        CrawlConfig {
            site,
            keywords: self.vocabulary.keywords,
            tags: self.vocabulary.tags,
            sitemap: self.sources.sitemap,
            max_refs_per_source: self.sources.max_refs_per_source,
            load_depth: self.sources.load_depth,
            sample_cap: self.limits.sample_cap,
            max_profiles_per_run: self.limits.max_profiles_per_run,
            checkpoint_every: self.limits.checkpoint_every,
            relevance: self.sources.relevance,
            fetch,
        }
    }
}

/// Load and parse a TOML config file.
pub fn load_config(path: &Path) -> Result<FileConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config: FileConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    Ok(config)
}
