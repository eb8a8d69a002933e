//! Frontier collection: turn a source descriptor into fresh ContentRefs.

use std::collections::HashSet;

use byline_common::{ContentRef, CrawlConfig, SitePolicy, SourceDescriptor, SourceKind};
use tracing::{debug, info, warn};
use url::Url;

use crate::infra::html::Document;
use crate::infra::util::{content_slug, page_url};
use crate::infra::Fetcher;
use crate::pipeline::sitemap::{select_feeds, SitemapDoc};
use crate::pipeline::state::CrawlState;

pub struct Collector<'a> {
    fetcher: &'a Fetcher,
    config: &'a CrawlConfig,
}

impl<'a> Collector<'a> {
    pub fn new(fetcher: &'a Fetcher, config: &'a CrawlConfig) -> Self {
        Self { fetcher, config }
    }

    /// Collect unseen refs for one source, at most `max_refs_per_source`.
    /// Fetch failures end the source early; they never abort the run.
    pub async fn collect(&self, source: &SourceDescriptor, state: &mut CrawlState) -> Vec<ContentRef> {
        let refs = match source {
            SourceDescriptor::Keyword(keyword) => {
                let url = self.config.site.search_url(keyword);
                self.collect_listing(source, &url, state).await
            }
            SourceDescriptor::Tag(tag) => {
                let url = self.config.site.tag_url(tag);
                self.collect_listing(source, &url, state).await
            }
            SourceDescriptor::Sitemap(index_url) => self.collect_sitemap(index_url, state).await,
        };
        info!(source = %source, refs = refs.len(), "Source collected");
        refs
    }

    async fn collect_listing(
        &self,
        source: &SourceDescriptor,
        base_url: &str,
        state: &mut CrawlState,
    ) -> Vec<ContentRef> {
        let cap = self.config.max_refs_per_source;
        let mut collected = Vec::new();

        for page in 1..=self.config.load_depth.max(1) {
            let url = page_url(base_url, page);
            let html = match self.fetcher.fetch(&url).await {
                Ok(html) => html,
                Err(err) => {
                    warn!(source = %source, url = %url, error = %err, "Listing fetch failed, source skipped");
                    break;
                }
            };

            let candidates = candidates_from_listing(&html, source, &self.config.site);
            let admitted = admit(candidates, state, remaining(cap, collected.len()));
            debug!(source = %source, page, admitted = admitted.len(), "Listing page read");
            if admitted.is_empty() {
                break;
            }
            collected.extend(admitted);
            if remaining(cap, collected.len()) == 0 {
                break;
            }
        }
        collected
    }

    async fn collect_sitemap(&self, index_url: &str, state: &mut CrawlState) -> Vec<ContentRef> {
        let cap = self.config.max_refs_per_source;
        let policy = self.config.sitemap.unwrap_or_default();

        let index = match self.fetcher.fetch(index_url).await {
            Ok(xml) => SitemapDoc::parse(&xml),
            Err(err) => {
                warn!(url = index_url, error = %err, "Sitemap index fetch failed, source skipped");
                return Vec::new();
            }
        };

        let feeds: Vec<(String, Vec<String>)> = match index {
            SitemapDoc::UrlSet(locs) => vec![(index_url.to_string(), locs)],
            SitemapDoc::Index(feeds) => {
                let mut loaded = Vec::new();
                for feed_url in select_feeds(&feeds, &policy) {
                    match self.fetcher.fetch(&feed_url).await {
                        Ok(xml) => match SitemapDoc::parse(&xml) {
                            SitemapDoc::UrlSet(locs) => loaded.push((feed_url, locs)),
                            SitemapDoc::Index(_) => {
                                debug!(url = %feed_url, "Nested sitemap index ignored")
                            }
                        },
                        Err(err) => {
                            warn!(url = %feed_url, error = %err, "Sitemap feed fetch failed, skipped")
                        }
                    }
                }
                loaded
            }
        };

        let mut collected = Vec::new();
        for (feed_url, locs) in feeds {
            let candidates = candidates_from_locs(&locs, &feed_url, &self.config.site);
            collected.extend(admit(candidates, state, remaining(cap, collected.len())));
            if remaining(cap, collected.len()) == 0 {
                break;
            }
        }
        collected
    }
}

/// Slots left under a cap. A cap of 0 means unlimited.
fn remaining(cap: usize, used: usize) -> usize {
    if cap == 0 {
        usize::MAX
    } else {
        cap.saturating_sub(used)
    }
}

/// Content-looking anchors on a listing page, in document order, first
/// occurrence of each slug kept.
pub fn candidates_from_listing(
    html: &str,
    source: &SourceDescriptor,
    site: &SitePolicy,
) -> Vec<ContentRef> {
    let site_host = site.host();
    let mut slugs = HashSet::new();
    let mut refs = Vec::new();

    for anchor in Document::parse(html).anchors() {
        let Some(path) = on_site_path(&anchor.href, site_host.as_deref()) else {
            continue;
        };
        let Some(slug) = content_slug(&path, &site.excluded_prefixes) else {
            continue;
        };
        let title = anchor.label().to_string();
        let title_len = title.chars().count();
        if title_len < site.title_min_len || title_len > site.title_max_len {
            debug!(slug = %slug, title_len, "Anchor title out of range");
            continue;
        }
        if !slugs.insert(slug.clone()) {
            continue;
        }
        refs.push(ContentRef {
            url: site.absolute(&format!("/{slug}")),
            slug,
            title,
            provenance: source.value().to_string(),
            source_kind: source.kind(),
        });
    }
    refs
}

/// Content-looking page locations from one sitemap sub-feed.
pub fn candidates_from_locs(locs: &[String], feed_url: &str, site: &SitePolicy) -> Vec<ContentRef> {
    let site_host = site.host();
    let mut slugs = HashSet::new();
    locs.iter()
        .filter_map(|loc| on_site_path(loc, site_host.as_deref()))
        .filter_map(|path| content_slug(&path, &site.excluded_prefixes))
        .filter(|slug| slugs.insert(slug.clone()))
        .map(|slug| ContentRef {
            url: site.absolute(&format!("/{slug}")),
            slug,
            title: String::new(),
            provenance: feed_url.to_string(),
            source_kind: SourceKind::Sitemap,
        })
        .collect()
}

/// Root-relative hrefs pass through; absolute ones must be on the crawled host.
fn on_site_path(href: &str, site_host: Option<&str>) -> Option<String> {
    if href.starts_with('/') && !href.starts_with("//") {
        return Some(href.to_string());
    }
    let parsed = Url::parse(href).ok()?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return None;
    }
    let host = parsed.host_str()?.trim_start_matches("www.").to_ascii_lowercase();
    if Some(host.as_str()) != site_host {
        return None;
    }
    Some(parsed.path().to_string())
}

/// Drop refs already seen or processed, cap what is left, and mark the
/// survivors seen.
pub fn admit(candidates: Vec<ContentRef>, state: &mut CrawlState, cap: usize) -> Vec<ContentRef> {
    let mut admitted = Vec::new();
    let mut batch = HashSet::new();
    for candidate in candidates {
        if admitted.len() >= cap {
            break;
        }
        if !batch.insert(candidate.slug.clone())
            || state.is_seen(&candidate.slug)
            || state.is_processed(&candidate.url)
        {
            continue;
        }
        admitted.push(candidate);
    }
    for content_ref in &admitted {
        state.mark_seen(&content_ref.slug);
    }
    admitted
}
