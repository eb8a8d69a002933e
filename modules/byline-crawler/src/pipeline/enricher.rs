// Profile enrichment: one fetch per author, ever, unless explicitly forgotten.
//
// Links are scanned in document order; the first link per field wins and
// fields already filled on the author are left alone.

use byline_common::{Author, CrawlConfig, SitePolicy};
use tracing::{info, warn};

use crate::error::FetchError;
use crate::infra::html::Document;
use crate::infra::links::{absolute_href, classify, is_external_website, platform_identifier, Platform};
use crate::infra::Fetcher;
use crate::pipeline::merger::fill_once;
use crate::pipeline::state::CrawlState;

/// External identity links found on a profile page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileLinks {
    pub twitter: Option<String>,
    pub linkedin: Option<String>,
    pub github: Option<String>,
    pub website: Option<String>,
}

impl ProfileLinks {
    fn is_complete(&self) -> bool {
        self.twitter.is_some() && self.linkedin.is_some() && self.github.is_some() && self.website.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrichOutcome {
    /// Profile read; `fields_filled` counts fields that were empty before.
    Enriched { fields_filled: usize },
    /// Handle was already enriched, or is unknown.
    Skipped,
    FetchFailed(FetchError),
}

pub struct Enricher<'a> {
    fetcher: &'a Fetcher,
    config: &'a CrawlConfig,
}

impl<'a> Enricher<'a> {
    pub fn new(fetcher: &'a Fetcher, config: &'a CrawlConfig) -> Self {
        Self { fetcher, config }
    }

    /// Handles to enrich this run, ascending, bounded by `max_profiles_per_run`.
    pub fn pending(&self, state: &CrawlState) -> Vec<String> {
        let mut pending = state.pending_profiles();
        if self.config.max_profiles_per_run > 0 {
            pending.truncate(self.config.max_profiles_per_run);
        }
        pending
    }

    /// Mark the profile processed, fetch it once, fill empty link fields.
    pub async fn enrich(&self, handle: &str, state: &mut CrawlState) -> EnrichOutcome {
        let Some(author) = state.author(handle) else {
            return EnrichOutcome::Skipped;
        };
        let url = author
            .profile_url
            .clone()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| self.config.site.profile_url(handle));

        if !state.mark_profile_processed(handle) {
            return EnrichOutcome::Skipped;
        }

        let html = match self.fetcher.fetch(&url).await {
            Ok(html) => html,
            Err(err) => {
                warn!(handle, url = %url, error = %err, "Profile fetch failed, not retried this run");
                return EnrichOutcome::FetchFailed(err);
            }
        };

        let links = profile_links(&html, &self.config.site);
        let fields_filled = match state.author_mut(handle) {
            Some(author) => apply(author, &links),
            None => 0,
        };
        info!(handle, fields_filled, "Profile enriched");
        EnrichOutcome::Enriched { fields_filled }
    }
}

/// Scan absolute anchors in document order for identity links.
pub fn profile_links(html: &str, site: &SitePolicy) -> ProfileLinks {
    let site_host = site.host();
    let mut links = ProfileLinks::default();

    for href in Document::parse(html).hrefs() {
        let Some(url) = absolute_href(&href) else {
            continue;
        };
        match classify(&url) {
            Some(Platform::Twitter) if links.twitter.is_none() => {
                links.twitter = platform_identifier(Platform::Twitter, &url);
            }
            Some(Platform::LinkedIn) if links.linkedin.is_none() => {
                links.linkedin = platform_identifier(Platform::LinkedIn, &url);
            }
            Some(Platform::GitHub) if links.github.is_none() => {
                links.github = platform_identifier(Platform::GitHub, &url);
            }
            Some(_) => {}
            None => {
                if links.website.is_none()
                    && is_external_website(&url, site_host.as_deref(), &site.extra_platform_domains)
                {
                    links.website = Some(url.to_string());
                }
            }
        }
        if links.is_complete() {
            break;
        }
    }
    links
}

/// Fill the author's empty link fields. Returns how many changed.
pub fn apply(author: &mut Author, links: &ProfileLinks) -> usize {
    [
        fill_once(&mut author.twitter, &links.twitter),
        fill_once(&mut author.linkedin, &links.linkedin),
        fill_once(&mut author.github, &links.github),
        fill_once(&mut author.website, &links.website),
    ]
    .into_iter()
    .filter(|changed| *changed)
    .count()
}
