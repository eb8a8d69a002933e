use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use byline_common::Author;
use serde::{Deserialize, Serialize};

use crate::pipeline::merger;

pub const SNAPSHOT_VERSION: u32 = 1;

/// Everything a crawl has learned so far. Threaded through every stage.
///
/// The three progress marks are independent: a slug can be seen (collected)
/// before its URL is processed, and a handle's profile is enriched on its
/// own schedule.
#[derive(Debug, Clone, Default)]
pub struct CrawlState {
    seen_slugs: HashSet<String>,
    processed_urls: HashSet<String>,
    processed_profiles: HashSet<String>,
    authors: HashMap<String, Author>,
    author_articles: HashMap<String, Vec<String>>,
}

impl CrawlState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: CrawlSnapshot, sample_cap: usize) -> Self {
        let mut state = Self::new();
        state.import(snapshot, sample_cap);
        state
    }

    // --- Slugs ---

    /// Returns `true` if the slug was not seen before.
    pub fn mark_seen(&mut self, slug: &str) -> bool {
        self.seen_slugs.insert(slug.to_string())
    }

    pub fn is_seen(&self, slug: &str) -> bool {
        self.seen_slugs.contains(slug)
    }

    // --- URLs ---

    /// Returns `true` if the URL was not processed before.
    pub fn mark_processed(&mut self, url: &str) -> bool {
        self.processed_urls.insert(url.to_string())
    }

    pub fn is_processed(&self, url: &str) -> bool {
        self.processed_urls.contains(url)
    }

    // --- Profiles ---

    pub fn mark_profile_processed(&mut self, handle: &str) -> bool {
        self.processed_profiles.insert(handle.to_string())
    }

    pub fn is_profile_processed(&self, handle: &str) -> bool {
        self.processed_profiles.contains(handle)
    }

    /// Allow the next run to enrich this handle again.
    pub fn forget_profile(&mut self, handle: &str) -> bool {
        self.processed_profiles.remove(handle)
    }

    /// Handles with no enrichment attempt yet, ascending.
    pub fn pending_profiles(&self) -> Vec<String> {
        let mut pending: Vec<String> = self
            .authors
            .keys()
            .filter(|handle| !self.processed_profiles.contains(*handle))
            .cloned()
            .collect();
        pending.sort();
        pending
    }

    // --- Authors ---

    pub fn author(&self, handle: &str) -> Option<&Author> {
        self.authors.get(handle)
    }

    pub fn author_mut(&mut self, handle: &str) -> Option<&mut Author> {
        self.authors.get_mut(handle)
    }

    pub fn authors(&self) -> impl Iterator<Item = &Author> {
        self.authors.values()
    }

    pub(crate) fn insert_author(&mut self, author: Author) {
        self.authors.insert(author.handle.clone(), author);
    }

    /// Every article URL attributed to the handle, first-seen order.
    pub fn articles_of(&self, handle: &str) -> &[String] {
        self.author_articles
            .get(handle)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Record an article URL for a handle. Returns `true` if it was new.
    pub fn record_article(&mut self, handle: &str, url: &str) -> bool {
        let articles = self.author_articles.entry(handle.to_string()).or_default();
        if articles.iter().any(|u| u == url) {
            return false;
        }
        articles.push(url.to_string());
        true
    }

    // --- Counts ---

    pub fn author_count(&self) -> usize {
        self.authors.len()
    }

    pub fn seen_count(&self) -> usize {
        self.seen_slugs.len()
    }

    pub fn processed_count(&self) -> usize {
        self.processed_urls.len()
    }

    pub fn processed_profile_count(&self) -> usize {
        self.processed_profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen_slugs.is_empty()
            && self.processed_urls.is_empty()
            && self.processed_profiles.is_empty()
            && self.authors.is_empty()
            && self.author_articles.is_empty()
    }

    /// Forget everything.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    // --- Continuation ---

    /// Union a snapshot into this state. Authors known on both sides are
    /// combined with the merger's field policy.
    pub fn import(&mut self, snapshot: CrawlSnapshot, sample_cap: usize) {
        self.seen_slugs.extend(snapshot.seen_slugs);
        self.processed_urls.extend(snapshot.processed_urls);
        self.processed_profiles.extend(snapshot.processed_profiles);

        for (handle, mut incoming) in snapshot.authors {
            match self.authors.get_mut(&handle) {
                Some(existing) => merger::absorb(existing, &incoming, sample_cap),
                None => {
                    incoming.handle = handle.clone();
                    incoming.sample_articles.truncate(sample_cap);
                    self.authors.insert(handle, incoming);
                }
            }
        }

        for (handle, urls) in snapshot.author_articles {
            for url in urls {
                self.record_article(&handle, &url);
            }
        }
    }

    /// Complete, order-independent copy of the state.
    pub fn export(&self) -> CrawlSnapshot {
        CrawlSnapshot {
            version: SNAPSHOT_VERSION,
            seen_slugs: self.seen_slugs.iter().cloned().collect(),
            processed_urls: self.processed_urls.iter().cloned().collect(),
            processed_profiles: self.processed_profiles.iter().cloned().collect(),
            authors: self
                .authors
                .iter()
                .map(|(handle, author)| (handle.clone(), author.clone()))
                .collect(),
            author_articles: self
                .author_articles
                .iter()
                .filter(|(_, urls)| !urls.is_empty())
                .map(|(handle, urls)| (handle.clone(), urls.clone()))
                .collect(),
        }
    }
}

/// Serialized crawl state. Sorted collections so identical content always
/// serializes identically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlSnapshot {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub seen_slugs: BTreeSet<String>,
    #[serde(default)]
    pub processed_urls: BTreeSet<String>,
    #[serde(default)]
    pub processed_profiles: BTreeSet<String>,
    #[serde(default)]
    pub authors: BTreeMap<String, Author>,
    #[serde(default)]
    pub author_articles: BTreeMap<String, Vec<String>>,
}

impl Default for CrawlSnapshot {
    fn default() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            seen_slugs: BTreeSet::new(),
            processed_urls: BTreeSet::new(),
            processed_profiles: BTreeSet::new(),
            authors: BTreeMap::new(),
            author_articles: BTreeMap::new(),
        }
    }
}

fn default_version() -> u32 {
    SNAPSHOT_VERSION
}
