//! Content extraction: one ContentRef in, at most one author observation out.
//!
//! Identity comes from JSON-LD first (`author` on the first object that has
//! one, including inside `@graph`), then from the first `/@handle` anchor in
//! document order. Relevance is decided by the configured `RelevanceFilter`.

use std::collections::BTreeSet;

use byline_common::{Author, ContentRef, SampleArticle, SitePolicy, SourceKind};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::FetchError;
use crate::infra::html::Document;
use crate::infra::links::{absolute_href, is_external_website, resolve_href};
use crate::infra::util::collapse_whitespace;
use crate::infra::Fetcher;
use crate::pipeline::relevance::{RelevanceFilter, Vocabulary};
use crate::pipeline::state::CrawlState;

/// One author observation derived from one content page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub handle: String,
    pub display_name: String,
    pub profile_url: Option<String>,
    pub bio: Option<String>,
    pub website: Option<String>,
    pub matched_keywords: BTreeSet<String>,
    pub article: SampleArticle,
}

impl Extraction {
    /// The observation as a single-article author record.
    pub fn to_author(&self) -> Author {
        let mut author = Author::new(&self.handle);
        if !self.display_name.trim().is_empty() {
            author.display_name = self.display_name.trim().to_string();
        }
        author.profile_url = self.profile_url.clone();
        author.bio = self.bio.clone();
        author.website = self.website.clone();
        author.matched_keywords = self.matched_keywords.clone();
        author.sample_articles = vec![self.article.clone()];
        author
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractOutcome {
    /// URL was processed by an earlier run or source. Nothing fetched.
    AlreadyProcessed,
    Extracted(Extraction),
    NoAuthor,
    Irrelevant,
    FetchFailed(FetchError),
}

impl ExtractOutcome {
    pub fn into_extraction(self) -> Option<Extraction> {
        match self {
            ExtractOutcome::Extracted(extraction) => Some(extraction),
            _ => None,
        }
    }
}

pub struct Extractor<'a> {
    site: &'a SitePolicy,
    vocabulary: &'a Vocabulary,
    relevance: &'a dyn RelevanceFilter,
}

impl<'a> Extractor<'a> {
    pub fn new(
        site: &'a SitePolicy,
        vocabulary: &'a Vocabulary,
        relevance: &'a dyn RelevanceFilter,
    ) -> Self {
        Self {
            site,
            vocabulary,
            relevance,
        }
    }

    /// Process one ref. The URL is marked processed before the fetch, so it
    /// is never attempted twice whatever the outcome.
    pub async fn extract(
        &self,
        fetcher: &Fetcher,
        content_ref: &ContentRef,
        state: &mut CrawlState,
    ) -> ExtractOutcome {
        if !state.mark_processed(&content_ref.url) {
            debug!(url = %content_ref.url, "Already processed, skipping");
            return ExtractOutcome::AlreadyProcessed;
        }

        let html = match fetcher.fetch(&content_ref.url).await {
            Ok(html) => html,
            Err(err) => {
                warn!(url = %content_ref.url, error = %err, "Content fetch failed, skipping");
                return ExtractOutcome::FetchFailed(err);
            }
        };

        let outcome = self.extract_html(&html, content_ref);
        match &outcome {
            ExtractOutcome::Extracted(extraction) => info!(
                url = %content_ref.url,
                handle = %extraction.handle,
                keywords = extraction.matched_keywords.len(),
                "Author extracted"
            ),
            ExtractOutcome::NoAuthor => info!(url = %content_ref.url, "No author on page"),
            ExtractOutcome::Irrelevant => {
                info!(url = %content_ref.url, source = %content_ref.source_kind, "Page not relevant")
            }
            _ => {}
        }
        outcome
    }

    /// Derive the extraction from already-fetched markup. No state access.
    pub fn extract_html(&self, html: &str, content_ref: &ContentRef) -> ExtractOutcome {
        let doc = Document::parse(html);
        let structured = StructuredData::from_document(&doc, self.site);
        let fallback = dom_identity(&doc, self.site);

        let Some(identity) = Identity::resolve(structured.identity, fallback) else {
            return ExtractOutcome::NoAuthor;
        };

        let title = structured
            .headline
            .or_else(|| doc.meta("og:title"))
            .or_else(|| doc.first_h1())
            .unwrap_or_else(|| content_ref.title.clone());
        let excerpt = doc
            .meta("description")
            .or_else(|| doc.meta("og:description"))
            .or(structured.description)
            .unwrap_or_default();

        let mut tags = tag_slugs(&doc, self.site);
        tags.extend(structured.keywords);

        let vocab_matches = self.vocabulary.matches(
            [title.as_str(), excerpt.as_str()]
                .into_iter()
                .chain(tags.iter().map(String::as_str)),
        );
        if !self.relevance.accept(content_ref.source_kind, &vocab_matches) {
            return ExtractOutcome::Irrelevant;
        }

        let provenance_keyword = match content_ref.source_kind {
            SourceKind::Keyword | SourceKind::Tag => Some(content_ref.provenance.clone()),
            SourceKind::Sitemap => None,
        };
        let sample_keyword = provenance_keyword
            .clone()
            .or_else(|| vocab_matches.iter().next().cloned())
            .unwrap_or_default();
        let mut matched_keywords = vocab_matches;
        matched_keywords.extend(provenance_keyword);

        let display_name = identity.name.unwrap_or_else(|| identity.handle.clone());
        ExtractOutcome::Extracted(Extraction {
            display_name,
            profile_url: Some(self.site.profile_url(&identity.handle)),
            bio: identity.bio,
            website: identity.website,
            matched_keywords,
            article: SampleArticle {
                title,
                url: content_ref.url.clone(),
                keyword: sample_keyword,
            },
            handle: identity.handle,
        })
    }
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct PartialIdentity {
    handle: Option<String>,
    name: Option<String>,
    bio: Option<String>,
    website: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Identity {
    handle: String,
    name: Option<String>,
    bio: Option<String>,
    website: Option<String>,
}

impl Identity {
    /// Structured data wins field by field; the DOM fills what it lacks,
    /// unless it names a different handle.
    fn resolve(structured: Option<PartialIdentity>, dom: Option<PartialIdentity>) -> Option<Self> {
        let structured = structured.unwrap_or_default();
        let dom = dom
            .filter(|d| structured.handle.is_none() || d.handle == structured.handle)
            .unwrap_or_default();
        let handle = structured.handle.or(dom.handle)?;
        Some(Self {
            handle,
            name: structured.name.or(dom.name),
            bio: structured.bio.or(dom.bio),
            website: structured.website.or(dom.website),
        })
    }
}

/// The handle in a profile path (`/@jdoe` → `jdoe`).
fn handle_from_path(path: &str, profile_prefix: &str) -> Option<String> {
    let rest = path.strip_prefix(profile_prefix)?;
    let handle = rest.split(['/', '?', '#']).next()?.trim();
    if handle.is_empty() {
        None
    } else {
        Some(handle.to_string())
    }
}

/// The handle of an on-site profile link, absolute or root-relative.
fn handle_from_href(href: &str, site: &SitePolicy) -> Option<String> {
    let base = Url::parse(&site.base_url).ok()?;
    let resolved = resolve_href(href, Some(&base))?;
    let site_host = site.host()?;
    let host = resolved.host_str()?.trim_start_matches("www.").to_ascii_lowercase();
    if host != site_host {
        return None;
    }
    handle_from_path(resolved.path(), site.profile_prefix())
}

fn dom_identity(doc: &Document, site: &SitePolicy) -> Option<PartialIdentity> {
    doc.anchors().into_iter().find_map(|anchor| {
        let handle = handle_from_href(&anchor.href, site)?;
        let name = Some(anchor.text).filter(|t| !t.is_empty());
        Some(PartialIdentity {
            handle: Some(handle),
            name,
            bio: None,
            website: None,
        })
    })
}

// ---------------------------------------------------------------------------
// JSON-LD
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct StructuredData {
    identity: Option<PartialIdentity>,
    headline: Option<String>,
    description: Option<String>,
    keywords: Vec<String>,
}

impl StructuredData {
    fn from_document(doc: &Document, site: &SitePolicy) -> Self {
        let blocks = doc.json_ld();
        let Some(object) = blocks.iter().find_map(find_authored) else {
            return Self::default();
        };

        let identity = object
            .get("author")
            .and_then(first_author)
            .map(|author| ld_identity(author, site));

        Self {
            identity,
            headline: ld_string(object, "headline"),
            description: ld_string(object, "description"),
            keywords: ld_keywords(object.get("keywords")),
        }
    }
}

/// First object carrying an `author` member, searching arrays and `@graph`.
fn find_authored(value: &Value) -> Option<&Map<String, Value>> {
    match value {
        Value::Array(items) => items.iter().find_map(find_authored),
        Value::Object(map) if map.contains_key("author") => Some(map),
        Value::Object(map) => map.get("@graph").and_then(find_authored),
        _ => None,
    }
}

fn first_author(value: &Value) -> Option<&Value> {
    match value {
        Value::Array(items) => items.first(),
        Value::Null => None,
        other => Some(other),
    }
}

fn ld_identity(author: &Value, site: &SitePolicy) -> PartialIdentity {
    let Value::Object(map) = author else {
        // Bare string author: a name and nothing else.
        return PartialIdentity {
            name: author.as_str().map(collapse_whitespace).filter(|s| !s.is_empty()),
            ..PartialIdentity::default()
        };
    };

    // `url` names the author only when it is a profile on the crawled site;
    // anywhere else it is a candidate website
    let handle = ld_string(map, "url")
        .and_then(|u| handle_from_href(&u, site))
        .or_else(|| {
            ld_string(map, "alternateName")
                .map(|alt| alt.trim_start_matches('@').trim().to_string())
                .filter(|alt| !alt.is_empty() && !alt.contains(char::is_whitespace))
        });

    let site_host = site.host();
    let website = ld_links(map)
        .into_iter()
        .filter_map(|link| absolute_href(&link))
        .find(|link| {
            is_external_website(link, site_host.as_deref(), &site.extra_platform_domains)
        })
        .map(|link| link.to_string());

    PartialIdentity {
        handle,
        name: ld_string(map, "name"),
        bio: ld_string(map, "description"),
        website,
    }
}

/// `sameAs` entries then `url`, in that order.
fn ld_links(map: &Map<String, Value>) -> Vec<String> {
    let mut links = Vec::new();
    match map.get("sameAs") {
        Some(Value::String(s)) => links.push(s.clone()),
        Some(Value::Array(items)) => {
            links.extend(items.iter().filter_map(Value::as_str).map(String::from))
        }
        _ => {}
    }
    if let Some(url) = map.get("url").and_then(Value::as_str) {
        links.push(url.to_string());
    }
    links
}

fn ld_string(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key)
        .and_then(Value::as_str)
        .map(collapse_whitespace)
        .filter(|s| !s.is_empty())
}

fn ld_keywords(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(s)) => s
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(String::from)
            .collect(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(String::from)
            .collect(),
        _ => Vec::new(),
    }
}

// ---------------------------------------------------------------------------
// Tags
// ---------------------------------------------------------------------------

/// Slugs of every on-site tag link (`/t/saas` → `saas`), decoded, document order.
fn tag_slugs(doc: &Document, site: &SitePolicy) -> Vec<String> {
    let (Ok(base), Some(site_host)) = (Url::parse(&site.base_url), site.host()) else {
        return Vec::new();
    };
    let prefix = site.tag_prefix();
    let mut slugs: Vec<String> = Vec::new();
    for href in doc.hrefs() {
        let Some(resolved) = resolve_href(&href, Some(&base)) else {
            continue;
        };
        let on_site = resolved
            .host_str()
            .is_some_and(|h| h.trim_start_matches("www.").eq_ignore_ascii_case(&site_host));
        if !on_site {
            continue;
        }
        let Some(rest) = resolved.path().strip_prefix(prefix) else {
            continue;
        };
        let raw = rest.split('/').next().unwrap_or("");
        let slug = urlencoding::decode(raw)
            .map(|s| s.to_lowercase())
            .unwrap_or_else(|_| raw.to_lowercase());
        if !slug.is_empty() && !slugs.contains(&slug) {
            slugs.push(slug);
        }
    }
    slugs
}
