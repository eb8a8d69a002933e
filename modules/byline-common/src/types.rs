use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

// --- Sources ---

/// Which discovery strategy produced a content reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Keyword,
    Tag,
    Sitemap,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Keyword => write!(f, "keyword"),
            SourceKind::Tag => write!(f, "tag"),
            SourceKind::Sitemap => write!(f, "sitemap"),
        }
    }
}

/// One configured source the collector walks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum SourceDescriptor {
    /// Site search for a keyword.
    Keyword(String),
    /// Topic listing for a tag slug.
    Tag(String),
    /// Sitemap index; sub-feeds are picked by the sitemap policy.
    Sitemap(String),
}

impl SourceDescriptor {
    pub fn kind(&self) -> SourceKind {
        match self {
            SourceDescriptor::Keyword(_) => SourceKind::Keyword,
            SourceDescriptor::Tag(_) => SourceKind::Tag,
            SourceDescriptor::Sitemap(_) => SourceKind::Sitemap,
        }
    }

    /// The keyword, tag slug or sitemap URL.
    pub fn value(&self) -> &str {
        match self {
            SourceDescriptor::Keyword(v) | SourceDescriptor::Tag(v) | SourceDescriptor::Sitemap(v) => {
                v
            }
        }
    }
}

impl fmt::Display for SourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.value())
    }
}

/// A candidate content page produced by the collector and consumed once by the extractor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRef {
    pub slug: String,
    pub url: String,
    /// Heading text paired with the anchor. Empty for sitemap refs.
    pub title: String,
    /// Keyword, tag slug or sitemap sub-feed URL that surfaced this ref.
    pub provenance: String,
    pub source_kind: SourceKind,
}

// --- Authors ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleArticle {
    pub title: String,
    pub url: String,
    pub keyword: String,
}

/// Canonical author record, keyed by handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub handle: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default)]
    pub matched_keywords: BTreeSet<String>,
    #[serde(default)]
    pub sample_articles: Vec<SampleArticle>,
}

impl Author {
    /// A bare record whose display name is the handle itself.
    pub fn new(handle: impl Into<String>) -> Self {
        let handle = handle.into();
        Self {
            display_name: handle.clone(),
            handle,
            profile_url: None,
            bio: None,
            twitter: None,
            linkedin: None,
            github: None,
            website: None,
            matched_keywords: BTreeSet::new(),
            sample_articles: Vec::new(),
        }
    }

    pub fn has_bio(&self) -> bool {
        is_filled(&self.bio)
    }

    pub fn has_website(&self) -> bool {
        is_filled(&self.website)
    }

    pub fn has_twitter(&self) -> bool {
        is_filled(&self.twitter)
    }

    pub fn has_linkedin(&self) -> bool {
        is_filled(&self.linkedin)
    }

    pub fn has_github(&self) -> bool {
        is_filled(&self.github)
    }
}

/// True when the option holds a non-blank string.
pub fn is_filled(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}
