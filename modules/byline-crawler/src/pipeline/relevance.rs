use std::collections::BTreeSet;

use byline_common::{RelevanceMode, RelevanceModes, SourceKind};

use crate::infra::util::slugify;

/// The configured keyword and tag vocabulary, matched case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    /// (original entry, lowercase spellings to look for)
    entries: Vec<(String, Vec<String>)>,
}

impl Vocabulary {
    pub fn new(keywords: &[String], tags: &[String]) -> Self {
        let mut entries: Vec<(String, Vec<String>)> = Vec::new();
        for term in keywords.iter().chain(tags) {
            let term = term.trim();
            if term.is_empty() || entries.iter().any(|(t, _)| t == term) {
                continue;
            }
            entries.push((term.to_string(), spellings(term)));
        }
        Self { entries }
    }

    /// Vocabulary entries found in any of the given texts.
    pub fn matches<'a>(&self, texts: impl IntoIterator<Item = &'a str>) -> BTreeSet<String> {
        let haystacks: Vec<String> = texts
            .into_iter()
            .map(|t| t.to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();

        self.entries
            .iter()
            .filter(|(_, needles)| {
                needles
                    .iter()
                    .any(|needle| haystacks.iter().any(|hay| hay.contains(needle.as_str())))
            })
            .map(|(term, _)| term.clone())
            .collect()
    }
}

/// `Indie Hacker` matches "indie hacker" in prose and `indie-hacker` in tag slugs.
fn spellings(term: &str) -> Vec<String> {
    let lowered = term.to_lowercase();
    let mut out = vec![lowered.clone()];
    for variant in [lowered.replace('-', " "), slugify(term)] {
        if !variant.is_empty() && !out.contains(&variant) {
            out.push(variant);
        }
    }
    out
}

/// Decides whether an extracted page is on-topic enough to keep.
pub trait RelevanceFilter: Send + Sync {
    /// `matched` holds the vocabulary entries found on the page, not the
    /// source's own keyword.
    fn accept(&self, kind: SourceKind, matched: &BTreeSet<String>) -> bool;
}

/// Per-source-kind rule: implicit sources always pass, the rest need a match.
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceRelevance {
    modes: RelevanceModes,
}

impl SourceRelevance {
    pub fn new(modes: RelevanceModes) -> Self {
        Self { modes }
    }
}

impl RelevanceFilter for SourceRelevance {
    fn accept(&self, kind: SourceKind, matched: &BTreeSet<String>) -> bool {
        match self.modes.for_kind(kind) {
            RelevanceMode::Implicit => true,
            RelevanceMode::RequireMatch => !matched.is_empty(),
        }
    }
}
