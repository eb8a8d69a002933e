// Folding extractions into canonical authors.
//
// Policy: keywords only grow; optional fields fill once and are never
// replaced; the display name may be upgraded to a strictly longer one;
// sample articles stop at the cap, oldest first.

use byline_common::{is_filled, Author, SampleArticle};
use tracing::debug;

use crate::pipeline::extractor::Extraction;
use crate::pipeline::state::CrawlState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Created,
    Updated,
}

/// Fold one extraction into the state's author map.
pub fn merge(state: &mut CrawlState, extraction: &Extraction, sample_cap: usize) -> MergeOutcome {
    let incoming = extraction.to_author();
    state.record_article(&extraction.handle, &extraction.article.url);

    match state.author_mut(&extraction.handle) {
        Some(existing) => {
            absorb(existing, &incoming, sample_cap);
            debug!(
                handle = %extraction.handle,
                keywords = existing.matched_keywords.len(),
                samples = existing.sample_articles.len(),
                "Merged into existing author"
            );
            MergeOutcome::Updated
        }
        None => {
            let mut author = incoming;
            author.sample_articles.truncate(sample_cap);
            state.insert_author(author);
            MergeOutcome::Created
        }
    }
}

/// Combine `incoming` into `existing` under the field policy.
pub fn absorb(existing: &mut Author, incoming: &Author, sample_cap: usize) {
    existing
        .matched_keywords
        .extend(incoming.matched_keywords.iter().cloned());

    for article in &incoming.sample_articles {
        add_sample(&mut existing.sample_articles, article, sample_cap);
    }

    upgrade_name(&mut existing.display_name, &incoming.display_name);

    fill_once(&mut existing.profile_url, &incoming.profile_url);
    fill_once(&mut existing.bio, &incoming.bio);
    fill_once(&mut existing.website, &incoming.website);
    fill_once(&mut existing.twitter, &incoming.twitter);
    fill_once(&mut existing.linkedin, &incoming.linkedin);
    fill_once(&mut existing.github, &incoming.github);
}

/// Set `target` from `value` only if `target` is empty and `value` is not.
/// Returns `true` when the field changed.
pub fn fill_once(target: &mut Option<String>, value: &Option<String>) -> bool {
    if is_filled(target) || !is_filled(value) {
        return false;
    }
    *target = value.as_ref().map(|v| v.trim().to_string());
    true
}

fn upgrade_name(current: &mut String, candidate: &str) {
    let candidate = candidate.trim();
    if !candidate.is_empty() && candidate.chars().count() > current.chars().count() {
        *current = candidate.to_string();
    }
}

fn add_sample(samples: &mut Vec<SampleArticle>, article: &SampleArticle, cap: usize) {
    if samples.len() >= cap || samples.iter().any(|s| s.url == article.url) {
        return;
    }
    samples.push(article.clone());
}
