use byline_common::Author;
use serde::{Deserialize, Serialize};

use crate::pipeline::progress::RunProgress;
use crate::pipeline::state::CrawlState;
use crate::pipeline::stats::ScrapeStats;

/// One output row: the canonical author plus how many articles back it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorRecord {
    #[serde(flatten)]
    pub author: Author,
    pub article_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeResult {
    pub authors: Vec<AuthorRecord>,
    pub stats: ScrapeStats,
}

/// Project state and run counters into the output. Pure: the same inputs
/// always serialize to the same bytes.
pub fn finalize(state: &CrawlState, run: &RunProgress) -> ScrapeResult {
    let mut authors: Vec<AuthorRecord> = state
        .authors()
        .map(|author| AuthorRecord {
            article_count: state.articles_of(&author.handle).len(),
            author: author.clone(),
        })
        .collect();

    authors.sort_by(|a, b| {
        b.author
            .matched_keywords
            .len()
            .cmp(&a.author.matched_keywords.len())
            .then_with(|| b.article_count.cmp(&a.article_count))
            .then_with(|| a.author.handle.cmp(&b.author.handle))
    });

    let count = |pred: fn(&Author) -> bool| authors.iter().filter(|r| pred(&r.author)).count() as u32;
    let stats = ScrapeStats {
        total_authors: authors.len() as u32,
        with_bio: count(Author::has_bio),
        with_website: count(Author::has_website),
        with_twitter: count(Author::has_twitter),
        with_linkedin: count(Author::has_linkedin),
        with_github: count(Author::has_github),
        new_this_run: run.authors_created,
        refs_collected: run.refs_collected,
        urls_processed_this_run: run.urls_processed,
        profiles_processed_this_run: run.profiles_processed,
        failures: run.failures(),
        total_processed_urls: state.processed_count() as u32,
        total_seen_slugs: state.seen_count() as u32,
        duration_ms: run.duration_ms(),
    };

    ScrapeResult { authors, stats }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::extractor::Extraction;
    use crate::pipeline::merger::merge;
    use byline_common::SampleArticle;
    use std::collections::BTreeSet;

    fn observe(state: &mut CrawlState, handle: &str, keywords: &[&str], article: &str) {
        let extraction = Extraction {
            handle: handle.into(),
            display_name: handle.into(),
            profile_url: None,
            bio: None,
            website: None,
            matched_keywords: keywords.iter().map(|k| k.to_string()).collect::<BTreeSet<_>>(),
            article: SampleArticle {
                title: format!("Post {article}"),
                url: format!("https://site.test/{article}"),
                keyword: keywords[0].into(),
            },
        };
        merge(state, &extraction, 5);
    }

    fn state() -> CrawlState {
        let mut state = CrawlState::new();
        observe(&mut state, "zed", &["saas"], "z-1");
        observe(&mut state, "amy", &["saas"], "a-1");
        observe(&mut state, "bob", &["saas", "maker"], "b-1");
        observe(&mut state, "amy", &["saas"], "a-2");
        state
    }

    #[test]
    fn orders_by_keywords_then_articles_then_handle() {
        let result = finalize(&state(), &RunProgress::default());
        let handles: Vec<&str> = result.authors.iter().map(|r| r.author.handle.as_str()).collect();
        assert_eq!(handles, vec!["bob", "amy", "zed"]);
        assert_eq!(result.authors[1].article_count, 2);
    }

    #[test]
    fn output_is_byte_identical_across_calls() {
        let state = state();
        let run = RunProgress {
            authors_created: 3,
            ..RunProgress::default()
        };
        let first = serde_json::to_string(&finalize(&state, &run)).unwrap();
        let second = serde_json::to_string(&finalize(&state, &run)).unwrap();
        assert_eq!(first, second);

        let rebuilt = CrawlState::from_snapshot(state.export(), 5);
        assert_eq!(first, serde_json::to_string(&finalize(&rebuilt, &run)).unwrap());
    }

    #[test]
    fn stats_count_field_presence() {
        let mut state = state();
        state.author_mut("amy").unwrap().bio = Some("writer".into());
        state.author_mut("zed").unwrap().github = Some("zed".into());
        let stats = finalize(&state, &RunProgress::default()).stats;
        assert_eq!(stats.total_authors, 3);
        assert_eq!(stats.with_bio, 1);
        assert_eq!(stats.with_github, 1);
        assert_eq!(stats.with_twitter, 0);
    }
}
