//! Resumable runs: state export/import, stores, and initialization failure.

use std::sync::Arc;

use byline_common::{Author, CrawlConfig};
use byline_crawler::store::{JsonFileStateStore, MemoryStateStore};
use byline_crawler::testing::{article_page, listing_page, site_url, test_config, MockPageSource};
use byline_crawler::traits::{NullProgress, StateStore};
use byline_crawler::{CrawlError, CrawlSnapshot, CrawlState, Crawler, RunPhase, RunProgress};
use tokio::sync::watch;

fn saas_config() -> CrawlConfig {
    CrawlConfig {
        tags: vec!["saas".into()],
        ..test_config()
    }
}

fn saas_site() -> MockPageSource {
    MockPageSource::new()
        .on_page(
            &site_url("/t/saas"),
            &listing_page(&[
                ("/first-saas-post", "My first SaaS post ever"),
                ("/second-saas-post", "My second SaaS post ever"),
            ]),
        )
        .on_page(
            &site_url("/first-saas-post"),
            &article_page("jdoe", "Jane Doe", "My first SaaS post ever"),
        )
        .on_page(
            &site_url("/second-saas-post"),
            &article_page("asmith", "Ann Smith", "My second SaaS post ever"),
        )
}

#[tokio::test]
async fn second_run_over_same_listings_is_a_no_op() {
    let source = Arc::new(saas_site());
    let mut first = Crawler::new(saas_config(), source.clone());
    let run1 = first.run(&NullProgress).await.unwrap();
    assert_eq!(run1.progress.refs_collected, 2);
    let snapshot = first.export();

    let mut second = Crawler::new(saas_config(), source.clone()).with_snapshot(snapshot.clone());
    let run2 = second.run(&NullProgress).await.unwrap();

    assert_eq!(run2.progress.refs_collected, 0);
    assert_eq!(run2.progress.urls_processed, 0);
    assert_eq!(run2.progress.profiles_processed, 0);
    assert_eq!(second.export(), snapshot);
    assert_eq!(source.fetch_count(&site_url("/first-saas-post")), 1);
    assert_eq!(source.fetch_count(&site_url("/second-saas-post")), 1);
}

#[tokio::test]
async fn snapshot_round_trip_is_a_fixed_point() {
    let mut crawler = Crawler::new(saas_config(), Arc::new(saas_site()));
    crawler.run(&NullProgress).await.unwrap();

    let exported = crawler.export();
    let json = serde_json::to_string(&exported).unwrap();
    let parsed: CrawlSnapshot = serde_json::from_str(&json).unwrap();
    let reexported = CrawlState::from_snapshot(parsed, 5).export();

    assert_eq!(exported, reexported);
    assert_eq!(json, serde_json::to_string(&reexported).unwrap());
}

#[tokio::test]
async fn importing_into_a_live_state_is_a_union() {
    let mut crawler = Crawler::new(saas_config(), Arc::new(saas_site()));
    crawler.run(&NullProgress).await.unwrap();

    let mut other = CrawlSnapshot::default();
    other.seen_slugs.insert("elsewhere-post".into());
    let mut jdoe = Author::new("jdoe");
    jdoe.bio = Some("Indie maker".into());
    jdoe.matched_keywords.insert("maker".into());
    other.authors.insert("jdoe".into(), jdoe);
    crawler.import(other);

    let state = crawler.state();
    assert!(state.is_seen("elsewhere-post"));
    assert!(state.is_seen("first-saas-post"));
    let jdoe = state.author("jdoe").unwrap();
    assert_eq!(jdoe.bio.as_deref(), Some("Indie maker"));
    assert!(jdoe.matched_keywords.contains("saas"));
    assert!(jdoe.matched_keywords.contains("maker"));
    assert_eq!(jdoe.display_name, "Jane Doe");
}

#[tokio::test]
async fn initialization_failure_keeps_and_saves_state() {
    let mut seed = CrawlSnapshot::default();
    seed.processed_urls.insert(site_url("/old-post"));
    seed.authors.insert("jdoe".into(), Author::new("jdoe"));
    let store = MemoryStateStore::with_snapshot(seed.clone());

    let source = Arc::new(saas_site().fail_start());
    let mut crawler = Crawler::new(saas_config(), source.clone());
    let err = crawler.run_with_store(&store, &NullProgress).await.unwrap_err();

    assert!(matches!(err, CrawlError::Initialization { .. }));
    assert!(source.fetched().is_empty());
    assert_eq!(store.save_count(), 1);
    assert_eq!(store.snapshot(), Some(seed));
    assert_eq!(crawler.state().author_count(), 1);
}

#[tokio::test]
async fn file_store_carries_state_between_crawlers() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStateStore::new(dir.path().join("state.json"));
    let source = Arc::new(saas_site());

    let mut first = Crawler::new(saas_config(), source.clone());
    first.run_with_store(&store, &NullProgress).await.unwrap();
    let saved = store.load().await.unwrap().unwrap();
    assert_eq!(saved, first.export());
    assert_eq!(saved.authors.len(), 2);

    let mut second = Crawler::new(saas_config(), source.clone());
    let run2 = second.run_with_store(&store, &NullProgress).await.unwrap();
    assert_eq!(run2.progress.urls_processed, 0);
    assert_eq!(run2.result.stats.total_authors, 2);
    assert_eq!(source.fetch_count(&site_url("/first-saas-post")), 1);
}

#[tokio::test]
async fn checkpoints_are_written_during_the_run() {
    let store = MemoryStateStore::new();
    let config = CrawlConfig {
        checkpoint_every: 1,
        ..saas_config()
    };
    let mut crawler = Crawler::new(config, Arc::new(saas_site()));
    crawler.run_with_store(&store, &NullProgress).await.unwrap();

    // 2 articles + 2 profiles checkpointed, plus the final save
    assert_eq!(store.save_count(), 5);
}

#[tokio::test]
async fn progress_is_streamed_to_watchers() {
    let (tx, rx) = watch::channel(RunProgress::default());
    let mut crawler = Crawler::new(saas_config(), Arc::new(saas_site()));
    crawler.run(&tx).await.unwrap();

    let last = rx.borrow().clone();
    assert_eq!(last.phase, RunPhase::Finished);
    assert_eq!(last.urls_processed, 2);
    assert!(last.finished_at.is_some());
}
