//! Fetch failures, rate limits, and profile enrichment.
//!
//! - A rate-limited listing is retried and then read
//! - A URL that exhausts its retries is processed and never fetched again
//! - Profiles are fetched once, fill only empty fields, and respect the per-run limit

use std::sync::Arc;

use byline_common::{Author, CrawlConfig};
use byline_crawler::testing::{
    article_page, listing_page, profile_page, site_url, test_config, MockPageSource,
};
use byline_crawler::traits::NullProgress;
use byline_crawler::{CrawlSnapshot, Crawler};

fn saas_config() -> CrawlConfig {
    CrawlConfig {
        tags: vec!["saas".into()],
        ..test_config()
    }
}

fn one_post_listing() -> String {
    listing_page(&[("/jdoe-saas-post", "Pricing my SaaS the hard way")])
}

fn jdoe_article() -> String {
    article_page("jdoe", "Jane Doe", "Pricing my SaaS the hard way")
}

fn jdoe_profile() -> String {
    profile_page(&[
        "https://twitter.com/janedoe",
        "https://site.test/about",
        "https://www.linkedin.com/in/jane-doe/",
        "https://github.com/jdoe",
        "https://janedoe.dev/",
    ])
}

#[tokio::test]
async fn rate_limited_listing_is_retried() {
    let tag_url = site_url("/t/saas");
    let source = Arc::new(
        MockPageSource::new()
            .on_rate_limit(&tag_url)
            .then_page(&tag_url, &one_post_listing())
            .on_page(&site_url("/jdoe-saas-post"), &jdoe_article()),
    );
    let mut crawler = Crawler::new(saas_config(), source.clone());
    let outcome = crawler.run(&NullProgress).await.unwrap();

    assert_eq!(source.fetch_count(&tag_url), 2);
    assert_eq!(outcome.progress.refs_collected, 1);
    assert_eq!(outcome.result.authors.len(), 1);
}

#[tokio::test]
async fn exhausted_fetch_is_processed_and_not_retried_later() {
    let article_url = site_url("/jdoe-saas-post");
    let source = Arc::new(
        MockPageSource::new()
            .on_page(&site_url("/t/saas"), &one_post_listing())
            .on_failure(&article_url),
    );
    let mut crawler = Crawler::new(saas_config(), source.clone());
    let outcome = crawler.run(&NullProgress).await.unwrap();

    assert_eq!(outcome.progress.fetch_failures, 1);
    assert_eq!(outcome.progress.urls_processed, 1);
    assert!(outcome.result.authors.is_empty());
    assert!(crawler.state().is_processed(&article_url));
    assert_eq!(source.fetch_count(&article_url), 3);

    let snapshot = crawler.export();
    let mut next = Crawler::new(saas_config(), source.clone()).with_snapshot(snapshot);
    next.run(&NullProgress).await.unwrap();
    assert_eq!(source.fetch_count(&article_url), 3);
}

#[tokio::test]
async fn failed_listing_skips_only_that_source() {
    let source = Arc::new(
        MockPageSource::new()
            .on_status(&site_url("/search?q=maker"), 500)
            .on_page(&site_url("/t/saas"), &one_post_listing())
            .on_page(&site_url("/jdoe-saas-post"), &jdoe_article()),
    );
    let config = CrawlConfig {
        keywords: vec!["maker".into()],
        ..saas_config()
    };
    let mut crawler = Crawler::new(config, source.clone());
    let outcome = crawler.run(&NullProgress).await.unwrap();

    assert_eq!(outcome.progress.sources_done, 2);
    assert_eq!(outcome.result.authors.len(), 1);
}

#[tokio::test]
async fn profile_links_fill_author_fields() {
    let source = Arc::new(
        MockPageSource::new()
            .on_page(&site_url("/t/saas"), &one_post_listing())
            .on_page(&site_url("/jdoe-saas-post"), &jdoe_article())
            .on_page(&site_url("/@jdoe"), &jdoe_profile()),
    );
    let mut crawler = Crawler::new(saas_config(), source.clone());
    let outcome = crawler.run(&NullProgress).await.unwrap();

    let author = &outcome.result.authors[0].author;
    assert_eq!(author.twitter.as_deref(), Some("janedoe"));
    assert_eq!(author.linkedin.as_deref(), Some("https://www.linkedin.com/in/jane-doe"));
    assert_eq!(author.github.as_deref(), Some("jdoe"));
    assert_eq!(author.website.as_deref(), Some("https://janedoe.dev/"));
    assert_eq!(outcome.progress.profiles_processed, 1);
    assert_eq!(outcome.progress.fields_filled, 4);
    assert_eq!(outcome.result.stats.with_github, 1);

    crawler.run(&NullProgress).await.unwrap();
    assert_eq!(source.fetch_count(&site_url("/@jdoe")), 1);
}

#[tokio::test]
async fn off_site_author_url_is_not_fetched_as_a_profile() {
    let article = r#"<html><head><script type="application/ld+json">
        {"@type":"Article","headline":"Pricing my SaaS the hard way",
         "author":{"name":"Jane Doe","url":"https://janedoe.dev/"}}
        </script></head><body><p>by <a href="/@jdoe">Jane</a></p></body></html>"#;
    let source = Arc::new(
        MockPageSource::new()
            .on_page(&site_url("/t/saas"), &one_post_listing())
            .on_page(&site_url("/jdoe-saas-post"), article)
            .on_page(&site_url("/@jdoe"), &jdoe_profile()),
    );
    let mut crawler = Crawler::new(saas_config(), source.clone());
    let outcome = crawler.run(&NullProgress).await.unwrap();

    assert_eq!(source.fetch_count(&site_url("/@jdoe")), 1);
    assert_eq!(source.fetch_count("https://janedoe.dev/"), 0);
    let author = &outcome.result.authors[0].author;
    assert_eq!(author.profile_url.as_deref(), Some("https://site.test/@jdoe"));
    assert_eq!(author.website.as_deref(), Some("https://janedoe.dev/"));
    assert_eq!(author.github.as_deref(), Some("jdoe"));
}

#[tokio::test]
async fn enrichment_never_overwrites_filled_fields() {
    let mut seed = CrawlSnapshot::default();
    let mut jdoe = Author::new("jdoe");
    jdoe.website = Some("https://old.dev".into());
    seed.authors.insert("jdoe".into(), jdoe);

    let source = Arc::new(
        MockPageSource::new()
            .on_page(&site_url("/t/saas"), &one_post_listing())
            .on_page(&site_url("/jdoe-saas-post"), &jdoe_article())
            .on_page(&site_url("/@jdoe"), &jdoe_profile()),
    );
    let mut crawler = Crawler::new(saas_config(), source).with_snapshot(seed);
    let outcome = crawler.run(&NullProgress).await.unwrap();

    let author = &outcome.result.authors[0].author;
    assert_eq!(author.website.as_deref(), Some("https://old.dev"));
    assert_eq!(author.twitter.as_deref(), Some("janedoe"));
    assert_eq!(outcome.progress.fields_filled, 3);
}

#[tokio::test]
async fn profile_limit_takes_handles_in_order() {
    let source = Arc::new(
        MockPageSource::new()
            .on_page(
                &site_url("/t/saas"),
                &listing_page(&[
                    ("/jdoe-saas-post", "Pricing my SaaS the hard way"),
                    ("/asmith-saas-post", "What my SaaS taught me"),
                ]),
            )
            .on_page(&site_url("/jdoe-saas-post"), &jdoe_article())
            .on_page(
                &site_url("/asmith-saas-post"),
                &article_page("asmith", "Ann Smith", "What my SaaS taught me"),
            )
            .on_page(&site_url("/@jdoe"), &jdoe_profile())
            .on_page(&site_url("/@asmith"), &profile_page(&["https://github.com/asmith"])),
    );
    let config = CrawlConfig {
        max_profiles_per_run: 1,
        ..saas_config()
    };

    let mut crawler = Crawler::new(config, source.clone());
    let first = crawler.run(&NullProgress).await.unwrap();
    assert_eq!(first.progress.profiles_processed, 1);
    assert_eq!(source.fetch_count(&site_url("/@asmith")), 1);
    assert_eq!(source.fetch_count(&site_url("/@jdoe")), 0);

    let second = crawler.run(&NullProgress).await.unwrap();
    assert_eq!(second.progress.profiles_processed, 1);
    assert_eq!(source.fetch_count(&site_url("/@jdoe")), 1);
    assert_eq!(source.fetch_count(&site_url("/@asmith")), 1);
}

#[tokio::test]
async fn forgotten_profile_is_fetched_again() {
    let source = Arc::new(
        MockPageSource::new()
            .on_page(&site_url("/t/saas"), &one_post_listing())
            .on_page(&site_url("/jdoe-saas-post"), &jdoe_article())
            .on_page(&site_url("/@jdoe"), &jdoe_profile()),
    );
    let mut crawler = Crawler::new(saas_config(), source.clone());
    crawler.run(&NullProgress).await.unwrap();

    assert!(crawler.forget_profile("jdoe"));
    assert!(!crawler.forget_profile("jdoe"));
    let outcome = crawler.run(&NullProgress).await.unwrap();

    assert_eq!(source.fetch_count(&site_url("/@jdoe")), 2);
    assert_eq!(outcome.progress.profiles_processed, 1);
    assert_eq!(outcome.progress.fields_filled, 0);
}
