//! Sitemap source: sub-feed selection and vocabulary-gated relevance.

use std::collections::BTreeSet;
use std::sync::Arc;

use byline_common::{CrawlConfig, SitemapPolicy, SourceKind};
use byline_crawler::pipeline::relevance::RelevanceFilter;
use byline_crawler::testing::{
    article_with_ld, listing_page, site_url, sitemap_index, test_config, urlset, MockPageSource,
};
use byline_crawler::traits::NullProgress;
use byline_crawler::Crawler;

fn sitemap_config() -> CrawlConfig {
    CrawlConfig {
        tags: vec!["saas".into()],
        sitemap: Some(SitemapPolicy {
            count: 1,
            newest_first: true,
        }),
        ..test_config()
    }
}

fn sitemap_site() -> MockPageSource {
    MockPageSource::new()
        .on_page(&site_url("/t/saas"), &listing_page(&[]))
        .on_page(
            &site_url("/sitemap.xml"),
            &sitemap_index(&[&site_url("/sitemap-1.xml"), &site_url("/sitemap-2.xml")]),
        )
        .on_page(
            &site_url("/sitemap-2.xml"),
            &urlset(&[
                &site_url("/balcony-tomatoes-post"),
                &site_url("/pricing-saas-post"),
                &site_url("/@jdoe"),
                "https://other.test/foreign-post",
            ]),
        )
        .on_page(
            &site_url("/balcony-tomatoes-post"),
            &article_with_ld(
                "gardener",
                "Gary Green",
                "Growing tomatoes on a balcony",
                "Grows things",
                &["gardening"],
            ),
        )
        .on_page(
            &site_url("/pricing-saas-post"),
            &article_with_ld(
                "jdoe",
                "Jane Doe",
                "Pricing a small product",
                "Indie maker",
                &["saas"],
            ),
        )
}

#[tokio::test]
async fn newest_feed_only_and_off_topic_pages_dropped() {
    let source = Arc::new(sitemap_site());
    let mut crawler = Crawler::new(sitemap_config(), source.clone());
    let outcome = crawler.run(&NullProgress).await.unwrap();

    assert_eq!(source.fetch_count(&site_url("/sitemap-1.xml")), 0);
    assert_eq!(source.fetch_count(&site_url("/sitemap-2.xml")), 1);
    assert_eq!(outcome.progress.refs_collected, 2);
    assert_eq!(outcome.progress.irrelevant, 1);
    assert!(crawler.state().is_processed(&site_url("/balcony-tomatoes-post")));

    assert_eq!(outcome.result.authors.len(), 1);
    let author = &outcome.result.authors[0].author;
    assert_eq!(author.handle, "jdoe");
    assert_eq!(author.bio.as_deref(), Some("Indie maker"));
    assert_eq!(author.sample_articles[0].keyword, "saas");
    assert_eq!(author.sample_articles[0].title, "Pricing a small product");
}

/// Accepts everything, whatever the source.
struct AcceptAll;

impl RelevanceFilter for AcceptAll {
    fn accept(&self, _kind: SourceKind, _matches: &BTreeSet<String>) -> bool {
        true
    }
}

#[tokio::test]
async fn custom_relevance_filter_replaces_the_default() {
    let mut crawler =
        Crawler::new(sitemap_config(), Arc::new(sitemap_site())).with_relevance(AcceptAll);
    let outcome = crawler.run(&NullProgress).await.unwrap();

    assert_eq!(outcome.progress.irrelevant, 0);
    assert_eq!(outcome.result.authors.len(), 2);
    // keyword matches rank jdoe first
    assert_eq!(outcome.result.authors[0].author.handle, "jdoe");
    let gardener = &outcome.result.authors[1].author;
    assert_eq!(gardener.sample_articles[0].keyword, "");
    assert!(gardener.matched_keywords.is_empty());
}
