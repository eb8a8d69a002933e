//! Sitemap index and urlset parsing.
//!
//! Sitemaps are regular enough that a pair of non-greedy regexes over
//! `<sitemap>`/`<url>` blocks is sufficient; no XML parser is pulled in.

use std::sync::LazyLock;

use byline_common::SitemapPolicy;
use regex::Regex;

static SITEMAP_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<sitemap\b[^>]*>(.*?)</sitemap>").expect("valid regex"));
static URL_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<url\b[^>]*>(.*?)</url>").expect("valid regex"));
static LOC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<loc\b[^>]*>(.*?)</loc>").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SitemapDoc {
    /// `<sitemapindex>`: locations of sub-feeds.
    Index(Vec<String>),
    /// `<urlset>`: page locations.
    UrlSet(Vec<String>),
}

impl SitemapDoc {
    pub fn parse(xml: &str) -> Self {
        let feeds = locs_in_blocks(&SITEMAP_BLOCK, xml);
        if !feeds.is_empty() {
            return SitemapDoc::Index(feeds);
        }
        SitemapDoc::UrlSet(locs_in_blocks(&URL_BLOCK, xml))
    }
}

fn locs_in_blocks(block: &Regex, xml: &str) -> Vec<String> {
    block
        .captures_iter(xml)
        .filter_map(|caps| {
            let inner = caps.get(1)?.as_str();
            let loc = LOC.captures(inner)?.get(1)?.as_str();
            let loc = decode_loc(loc);
            (!loc.is_empty()).then_some(loc)
        })
        .collect()
}

fn decode_loc(raw: &str) -> String {
    let raw = raw.trim();
    let raw = raw
        .strip_prefix("<![CDATA[")
        .and_then(|s| s.strip_suffix("]]>"))
        .unwrap_or(raw)
        .trim();
    raw.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Pick which sub-feeds to read this run, in reading order.
pub fn select_feeds(feeds: &[String], policy: &SitemapPolicy) -> Vec<String> {
    if policy.newest_first {
        feeds.iter().rev().take(policy.count).cloned().collect()
    } else {
        feeds.iter().take(policy.count).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDEX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <sitemap><loc>https://site.test/sitemap-posts-1.xml</loc><lastmod>2024-01-01</lastmod></sitemap>
  <sitemap><loc>https://site.test/sitemap-posts-2.xml</loc></sitemap>
  <sitemap>
    <loc> https://site.test/sitemap-posts-3.xml?part=a&amp;v=2 </loc>
  </sitemap>
</sitemapindex>"#;

    #[test]
    fn index_lists_sub_feeds_with_entities_decoded() {
        let SitemapDoc::Index(feeds) = SitemapDoc::parse(INDEX) else {
            panic!("expected index");
        };
        assert_eq!(
            feeds,
            vec![
                "https://site.test/sitemap-posts-1.xml",
                "https://site.test/sitemap-posts-2.xml",
                "https://site.test/sitemap-posts-3.xml?part=a&v=2",
            ]
        );
    }

    #[test]
    fn urlset_lists_pages() {
        let xml = r#"<urlset>
            <url><loc><![CDATA[https://site.test/first-post]]></loc></url>
            <url><loc>https://site.test/second-post</loc><priority>0.5</priority></url>
        </urlset>"#;
        assert_eq!(
            SitemapDoc::parse(xml),
            SitemapDoc::UrlSet(vec![
                "https://site.test/first-post".into(),
                "https://site.test/second-post".into(),
            ])
        );
    }

    #[test]
    fn garbage_parses_as_empty_urlset() {
        assert_eq!(SitemapDoc::parse("<html>nope</html>"), SitemapDoc::UrlSet(vec![]));
    }

    #[test]
    fn newest_first_takes_from_the_end() {
        let feeds: Vec<String> = (1..=5).map(|i| format!("feed-{i}")).collect();
        let newest = select_feeds(&feeds, &SitemapPolicy { count: 2, newest_first: true });
        assert_eq!(newest, vec!["feed-5", "feed-4"]);
        let oldest = select_feeds(&feeds, &SitemapPolicy { count: 2, newest_first: false });
        assert_eq!(oldest, vec!["feed-1", "feed-2"]);
    }
}
