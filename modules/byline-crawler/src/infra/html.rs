//! Structural queries over fetched markup.
//!
//! All iteration is in document order (`scraper` walks the tree
//! depth-first), so every "first match wins" rule built on top of
//! `Document` is deterministic.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use crate::infra::util::collapse_whitespace;

static ANCHOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid selector"));
static HEADING: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1, h2, h3, h4").expect("valid selector"));
static H1: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1").expect("valid selector"));
static META: LazyLock<Selector> = LazyLock::new(|| Selector::parse("meta").expect("valid selector"));
static JSON_LD: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"script[type="application/ld+json"]"#).expect("valid selector")
});

/// How far up the tree to look for a heading that labels an anchor.
const HEADING_ANCESTOR_DEPTH: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    pub href: String,
    /// Visible anchor text, whitespace-collapsed.
    pub text: String,
    /// Heading text that labels this anchor, if any.
    pub heading: Option<String>,
}

impl Anchor {
    /// Heading if present, else the anchor's own text.
    pub fn label(&self) -> &str {
        self.heading.as_deref().unwrap_or(&self.text)
    }
}

pub struct Document {
    html: Html,
}

impl Document {
    pub fn parse(markup: &str) -> Self {
        Self {
            html: Html::parse_document(markup),
        }
    }

    /// Every `a[href]` in document order.
    pub fn anchors(&self) -> Vec<Anchor> {
        self.html
            .select(&ANCHOR)
            .filter_map(|element| {
                let href = element.value().attr("href")?.trim().to_string();
                Some(Anchor {
                    href,
                    text: element_text(&element),
                    heading: heading_for(&element),
                })
            })
            .collect()
    }

    /// Just the hrefs, in document order.
    pub fn hrefs(&self) -> Vec<String> {
        self.html
            .select(&ANCHOR)
            .filter_map(|element| element.value().attr("href"))
            .map(|href| href.trim().to_string())
            .collect()
    }

    /// `content` of the first `<meta name=..>` or `<meta property=..>` matching `key`.
    pub fn meta(&self, key: &str) -> Option<String> {
        self.html
            .select(&META)
            .find(|element| {
                let value = element.value();
                value.attr("name").is_some_and(|n| n.eq_ignore_ascii_case(key))
                    || value.attr("property").is_some_and(|p| p.eq_ignore_ascii_case(key))
            })
            .and_then(|element| element.value().attr("content"))
            .map(collapse_whitespace)
            .filter(|content| !content.is_empty())
    }

    pub fn first_h1(&self) -> Option<String> {
        self.html
            .select(&H1)
            .map(|element| element_text(&element))
            .find(|text| !text.is_empty())
    }

    /// Parsed JSON-LD blocks in document order. Malformed blocks are skipped.
    pub fn json_ld(&self) -> Vec<serde_json::Value> {
        self.html
            .select(&JSON_LD)
            .filter_map(|element| {
                let raw: String = element.text().collect();
                serde_json::from_str(raw.trim()).ok()
            })
            .collect()
    }
}

fn element_text(element: &ElementRef) -> String {
    collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

fn is_heading(element: &ElementRef) -> bool {
    matches!(element.value().name(), "h1" | "h2" | "h3" | "h4")
}

/// The heading the anchor sits inside, else a heading inside the anchor,
/// else the sole heading of the nearest enclosing card.
fn heading_for(anchor: &ElementRef) -> Option<String> {
    let ancestors: Vec<ElementRef> = anchor
        .ancestors()
        .filter_map(ElementRef::wrap)
        .take(HEADING_ANCESTOR_DEPTH)
        .collect();

    if let Some(heading) = ancestors.iter().find(|el| is_heading(el)) {
        return non_empty(element_text(heading));
    }
    if let Some(inner) = anchor.select(&HEADING).next() {
        return non_empty(element_text(&inner));
    }
    ancestors
        .iter()
        .filter(|el| !matches!(el.value().name(), "body" | "html"))
        .find_map(sole_heading)
        .and_then(|heading| non_empty(element_text(&heading)))
}

/// A container with several headings is a list, not a card.
fn sole_heading<'a>(container: &ElementRef<'a>) -> Option<ElementRef<'a>> {
    let mut headings = container.select(&HEADING);
    let first = headings.next()?;
    headings.next().is_none().then_some(first)
}

fn non_empty(text: String) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}
