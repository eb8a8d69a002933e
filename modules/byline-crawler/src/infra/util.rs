// Small string and path helpers shared by the collector, extractor and enricher.

/// Collapse runs of whitespace into single spaces and trim.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lowercase, hyphen-separated form of a tag or keyword (`"Indie Hacker"` → `indie-hacker`).
pub fn slugify(text: &str) -> String {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(|part| part.to_lowercase())
        .collect::<Vec<_>>()
        .join("-")
}

/// The single path segment of a content path, if the path has exactly one
/// hyphenated segment that is not an excluded prefix.
///
/// `/my-first-post` → `my-first-post`; `/t/saas`, `/about`, `/@jdoe` → `None`.
pub fn content_slug(path: &str, excluded_prefixes: &[String]) -> Option<String> {
    let path = path.split(['?', '#']).next().unwrap_or("");
    let segment = path.strip_prefix('/')?.trim_end_matches('/');
    if segment.is_empty() || segment.contains('/') || !segment.contains('-') {
        return None;
    }
    let lowered = segment.to_ascii_lowercase();
    if excluded_prefixes
        .iter()
        .any(|prefix| has_excluded_prefix(&lowered, &prefix.to_ascii_lowercase()))
    {
        return None;
    }
    Some(segment.to_string())
}

/// Word prefixes (`search`) only match whole leading words (`search-results`,
/// not `searching-for-users`); marker prefixes (`@`) match any start.
fn has_excluded_prefix(segment: &str, prefix: &str) -> bool {
    if prefix.is_empty() || !segment.starts_with(prefix) {
        return false;
    }
    if !prefix.ends_with(|c: char| c.is_alphanumeric()) {
        return true;
    }
    matches!(segment[prefix.len()..].chars().next(), None | Some('-') | Some('_'))
}

/// Append `page=<n>` to a listing URL. Page 1 is the bare URL.
pub fn page_url(url: &str, page: u32) -> String {
    if page <= 1 {
        return url.to_string();
    }
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}page={page}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn excluded() -> Vec<String> {
        ["@", "tag", "search", "login"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn collapse_whitespace_joins_lines() {
        assert_eq!(collapse_whitespace("  Jane \n\t Doe  "), "Jane Doe");
    }

    #[test]
    fn slugify_lowercases_and_hyphenates() {
        assert_eq!(slugify("Indie Hacker"), "indie-hacker");
        assert_eq!(slugify("  SaaS / B2B "), "saas-b2b");
    }

    #[test]
    fn content_slug_accepts_single_hyphenated_segment() {
        assert_eq!(
            content_slug("/how-i-built-this", &excluded()).as_deref(),
            Some("how-i-built-this")
        );
        assert_eq!(
            content_slug("/how-i-built-this?ref=home#top", &excluded()).as_deref(),
            Some("how-i-built-this")
        );
    }

    #[test]
    fn content_slug_rejects_non_content_paths() {
        assert!(content_slug("/about", &excluded()).is_none());
        assert!(content_slug("/t/saas-tools", &excluded()).is_none());
        assert!(content_slug("/@jane-doe", &excluded()).is_none());
        assert!(content_slug("/search-results", &excluded()).is_none());
        assert!(content_slug("/login-help", &excluded()).is_none());
        assert!(content_slug("/tagging-made-easy", &excluded()).is_some());
        assert!(content_slug("/", &excluded()).is_none());
        assert!(content_slug("relative-path", &excluded()).is_none());
    }

    #[test]
    fn page_url_appends_page_param() {
        assert_eq!(page_url("https://site.test/t/saas", 1), "https://site.test/t/saas");
        assert_eq!(page_url("https://site.test/t/saas", 2), "https://site.test/t/saas?page=2");
        assert_eq!(
            page_url("https://site.test/search?q=maker", 3),
            "https://site.test/search?q=maker&page=3"
        );
    }
}
