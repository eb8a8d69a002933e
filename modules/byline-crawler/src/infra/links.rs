use url::Url;

/// Social platforms the enricher records a dedicated identifier for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Twitter,
    LinkedIn,
    GitHub,
}

const TWITTER_HOSTS: &[&str] = &["twitter.com", "x.com"];
const LINKEDIN_HOSTS: &[&str] = &["linkedin.com"];
const GITHUB_HOSTS: &[&str] = &["github.com"];

/// Hosts that are never a person's own website.
const OTHER_PLATFORM_HOSTS: &[&str] = &[
    "t.co",
    "lnkd.in",
    "facebook.com",
    "fb.com",
    "instagram.com",
    "youtube.com",
    "youtu.be",
    "tiktok.com",
    "threads.net",
];

/// First path segments on each platform that are app routes, not accounts.
const TWITTER_RESERVED: &[&str] = &["intent", "share", "home", "hashtag", "i", "search"];
const GITHUB_RESERVED: &[&str] = &[
    "sponsors", "orgs", "topics", "features", "about", "login", "marketplace",
];

/// True when `host` is `domain` or one of its subdomains.
pub fn host_matches(host: &str, domain: &str) -> bool {
    let host = host.to_ascii_lowercase();
    host == domain || host.ends_with(&format!(".{domain}"))
}

/// Resolve a raw href against a base URL, returning an absolute http(s) URL
/// with the fragment stripped.
pub fn resolve_href(raw: &str, base: Option<&Url>) -> Option<Url> {
    let raw = raw.trim();
    if raw.is_empty()
        || raw.starts_with('#')
        || raw.starts_with("javascript:")
        || raw.starts_with("mailto:")
        || raw.starts_with("tel:")
    {
        return None;
    }
    let mut parsed = if raw.starts_with("http://") || raw.starts_with("https://") {
        Url::parse(raw).ok()?
    } else {
        base?.join(raw).ok()?
    };
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return None;
    }
    parsed.set_fragment(None);
    Some(parsed)
}

/// Parse an href only if it is already absolute.
pub fn absolute_href(raw: &str) -> Option<Url> {
    let raw = raw.trim();
    if raw.starts_with("http://") || raw.starts_with("https://") {
        resolve_href(raw, None)
    } else {
        None
    }
}

pub fn classify(url: &Url) -> Option<Platform> {
    let host = url.host_str()?;
    if TWITTER_HOSTS.iter().any(|d| host_matches(host, d)) {
        Some(Platform::Twitter)
    } else if LINKEDIN_HOSTS.iter().any(|d| host_matches(host, d)) {
        Some(Platform::LinkedIn)
    } else if GITHUB_HOSTS.iter().any(|d| host_matches(host, d)) {
        Some(Platform::GitHub)
    } else {
        None
    }
}

/// Any known platform host, including the ones without a dedicated field.
pub fn is_platform_host(host: &str, extra: &[String]) -> bool {
    TWITTER_HOSTS
        .iter()
        .chain(LINKEDIN_HOSTS)
        .chain(GITHUB_HOSTS)
        .chain(OTHER_PLATFORM_HOSTS)
        .any(|d| host_matches(host, d))
        || extra
            .iter()
            .any(|d| host_matches(host, &d.to_ascii_lowercase()))
}

/// The identifier stored for a platform link:
/// twitter and github yield the account name, linkedin the canonical profile URL.
pub fn platform_identifier(platform: Platform, url: &Url) -> Option<String> {
    let mut segments = url
        .path_segments()?
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string());
    let first = segments.next()?;

    match platform {
        Platform::Twitter => {
            let name = first.trim_start_matches('@');
            if name.is_empty() || TWITTER_RESERVED.contains(&name.to_ascii_lowercase().as_str()) {
                return None;
            }
            Some(name.to_string())
        }
        Platform::GitHub => {
            if GITHUB_RESERVED.contains(&first.to_ascii_lowercase().as_str()) {
                return None;
            }
            Some(first)
        }
        Platform::LinkedIn => {
            let kind = first.to_ascii_lowercase();
            if kind != "in" && kind != "company" {
                return None;
            }
            let slug = segments.next()?;
            Some(format!("https://www.linkedin.com/{kind}/{slug}"))
        }
    }
}

/// An absolute link that could be someone's own site: off the crawled host
/// and not on any known platform.
pub fn is_external_website(url: &Url, site_host: Option<&str>, extra: &[String]) -> bool {
    let Some(host) = url.host_str() else {
        return false;
    };
    if let Some(site_host) = site_host {
        if host_matches(host, site_host) {
            return false;
        }
    }
    !is_platform_host(host, extra)
}
