//! Codec for the suspended placeholder URL.
//!
//! `{origin}/suspended.html#ttl={title}&pos={scrollY}&uri={originalUrl}`
//!
//! `uri` is always last and unescaped, so it may itself contain `&` and `#`.

use std::sync::OnceLock;

use regex::Regex;

use crate::types::tab::ScrollPosition;

const SUSPENDED_PAGE: &str = "/suspended.html";

pub fn build(origin: &str, title: &str, scroll: ScrollPosition, original_url: &str) -> String {
    format!(
        "{}{}#ttl={}&pos={}&uri={}",
        origin,
        SUSPENDED_PAGE,
        title.replace('&', "%26"),
        scroll.y,
        original_url
    )
}

/// Whether `url` is this extension's suspended placeholder.
pub fn is_suspended_url(url: &str, origin: &str) -> bool {
    url.strip_prefix(origin)
        .is_some_and(|rest| rest.starts_with(SUSPENDED_PAGE))
}

/// Whether `url` is a suspended placeholder of any extension, including
/// another installation of this one.
pub fn is_any_suspended_url(url: &str) -> bool {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^chrome-extension://[^/]*/suspended\.html").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(url))
}

/// Rewrites a placeholder owned by another origin so it belongs to `origin`.
pub fn claim(url: &str, origin: &str) -> Option<String> {
    if !is_any_suspended_url(url) || is_suspended_url(url, origin) {
        return None;
    }
    let page = url.find(SUSPENDED_PAGE)?;
    Some(format!("{}{}", origin, &url[page..]))
}

fn fragment(url: &str) -> Option<&str> {
    url.split_once('#').map(|(_, hash)| hash)
}

/// The page the placeholder stands in for.
pub fn original_url(url: &str) -> Option<String> {
    let hash = fragment(url)?;
    let start = if hash.starts_with("uri=") {
        0
    } else {
        hash.find("&uri=")? + 1
    };
    let original = &hash[start + "uri=".len()..];
    if original.is_empty() {
        None
    } else {
        Some(original.to_string())
    }
}

/// Scroll offset recorded when the tab was suspended; zero when absent.
pub fn scroll_position(url: &str) -> ScrollPosition {
    let Some(hash) = fragment(url) else {
        return ScrollPosition::default();
    };
    // Parameters after `uri=` belong to the original URL.
    let params = match hash.find("uri=") {
        Some(end) => &hash[..end],
        None => hash,
    };
    params
        .split('&')
        .find_map(|pair| pair.strip_prefix("pos="))
        .and_then(|pos| pos.parse::<f64>().ok())
        .filter(|y| y.is_finite())
        .map(ScrollPosition::vertical)
        .unwrap_or_default()
}
