//! Content reference normalization
//!
//! Links reported by embedded content come in many shapes: relative wiki
//! paths, absolute URLs, or URLs wrapped by the content proxy (`/m?url=…`,
//! `/m?path=…`, `/i?url=…`), sometimes wrapped more than once or with a
//! double-encoded query. Normalization turns all of them into one absolute
//! http(s) URL without a fragment, so identical targets produce identical
//! dedup keys.

use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;
use url::{form_urlencoded, Position, Url};

/// Nested proxy wrappers unwrapped before giving up
const MAX_PROXY_HOPS: usize = 8;

/// Wikimedia apex domains; any subdomain is accepted
const WIKIMEDIA_APEX: &[&str] = &[
    "wikipedia.org",
    "wiktionary.org",
    "wikidata.org",
    "wikimedia.org",
    "wikibooks.org",
    "wikiquote.org",
    "wikiversity.org",
    "wikivoyage.org",
    "wikisource.org",
    "wikinews.org",
    "mediawiki.org",
];

// File and media description pages, by path or by `title=` query
const FILE_LIKE_PATTERN: &str = r"(?i)(/(wiki|w)/|[?&]title=)(File|Media):|/wiki/Special:FilePath/";

/// Resolve a raw link against `base` into a canonical absolute URL.
///
/// Returns `None` for empty references, in-page anchors, `javascript:` and
/// `data:` links, and anything that does not end up as http(s).
///
/// # Examples
///
/// ```
/// # use framegraph_core::utils::normalize_reference;
/// # use url::Url;
/// let base = Url::parse("https://en.m.wikipedia.org").unwrap();
/// let proxies = vec!["/m".to_string()];
/// let url = normalize_reference("/m?path=/wiki/Rust%23History", &base, &proxies).unwrap();
/// assert_eq!(url.as_str(), "https://en.m.wikipedia.org/wiki/Rust");
/// assert!(normalize_reference("#top", &base, &proxies).is_none());
/// ```
pub fn normalize_reference(raw: &str, base: &Url, proxy_paths: &[String]) -> Option<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with("javascript:") || lower.starts_with("data:") {
        return None;
    }

    let mut current = base.join(trimmed).ok()?;
    for _ in 0..MAX_PROXY_HOPS {
        match unwrap_proxy_hop(&current, base, proxy_paths) {
            Some(inner) => current = inner,
            None => break,
        }
    }

    if !is_http(&current) {
        return None;
    }
    current.set_fragment(None);
    Some(current)
}

/// One level of proxy unwrapping, or `None` if `url` is not a proxy URL.
fn unwrap_proxy_hop(url: &Url, base: &Url, proxy_paths: &[String]) -> Option<Url> {
    if !is_http(url) || !proxy_paths.iter().any(|p| p == url.path()) {
        return None;
    }

    let params = proxy_params(url);
    if let Some(inner) = params.get("url").filter(|s| !s.is_empty()) {
        return Url::parse(inner).ok();
    }
    // Only the page proxy accepts a bare wiki path.
    if proxy_paths.first().map(String::as_str) == Some(url.path()) {
        if let Some(path) = params.get("path").filter(|s| !s.is_empty()) {
            return base.join(path).ok();
        }
    }
    None
}

/// Query parameters of a proxy URL, tolerating a double-encoded query
/// (`url%3Dhttps%253A…`) that decodes to a single `url=…` key.
fn proxy_params(url: &Url) -> HashMap<String, String> {
    let params: HashMap<String, String> = url.query_pairs().into_owned().collect();
    if params.contains_key("url") || params.contains_key("path") || params.len() != 1 {
        return params;
    }

    match params.keys().next() {
        Some(only) if only.starts_with("url=") || only.starts_with("path=") => {
            form_urlencoded::parse(only.as_bytes()).into_owned().collect()
        }
        _ => params,
    }
}

fn is_http(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

/// True for Wikimedia hosts (apex domains, their subdomains, Commons and
/// the upload host). Case-insensitive; a port suffix is ignored.
pub fn is_wikimedia_host(host: &str) -> bool {
    let host = host.trim().to_ascii_lowercase();
    let host = host.split(':').next().unwrap_or_default();
    if host.is_empty() {
        return false;
    }
    if host == "commons.wikimedia.org" || host == "upload.wikimedia.org" {
        return true;
    }
    WIKIMEDIA_APEX
        .iter()
        .any(|apex| host == *apex || host.ends_with(&format!(".{}", apex)))
}

/// True for file/media description pages, which the embedded content opens
/// itself instead of spawning a frame.
pub fn is_file_like(url: &Url) -> bool {
    static FILE_LIKE_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = FILE_LIKE_REGEX.get_or_init(|| Regex::new(FILE_LIKE_PATTERN).unwrap());
    regex.is_match(&url[Position::BeforePath..])
}
