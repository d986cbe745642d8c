//! Embedding website validation.

use url::Url;

/// Hosts (and their subdomains) that can never be an embedding website
const BLOCKED_DOMAINS: &[&str] = &["facebook.com", "fb.com", "fbcdn.net"];

/// Paths with these extensions point at assets, not pages
const ASSET_EXTENSIONS: &[&str] = &[
    ".js", ".css", ".png", ".jpg", ".jpeg", ".gif", ".svg", ".ico", ".woff", ".woff2",
];

fn is_blocked_host(host: &str) -> bool {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    BLOCKED_DOMAINS
        .iter()
        .any(|d| host == *d || host.ends_with(&format!(".{}", d)))
}

/// Normalized website URL, or `None` when it cannot embed the app
pub fn validate_website(raw: &str) -> Option<String> {
    let url = Url::parse(raw.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    let host = url.host_str()?;
    if is_blocked_host(host) {
        return None;
    }
    let path = url.path().to_ascii_lowercase();
    if ASSET_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
        return None;
    }
    Some(url.to_string())
}
