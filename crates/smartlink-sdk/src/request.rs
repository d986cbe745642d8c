//! Inbound request signals.
//!
//! A [`RequestContext`] carries the query string, cookies and headers of one
//! request. It is built once by the caller and passed explicitly to the
//! resolver and the link builder.

use std::collections::BTreeMap;
use url::form_urlencoded;

/// Query parameters, cookies and headers of one request
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    query: Vec<(String, String)>,
    cookies: BTreeMap<String, String>,
    headers: BTreeMap<String, String>,
}

/// Percent-decode a single cookie value
pub(crate) fn decode_cookie_value(raw: &str) -> String {
    if raw.contains(['&', '=']) {
        return raw.to_string();
    }
    form_urlencoded::parse(raw.as_bytes())
        .next()
        .map(|(value, _)| value.into_owned())
        .unwrap_or_default()
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a raw query string (with or without the leading `?`)
    pub fn from_query_string(query: &str) -> Self {
        let mut ctx = Self::new();
        ctx.query = form_urlencoded::parse(query.trim_start_matches('?').as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        ctx
    }

    /// Add a query parameter
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Add a (decoded) cookie
    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    /// Add a header; names are case-insensitive
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Parse a `Cookie` request header (`a=1; b=2`)
    pub fn with_cookie_header(mut self, header: &str) -> Self {
        for pair in header.split(';') {
            if let Some((name, raw)) = pair.trim().split_once('=') {
                let name = name.trim();
                if !name.is_empty() {
                    self.cookies.insert(name.to_string(), decode_cookie_value(raw.trim()));
                }
            }
        }
        self
    }

    /// First value of a query parameter
    pub fn query(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// First non-empty value of a query parameter
    pub fn query_non_empty(&self, name: &str) -> Option<&str> {
        self.query(name).filter(|v| !v.trim().is_empty())
    }

    /// All query parameters in request order
    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn user_agent(&self) -> &str {
        self.header("user-agent").unwrap_or("")
    }
}
