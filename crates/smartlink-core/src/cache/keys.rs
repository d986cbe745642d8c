//! Cache key derivation.

use serde_json::json;
use std::collections::BTreeMap;

/// Deterministic cache key for a GET request.
///
/// The language is hashed as a JSON value, so `None` (`null`), `Some("")`
/// and concrete tags never collide. Parameters are ordered by key.
pub fn cache_key(lang: Option<&str>, route: &str, params: &BTreeMap<String, String>) -> String {
    let material = json!([lang, route.trim_matches('/'), params]);
    format!("{:x}", md5::compute(material.to_string()))
}
