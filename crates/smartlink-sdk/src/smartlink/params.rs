//! Pass-through parameters.
//!
//! Live query values always win. A parameter restored from the session
//! cookie but missing from the live query stays usable for this request but
//! is marked expired and is not written back, unless it is re-added through
//! [`ParamBag::add_params`].

use std::collections::{BTreeMap, BTreeSet};

/// Query parameters the SDK interprets itself; never passed through
pub const RESERVED_PARAMS: &[&str] = &[
    "appId",
    "templateId",
    "versionId",
    "lang",
    "locale",
    "device",
    "fb_page_id",
    "fb_app_id",
    "signed_request",
    "website",
    "invalidate",
    "format",
];

pub fn is_reserved(name: &str) -> bool {
    RESERVED_PARAMS.contains(&name)
}

/// Ordered parameter bag with expiry marks
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamBag {
    entries: Vec<(String, String)>,
    expired: BTreeSet<String>,
}

impl ParamBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the live query, then the restored cookie params
    pub fn restore(live: &[(String, String)], restored: &BTreeMap<String, String>) -> Self {
        let mut bag = Self::new();
        for (key, value) in live {
            if !is_reserved(key) && !bag.contains(key) {
                bag.entries.push((key.clone(), value.clone()));
            }
        }
        for (key, value) in restored {
            if !is_reserved(key) && !bag.contains(key) {
                bag.entries.push((key.clone(), value.clone()));
                bag.expired.insert(key.clone());
            }
        }
        bag
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Replace the whole bag
    pub fn set_params<I, K, V>(&mut self, params: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.entries.clear();
        self.expired.clear();
        self.add_params(params);
    }

    /// Merge parameters; existing values are kept, re-added keys un-expire
    pub fn add_params<I, K, V>(&mut self, params: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in params {
            let key = key.into();
            self.expired.remove(&key);
            if !self.contains(&key) {
                self.entries.push((key, value.into()));
            }
        }
    }

    /// All parameters in insertion order (expired included)
    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    pub fn is_expired(&self, key: &str) -> bool {
        self.expired.contains(key)
    }

    /// Parameters to write back to the session cookie
    pub fn persisted(&self) -> BTreeMap<String, String> {
        self.entries
            .iter()
            .filter(|(k, _)| !self.expired.contains(k))
            .cloned()
            .collect()
    }

    /// Expired parameters with their last values
    pub fn expired(&self) -> BTreeMap<String, String> {
        self.entries
            .iter()
            .filter(|(k, _)| self.expired.contains(k))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(list: &[(&str, &str)]) -> Vec<(String, String)> {
        list.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn map(list: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs(list).into_iter().collect()
    }

    #[test]
    fn test_live_wins_and_restored_expire() {
        let bag = ParamBag::restore(
            &pairs(&[("foo", "live"), ("appId", "5")]),
            &map(&[("foo", "stale"), ("bar", "kept")]),
        );

        assert_eq!(bag.get("foo"), Some("live"));
        assert_eq!(bag.get("bar"), Some("kept"));
        assert!(!bag.contains("appId"));
        assert!(!bag.is_expired("foo"));
        assert!(bag.is_expired("bar"));

        assert_eq!(bag.persisted(), map(&[("foo", "live")]));
        assert_eq!(bag.expired(), map(&[("bar", "kept")]));
    }

    #[test]
    fn test_add_params_unexpires_and_keeps_first_value() {
        let mut bag = ParamBag::restore(&pairs(&[("foo", "live")]), &map(&[("bar", "kept")]));
        bag.add_params([("bar", "new"), ("foo", "ignored"), ("baz", "added")]);

        assert_eq!(bag.get("bar"), Some("kept"));
        assert_eq!(bag.get("foo"), Some("live"));
        assert!(bag.expired().is_empty());
        assert_eq!(bag.persisted(), map(&[("bar", "kept"), ("baz", "added"), ("foo", "live")]));

        let order: Vec<&str> = bag.entries().iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(order, vec!["foo", "bar", "baz"]);
    }

    #[test]
    fn test_set_params_replaces() {
        let mut bag = ParamBag::restore(&pairs(&[("foo", "live")]), &map(&[("bar", "kept")]));
        bag.set_params([("only", "this")]);
        assert_eq!(bag.entries(), pairs(&[("only", "this")]).as_slice());
        assert!(bag.expired().is_empty());
    }
}
