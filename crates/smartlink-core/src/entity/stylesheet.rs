//! Input for a stylesheet compilation.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Everything a stylesheet compiler needs for one compilation.
///
/// Built once per call from an entity's configs and never mutated by the
/// compiler.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StylesheetRequest {
    /// Stylesheet files compiled first, in order
    pub files: Vec<PathBuf>,
    /// Inline sources from `css` configs, ordered by config key
    pub inline_sources: Vec<String>,
    /// Variables from `color` and `text` configs
    pub variables: BTreeMap<String, String>,
    /// Literal string replacements applied to the compiled output
    pub replacements: BTreeMap<String, String>,
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

impl StylesheetRequest {
    /// Collect inline sources and variables from config records
    pub fn from_configs(configs: &BTreeMap<String, Value>, files: Vec<PathBuf>) -> Self {
        let mut request = Self {
            files,
            ..Self::default()
        };

        for (key, record) in configs {
            let Some(value) = record.get("value").and_then(as_text) else {
                continue;
            };
            match record.get("type").and_then(Value::as_str) {
                Some("css") => request.inline_sources.push(value),
                Some("color") | Some("text") => {
                    request.variables.insert(key.clone(), value);
                }
                _ => {}
            }
        }

        request
    }

    pub fn with_replacement(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.replacements.insert(from.into(), to.into());
        self
    }

    /// True when there is nothing to compile
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.inline_sources.is_empty()
    }
}
