//! Signed request payloads posted by the social platform to page tabs.
//!
//! Format: `<signature>.<base64url(json)>`. The signature is not verified;
//! only the payload is read. Any malformation yields `None`.

use base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine as _,
};
use serde_json::{Map, Value};
use tracing::debug;

/// Standard alphabet, lenient about padding and trailing bits
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Decoded payload of a signed request
#[derive(Debug, Clone, PartialEq)]
pub struct SignedRequest {
    payload: Map<String, Value>,
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl SignedRequest {
    /// Decode a raw `signed_request` value
    pub fn decode(raw: &str) -> Option<Self> {
        let (_signature, payload) = raw.split_once('.')?;
        let payload: String = payload
            .chars()
            .map(|c| match c {
                '-' => '+',
                '_' => '/',
                c => c,
            })
            .collect();
        let bytes = match PAYLOAD_ENGINE.decode(payload) {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!("Ignoring signed request with bad encoding: {}", e);
                return None;
            }
        };
        match serde_json::from_slice::<Value>(&bytes) {
            Ok(Value::Object(payload)) => Some(Self { payload }),
            Ok(_) => None,
            Err(e) => {
                debug!("Ignoring signed request with bad payload: {}", e);
                None
            }
        }
    }

    /// Id of the page the tab is rendered on
    pub fn page_id(&self) -> Option<String> {
        self.payload.get("page")?.get("id").and_then(id_string)
    }

    /// Whether the visitor likes the page
    pub fn page_liked(&self) -> bool {
        self.payload
            .get("page")
            .and_then(|p| p.get("liked"))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Parameters passed through the tab URL's `app_data`.
    ///
    /// Accepts a JSON object or a string holding one; scalar values are
    /// stringified, nested values are kept as JSON text.
    pub fn app_data(&self) -> Vec<(String, String)> {
        let object = match self.payload.get("app_data") {
            Some(Value::Object(map)) => map.clone(),
            Some(Value::String(s)) => match serde_json::from_str::<Value>(s) {
                Ok(Value::Object(map)) => map,
                _ => return Vec::new(),
            },
            _ => return Vec::new(),
        };
        object
            .into_iter()
            .filter_map(|(k, v)| {
                let value = match v {
                    Value::Null => return None,
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                Some((k, value))
            })
            .collect()
    }

    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }
}

#[cfg(test)]
pub(crate) fn encode_for_test(payload: &Value) -> String {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    format!("sig.{}", URL_SAFE_NO_PAD.encode(payload.to_string()))
}
