//! Cookie-backed SmartLink sessions.
//!
//! The session cookie is read once at the start of a request into a
//! [`SessionSnapshot`] and written once at the end as a full replacement.
//! Every write restarts the cookie's lifetime.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;
use url::form_urlencoded;

use smartlink_core::EntityRef;

use crate::collaborators::ClientInfo;
use crate::environment::{Device, FacebookContext};
use crate::request::RequestContext;

/// Cookie holding the last entity the visitor opened
pub const ENTITY_COOKIE: &str = "smartlink_entity";

/// Cookie holding the visitor's language
pub const LANG_COOKIE: &str = "smartlink_lang";

/// Session state persisted between requests
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    #[serde(default)]
    pub entity_id: Option<u64>,
    #[serde(default)]
    pub lang: Option<String>,
    /// Pass-through parameters carried into the next request
    #[serde(default)]
    pub params: BTreeMap<String, String>,
    /// Parameters restored last time but not supplied again
    #[serde(default)]
    pub params_expired: BTreeMap<String, String>,
    #[serde(default)]
    pub device: Option<Device>,
    #[serde(default)]
    pub browser: Option<ClientInfo>,
    #[serde(default)]
    pub facebook: Option<FacebookContext>,
    #[serde(default)]
    pub website: Option<String>,
}

/// Session cookie name for an entity
pub fn session_cookie_name(prefix: &str, entity_id: u64) -> String {
    format!("{}{}", prefix, entity_id)
}

impl SessionSnapshot {
    /// Read the session cookie for `entity_id`; absent or malformed cookies
    /// yield an empty snapshot
    pub fn read(ctx: &RequestContext, prefix: &str, entity_id: u64) -> Self {
        let name = session_cookie_name(prefix, entity_id);
        let Some(raw) = ctx.cookie(&name) else {
            return Self::default();
        };
        match serde_json::from_str(raw) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                debug!("Ignoring malformed session cookie {}: {}", name, e);
                Self::default()
            }
        }
    }
}

/// Entity named by the entity cookie
pub fn read_entity_cookie(ctx: &RequestContext) -> Option<EntityRef> {
    serde_json::from_str(ctx.cookie(ENTITY_COOKIE)?).ok()
}

/// Language named by the language cookie (JSON string or bare tag)
pub fn read_lang_cookie(ctx: &RequestContext) -> Option<String> {
    let raw = ctx.cookie(LANG_COOKIE)?;
    serde_json::from_str::<String>(raw)
        .ok()
        .or_else(|| Some(raw.to_string()))
        .filter(|l| !l.is_empty())
}

/// A cookie to send back with the response
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SetCookie {
    pub name: String,
    /// Decoded value (JSON text)
    pub value: String,
    pub max_age: Duration,
    pub expires: DateTime<Utc>,
}

impl SetCookie {
    /// Cookie expiring `ttl` from `now`
    pub fn new(name: impl Into<String>, value: impl Into<String>, ttl: Duration, now: DateTime<Utc>) -> Self {
        let expires = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|d| now.checked_add_signed(d))
            .unwrap_or(now);
        Self {
            name: name.into(),
            value: value.into(),
            max_age: ttl,
            expires,
        }
    }

    /// `Set-Cookie` header value.
    ///
    /// `SameSite=None` keeps the cookie available inside page-tab iframes.
    pub fn to_header_value(&self) -> String {
        let encoded: String = form_urlencoded::byte_serialize(self.value.as_bytes()).collect();
        format!(
            "{}={}; Path=/; Max-Age={}; Expires={}; SameSite=None; Secure",
            self.name,
            encoded,
            self.max_age.as_secs(),
            self.expires.format("%a, %d %b %Y %H:%M:%S GMT"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use smartlink_core::EntityType;

    #[test]
    fn test_read_snapshot() {
        let cookie = r#"{"entity_id":5,"lang":"en_US","params":{"foo":"stale","bar":"kept"},"device":"mobile"}"#;
        let ctx = RequestContext::new().with_cookie("smartlink_5", cookie);

        let snapshot = SessionSnapshot::read(&ctx, "smartlink_", 5);
        assert_eq!(snapshot.entity_id, Some(5));
        assert_eq!(snapshot.params.get("bar").map(String::as_str), Some("kept"));
        assert_eq!(snapshot.device, Some(Device::Mobile));
        assert!(snapshot.params_expired.is_empty());

        // Another entity's cookie is not ours
        assert_eq!(SessionSnapshot::read(&ctx, "smartlink_", 6), SessionSnapshot::default());
    }

    #[test]
    fn test_malformed_snapshot_is_empty() {
        let ctx = RequestContext::new().with_cookie("smartlink_5", "{not json");
        assert_eq!(SessionSnapshot::read(&ctx, "smartlink_", 5), SessionSnapshot::default());
    }

    #[test]
    fn test_entity_and_lang_cookies() {
        let ctx = RequestContext::new()
            .with_cookie(ENTITY_COOKIE, r#"{"entity_type":"template","id":3}"#)
            .with_cookie(LANG_COOKIE, "\"fr_FR\"");
        assert_eq!(read_entity_cookie(&ctx), Some(EntityRef::new(EntityType::Template, 3)));
        assert_eq!(read_lang_cookie(&ctx).as_deref(), Some("fr_FR"));

        let bare = RequestContext::new().with_cookie(LANG_COOKIE, "en_GB");
        assert_eq!(read_lang_cookie(&bare).as_deref(), Some("en_GB"));
        assert!(read_entity_cookie(&bare).is_none());
    }

    #[test]
    fn test_set_cookie_header() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let cookie = SetCookie::new("smartlink_lang", "\"de_DE\"", Duration::from_secs(3600), now);
        assert_eq!(cookie.expires, Utc.with_ymd_and_hms(2024, 3, 1, 13, 0, 0).unwrap());
        assert_eq!(
            cookie.to_header_value(),
            "smartlink_lang=%22de_DE%22; Path=/; Max-Age=3600; Expires=Fri, 01 Mar 2024 13:00:00 GMT; SameSite=None; Secure"
        );

        // What we write, we read back
        let header = format!("smartlink_lang={}", cookie.to_header_value().split(';').next().unwrap().split_once('=').unwrap().1);
        let ctx = RequestContext::new().with_cookie_header(&header);
        assert_eq!(read_lang_cookie(&ctx).as_deref(), Some("de_DE"));
    }
}
