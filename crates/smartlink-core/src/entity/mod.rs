//! Configuration-bearing entities (apps, templates, versions).
//!
//! An [`Entity`] lives for one request. Each resource (configs, infos,
//! translations, languages, channels) is fetched through the
//! [`ConfigGateway`] at most once per instance on success; failures are
//! returned and the next call retries.

mod stylesheet;
mod translate;

pub use stylesheet::StylesheetRequest;
pub use translate::format_printf;

use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::client::QueryParams;
use crate::error::{Error, Result};
use crate::gateway::ConfigGateway;
use crate::lang::{validate_lang, DEFAULT_LANG};
use crate::types::{unwrap_envelope, Channel, EntityRef, EntityType, Resource};

/// Keyed records from an object or from a list of records
fn keyed_records(payload: &Value, key_fields: &[&str]) -> BTreeMap<String, Value> {
    match unwrap_envelope(payload) {
        Value::Object(map) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some((s.clone(), item.clone())),
                Value::Object(record) => key_fields
                    .iter()
                    .find_map(|f| record.get(*f).and_then(Value::as_str))
                    .map(|k| (k.to_string(), item.clone())),
                _ => None,
            })
            .collect(),
        _ => BTreeMap::new(),
    }
}

/// An app, template or version for one request
pub struct Entity {
    entity: EntityRef,
    lang: String,
    gateway: Arc<ConfigGateway>,
    configs: OnceCell<BTreeMap<String, Value>>,
    infos: OnceCell<BTreeMap<String, Value>>,
    translations: OnceCell<BTreeMap<String, Value>>,
    languages: OnceCell<BTreeMap<String, Value>>,
    channels: OnceCell<Vec<Channel>>,
}

impl Entity {
    /// Create an entity; `lang` defaults to [`DEFAULT_LANG`]
    pub fn new(entity: EntityRef, lang: Option<&str>, gateway: Arc<ConfigGateway>) -> Result<Self> {
        let lang = lang.unwrap_or(DEFAULT_LANG);
        validate_lang(lang)?;
        Ok(Self {
            entity,
            lang: lang.to_string(),
            gateway,
            configs: OnceCell::new(),
            infos: OnceCell::new(),
            translations: OnceCell::new(),
            languages: OnceCell::new(),
            channels: OnceCell::new(),
        })
    }

    pub fn entity_ref(&self) -> EntityRef {
        self.entity
    }

    pub fn id(&self) -> u64 {
        self.entity.id
    }

    pub fn entity_type(&self) -> EntityType {
        self.entity.entity_type
    }

    pub fn lang(&self) -> &str {
        &self.lang
    }

    /// Switch language; memoized data is dropped
    pub fn set_lang(&mut self, lang: &str) -> Result<()> {
        validate_lang(lang)?;
        if lang != self.lang {
            self.lang = lang.to_string();
            self.configs = OnceCell::new();
            self.infos = OnceCell::new();
            self.translations = OnceCell::new();
            self.languages = OnceCell::new();
            self.channels = OnceCell::new();
        }
        Ok(())
    }

    async fn fetch(&self, route: &str) -> Result<Value> {
        self.gateway.fetch(route, Some(&self.lang), &QueryParams::new()).await
    }

    async fn fetch_resource(&self, resource: Resource) -> Result<Value> {
        self.fetch(&self.entity.resource_route(resource)).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Configs
    // ─────────────────────────────────────────────────────────────────────────

    /// All config records keyed by config key
    pub async fn configs(&self) -> Result<&BTreeMap<String, Value>> {
        self.configs
            .get_or_try_init(|| async {
                let payload = self.fetch_resource(Resource::Configs).await?;
                Ok::<_, Error>(keyed_records(&payload, &["key", "name"]))
            })
            .await
    }

    /// One attribute of a config record
    pub async fn config_attr(&self, key: &str, attr: &str) -> Result<Option<Value>> {
        if key.is_empty() {
            return Err(Error::invalid_input("config key must not be empty"));
        }
        let configs = self.configs().await?;
        Ok(configs.get(key).and_then(|record| match record {
            Value::Object(fields) => fields.get(attr).cloned(),
            scalar if attr == "value" => Some(scalar.clone()),
            _ => None,
        }))
    }

    /// Several attributes of a config record; absent attributes map to `Null`
    pub async fn config_attrs(&self, key: &str, attrs: &[&str]) -> Result<BTreeMap<String, Value>> {
        if key.is_empty() {
            return Err(Error::invalid_input("config key must not be empty"));
        }
        let configs = self.configs().await?;
        let record = configs.get(key);
        Ok(attrs
            .iter()
            .map(|attr| {
                let value = record.and_then(|r| r.get(*attr)).cloned().unwrap_or(Value::Null);
                (attr.to_string(), value)
            })
            .collect())
    }

    /// Shorthand for the `value` attribute of a config
    pub async fn config(&self, key: &str) -> Result<Option<Value>> {
        self.config_attr(key, "value").await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Infos
    // ─────────────────────────────────────────────────────────────────────────

    /// Entity fields merged with its info records.
    ///
    /// Info records win on key collision. A missing info list counts as empty.
    pub async fn infos(&self) -> Result<&BTreeMap<String, Value>> {
        self.infos
            .get_or_try_init(|| async {
                let primary = self.fetch(&self.entity.route()).await?;
                let mut merged: BTreeMap<String, Value> = match unwrap_envelope(&primary) {
                    Value::Object(fields) => fields.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
                    _ => BTreeMap::new(),
                };

                let supplementary = match self.fetch_resource(Resource::Infos).await {
                    Ok(payload) => payload,
                    Err(Error::NotFound(route)) => {
                        debug!("No infos at {}", route);
                        Value::Null
                    }
                    Err(e) => return Err(e),
                };
                let records = keyed_records(&supplementary, &["key"]);
                let is_list = unwrap_envelope(&supplementary).is_array();
                for (key, record) in records {
                    let value = if is_list {
                        record.get("value").cloned().unwrap_or(Value::Null)
                    } else {
                        record
                    };
                    merged.insert(key, value);
                }
                Ok::<_, Error>(merged)
            })
            .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Translations & Languages
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn translations(&self) -> Result<&BTreeMap<String, Value>> {
        self.translations
            .get_or_try_init(|| async {
                let payload = self.fetch_resource(Resource::Translations).await?;
                Ok::<_, Error>(keyed_records(&payload, &["key"]))
            })
            .await
    }

    /// Translation for `key` with printf-style `args` substituted.
    ///
    /// Unknown keys (and unavailable translations) yield the key itself.
    pub async fn translate(&self, key: &str, args: &[&str]) -> String {
        if key.is_empty() {
            return String::new();
        }
        let translations = match self.translations().await {
            Ok(t) => t,
            Err(e) => {
                warn!("Translations for {} unavailable: {}", self.entity, e);
                return key.to_string();
            }
        };
        let template = translations.get(key).and_then(|record| match record {
            Value::String(s) => Some(s.as_str()),
            Value::Object(fields) => fields.get("translation").and_then(Value::as_str),
            _ => None,
        });
        match template {
            Some(t) => format_printf(t, args),
            None => key.to_string(),
        }
    }

    /// Languages the entity is available in, keyed by locale tag
    pub async fn languages(&self) -> Result<&BTreeMap<String, Value>> {
        self.languages
            .get_or_try_init(|| async {
                let payload = self.fetch_resource(Resource::Languages).await?;
                Ok::<_, Error>(keyed_records(&payload, &["lang", "locale", "key"]))
            })
            .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Channels
    // ─────────────────────────────────────────────────────────────────────────

    /// Publication channels; empty without I/O for entities without channels
    pub async fn channels(&self) -> Result<&[Channel]> {
        let channels = self
            .channels
            .get_or_try_init(|| async {
                if !self.entity.entity_type.has_channels() {
                    return Ok::<_, Error>(Vec::new());
                }
                let payload = self.fetch_resource(Resource::Channels).await?;
                let items: Vec<Value> = match unwrap_envelope(&payload) {
                    Value::Array(items) => items.clone(),
                    Value::Object(map) => map.values().cloned().collect(),
                    _ => Vec::new(),
                };
                Ok(items
                    .into_iter()
                    .filter_map(|item| match serde_json::from_value::<Channel>(item) {
                        Ok(channel) => Some(channel),
                        Err(e) => {
                            warn!("Skipping malformed channel of {}: {}", self.entity, e);
                            None
                        }
                    })
                    .collect())
            })
            .await?;
        Ok(channels.as_slice())
    }

    /// Stylesheet inputs from this entity's configs
    pub async fn stylesheet_request(&self, extra_files: &[PathBuf]) -> Result<StylesheetRequest> {
        let configs = self.configs().await?;
        Ok(StylesheetRequest::from_configs(configs, extra_files.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{MemoryStore, TaggedCache};
    use crate::client::StaticApi;
    use serde_json::json;

    fn entity_with(api: Arc<StaticApi>, entity: EntityRef) -> Entity {
        let cache = TaggedCache::new(Arc::new(MemoryStore::new()), None);
        let gateway = Arc::new(ConfigGateway::new(api, Arc::new(cache)));
        Entity::new(entity, None, gateway).unwrap()
    }

    fn app(id: u64) -> EntityRef {
        EntityRef::new(EntityType::App, id)
    }

    #[tokio::test]
    async fn test_config_accessors() {
        let api = Arc::new(StaticApi::new().with_route(
            "apps/5/configs",
            200,
            json!([
                {"key": "title", "type": "text", "value": "Spring Raffle"},
                {"key": "color", "type": "color", "value": "#fff", "label": "Primary"}
            ]),
        ));
        let entity = entity_with(api.clone(), app(5));

        assert_eq!(entity.config("title").await.unwrap(), Some(json!("Spring Raffle")));
        assert_eq!(entity.config("missing").await.unwrap(), None);
        assert_eq!(entity.config_attr("color", "label").await.unwrap(), Some(json!("Primary")));

        let attrs = entity.config_attrs("color", &["value", "type", "nope"]).await.unwrap();
        assert_eq!(attrs.len(), 3);
        assert_eq!(attrs["value"], json!("#fff"));
        assert_eq!(attrs["nope"], Value::Null);

        // Memoized after the first successful load
        assert_eq!(api.call_count("apps/5/configs"), 1);
    }

    #[tokio::test]
    async fn test_empty_key_rejected_before_io() {
        let api = Arc::new(StaticApi::new());
        let entity = entity_with(api.clone(), app(5));

        assert!(matches!(entity.config("").await, Err(Error::InvalidInput(_))));
        assert!(matches!(entity.config_attrs("", &["value"]).await, Err(Error::InvalidInput(_))));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_failures_not_memoized() {
        let api = Arc::new(StaticApi::new());
        let entity = entity_with(api.clone(), app(5));

        assert!(matches!(entity.configs().await, Err(Error::NotFound(_))));

        api.insert("apps/5/configs", 200, json!({"title": {"value": "Later"}}));
        assert_eq!(entity.config("title").await.unwrap(), Some(json!("Later")));
    }

    #[tokio::test]
    async fn test_infos_merge_order() {
        let api = Arc::new(
            StaticApi::new()
                .with_route("apps/5", 200, json!({"zebra": 1, "alpha": 2}))
                .with_route(
                    "apps/5/infos",
                    200,
                    json!([{"key": "alpha", "value": 3}, {"key": "mango", "value": 4}]),
                ),
        );
        let entity = entity_with(api, app(5));

        let infos = entity.infos().await.unwrap();
        let keys: Vec<&str> = infos.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["alpha", "mango", "zebra"]);
        assert_eq!(infos["alpha"], json!(3));
        assert_eq!(infos["zebra"], json!(1));
    }

    #[tokio::test]
    async fn test_infos_without_info_list() {
        let api = Arc::new(StaticApi::new().with_route("versions/2", 200, json!({"name": "v2"})));
        let entity = entity_with(api, EntityRef::new(EntityType::Version, 2));

        let infos = entity.infos().await.unwrap();
        assert_eq!(infos.len(), 1);
        assert_eq!(infos["name"], json!("v2"));
    }

    #[tokio::test]
    async fn test_translate() {
        let api = Arc::new(
            StaticApi::new()
                .with_route("apps/5", 200, json!({"templateId": 3}))
                .with_route(
                    "apps/5/translations?lang=en_US",
                    200,
                    json!({
                        "greeting": "Hello %s",
                        "score": {"translation": "%2$s scored %1$d points"},
                    }),
                ),
        );
        let mut entity = entity_with(api, app(5));
        entity.set_lang("en_US").unwrap();

        assert_eq!(entity.translate("greeting", &["Ann"]).await, "Hello Ann");
        assert_eq!(entity.translate("score", &["7", "Bo"]).await, "Bo scored 7 points");
        assert_eq!(entity.translate("unknown_key", &[]).await, "unknown_key");
        assert_eq!(entity.translate("", &[]).await, "");
    }

    #[tokio::test]
    async fn test_set_lang_validation_and_reset() {
        let api = Arc::new(
            StaticApi::new()
                .with_route("versions/2/configs?lang=de_DE", 200, json!({"t": {"value": "Hallo"}}))
                .with_route("versions/2/configs?lang=en_US", 200, json!({"t": {"value": "Hello"}})),
        );
        let mut entity = entity_with(api.clone(), EntityRef::new(EntityType::Version, 2));
        assert_eq!(entity.lang(), DEFAULT_LANG);
        assert_eq!(entity.config("t").await.unwrap(), Some(json!("Hallo")));

        assert!(matches!(entity.set_lang("klingon"), Err(Error::InvalidInput(_))));
        assert_eq!(entity.lang(), DEFAULT_LANG);

        entity.set_lang("en_US").unwrap();
        assert_eq!(entity.config("t").await.unwrap(), Some(json!("Hello")));
        assert_eq!(api.call_count("versions/2/configs"), 2);
    }

    #[tokio::test]
    async fn test_channels_capability() {
        let api = Arc::new(
            StaticApi::new()
                .with_route("apps/5", 200, json!({"templateId": 3}))
                .with_route(
                    "apps/5/channels",
                    200,
                    json!([
                        {"type": "facebook", "value": "https://www.facebook.com/p/app/1", "pageId": "11"},
                        {"type": "website", "value": "https://shop.example.com/raffle/"},
                        {"bogus": true}
                    ]),
                ),
        );
        let entity = entity_with(api.clone(), app(5));
        let channels = entity.channels().await.unwrap();
        assert_eq!(channels.len(), 2);
        assert!(channels[0].is_facebook());

        let template = entity_with(api.clone(), EntityRef::new(EntityType::Template, 3));
        assert!(template.channels().await.unwrap().is_empty());
        assert_eq!(api.call_count("templates/3/channels"), 0);
    }

    #[tokio::test]
    async fn test_stylesheet_request() {
        let api = Arc::new(StaticApi::new().with_route(
            "versions/2/configs",
            200,
            json!({"custom_css": {"type": "css", "value": "a { color: $primary; }"},
                   "primary": {"type": "color", "value": "#00f"}}),
        ));
        let entity = entity_with(api, EntityRef::new(EntityType::Version, 2));

        let request = entity.stylesheet_request(&[PathBuf::from("theme.scss")]).await.unwrap();
        assert_eq!(request.files, vec![PathBuf::from("theme.scss")]);
        assert_eq!(request.inline_sources.len(), 1);
        assert_eq!(request.variables["primary"], "#00f");
    }
}
