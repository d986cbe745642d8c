//! Caching gateway in front of the configuration API.
//!
//! [`ConfigGateway::fetch`] answers from the [`TaggedCache`] when it can and
//! falls back to the [`ConfigApi`] otherwise. Successful responses are cached
//! under the tag set derived from their route (see [`ConfigGateway::tags_for`]);
//! the single cache write happens only once that tag set is complete.

mod directive;

pub use directive::CacheDirective;

use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::cache::{cache_key, TaggedCache};
use crate::client::{ConfigApi, QueryParams};
use crate::error::{Error, Result};
use crate::types::{unwrap_envelope, ApiResponse, EntityRef, EntityType, Resource};

/// Cached access to the configuration API
pub struct ConfigGateway {
    client: Arc<dyn ConfigApi>,
    cache: Arc<TaggedCache>,
}

/// Non-empty route segments
fn segments(route: &str) -> Vec<&str> {
    route.split('/').filter(|s| !s.is_empty()).collect()
}

/// Entity addressed by the first two segments of a route, if any
pub fn entity_of_route(route: &str) -> Option<EntityRef> {
    let segs = segments(route);
    let entity_type = EntityType::from_collection(segs.first()?)?;
    let id = segs.get(1)?.parse().ok()?;
    Some(EntityRef::new(entity_type, id))
}

/// Read an id field that may be encoded as number or string
fn id_field(payload: &Value, field: &str) -> Option<u64> {
    match unwrap_envelope(payload).get(field)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Map a non-success response to an error
fn failure(route: &str, resp: &ApiResponse) -> Error {
    match resp.status {
        401 => Error::Unauthorized,
        404 => Error::NotFound(route.to_string()),
        status => Error::unavailable(format!("{} returned status {}", route, status)),
    }
}

impl ConfigGateway {
    pub fn new(client: Arc<dyn ConfigApi>, cache: Arc<TaggedCache>) -> Self {
        Self { client, cache }
    }

    /// The cache this gateway writes to
    pub fn cache(&self) -> &TaggedCache {
        &self.cache
    }

    /// Fetch a route, answering from cache when possible.
    ///
    /// `lang` is sent as the `lang` query parameter and is part of the cache
    /// key. Only successful responses are cached.
    pub async fn fetch(&self, route: &str, lang: Option<&str>, params: &QueryParams) -> Result<Value> {
        let key = cache_key(lang, route, params);
        if let Some(value) = self.cache.get(&key).await {
            return Ok(value);
        }

        let mut query = params.clone();
        if let Some(lang) = lang {
            query.insert("lang".to_string(), lang.to_string());
        }

        let resp = self.client.get(route, &query).await?;
        if !resp.is_success() {
            debug!("Fetch {} failed with status {}", route, resp.status);
            return Err(failure(route, &resp));
        }

        match self.tags_for(route, &resp.body).await {
            Ok(Some(tags)) => {
                self.cache.set(&key, resp.body.clone(), &tags).await;
            }
            Ok(None) => debug!("Route {} is not taggable, not caching", route),
            Err(e) => warn!("Tag resolution for {} failed, not caching: {}", route, e),
        }

        Ok(resp.body)
    }

    /// Tag set for a successful response of `route`.
    ///
    /// Returns `None` for routes outside the entity collections. Resolving
    /// the ancestor may require a lookup of the entity itself; a failure of
    /// that lookup is returned as an error so nothing gets cached under an
    /// incomplete tag set.
    pub async fn tags_for(&self, route: &str, payload: &Value) -> Result<Option<BTreeSet<String>>> {
        let Some(entity) = entity_of_route(route) else {
            return Ok(None);
        };
        let segs = segments(route);

        let mut tags = BTreeSet::new();
        tags.insert(entity.tag());

        if let Some(relation) = entity.entity_type.ancestor() {
            let ancestor = match id_field(payload, relation.field) {
                Some(id) => Some(id),
                // The entity's own payload had no ancestor: it has none
                None if segs.len() == 2 => None,
                None => self.lookup_ancestor(&entity, relation.field).await?,
            };
            if let Some(ancestor_id) = ancestor.filter(|a| *a != entity.id) {
                tags.insert(format!("{}.{}", relation.relation, ancestor_id));
            }
        }

        if segs.len() == 2 {
            tags.insert(entity.resource_tag(Resource::Infos));
        } else if let Some(resource) = segs.get(2).and_then(|s| Resource::from_str(s)) {
            tags.insert(entity.resource_tag(resource));
        }

        Ok(Some(tags))
    }

    async fn lookup_ancestor(&self, entity: &EntityRef, field: &str) -> Result<Option<u64>> {
        let route = entity.route();
        let resp = self.client.get(&route, &QueryParams::new()).await?;
        if !resp.is_success() {
            return Err(failure(&route, &resp));
        }
        Ok(id_field(&resp.body, field))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Writes & Invalidation
    // ─────────────────────────────────────────────────────────────────────────

    /// Apply a cache directive for `entity`; returns the tags invalidated
    pub async fn invalidate(&self, entity: &EntityRef, directive: CacheDirective) -> Vec<String> {
        let tags = directive.tags_for(entity);
        if tags.is_empty() {
            debug!("Directive '{}' does not apply to {}", directive.as_str(), entity);
        } else {
            self.cache.invalidate_tags(&tags).await;
        }
        tags
    }

    /// POST to the API, invalidating the addressed entity on success
    pub async fn post(&self, route: &str, body: &Value) -> Result<Value> {
        let resp = self.client.post(route, body).await?;
        self.after_write(route, resp).await
    }

    /// PUT to the API, invalidating the addressed entity on success
    pub async fn put(&self, route: &str, body: &Value) -> Result<Value> {
        let resp = self.client.put(route, body).await?;
        self.after_write(route, resp).await
    }

    async fn after_write(&self, route: &str, resp: ApiResponse) -> Result<Value> {
        if !(200..300).contains(&resp.status) {
            return Err(failure(route, &resp));
        }
        if let Some(entity) = entity_of_route(route) {
            self.cache.invalidate_tag(&entity.tag()).await;
        }
        Ok(resp.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;
    use crate::client::StaticApi;
    use serde_json::json;

    fn gateway(api: Arc<StaticApi>) -> ConfigGateway {
        let cache = TaggedCache::new(Arc::new(MemoryStore::new()), None);
        ConfigGateway::new(api, Arc::new(cache))
    }

    fn tagset(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|t| t.to_string()).collect()
    }

    #[tokio::test]
    async fn test_fetch_caches_success() {
        let api = Arc::new(StaticApi::new().with_route("apps/5", 200, json!({"id": 5, "templateId": 3})));
        let gw = gateway(api.clone());

        let first = gw.fetch("apps/5", None, &QueryParams::new()).await.unwrap();
        let second = gw.fetch("apps/5", None, &QueryParams::new()).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(api.call_count("apps/5"), 1);
    }

    #[tokio::test]
    async fn test_fetch_language_isolation() {
        let api = Arc::new(
            StaticApi::new()
                .with_route("apps/5", 200, json!({"templateId": 3}))
                .with_route("apps/5/configs?lang=en_US", 200, json!({"title": {"value": "Hello"}}))
                .with_route("apps/5/configs?lang=de_DE", 200, json!({"title": {"value": "Hallo"}})),
        );
        let gw = gateway(api.clone());

        let en = gw.fetch("apps/5/configs", Some("en_US"), &QueryParams::new()).await.unwrap();
        let de = gw.fetch("apps/5/configs", Some("de_DE"), &QueryParams::new()).await.unwrap();
        assert_eq!(en["title"]["value"], "Hello");
        assert_eq!(de["title"]["value"], "Hallo");
        assert_eq!(api.call_count("apps/5/configs"), 2);

        // Each language is now served from its own entry
        let en_again = gw.fetch("apps/5/configs", Some("en_US"), &QueryParams::new()).await.unwrap();
        assert_eq!(en_again["title"]["value"], "Hello");
        assert_eq!(api.call_count("apps/5/configs"), 2);
    }

    #[tokio::test]
    async fn test_unauthorized_and_failures_not_cached() {
        let api = Arc::new(
            StaticApi::new()
                .with_route("apps/1", 401, json!({"message": "invalid key"}))
                .with_route("apps/2", 500, Value::Null),
        );
        let gw = gateway(api.clone());

        assert!(matches!(gw.fetch("apps/1", None, &QueryParams::new()).await, Err(Error::Unauthorized)));
        assert!(matches!(gw.fetch("apps/1", None, &QueryParams::new()).await, Err(Error::Unauthorized)));
        assert_eq!(api.call_count("apps/1"), 2);

        assert!(matches!(gw.fetch("apps/2", None, &QueryParams::new()).await, Err(Error::Unavailable(_))));
        assert!(matches!(gw.fetch("apps/3", None, &QueryParams::new()).await, Err(Error::NotFound(_))));
        assert_eq!(gw.cache().stats().writes, 0);
    }

    #[tokio::test]
    async fn test_tags_for_entity_routes() {
        let api = Arc::new(StaticApi::new().with_route("apps/5", 200, json!({"templateId": "3"})));
        let gw = gateway(api.clone());

        let tags = gw.tags_for("apps/5", &json!({"templateId": 3})).await.unwrap().unwrap();
        assert_eq!(tags, tagset(&["app.5", "app.5.infos", "appTemplate.3"]));

        // Sub-resource: ancestor resolved through a lookup of apps/5
        let tags = gw.tags_for("apps/5/configs", &json!({})).await.unwrap().unwrap();
        assert_eq!(tags, tagset(&["app.5", "app.5.configs", "appTemplate.3"]));
        assert_eq!(api.call_count("apps/5"), 1);

        // Unknown third segment gets no resource tag
        let tags = gw.tags_for("apps/5/stats", &json!({"templateId": 3})).await.unwrap().unwrap();
        assert_eq!(tags, tagset(&["app.5", "appTemplate.3"]));

        // Template with parent, and a self-referential parent
        let tags = gw.tags_for("templates/3", &json!({"parentId": 1})).await.unwrap().unwrap();
        assert_eq!(tags, tagset(&["template.3", "template.3.infos", "templateTemplate.1"]));
        let tags = gw.tags_for("templates/3", &json!({"parentId": 3})).await.unwrap().unwrap();
        assert_eq!(tags, tagset(&["template.3", "template.3.infos"]));

        // Versions have no ancestor and need no lookup
        let tags = gw.tags_for("versions/9/languages", &json!({})).await.unwrap().unwrap();
        assert_eq!(tags, tagset(&["version.9", "version.9.languages"]));

        assert!(gw.tags_for("users/5", &json!({})).await.unwrap().is_none());
        assert!(gw.tags_for("apps/abc", &json!({})).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_no_partial_tag_caching() {
        let api = Arc::new(StaticApi::new().with_route("apps/5/configs", 200, json!({"a": {"value": 1}})));
        api.fail("apps/5");
        let gw = gateway(api.clone());

        // Caller still gets the payload...
        let value = gw.fetch("apps/5/configs", None, &QueryParams::new()).await.unwrap();
        assert_eq!(value["a"]["value"], 1);

        // ...but nothing was cached
        let key = cache_key(None, "apps/5/configs", &QueryParams::new());
        assert!(gw.cache().get(&key).await.is_none());
        assert_eq!(gw.cache().stats().writes, 0);
    }

    #[tokio::test]
    async fn test_template_invalidation_cascades_to_apps() {
        let api = Arc::new(
            StaticApi::new()
                .with_route("apps/5", 200, json!({"templateId": 3}))
                .with_route("apps/5/configs", 200, json!({"a": {"value": 1}})),
        );
        let gw = gateway(api.clone());
        gw.fetch("apps/5/configs", None, &QueryParams::new()).await.unwrap();
        assert_eq!(api.call_count("apps/5/configs"), 1);

        let template = EntityRef::new(EntityType::Template, 3);
        let tags = gw.invalidate(&template, CacheDirective::Apps).await;
        assert_eq!(tags, vec!["appTemplate.3".to_string()]);

        gw.fetch("apps/5/configs", None, &QueryParams::new()).await.unwrap();
        assert_eq!(api.call_count("apps/5/configs"), 2);
    }

    #[tokio::test]
    async fn test_put_invalidates_entity() {
        let api = Arc::new(
            StaticApi::new()
                .with_route("versions/2", 200, json!({"name": "v2"}))
                .with_route("versions/2/configs/color", 200, json!({"ok": true})),
        );
        let gw = gateway(api.clone());
        gw.fetch("versions/2", None, &QueryParams::new()).await.unwrap();

        gw.put("versions/2/configs/color", &json!({"value": "red"})).await.unwrap();
        gw.fetch("versions/2", None, &QueryParams::new()).await.unwrap();
        assert_eq!(api.call_count("versions/2"), 2);
    }
}
