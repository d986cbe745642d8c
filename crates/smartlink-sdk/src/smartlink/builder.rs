//! Share and target URL construction.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

use smartlink_core::{Channel, Entity, EntityRef};

use super::params::{is_reserved, ParamBag};
use crate::collaborators::LinkShortener;
use crate::config::SmartLinkSettings;
use crate::environment::{Device, Environment, EnvironmentResolver, FacebookContext, ResolvedEnvironment};
use crate::request::RequestContext;
use crate::session::{session_cookie_name, SessionSnapshot, SetCookie, ENTITY_COOKIE, LANG_COOKIE};
use crate::{SdkError, SdkResult};

/// One `<meta property=... content=...>` tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetaTag {
    pub property: String,
    pub content: String,
}

impl MetaTag {
    fn new(property: &str, content: impl Into<String>) -> Self {
        Self {
            property: property.to_string(),
            content: content.into(),
        }
    }
}

/// Everything a caller needs to answer a SmartLink request
#[derive(Debug, Clone, Serialize)]
pub struct LinkSummary {
    pub entity: EntityRef,
    pub environment: Environment,
    pub device: Device,
    pub lang: String,
    pub share_url: String,
    pub target_url: String,
    pub params: BTreeMap<String, String>,
    pub expired_params: Vec<String>,
}

/// Directory part of a URL (query and fragment dropped)
fn directory_of(raw: &str) -> SdkResult<String> {
    let mut url = Url::parse(raw)
        .map_err(|e| SdkError::invalid_input(format!("invalid channel URL '{}': {}", raw, e)))?;
    url.set_query(None);
    url.set_fragment(None);
    let dir = match url.path().rfind('/') {
        Some(i) => url.path()[..=i].to_string(),
        None => "/".to_string(),
    };
    url.set_path(&dir);
    Ok(url.to_string())
}

/// Append parameters individually, or packed into one `app_data` JSON parameter
fn append_params(base: &str, params: &[(String, String)], pack: bool) -> SdkResult<String> {
    let mut url = Url::parse(base)
        .map_err(|e| SdkError::invalid_input(format!("invalid URL '{}': {}", base, e)))?;
    if !params.is_empty() {
        let mut pairs = url.query_pairs_mut();
        if pack {
            let data: Map<String, Value> = params
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect();
            pairs.append_pair("app_data", &Value::Object(data).to_string());
        } else {
            for (key, value) in params {
                pairs.append_pair(key, value);
            }
        }
    }
    Ok(url.to_string())
}

/// Builds the share and target URLs of one entity for one request
pub struct SmartLinkBuilder {
    entity: Arc<Entity>,
    resolved: ResolvedEnvironment,
    params: ParamBag,
    channels: Vec<Channel>,
    settings: SmartLinkSettings,
    shortener: Option<Arc<dyn LinkShortener>>,
    short_urls: HashMap<String, String>,
}

impl SmartLinkBuilder {
    /// Restore the session, resolve the environment and load the channels.
    ///
    /// Channels that fail to load count as none.
    pub async fn new(
        entity: Arc<Entity>,
        ctx: &RequestContext,
        resolver: &EnvironmentResolver,
        settings: SmartLinkSettings,
    ) -> Self {
        let session = SessionSnapshot::read(ctx, &settings.cookie_prefix, entity.id());
        let resolved = resolver.resolve(ctx, &session);
        let params = ParamBag::restore(&resolved.query, &session.params);

        let channels = match entity.channels().await {
            Ok(channels) => channels.to_vec(),
            Err(e) => {
                warn!("Channels of {} unavailable: {}", entity.entity_ref(), e);
                Vec::new()
            }
        };

        Self {
            entity,
            resolved,
            params,
            channels,
            settings,
            shortener: None,
            short_urls: HashMap::new(),
        }
    }

    pub fn with_shortener(mut self, shortener: Option<Arc<dyn LinkShortener>>) -> Self {
        self.shortener = shortener;
        self
    }

    pub fn entity(&self) -> &Entity {
        &self.entity
    }

    pub fn environment(&self) -> Environment {
        self.resolved.environment
    }

    pub fn device(&self) -> Device {
        self.resolved.device
    }

    pub fn resolved(&self) -> &ResolvedEnvironment {
        &self.resolved
    }

    pub fn params(&self) -> &ParamBag {
        &self.params
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// Replace the pass-through parameters
    pub fn set_params<I, K, V>(&mut self, params: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.params.set_params(params);
    }

    /// Merge pass-through parameters; earlier values win
    pub fn add_params<I, K, V>(&mut self, params: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.params.add_params(params);
    }

    /// First channel usable on the resolved device
    pub fn compatible_channel(&self) -> Option<&Channel> {
        let device = self.resolved.device;
        self.channels
            .iter()
            .find(|c| device.supports_page_tabs() || !c.is_facebook())
    }

    /// Identity, language, then pass-through parameters
    fn url_params(&self) -> Vec<(String, String)> {
        let entity = self.entity.entity_ref();
        let mut params = vec![
            (entity.entity_type.id_param().to_string(), entity.id.to_string()),
            ("lang".to_string(), self.entity.lang().to_string()),
        ];
        params.extend(
            self.params
                .entries()
                .iter()
                .filter(|(k, _)| !is_reserved(k))
                .cloned(),
        );
        params
    }

    fn entry_url(&self) -> SdkResult<String> {
        let base = match &self.settings.base_url {
            Some(base) => base.clone(),
            None => {
                let channel = self.compatible_channel().ok_or_else(|| {
                    SdkError::invalid_input("no base URL configured and no channel to derive one from")
                })?;
                directory_of(&channel.url)?
            }
        };
        let base = if base.ends_with('/') { base } else { format!("{}/", base) };
        Ok(format!("{}{}", base, self.settings.entry_file))
    }

    /// Long share URL, recomputed on every call
    pub fn share_url(&self) -> SdkResult<String> {
        append_params(&self.entry_url()?, &self.url_params(), false)
    }

    /// Share URL, optionally shortened.
    ///
    /// Short URLs are memoized per long URL; a failing shortener yields the
    /// long URL.
    pub async fn get_url(&mut self, shorten: bool) -> SdkResult<String> {
        let long = self.share_url()?;
        if !shorten {
            return Ok(long);
        }
        let Some(shortener) = self.shortener.clone() else {
            return Ok(long);
        };
        if let Some(short) = self.short_urls.get(&long) {
            return Ok(short.clone());
        }
        match shortener.shorten(&long).await {
            Ok(short) => {
                self.short_urls.insert(long, short.clone());
                Ok(short)
            }
            Err(e) => {
                warn!("Shortening failed, using long URL: {}", e);
                Ok(long)
            }
        }
    }

    /// URL the visitor is redirected to
    pub fn get_url_target(&self) -> SdkResult<String> {
        let params = self.url_params();
        match self.resolved.environment {
            Environment::Website => {
                let website = self
                    .resolved
                    .website
                    .as_deref()
                    .ok_or_else(|| SdkError::invalid_input("website environment without website"))?;
                append_params(website, &params, false)
            }
            Environment::SocialPageTab => {
                let base = self
                    .channels
                    .iter()
                    .find(|c| c.is_facebook())
                    .map(|c| c.url.clone())
                    .or_else(|| self.resolved.facebook.as_ref().map(FacebookContext::page_tab_url))
                    .ok_or_else(|| SdkError::invalid_input("page tab environment without page tab"))?;
                append_params(&base, &params, true)
            }
            Environment::Direct => match self.compatible_channel() {
                Some(channel) => {
                    let pack = channel.is_facebook() && self.resolved.device.supports_page_tabs();
                    append_params(&channel.url, &params, pack)
                }
                None => {
                    debug!("No channel for {}, redirecting to share URL", self.entity.entity_ref());
                    self.share_url()
                }
            },
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Session
    // ─────────────────────────────────────────────────────────────────────────

    /// Session state to persist for the next request
    pub fn session_snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            entity_id: Some(self.entity.id()),
            lang: Some(self.entity.lang().to_string()),
            params: self.params.persisted(),
            params_expired: self.params.expired(),
            device: Some(self.resolved.device),
            browser: Some(self.resolved.client.clone()),
            facebook: self.resolved.facebook.clone(),
            website: self.resolved.website.clone(),
        }
    }

    /// Session, entity and language cookies, expiring one cookie TTL after `now`
    pub fn session_cookies(&self, now: DateTime<Utc>) -> SdkResult<Vec<SetCookie>> {
        let ttl = self.settings.cookie_ttl();
        let session_name = session_cookie_name(&self.settings.cookie_prefix, self.entity.id());
        Ok(vec![
            SetCookie::new(session_name, serde_json::to_string(&self.session_snapshot())?, ttl, now),
            SetCookie::new(ENTITY_COOKIE, serde_json::to_string(&self.entity.entity_ref())?, ttl, now),
            SetCookie::new(LANG_COOKIE, serde_json::to_string(self.entity.lang())?, ttl, now),
        ])
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Page metadata
    // ─────────────────────────────────────────────────────────────────────────

    async fn config_text(&self, key: &str) -> Option<String> {
        match self.entity.config(key).await {
            Ok(Some(Value::String(s))) if !s.is_empty() => Some(s),
            Ok(_) => None,
            Err(e) => {
                debug!("Config {} unavailable: {}", key, e);
                None
            }
        }
    }

    /// Open Graph tags for the share page
    pub async fn meta_tags(&self) -> SdkResult<Vec<MetaTag>> {
        let mut tags = vec![
            MetaTag::new("og:type", "website"),
            MetaTag::new("og:url", self.share_url()?),
        ];

        let title = match self.config_text("share_title").await {
            Some(title) => Some(title),
            None => self
                .entity
                .infos()
                .await
                .ok()
                .and_then(|infos| infos.get("name"))
                .and_then(Value::as_str)
                .map(str::to_string),
        };
        if let Some(title) = title {
            tags.push(MetaTag::new("og:title", title));
        }
        if let Some(description) = self.config_text("share_description").await {
            tags.push(MetaTag::new("og:description", description));
        }
        if let Some(image) = self.config_text("share_image").await {
            tags.push(MetaTag::new("og:image", image));
        }
        Ok(tags)
    }

    /// Share and target URLs plus the resolved context
    pub async fn summary(&mut self, shorten: bool) -> SdkResult<LinkSummary> {
        let share_url = self.get_url(shorten).await?;
        let target_url = self.get_url_target()?;
        Ok(LinkSummary {
            entity: self.entity.entity_ref(),
            environment: self.resolved.environment,
            device: self.resolved.device,
            lang: self.entity.lang().to_string(),
            share_url,
            target_url,
            params: self.params.entries().iter().cloned().collect(),
            expired_params: self.params.expired().into_keys().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::HeuristicClassifier;
    use crate::environment::signed_request::encode_for_test;
    use async_trait::async_trait;
    use serde_json::json;
    use smartlink_core::cache::{MemoryStore, TaggedCache};
    use smartlink_core::client::StaticApi;
    use smartlink_core::{ConfigGateway, EntityType};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const DESKTOP_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) Chrome/120.0 Safari/537.36";
    const FACEBOOK_TAB: &str = "https://www.facebook.com/mypage/app/123";
    const SHOP_PAGE: &str = "https://shop.example.com/raffle/index.html";

    fn entity_with(api: StaticApi, entity: EntityRef) -> Arc<Entity> {
        let cache = TaggedCache::new(Arc::new(MemoryStore::new()), None);
        let gateway = Arc::new(ConfigGateway::new(Arc::new(api), Arc::new(cache)));
        Arc::new(Entity::new(entity, None, gateway).unwrap())
    }

    fn app_with_channels(channels: Value) -> Arc<Entity> {
        let api = StaticApi::new()
            .with_route("apps/5", 200, json!({"templateId": 3, "name": "Spring Raffle"}))
            .with_route("apps/5/channels", 200, channels);
        entity_with(api, EntityRef::new(EntityType::App, 5))
    }

    fn two_channels() -> Value {
        json!([
            {"type": "facebook", "value": FACEBOOK_TAB},
            {"type": "website", "value": SHOP_PAGE}
        ])
    }

    fn settings(base_url: Option<&str>) -> SmartLinkSettings {
        SmartLinkSettings {
            base_url: base_url.map(str::to_string),
            ..Default::default()
        }
    }

    fn resolver() -> EnvironmentResolver {
        EnvironmentResolver::new(Arc::new(HeuristicClassifier), None)
    }

    fn query_of(url: &str) -> Vec<(String, String)> {
        Url::parse(url).unwrap().query_pairs().into_owned().collect()
    }

    fn page_tab_request() -> RequestContext {
        RequestContext::new()
            .with_header("user-agent", DESKTOP_UA)
            .with_query("foo", "bar")
            .with_query("fb_app_id", "123")
            .with_query("signed_request", encode_for_test(&json!({"page": {"id": "mypage"}})))
    }

    struct CountingShortener {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl LinkShortener for CountingShortener {
        async fn shorten(&self, _long_url: &str) -> SdkResult<String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(SdkError::invalid_input("shortener down"));
            }
            Ok(format!("https://sho.rt/{}", n))
        }
    }

    #[tokio::test]
    async fn test_end_to_end_page_tab_pick() {
        let entity = app_with_channels(two_channels());
        let builder = SmartLinkBuilder::new(
            entity,
            &page_tab_request(),
            &resolver(),
            settings(Some("https://links.example.com")),
        )
        .await;

        assert_eq!(builder.environment(), Environment::SocialPageTab);
        assert_eq!(
            builder.share_url().unwrap(),
            "https://links.example.com/smartlink.php?appId=5&lang=de_DE&foo=bar"
        );

        let target = builder.get_url_target().unwrap();
        assert!(target.starts_with(&format!("{}?app_data=", FACEBOOK_TAB)));
        let query = query_of(&target);
        assert_eq!(query.len(), 1);
        let app_data: Value = serde_json::from_str(&query[0].1).unwrap();
        assert_eq!(app_data, json!({"appId": "5", "lang": "de_DE", "foo": "bar"}));
    }

    #[tokio::test]
    async fn test_device_override_skips_facebook_channel() {
        let entity = app_with_channels(two_channels());
        let ctx = page_tab_request().with_query("device", "mobile");
        let builder = SmartLinkBuilder::new(entity, &ctx, &resolver(), settings(None)).await;

        assert_eq!(builder.device(), Device::Mobile);
        assert_eq!(builder.environment(), Environment::Direct);
        assert_eq!(builder.compatible_channel().map(|c| c.url.as_str()), Some(SHOP_PAGE));
        assert_eq!(
            builder.share_url().unwrap(),
            "https://shop.example.com/raffle/smartlink.php?appId=5&lang=de_DE&foo=bar"
        );
        assert_eq!(
            builder.get_url_target().unwrap(),
            "https://shop.example.com/raffle/index.html?appId=5&lang=de_DE&foo=bar"
        );
    }

    #[tokio::test]
    async fn test_parameter_precedence_and_expiry() {
        let entity = app_with_channels(json!([]));
        let ctx = RequestContext::new()
            .with_query("foo", "live")
            .with_cookie("smartlink_5", r#"{"params":{"foo":"stale","bar":"kept"}}"#);
        let mut builder = SmartLinkBuilder::new(entity, &ctx, &resolver(), settings(Some("https://l.example.com/"))).await;

        assert_eq!(builder.params().get("foo"), Some("live"));
        assert_eq!(builder.params().get("bar"), Some("kept"));

        let snapshot = builder.session_snapshot();
        assert_eq!(snapshot.params.get("foo").map(String::as_str), Some("live"));
        assert!(!snapshot.params.contains_key("bar"));
        assert_eq!(snapshot.params_expired.get("bar").map(String::as_str), Some("kept"));

        builder.add_params([("bar", "ignored")]);
        let snapshot = builder.session_snapshot();
        assert_eq!(snapshot.params.get("bar").map(String::as_str), Some("kept"));
        assert!(snapshot.params_expired.is_empty());
    }

    #[tokio::test]
    async fn test_website_target() {
        let entity = app_with_channels(two_channels());
        let ctx = page_tab_request().with_query("website", "https://blog.example.org/post");
        let builder = SmartLinkBuilder::new(entity, &ctx, &resolver(), settings(Some("https://l.example.com/"))).await;

        assert_eq!(builder.environment(), Environment::Website);
        assert_eq!(
            builder.get_url_target().unwrap(),
            "https://blog.example.org/post?appId=5&lang=de_DE&foo=bar"
        );
    }

    #[tokio::test]
    async fn test_page_tab_without_facebook_channel() {
        let entity = app_with_channels(json!([{"type": "website", "value": SHOP_PAGE}]));
        let ctx = RequestContext::new()
            .with_query("fb_page_id", "11")
            .with_query("fb_app_id", "22");
        let builder = SmartLinkBuilder::new(entity, &ctx, &resolver(), settings(None)).await;

        assert_eq!(builder.environment(), Environment::SocialPageTab);
        let target = builder.get_url_target().unwrap();
        assert!(target.starts_with("https://www.facebook.com/11/app/22?app_data="));
    }

    #[tokio::test]
    async fn test_direct_without_channels_uses_share_url() {
        let api = StaticApi::new().with_route("versions/8", 200, json!({}));
        let entity = entity_with(api, EntityRef::new(EntityType::Version, 8));
        let builder = SmartLinkBuilder::new(entity, &RequestContext::new(), &resolver(), settings(Some("https://l.example.com/sub"))).await;

        assert_eq!(builder.environment(), Environment::Direct);
        let share = builder.share_url().unwrap();
        assert_eq!(share, "https://l.example.com/sub/smartlink.php?versionId=8&lang=de_DE");
        assert_eq!(builder.get_url_target().unwrap(), share);

        // No base URL and no channel
        let api = StaticApi::new();
        let entity = entity_with(api, EntityRef::new(EntityType::Version, 8));
        let builder = SmartLinkBuilder::new(entity, &RequestContext::new(), &resolver(), settings(None)).await;
        assert!(builder.share_url().is_err());
    }

    #[tokio::test]
    async fn test_shortened_urls_memoized_per_long_url() {
        let shortener = Arc::new(CountingShortener {
            calls: AtomicUsize::new(0),
            fail: false,
        });
        let entity = app_with_channels(json!([]));
        let mut builder = SmartLinkBuilder::new(entity, &RequestContext::new(), &resolver(), settings(Some("https://l.example.com/")))
            .await
            .with_shortener(Some(shortener.clone()));

        assert_eq!(builder.get_url(true).await.unwrap(), "https://sho.rt/0");
        assert_eq!(builder.get_url(true).await.unwrap(), "https://sho.rt/0");
        assert_eq!(shortener.calls.load(Ordering::SeqCst), 1);

        builder.add_params([("utm", "mail")]);
        assert_eq!(builder.get_url(true).await.unwrap(), "https://sho.rt/1");
        assert!(builder.get_url(false).await.unwrap().ends_with("utm=mail"));
        assert_eq!(shortener.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_shortening_returns_long_url() {
        let shortener = Arc::new(CountingShortener {
            calls: AtomicUsize::new(0),
            fail: true,
        });
        let entity = app_with_channels(json!([]));
        let mut builder = SmartLinkBuilder::new(entity, &RequestContext::new(), &resolver(), settings(Some("https://l.example.com/")))
            .await
            .with_shortener(Some(shortener));

        assert_eq!(
            builder.get_url(true).await.unwrap(),
            "https://l.example.com/smartlink.php?appId=5&lang=de_DE"
        );
    }

    #[tokio::test]
    async fn test_session_cookies() {
        let entity = app_with_channels(two_channels());
        let builder = SmartLinkBuilder::new(entity, &page_tab_request(), &resolver(), settings(None)).await;
        let now = Utc::now();
        let cookies = builder.session_cookies(now).unwrap();

        let names: Vec<&str> = cookies.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["smartlink_5", ENTITY_COOKIE, LANG_COOKIE]);
        assert!(cookies.iter().all(|c| c.max_age.as_secs() == 3600 && c.expires > now));

        let snapshot: SessionSnapshot = serde_json::from_str(&cookies[0].value).unwrap();
        assert_eq!(snapshot.entity_id, Some(5));
        assert_eq!(snapshot.device, Some(Device::Desktop));
        assert_eq!(snapshot.facebook.map(|f| f.page_id), Some("mypage".to_string()));
        assert_eq!(snapshot.params.get("foo").map(String::as_str), Some("bar"));
        assert_eq!(cookies[2].value, "\"de_DE\"");
    }

    #[tokio::test]
    async fn test_meta_tags() {
        let api = StaticApi::new()
            .with_route("apps/5", 200, json!({"templateId": 3, "name": "Spring Raffle"}))
            .with_route("apps/5/channels", 200, json!([]))
            .with_route(
                "apps/5/configs",
                200,
                json!({"share_description": {"value": "Win a bike"}, "share_image": {"value": ""}}),
            )
            .with_route("apps/5/infos", 200, json!([]));
        let entity = entity_with(api, EntityRef::new(EntityType::App, 5));
        let builder = SmartLinkBuilder::new(entity, &RequestContext::new(), &resolver(), settings(Some("https://l.example.com/"))).await;

        let tags = builder.meta_tags().await.unwrap();
        let find = |p: &str| tags.iter().find(|t| t.property == p).map(|t| t.content.as_str());
        assert_eq!(find("og:title"), Some("Spring Raffle"));
        assert_eq!(find("og:description"), Some("Win a bike"));
        assert_eq!(find("og:image"), None);
        assert_eq!(find("og:url"), Some("https://l.example.com/smartlink.php?appId=5&lang=de_DE"));
    }
}
