//! Main SDK Entry Point
//!
//! Ties the configuration API client, the cache store and the collaborators
//! together and turns a [`RequestContext`] into a ready [`SmartLinkBuilder`].

use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use smartlink_core::cache::{CacheStore, FileStore, MemoryStore, SqliteStore, TaggedCache};
use smartlink_core::client::{ApiClient, ConfigApi};
use smartlink_core::lang;
use smartlink_core::{CacheDirective, ConfigGateway, Entity, EntityRef, EntityType};

use crate::collaborators::{
    BitlyShortener, HeuristicClassifier, LinkShortener, PlainCssCompiler, StylesheetCompiler,
    UserAgentClassifier,
};
use crate::config::{CacheBackend, CacheSettings, ConfigValidationError, SdkConfig};
use crate::environment::EnvironmentResolver;
use crate::request::RequestContext;
use crate::session::{read_entity_cookie, read_lang_cookie};
use crate::smartlink::SmartLinkBuilder;
use crate::{SdkError, SdkResult};

/// Open the configured cache store
fn open_store(settings: &CacheSettings) -> SdkResult<Arc<dyn CacheStore>> {
    if settings.backend == CacheBackend::Memory {
        return Ok(Arc::new(MemoryStore::new()));
    }
    let location = settings
        .dir
        .clone()
        .ok_or(ConfigValidationError::MissingCacheLocation(settings.backend))?;
    let store: Arc<dyn CacheStore> = match settings.backend {
        CacheBackend::Filesystem => {
            Arc::new(FileStore::new(location).map_err(smartlink_core::Error::from)?)
        }
        _ => Arc::new(SqliteStore::open(location).map_err(smartlink_core::Error::from)?),
    };
    Ok(store)
}

/// SmartLink SDK - Main entry point
///
/// # Example
///
/// ```rust,no_run
/// use smartlink_sdk::{RequestContext, SdkConfig, SmartLinkSdk};
///
/// async fn example() -> smartlink_sdk::SdkResult<()> {
///     let sdk = SmartLinkSdk::new(SdkConfig::new("https://api.example.com/v2", Some("key".into())))?;
///
///     let ctx = RequestContext::from_query_string("appId=5&lang=en_US&ref=newsletter");
///     let mut link = sdk.smartlink(&ctx).await?;
///     println!("share: {}", link.get_url(false).await?);
///     println!("target: {}", link.get_url_target()?);
///     Ok(())
/// }
/// ```
pub struct SmartLinkSdk {
    config: SdkConfig,
    client: Arc<dyn ConfigApi>,
    store: Arc<dyn CacheStore>,
    resolver: EnvironmentResolver,
    shortener: Option<Arc<dyn LinkShortener>>,
    compiler: Arc<dyn StylesheetCompiler>,
}

impl SmartLinkSdk {
    /// Create an SDK talking to the configured API
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration validation fails
    /// - The cache store cannot be opened
    pub fn new(config: SdkConfig) -> SdkResult<Self> {
        config.validate()?;
        let client = ApiClient::new(&config.api.base_url, config.api.api_key.clone(), config.timeout())?;
        Self::with_client(config, Arc::new(client))
    }

    /// Create an SDK over any [`ConfigApi`] (fixtures, tests)
    pub fn with_client(config: SdkConfig, client: Arc<dyn ConfigApi>) -> SdkResult<Self> {
        config.validate()?;
        let store = open_store(&config.cache)?;

        let shortener: Option<Arc<dyn LinkShortener>> = match &config.shortener.bitly_token {
            Some(token) => Some(Arc::new(BitlyShortener::new(token.clone(), config.timeout())?)),
            None => None,
        };

        let resolver = EnvironmentResolver::new(
            Arc::new(HeuristicClassifier),
            config.smartlink.facebook_app_id.clone(),
        );

        debug!("SmartLink SDK using {} cache store", store.name());

        Ok(Self {
            config,
            client,
            store,
            resolver,
            shortener,
            compiler: Arc::new(PlainCssCompiler),
        })
    }

    /// Replace the user-agent classifier
    pub fn with_classifier(mut self, classifier: Arc<dyn UserAgentClassifier>) -> Self {
        self.resolver = EnvironmentResolver::new(classifier, self.config.smartlink.facebook_app_id.clone());
        self
    }

    /// Replace (or disable) the link shortener
    pub fn with_shortener(mut self, shortener: Option<Arc<dyn LinkShortener>>) -> Self {
        self.shortener = shortener;
        self
    }

    /// Replace the stylesheet compiler
    pub fn with_compiler(mut self, compiler: Arc<dyn StylesheetCompiler>) -> Self {
        self.compiler = compiler;
        self
    }

    /// Get the SDK configuration
    pub fn config(&self) -> &SdkConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    /// Gateway with a fresh cache instance.
    ///
    /// Cache degradation is per instance, so use one gateway per request.
    pub fn gateway(&self) -> Arc<ConfigGateway> {
        let cache = TaggedCache::new(self.store.clone(), self.config.cache_ttl());
        Arc::new(ConfigGateway::new(self.client.clone(), Arc::new(cache)))
    }

    /// Entity named by the request: `appId`, `templateId` or `versionId`,
    /// else the entity cookie
    pub fn resolve_entity(&self, ctx: &RequestContext) -> Option<EntityRef> {
        EntityType::ALL
            .into_iter()
            .find_map(|t| {
                let id = ctx.query_non_empty(t.id_param())?.trim().parse().ok()?;
                Some(EntityRef::new(t, id))
            })
            .or_else(|| read_entity_cookie(ctx))
    }

    /// First supported language from `lang`, `locale`, the language cookie
    /// and the configured default
    pub fn resolve_lang(&self, ctx: &RequestContext) -> String {
        let candidates = [
            ctx.query_non_empty("lang").map(str::to_string),
            ctx.query_non_empty("locale").map(str::to_string),
            read_lang_cookie(ctx),
        ];
        candidates
            .into_iter()
            .flatten()
            .find(|l| {
                let ok = lang::is_supported(l);
                if !ok {
                    debug!("Ignoring unsupported language '{}'", l);
                }
                ok
            })
            .unwrap_or_else(|| self.config.smartlink.default_lang.clone())
    }

    /// Apply an `invalidate` directive; unknown directives are ignored
    pub async fn apply_directive(&self, gateway: &ConfigGateway, entity: &EntityRef, raw: &str) -> Vec<String> {
        match CacheDirective::from_param(raw) {
            Some(directive) => {
                let tags = gateway.invalidate(entity, directive).await;
                info!("Invalidated {:?} for {}", tags, entity);
                tags
            }
            None => {
                debug!("Ignoring unknown cache directive '{}'", raw);
                Vec::new()
            }
        }
    }

    /// Load an entity in the given language
    pub fn entity(&self, entity: EntityRef, lang: Option<&str>) -> SdkResult<Entity> {
        Ok(Entity::new(entity, lang, self.gateway())?)
    }

    /// Resolve a request into a SmartLink builder.
    ///
    /// Applies the request's `invalidate` directive before anything is read.
    pub async fn smartlink(&self, ctx: &RequestContext) -> SdkResult<SmartLinkBuilder> {
        let entity_ref = self
            .resolve_entity(ctx)
            .ok_or_else(|| SdkError::invalid_input("request names no appId, templateId or versionId"))?;

        let gateway = self.gateway();
        if let Some(directive) = ctx.query_non_empty("invalidate") {
            self.apply_directive(&gateway, &entity_ref, directive).await;
        }

        let lang = self.resolve_lang(ctx);
        let entity = Arc::new(Entity::new(entity_ref, Some(&lang), gateway)?);
        let builder = SmartLinkBuilder::new(entity, ctx, &self.resolver, self.config.smartlink.clone())
            .await
            .with_shortener(self.shortener.clone());

        info!(
            "SmartLink for {} resolved to {} ({})",
            entity_ref,
            builder.environment(),
            builder.device()
        );
        Ok(builder)
    }

    /// Compile the entity's stylesheet; failures yield `None`
    pub async fn stylesheet(&self, entity: &Entity, extra_files: &[PathBuf]) -> Option<String> {
        let request = match entity.stylesheet_request(extra_files).await {
            Ok(request) => request,
            Err(e) => {
                warn!("Stylesheet inputs of {} unavailable: {}", entity.entity_ref(), e);
                return None;
            }
        };
        match self.compiler.compile(&request) {
            Ok(css) => Some(css),
            Err(e) => {
                warn!("Stylesheet compilation for {} failed: {}", entity.entity_ref(), e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::Environment;
    use serde_json::json;
    use smartlink_core::client::StaticApi;
    use tempfile::TempDir;

    fn fixtures() -> Arc<StaticApi> {
        Arc::new(
            StaticApi::new()
                .with_route("apps/5", 200, json!({"templateId": 3, "name": "Spring Raffle"}))
                .with_route(
                    "apps/5/channels",
                    200,
                    json!([{"type": "website", "value": "https://shop.example.com/raffle/"}]),
                )
                .with_route(
                    "apps/5/configs",
                    200,
                    json!({"custom_css": {"type": "css", "value": "a { color: $primary; }"},
                           "primary": {"type": "color", "value": "#123456"}}),
                ),
        )
    }

    fn sdk(api: Arc<StaticApi>) -> SmartLinkSdk {
        let config = SdkConfig::new("https://api.example.com/v2", None).with_base_url("https://links.example.com/");
        SmartLinkSdk::with_client(config, api).unwrap()
    }

    #[test]
    fn test_sdk_validation() {
        let config = SdkConfig::new("", None);
        assert!(matches!(
            SmartLinkSdk::with_client(config, fixtures()),
            Err(SdkError::Config(ConfigValidationError::MissingApiUrl))
        ));

        let mut config = SdkConfig::new("https://api.example.com", None);
        config.cache.backend = CacheBackend::Filesystem;
        assert!(SmartLinkSdk::with_client(config, fixtures()).is_err());
    }

    #[test]
    fn test_persistent_backends() {
        let dir = TempDir::new().unwrap();

        let mut config = SdkConfig::new("https://api.example.com", None);
        config.cache.backend = CacheBackend::Sqlite;
        config.cache.dir = Some(dir.path().join("cache.db"));
        let sdk = SmartLinkSdk::with_client(config, fixtures()).unwrap();
        assert_eq!(sdk.store().name(), "sqlite");

        let mut config = SdkConfig::new("https://api.example.com", None);
        config.cache.backend = CacheBackend::Filesystem;
        config.cache.dir = Some(dir.path().join("files"));
        let sdk = SmartLinkSdk::with_client(config, fixtures()).unwrap();
        assert_eq!(sdk.store().name(), "filesystem");
    }

    #[test]
    fn test_resolve_entity_and_lang() {
        let sdk = sdk(fixtures());

        let ctx = RequestContext::from_query_string("versionId=8&appId=abc&lang=xx_XX&locale=fr_FR");
        assert_eq!(sdk.resolve_entity(&ctx), Some(EntityRef::new(EntityType::Version, 8)));
        assert_eq!(sdk.resolve_lang(&ctx), "fr_FR");

        let ctx = RequestContext::new().with_cookie("smartlink_entity", r#"{"entity_type":"app","id":5}"#);
        assert_eq!(sdk.resolve_entity(&ctx), Some(EntityRef::new(EntityType::App, 5)));
        assert_eq!(sdk.resolve_lang(&ctx), lang::DEFAULT_LANG);

        assert_eq!(sdk.resolve_entity(&RequestContext::new()), None);
    }

    #[tokio::test]
    async fn test_smartlink_from_request() {
        let sdk = sdk(fixtures());
        let ctx = RequestContext::from_query_string("appId=5&lang=en_US&ref=newsletter");
        let mut link = sdk.smartlink(&ctx).await.unwrap();

        assert_eq!(link.environment(), Environment::Direct);
        assert_eq!(
            link.get_url(false).await.unwrap(),
            "https://links.example.com/smartlink.php?appId=5&lang=en_US&ref=newsletter"
        );
        assert_eq!(
            link.get_url_target().unwrap(),
            "https://shop.example.com/raffle/?appId=5&lang=en_US&ref=newsletter"
        );

        let missing = sdk.smartlink(&RequestContext::new()).await;
        assert!(matches!(missing, Err(SdkError::InvalidInput { .. })));
    }

    #[tokio::test]
    async fn test_invalidate_directive_across_requests() {
        let api = fixtures();
        let sdk = sdk(api.clone());
        let ctx = RequestContext::from_query_string("appId=5");

        sdk.smartlink(&ctx).await.unwrap();
        sdk.smartlink(&ctx).await.unwrap();
        assert_eq!(api.call_count("apps/5/channels"), 1);

        let ctx = RequestContext::from_query_string("appId=5&invalidate=channels");
        sdk.smartlink(&ctx).await.unwrap();
        assert_eq!(api.call_count("apps/5/channels"), 2);

        // Unknown directives change nothing
        let ctx = RequestContext::from_query_string("appId=5&invalidate=everything");
        sdk.smartlink(&ctx).await.unwrap();
        assert_eq!(api.call_count("apps/5/channels"), 2);
    }

    #[tokio::test]
    async fn test_stylesheet_compilation() {
        let sdk = sdk(fixtures());
        let entity = sdk.entity(EntityRef::new(EntityType::App, 5), None).unwrap();
        let css = sdk.stylesheet(&entity, &[]).await.unwrap();
        assert!(css.contains("a { color: #123456; }"));

        let missing = sdk.entity(EntityRef::new(EntityType::Version, 9), None).unwrap();
        assert!(sdk.stylesheet(&missing, &[]).await.is_none());
    }
}
