//! Shared types for SmartLink core.
//!
//! Entity addressing (collections, tags), API responses and channels.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

// ─────────────────────────────────────────────────────────────────────────────
// Entity Types
// ─────────────────────────────────────────────────────────────────────────────

/// Kind of configuration-bearing entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    App,
    Template,
    Version,
}

/// Parent relation of an entity type, used for cascading cache tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AncestorRelation {
    /// Field in the entity payload holding the ancestor id
    pub field: &'static str,
    /// Tag prefix for the relation (e.g. `appTemplate`)
    pub relation: &'static str,
}

impl EntityType {
    pub const ALL: [EntityType; 3] = [EntityType::App, EntityType::Template, EntityType::Version];

    /// REST collection name (first route segment)
    pub fn collection(&self) -> &'static str {
        match self {
            Self::App => "apps",
            Self::Template => "templates",
            Self::Version => "versions",
        }
    }

    /// Name used in cache tags
    pub fn tag_name(&self) -> &'static str {
        match self {
            Self::App => "app",
            Self::Template => "template",
            Self::Version => "version",
        }
    }

    /// Query/cookie parameter carrying this entity's id
    pub fn id_param(&self) -> &'static str {
        match self {
            Self::App => "appId",
            Self::Template => "templateId",
            Self::Version => "versionId",
        }
    }

    /// Parse from a REST collection name
    pub fn from_collection(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.collection() == s)
    }

    /// Parse from a tag name (`app`, `template`, `version`)
    pub fn from_tag_name(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.tag_name() == s)
    }

    /// Ancestor whose invalidation must cascade to this entity type
    pub fn ancestor(&self) -> Option<AncestorRelation> {
        match self {
            Self::App => Some(AncestorRelation {
                field: "templateId",
                relation: "appTemplate",
            }),
            Self::Template => Some(AncestorRelation {
                field: "parentId",
                relation: "templateTemplate",
            }),
            Self::Version => None,
        }
    }

    /// Only apps are published through channels
    pub fn has_channels(&self) -> bool {
        matches!(self, Self::App)
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag_name())
    }
}

/// Sub-resources of an entity that get their own cache tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Configs,
    Infos,
    Translations,
    Languages,
    Channels,
}

impl Resource {
    pub const ALL: [Resource; 5] = [
        Resource::Configs,
        Resource::Infos,
        Resource::Translations,
        Resource::Languages,
        Resource::Channels,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Configs => "configs",
            Self::Infos => "infos",
            Self::Translations => "translations",
            Self::Languages => "languages",
            Self::Channels => "channels",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.as_str() == s)
    }
}

/// Address of a single entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub entity_type: EntityType,
    pub id: u64,
}

impl EntityRef {
    pub fn new(entity_type: EntityType, id: u64) -> Self {
        Self { entity_type, id }
    }

    /// Identity tag, e.g. `app.5`
    pub fn tag(&self) -> String {
        format!("{}.{}", self.entity_type.tag_name(), self.id)
    }

    /// Resource-scoped tag, e.g. `app.5.configs`
    pub fn resource_tag(&self, resource: Resource) -> String {
        format!("{}.{}", self.tag(), resource.as_str())
    }

    /// Entity route, e.g. `apps/5`
    pub fn route(&self) -> String {
        format!("{}/{}", self.entity_type.collection(), self.id)
    }

    /// Sub-resource route, e.g. `apps/5/configs`
    pub fn resource_route(&self, resource: Resource) -> String {
        format!("{}/{}", self.route(), resource.as_str())
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// API Responses
// ─────────────────────────────────────────────────────────────────────────────

/// Raw response of the configuration API
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    /// Success code for GET routes
    pub fn is_success(&self) -> bool {
        self.status == 200
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    /// Payload with the `_embedded.data` envelope stripped when present
    pub fn data(&self) -> &Value {
        unwrap_envelope(&self.body)
    }
}

/// Strip the `_embedded.data` envelope the API wraps collections in.
pub fn unwrap_envelope(body: &Value) -> &Value {
    body.get("_embedded")
        .and_then(|e| e.get("data"))
        .unwrap_or(body)
}

// ─────────────────────────────────────────────────────────────────────────────
// Channels
// ─────────────────────────────────────────────────────────────────────────────

/// Kind of publication channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelType {
    Facebook,
    Website,
    Domain,
    #[serde(other)]
    Other,
}

/// A place an app is published to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    #[serde(rename = "type")]
    pub channel_type: ChannelType,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(alias = "value")]
    pub url: String,
    #[serde(default)]
    pub page_id: Option<String>,
    #[serde(default)]
    pub app_id: Option<String>,
}

impl Channel {
    pub fn is_facebook(&self) -> bool {
        self.channel_type == ChannelType::Facebook
    }
}
