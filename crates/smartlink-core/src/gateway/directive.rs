//! Cache directives carried by the `invalidate` query parameter.

use std::fmt;

use crate::types::{EntityRef, EntityType, Resource};

/// What to drop from the cache for an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheDirective {
    /// Everything tagged with the entity
    All,
    /// A single sub-resource of the entity
    Resource(Resource),
    /// Apps derived from a template
    Apps,
    /// Templates derived from a template
    Templates,
}

impl CacheDirective {
    /// Parse an `invalidate` parameter value; unknown values yield `None`
    pub fn from_param(value: &str) -> Option<Self> {
        match value {
            "all" => Some(Self::All),
            "apps" => Some(Self::Apps),
            "templates" => Some(Self::Templates),
            other => Resource::from_str(other).map(Self::Resource),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Resource(r) => r.as_str(),
            Self::Apps => "apps",
            Self::Templates => "templates",
        }
    }

    /// Tags to invalidate for `entity`.
    ///
    /// `apps` and `templates` only apply to templates and are empty otherwise.
    pub fn tags_for(&self, entity: &EntityRef) -> Vec<String> {
        match (self, entity.entity_type) {
            (Self::All, _) => vec![entity.tag()],
            (Self::Resource(r), _) => vec![entity.resource_tag(*r)],
            (Self::Apps, EntityType::Template) => vec![format!("appTemplate.{}", entity.id)],
            (Self::Templates, EntityType::Template) => {
                vec![format!("templateTemplate.{}", entity.id)]
            }
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for CacheDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
