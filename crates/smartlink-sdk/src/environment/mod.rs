//! Environment resolution.
//!
//! Decides where a visitor should end up from the live request and the
//! restored session:
//!
//! 1. A valid embedding website (live `website` parameter, else the session)
//!    selects [`Environment::Website`].
//! 2. Otherwise a desktop visitor with a resolvable page tab context selects
//!    [`Environment::SocialPageTab`].
//! 3. Everything else is [`Environment::Direct`].
//!
//! The device is resolved independently (`device` override, session,
//! classifier) and gates the page tab: mobile and tablet visitors never land
//! on one.

mod device;
mod facebook;
pub mod signed_request;
mod website;

pub use device::{resolve_device, Device};
pub use facebook::{resolve_facebook, FacebookContext};
pub use signed_request::SignedRequest;
pub use website::validate_website;

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::collaborators::{ClientInfo, UserAgentClassifier};
use crate::request::RequestContext;
use crate::session::SessionSnapshot;

/// Primary environment of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Website,
    SocialPageTab,
    Direct,
}

impl Environment {
    /// Higher wins when several contexts are present
    pub fn priority(&self) -> u8 {
        match self {
            Self::Website => 20,
            Self::SocialPageTab => 10,
            Self::Direct => 0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Website => "website",
            Self::SocialPageTab => "social_page_tab",
            Self::Direct => "direct",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of resolving one request
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedEnvironment {
    pub environment: Environment,
    pub device: Device,
    /// Classifier output with the resolved device applied
    pub client: ClientInfo,
    pub website: Option<String>,
    pub facebook: Option<FacebookContext>,
    /// Live query with signed `app_data` merged in where absent
    pub query: Vec<(String, String)>,
}

/// Classifies requests into a primary environment
pub struct EnvironmentResolver {
    classifier: Arc<dyn UserAgentClassifier>,
    default_app_id: Option<String>,
}

impl EnvironmentResolver {
    pub fn new(classifier: Arc<dyn UserAgentClassifier>, default_app_id: Option<String>) -> Self {
        Self {
            classifier,
            default_app_id,
        }
    }

    pub fn resolve(&self, ctx: &RequestContext, session: &SessionSnapshot) -> ResolvedEnvironment {
        let mut client = self.classifier.classify(ctx.user_agent());
        let device = resolve_device(ctx.query("device"), session.device, client.device);
        client.device = device;

        let signed = ctx.query_non_empty("signed_request").and_then(SignedRequest::decode);

        let mut query = ctx.query_pairs().to_vec();
        if let Some(signed) = &signed {
            for (key, value) in signed.app_data() {
                if !query.iter().any(|(k, _)| *k == key) {
                    query.push((key, value));
                }
            }
        }

        let website = ctx
            .query_non_empty("website")
            .and_then(validate_website)
            .or_else(|| session.website.as_deref().and_then(validate_website));

        let facebook = resolve_facebook(
            ctx,
            signed.as_ref(),
            session.facebook.as_ref(),
            self.default_app_id.as_deref(),
        );

        let environment = if website.is_some() {
            Environment::Website
        } else if facebook.is_some() && device.supports_page_tabs() {
            Environment::SocialPageTab
        } else {
            Environment::Direct
        };

        debug!(
            "Resolved environment {} (device {}, website {:?}, page tab {:?})",
            environment,
            device,
            website,
            facebook.as_ref().map(|f| &f.page_id)
        );

        ResolvedEnvironment {
            environment,
            device,
            client,
            website,
            facebook,
            query,
        }
    }
}
