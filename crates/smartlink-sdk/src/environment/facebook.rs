//! Page-tab context on the social platform.

use serde::{Deserialize, Serialize};

use super::signed_request::SignedRequest;
use crate::request::RequestContext;

/// Page and app a request is embedded in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacebookContext {
    pub page_id: String,
    pub app_id: String,
    /// Whether a decodable signed request came with this request
    #[serde(default)]
    pub signed: bool,
}

impl FacebookContext {
    /// Page tab URL for this context
    pub fn page_tab_url(&self) -> String {
        format!("https://www.facebook.com/{}/app/{}", self.page_id, self.app_id)
    }
}

/// Resolve the page tab context.
///
/// Page id: `fb_page_id`, then the signed request, then the restored
/// session. App id: `fb_app_id`, then the restored session, then the
/// configured default. Both are required.
pub fn resolve_facebook(
    ctx: &RequestContext,
    signed: Option<&SignedRequest>,
    restored: Option<&FacebookContext>,
    default_app_id: Option<&str>,
) -> Option<FacebookContext> {
    let page_id = ctx
        .query_non_empty("fb_page_id")
        .map(str::to_string)
        .or_else(|| signed.and_then(SignedRequest::page_id))
        .or_else(|| restored.map(|f| f.page_id.clone()))?;

    let app_id = ctx
        .query_non_empty("fb_app_id")
        .map(str::to_string)
        .or_else(|| restored.map(|f| f.app_id.clone()))
        .or_else(|| default_app_id.filter(|id| !id.is_empty()).map(str::to_string))?;

    Some(FacebookContext {
        page_id,
        app_id,
        signed: signed.is_some(),
    })
}
