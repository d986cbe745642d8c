//! HTTP route modules.

pub mod health;
pub mod smartlink;

use axum::{
    http::{
        header::{COOKIE, USER_AGENT},
        HeaderMap, StatusCode,
    },
    routing::get,
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;

use smartlink_sdk::{RequestContext, SdkError};

use crate::state::AppState;

/// Create the main router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    let entry_path = state.config.entry_path();

    // Share data is read by embedding pages on other origins
    let share_routes = Router::new()
        .route("/share", get(smartlink::share))
        .layer(CorsLayer::permissive());

    Router::new()
        .route("/health", get(health::health_check))
        .route(&entry_path, get(smartlink::entry))
        .merge(share_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// SDK request context from the raw query and request headers
pub fn request_context(query: Option<&str>, headers: &HeaderMap) -> RequestContext {
    let mut ctx = RequestContext::from_query_string(query.unwrap_or_default());
    if let Some(user_agent) = headers.get(USER_AGENT).and_then(|v| v.to_str().ok()) {
        ctx = ctx.with_header("user-agent", user_agent);
    }
    for cookie in headers.get_all(COOKIE) {
        if let Ok(cookie) = cookie.to_str() {
            ctx = ctx.with_cookie_header(cookie);
        }
    }
    ctx
}

/// Map an SDK error to a status and message
pub fn sdk_error(e: SdkError) -> (StatusCode, String) {
    let status = match &e {
        SdkError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
        SdkError::Core(smartlink_core::Error::InvalidInput(_)) => StatusCode::BAD_REQUEST,
        e if e.is_not_found() => StatusCode::NOT_FOUND,
        SdkError::Core(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        warn!("SmartLink request failed: {}", e);
    }
    (status, e.to_string())
}
