//! SmartLink entry file and share data.

use axum::{
    extract::{RawQuery, State},
    http::{
        header::{LOCATION, SET_COOKIE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Serialize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::debug;

use smartlink_sdk::{EntityRef, MetaTag};

use super::{request_context, sdk_error};
use crate::state::AppState;

fn header_value(value: &str) -> Result<HeaderValue, (StatusCode, String)> {
    HeaderValue::from_str(value).map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

/// Resolve the visitor and redirect to the target URL.
///
/// Sets the session, entity and language cookies. `format=json` answers with
/// the link summary instead of redirecting.
pub async fn entry(
    State(state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Result<Response, (StatusCode, String)> {
    let ctx = request_context(query.as_deref(), &headers);
    let mut link = state.sdk.smartlink(&ctx).await.map_err(sdk_error)?;
    let summary = link.summary(false).await.map_err(sdk_error)?;

    let mut response_headers = HeaderMap::new();
    for cookie in link.session_cookies(Utc::now()).map_err(sdk_error)? {
        response_headers.append(SET_COOKIE, header_value(&cookie.to_header_value())?);
    }
    state.requests_served.fetch_add(1, Ordering::Relaxed);

    if ctx.query("format") == Some("json") {
        return Ok((response_headers, Json(summary)).into_response());
    }

    debug!("Redirecting {} visitor to {}", summary.environment, summary.target_url);
    response_headers.insert(LOCATION, header_value(&summary.target_url)?);
    Ok((StatusCode::FOUND, response_headers).into_response())
}

#[derive(Debug, Serialize)]
pub struct ShareResponse {
    pub entity: EntityRef,
    /// Shortened when a shortener is configured
    pub share_url: String,
    pub long_url: String,
    pub meta: Vec<MetaTag>,
}

/// Share URL and Open Graph tags for an entity
pub async fn share(
    State(state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Result<Json<ShareResponse>, (StatusCode, String)> {
    let ctx = request_context(query.as_deref(), &headers);
    let mut link = state.sdk.smartlink(&ctx).await.map_err(sdk_error)?;

    let long_url = link.share_url().map_err(sdk_error)?;
    let share_url = link.get_url(true).await.map_err(sdk_error)?;
    let meta = link.meta_tags().await.map_err(sdk_error)?;

    Ok(Json(ShareResponse {
        entity: link.entity().entity_ref(),
        share_url,
        long_url,
        meta,
    }))
}
