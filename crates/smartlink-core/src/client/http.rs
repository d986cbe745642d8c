//! reqwest implementation of [`ConfigApi`].

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use super::{ConfigApi, QueryParams};
use crate::error::{Error, Result};
use crate::types::ApiResponse;

/// HTTP client for the configuration API
#[derive(Clone)]
pub struct ApiClient {
    /// Base URL, without trailing slash
    base_url: String,
    /// API key sent as bearer token
    api_key: Option<String>,
    /// HTTP client
    client: reqwest::Client,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(Error::Config("API base URL is empty".into()));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url,
            api_key: api_key.filter(|k| !k.is_empty()),
            client,
        })
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, route: &str) -> String {
        format!("{}/{}", self.base_url, route.trim_start_matches('/'))
    }

    async fn request(
        &self,
        method: reqwest::Method,
        route: &str,
        params: Option<&QueryParams>,
        body: Option<&Value>,
    ) -> Result<ApiResponse> {
        let url = self.url(route);
        debug!("API request: {} {}", method, url);

        let mut req = self.client.request(method, &url);

        if let Some(params) = params {
            req = req.query(params);
        }

        if let Some(ref key) = self.api_key {
            req = req.header("Authorization", format!("Bearer {}", key));
        }

        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| Error::unavailable(format!("HTTP request failed: {}", e)))?;

        let status = resp.status().as_u16();
        let text = resp
            .text()
            .await
            .map_err(|e| Error::unavailable(format!("Failed to read response: {}", e)))?;

        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            match serde_json::from_str(&text) {
                Ok(v) => v,
                // A success status with an unreadable body is an upstream failure
                Err(e) if (200..300).contains(&status) => {
                    return Err(Error::unavailable(format!("Malformed payload from {}: {}", route, e)));
                }
                Err(_) => {
                    warn!("Non-JSON error body from {} (status {})", route, status);
                    Value::String(text)
                }
            }
        };

        Ok(ApiResponse::new(status, body))
    }
}

#[async_trait]
impl ConfigApi for ApiClient {
    async fn get(&self, route: &str, params: &QueryParams) -> Result<ApiResponse> {
        self.request(reqwest::Method::GET, route, Some(params), None).await
    }

    async fn post(&self, route: &str, body: &Value) -> Result<ApiResponse> {
        self.request(reqwest::Method::POST, route, None, Some(body)).await
    }

    async fn put(&self, route: &str, body: &Value) -> Result<ApiResponse> {
        self.request(reqwest::Method::PUT, route, None, Some(body)).await
    }
}
