//! Client for the remote configuration API.
//!
//! [`ConfigApi`] is the seam the gateway consumes; [`ApiClient`] is the
//! reqwest-backed implementation talking to the versioned REST API.
//!
//! # Usage
//!
//! ```rust,no_run
//! use smartlink_core::client::{ApiClient, ConfigApi};
//! use std::collections::BTreeMap;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> smartlink_core::Result<()> {
//!     let client = ApiClient::new("https://api.example.com/v2", Some("key".into()), Duration::from_secs(5))?;
//!     let resp = client.get("apps/5/configs", &BTreeMap::new()).await?;
//!     println!("{} {}", resp.status, resp.body);
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::Result;
use crate::types::ApiResponse;

mod fixtures;
#[cfg(feature = "client")]
mod http;

pub use fixtures::StaticApi;
#[cfg(feature = "client")]
pub use http::ApiClient;

/// Query parameters sent with a GET request
pub type QueryParams = BTreeMap<String, String>;

/// Remote configuration API.
///
/// Transport failures are returned as errors; every HTTP status (including
/// 401 and 404) comes back as an [`ApiResponse`] so callers can tell them apart.
#[async_trait]
pub trait ConfigApi: Send + Sync {
    /// GET a route with query parameters
    async fn get(&self, route: &str, params: &QueryParams) -> Result<ApiResponse>;

    /// POST a JSON body to a route
    async fn post(&self, route: &str, body: &Value) -> Result<ApiResponse>;

    /// PUT a JSON body to a route
    async fn put(&self, route: &str, body: &Value) -> Result<ApiResponse>;
}
