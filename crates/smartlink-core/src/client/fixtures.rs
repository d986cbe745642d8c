//! Fixture-backed [`ConfigApi`].
//!
//! Serves canned responses per route. Used for offline runs of the CLI
//! (`--fixtures`) and throughout the test suites.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

use super::{ConfigApi, QueryParams};
use crate::error::{Error, Result};
use crate::types::ApiResponse;

/// In-memory API answering from a route table.
///
/// Lookups try `<route>?lang=<lang>` first when a `lang` parameter is sent,
/// then the bare route. Unknown routes answer 404.
#[derive(Default)]
pub struct StaticApi {
    routes: Mutex<HashMap<String, ApiResponse>>,
    unreachable: Mutex<Vec<String>>,
    calls: Mutex<Vec<String>>,
}

fn normalize(route: &str) -> String {
    route.trim_matches('/').to_string()
}

impl StaticApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a JSON object mapping routes to 200 bodies
    pub fn from_fixtures(fixtures: &Value) -> Result<Self> {
        let map = fixtures
            .as_object()
            .ok_or_else(|| Error::invalid_input("fixtures must be a JSON object of routes"))?;
        let api = Self::new();
        for (route, body) in map {
            api.insert(route, 200, body.clone());
        }
        Ok(api)
    }

    /// Builder form of [`StaticApi::insert`]
    pub fn with_route(self, route: &str, status: u16, body: Value) -> Self {
        self.insert(route, status, body);
        self
    }

    /// Answer `route` with `status` and `body`
    pub fn insert(&self, route: &str, status: u16, body: Value) {
        if let Ok(mut routes) = self.routes.lock() {
            routes.insert(normalize(route), ApiResponse::new(status, body));
        }
    }

    /// Forget a route (it answers 404 afterwards)
    pub fn remove(&self, route: &str) {
        if let Ok(mut routes) = self.routes.lock() {
            routes.remove(&normalize(route));
        }
    }

    /// Make `route` fail at the transport level
    pub fn fail(&self, route: &str) {
        if let Ok(mut unreachable) = self.unreachable.lock() {
            unreachable.push(normalize(route));
        }
    }

    /// Every route requested so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// How many times `route` was requested
    pub fn call_count(&self, route: &str) -> usize {
        let route = normalize(route);
        self.calls().iter().filter(|c| **c == route).count()
    }

    fn respond(&self, route: &str, lang: Option<&String>) -> Result<ApiResponse> {
        let route = normalize(route);
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(route.clone());
        }

        let unreachable = self
            .unreachable
            .lock()
            .map(|u| u.contains(&route))
            .unwrap_or(false);
        if unreachable {
            return Err(Error::unavailable(format!("connection refused: {}", route)));
        }

        let routes = self
            .routes
            .lock()
            .map_err(|_| Error::unavailable("fixture table poisoned"))?;
        let localized = lang.and_then(|l| routes.get(&format!("{}?lang={}", route, l)));
        Ok(localized
            .or_else(|| routes.get(&route))
            .cloned()
            .unwrap_or_else(|| ApiResponse::new(404, Value::Null)))
    }
}

#[async_trait]
impl ConfigApi for StaticApi {
    async fn get(&self, route: &str, params: &QueryParams) -> Result<ApiResponse> {
        self.respond(route, params.get("lang"))
    }

    async fn post(&self, route: &str, _body: &Value) -> Result<ApiResponse> {
        self.respond(route, None)
    }

    async fn put(&self, route: &str, _body: &Value) -> Result<ApiResponse> {
        self.respond(route, None)
    }
}
