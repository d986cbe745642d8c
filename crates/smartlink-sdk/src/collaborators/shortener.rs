//! Link shortening.

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::SdkResult;

/// Turns long URLs into short ones
#[async_trait]
pub trait LinkShortener: Send + Sync {
    async fn shorten(&self, long_url: &str) -> SdkResult<String>;
}

const BITLY_ENDPOINT: &str = "https://api-ssl.bitly.com/v4/shorten";

/// bit.ly v4 API client
pub struct BitlyShortener {
    client: reqwest::Client,
    token: String,
    endpoint: String,
}

#[derive(Deserialize)]
struct ShortenResponse {
    link: String,
}

impl BitlyShortener {
    pub fn new(token: impl Into<String>, timeout: Duration) -> SdkResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            token: token.into(),
            endpoint: BITLY_ENDPOINT.to_string(),
        })
    }

    /// Point at another endpoint (self-hosted proxies, tests)
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl LinkShortener for BitlyShortener {
    async fn shorten(&self, long_url: &str) -> SdkResult<String> {
        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&json!({ "long_url": long_url }))
            .send()
            .await
            .context("Shortener request failed")?;

        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("Shortener returned status {}", status).into());
        }

        let body: ShortenResponse = resp.json().await.context("Invalid shortener response")?;
        Ok(body.link)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_bitly_shorten() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v4/shorten"))
            .and(header("authorization", "Bearer tok"))
            .and(body_json(json!({"long_url": "https://links.example.com/smartlink.php?appId=5"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"link": "https://bit.ly/abc"})))
            .mount(&server)
            .await;

        let shortener = BitlyShortener::new("tok", Duration::from_secs(5))
            .unwrap()
            .with_endpoint(format!("{}/v4/shorten", server.uri()));
        let short = shortener
            .shorten("https://links.example.com/smartlink.php?appId=5")
            .await
            .unwrap();
        assert_eq!(short, "https://bit.ly/abc");
    }

    #[tokio::test]
    async fn test_bitly_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({"message": "FORBIDDEN"})))
            .mount(&server)
            .await;

        let shortener = BitlyShortener::new("bad", Duration::from_secs(5))
            .unwrap()
            .with_endpoint(server.uri());
        assert!(shortener.shorten("https://example.com").await.is_err());
    }
}
