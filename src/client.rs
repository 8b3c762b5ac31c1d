use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, LINK};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::Settings;
use crate::error::FetchError;

const TOKEN_HEADER: &str = "X-Shopify-Access-Token";

/// One REST page: the decoded body plus the raw `Link` header, if any.
#[derive(Debug, Clone)]
pub struct RestResponse {
    pub body: Value,
    pub link: Option<String>,
}

/// The narrow surface the pipeline needs from the network. Swappable so
/// traversal and normalization run against scripted responses in tests.
pub trait Transport {
    async fn get(&self, url: &str) -> Result<RestResponse, FetchError>;

    /// POSTs `{"query": ...}` and returns the whole `{data, errors}` body.
    async fn graphql(&self, query: &str) -> Result<Value, FetchError>;

    /// Inter-request delay for the store's rate limit.
    async fn pause(&self, delay: Duration) {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

pub struct ShopifyClient {
    http: reqwest::Client,
    graphql_url: String,
}

impl ShopifyClient {
    pub fn new(settings: &Settings) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            TOKEN_HEADER,
            HeaderValue::from_str(&settings.access_token)
                .context("Access token is not a valid header value")?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(settings.request_timeout())
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            graphql_url: settings.graphql_url(),
        })
    }
}

impl Transport for ShopifyClient {
    async fn get(&self, url: &str) -> Result<RestResponse, FetchError> {
        debug!(%url, "GET");
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| request_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let link = response
            .headers()
            .get(LINK)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let text = response.text().await.map_err(|e| request_error(url, e))?;
        let body = serde_json::from_str(&text)?;
        Ok(RestResponse { body, link })
    }

    async fn graphql(&self, query: &str) -> Result<Value, FetchError> {
        let url = self.graphql_url.as_str();
        debug!(%url, bytes = query.len(), "POST graphql");
        let response = self
            .http
            .post(url)
            .json(&serde_json::json!({ "query": query }))
            .send()
            .await
            .map_err(|e| request_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let text = response.text().await.map_err(|e| request_error(url, e))?;
        Ok(serde_json::from_str(&text)?)
    }
}

fn request_error(url: &str, e: reqwest::Error) -> FetchError {
    FetchError::Request {
        url: url.to_string(),
        message: e.to_string(),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShopInfo {
    pub name: String,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub myshopify_domain: Option<String>,
}

#[derive(Deserialize)]
struct ShopEnvelope {
    shop: ShopInfo,
}

/// Reachability and credential check against `shop.json`. Any failure is
/// reported as [`FetchError::Connectivity`].
pub async fn ping<T: Transport>(transport: &T, settings: &Settings) -> Result<ShopInfo, FetchError> {
    let url = settings.rest_url("shop.json");
    let response = transport
        .get(&url)
        .await
        .map_err(|e| FetchError::Connectivity(e.to_string()))?;
    let envelope: ShopEnvelope = serde_json::from_value(response.body)
        .map_err(|e| FetchError::Connectivity(format!("unexpected shop.json body: {}", e)))?;

    info!(
        shop = %envelope.shop.name,
        currency = envelope.shop.currency.as_deref().unwrap_or("-"),
        "Connected"
    );
    Ok(envelope.shop)
}
