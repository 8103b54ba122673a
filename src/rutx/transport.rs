//! HTTP transport to the router REST API
//!
//! The router serves a self-signed certificate on the LAN, so certificate
//! validation is disabled. This trusts whatever answers on the configured
//! host; do not point it at anything reachable from outside the LAN.

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::Value;

use crate::config::ClientConfig;
use crate::error::RouterError;

/// One request against the router API, relative to the base URL
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
    pub bearer: Option<String>,
}

impl ApiRequest {
    pub fn get(path: &str) -> Self {
        Self {
            method: Method::GET,
            path: path.to_string(),
            body: None,
            bearer: None,
        }
    }

    pub fn post(path: &str, body: Value) -> Self {
        Self {
            method: Method::POST,
            path: path.to_string(),
            body: Some(body),
            bearer: None,
        }
    }

    pub fn bearer(mut self, token: &str) -> Self {
        self.bearer = Some(token.to_string());
        self
    }
}

/// Status and decoded body. Non-JSON bodies are kept as a JSON string.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub data: Value,
}

impl ApiResponse {
    /// Raw body for error messages
    pub fn body_text(&self) -> String {
        match &self.data {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

/// Router API transport
///
/// Any HTTP status is a successful transport round-trip; only unreachable
/// hosts, timeouts and broken connections are `RouterError::Network`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn request(&self, req: ApiRequest) -> Result<ApiResponse, RouterError>;
}

/// `https://` + host, with any scheme the user typed stripped
pub fn base_url(host: &str) -> String {
    let host = host.trim();
    let host = host
        .strip_prefix("https://")
        .or_else(|| host.strip_prefix("http://"))
        .unwrap_or(host);
    format!("https://{}", host.trim_end_matches('/'))
}

pub struct HttpTransport {
    http_client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, RouterError> {
        let http_client = Client::builder()
            .danger_accept_invalid_certs(true) // Self-signed router cert
            .timeout(config.timeout)
            .build()
            .map_err(|e| RouterError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: base_url(&config.host),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(&self, req: ApiRequest) -> Result<ApiResponse, RouterError> {
        let url = format!("{}{}", self.base_url, req.path);
        tracing::debug!("[Rutx] {} {}", req.method, url);

        let mut builder = self.http_client.request(req.method, &url);
        if let Some(token) = &req.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &req.body {
            builder = builder.json(body);
        }

        let resp = builder.send().await?;
        let status = resp.status().as_u16();
        let text = resp.text().await?;

        let data = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };

        Ok(ApiResponse { status, data })
    }
}
