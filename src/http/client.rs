//! HTTP client used by glue steps
//!
//! Thin wrapper over reqwest. Responses are read eagerly into a plain
//! struct so steps can assert on status, headers and body after the
//! connection is gone.

use reqwest::{Client, Method};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::utils::timer::Timer;

/// Errors raised while talking to the system under test
#[derive(Error, Debug)]
pub enum HttpError {
    #[error("Cannot build HTTP client: {0}")]
    Build(String),

    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),

    #[error("Relative URL '{0}' needs a base URL")]
    MissingBaseUrl(String),

    #[error("{url} did not answer within {secs} seconds")]
    Timeout { url: String, secs: u64 },

    #[error("Connection refused to {0}")]
    ConnectionRefused(String),

    #[error("Request to {url} failed: {message}")]
    RequestFailed { url: String, message: String },

    #[error("Cannot read response body from {url}: {message}")]
    Body { url: String, message: String },

    #[error("Response body is not JSON: {0}")]
    NotJson(String),

    #[error("JSON field '{0}' not found")]
    MissingField(String),
}

pub type HttpResult<T> = std::result::Result<T, HttpError>;

/// Resolve `path` against `base`; absolute URLs pass through unchanged
pub fn join_url(base: Option<&str>, path: &str) -> HttpResult<String> {
    if path.starts_with("http://") || path.starts_with("https://") {
        return Ok(path.to_string());
    }

    let base = base.ok_or_else(|| HttpError::MissingBaseUrl(path.to_string()))?;
    let separator = if path.starts_with('/') { "" } else { "/" };
    Ok(format!("{}{}{}", base.trim_end_matches('/'), separator, path))
}

/// HTTP client shared by every scenario of a run
#[derive(Clone, Debug)]
pub struct HttpClient {
    client: Client,
    timeout_secs: u64,
}

impl HttpClient {
    pub fn with_timeout(timeout_secs: u64) -> HttpResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;

        Ok(Self {
            client,
            timeout_secs,
        })
    }

    /// Send a request and read the whole response
    pub async fn send(&self, request: HttpRequest) -> HttpResult<HttpResponse> {
        let HttpRequest {
            method,
            url,
            headers,
            body,
        } = request;

        let method = Method::from_bytes(method.to_uppercase().as_bytes())
            .map_err(|_| HttpError::InvalidMethod(method.clone()))?;
        debug!("{} {}", method, url);

        let mut builder = self.client.request(method, &url);
        for (key, value) in &headers {
            builder = builder.header(key.as_str(), value.as_str());
        }
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let timer = Timer::start(format!("request {url}"));
        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                HttpError::Timeout {
                    url: url.clone(),
                    secs: self.timeout_secs,
                }
            } else if e.is_connect() {
                HttpError::ConnectionRefused(url.clone())
            } else {
                HttpError::RequestFailed {
                    url: url.clone(),
                    message: e.to_string(),
                }
            }
        })?;

        let status_code = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| Some((k.as_str().to_string(), v.to_str().ok()?.to_string())))
            .collect();
        let body = response.text().await.map_err(|e| HttpError::Body {
            url: url.clone(),
            message: e.to_string(),
        })?;
        let duration_ms = timer.stop().as_millis() as u64;

        debug!("{} answered {} in {}ms", url, status_code, duration_ms);

        Ok(HttpResponse {
            status_code,
            headers,
            body,
            duration_ms,
        })
    }
}

/// Request assembled by a step
#[derive(Clone, Debug)]
pub struct HttpRequest {
    pub method: String,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            headers: HashMap::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new("GET", url)
    }

    pub fn headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// Fully read response
#[derive(Clone, Debug)]
pub struct HttpResponse {
    pub status_code: u16,
    /// Header names are lowercase
    pub headers: HashMap<String, String>,
    pub body: String,
    pub duration_ms: u64,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }

    pub fn body_contains(&self, text: &str) -> bool {
        self.body.contains(text)
    }

    /// Look up a JSON field by dotted path (`data.items.0.name`)
    pub fn json_field(&self, path: &str) -> HttpResult<serde_json::Value> {
        let json: serde_json::Value =
            serde_json::from_str(&self.body).map_err(|e| HttpError::NotJson(e.to_string()))?;
        let pointer = format!("/{}", path.replace('.', "/"));
        json.pointer(&pointer)
            .cloned()
            .ok_or_else(|| HttpError::MissingField(path.to_string()))
    }
}
