//! HTTP rendition of the transport port
//!
//! Maps call verbs onto HTTP methods against a fixed base URL, decodes
//! JSON bodies, and classifies response statuses into the call error
//! taxonomy. Every request is raced against its cancellation token.

use std::time::Duration;

use async_trait::async_trait;
use breakwater_core::{Transport, TransportReply, TransportRequest};
use breakwater_domain::constants::{
    DEFAULT_REQUEST_TIMEOUT_MS, DEFAULT_USER_AGENT, RETRY_AFTER_HEADER,
};
use breakwater_domain::{CallError, ClientConfig, Result, Verb};
use reqwest::header::HeaderMap;
use reqwest::{Client as ReqwestClient, Method, Response, StatusCode};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::config::ConfigError;

/// Longest response-body excerpt carried into an error message.
const MESSAGE_PREVIEW_LIMIT: usize = 200;

/// Transport that carries calls over HTTP.
///
/// Performs exactly one attempt per [`send`](Transport::send); retries,
/// caching, and deduplication happen in the coordinator above it.
#[derive(Clone)]
pub struct HttpTransport {
    client: ReqwestClient,
    base_url: Url,
}

impl HttpTransport {
    /// Start building a transport against `base_url`.
    pub fn builder(base_url: impl Into<String>) -> HttpTransportBuilder {
        HttpTransportBuilder {
            base_url: base_url.into(),
            timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            default_headers: None,
        }
    }

    /// Transport configured from a loaded [`ClientConfig`].
    pub fn from_config(config: &ClientConfig) -> std::result::Result<Self, ConfigError> {
        Self::builder(config.base_url.as_str())
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .user_agent(config.user_agent.as_str())
            .build()
    }

    /// Absolute URL for `address`, joined onto the base.
    fn request_url(&self, address: &str) -> Result<Url> {
        self.base_url.join(address.trim_start_matches('/')).map_err(|err| {
            CallError::client_fault(None, format!("invalid call address {address:?}: {err}"))
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportReply> {
        let url = self.request_url(&request.address)?;
        let method = method_for(request.verb);

        let mut builder = self.client.request(method.clone(), url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(payload) = &request.payload {
            builder = builder.json(payload);
        }

        debug!(%method, %url, "sending HTTP request");

        let attempt = async {
            let response = builder.send().await.map_err(map_request_error)?;
            let status = response.status();
            debug!(%method, %url, status = status.as_u16(), "received HTTP response");

            if status.is_success() {
                let body = decode_body(response).await?;
                Ok(TransportReply { status: status.as_u16(), body })
            } else {
                Err(classify_status(response).await)
            }
        };

        tokio::select! {
            () = request.cancel.cancelled() => Err(CallError::Cancelled),
            result = attempt => result,
        }
    }
}

/// Builder for [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct HttpTransportBuilder {
    base_url: String,
    timeout: Duration,
    user_agent: String,
    default_headers: Option<HeaderMap>,
}

impl HttpTransportBuilder {
    /// Request timeout applied to every attempt.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// User agent advertised on every request.
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    /// Headers attached to every request this transport sends.
    pub fn default_headers(mut self, headers: HeaderMap) -> Self {
        self.default_headers = Some(headers);
        self
    }

    /// Validate the configuration and build the transport.
    pub fn build(self) -> std::result::Result<HttpTransport, ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("base_url must not be empty".to_string()));
        }
        let mut base_url = Url::parse(self.base_url.trim()).map_err(|err| {
            ConfigError::Invalid(format!("base_url {:?} is not a valid URL: {err}", self.base_url))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ConfigError::Invalid(format!(
                "base_url {:?} cannot be used as a base URL",
                self.base_url
            )));
        }
        // join() drops the last path segment unless the base ends with '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let mut client = ReqwestClient::builder().timeout(self.timeout).user_agent(self.user_agent);
        if let Some(headers) = self.default_headers {
            client = client.default_headers(headers);
        }
        let client = client
            .build()
            .map_err(|err| ConfigError::Invalid(format!("failed to build HTTP client: {err}")))?;

        Ok(HttpTransport { client, base_url })
    }
}

fn method_for(verb: Verb) -> Method {
    match verb {
        Verb::Read => Method::GET,
        Verb::Create => Method::POST,
        Verb::Replace => Method::PUT,
        Verb::Update => Method::PATCH,
        Verb::Delete => Method::DELETE,
    }
}

/// Decode a successful response body into JSON; no-body statuses and empty
/// bodies become `Null`.
async fn decode_body(response: Response) -> Result<Value> {
    let status = response.status();
    if status == StatusCode::NO_CONTENT || status == StatusCode::RESET_CONTENT {
        return Ok(Value::Null);
    }

    let bytes = response.bytes().await.map_err(map_request_error)?;
    if bytes.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_slice(&bytes).map_err(|err| {
        CallError::client_fault(None, format!("response body was not valid JSON: {err}"))
    })
}

/// Classify a non-success response into the call error taxonomy.
async fn classify_status(response: Response) -> CallError {
    let status = response.status();

    if status == StatusCode::TOO_MANY_REQUESTS {
        return CallError::rate_limited(parse_retry_after(&response));
    }

    let message = extract_message(response).await;
    if status.is_server_error() {
        CallError::server_fault(status.as_u16(), message)
    } else {
        CallError::client_fault(status.as_u16(), message)
    }
}

/// Server-supplied retry delay, when the header carries integer seconds.
fn parse_retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(RETRY_AFTER_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Best-effort human-readable message from a failure response body.
async fn extract_message(response: Response) -> String {
    let status = response.status();
    let fallback = status.canonical_reason().unwrap_or("request failed").to_string();

    let Ok(bytes) = response.bytes().await else {
        return fallback;
    };
    if bytes.is_empty() {
        return fallback;
    }

    if let Ok(body) = serde_json::from_slice::<Value>(&bytes) {
        for key in ["message", "error", "detail"] {
            if let Some(text) = body.get(key).and_then(Value::as_str) {
                return truncate(text);
            }
        }
    }
    truncate(&String::from_utf8_lossy(&bytes))
}

fn truncate(text: &str) -> String {
    let text = text.trim();
    if text.chars().count() <= MESSAGE_PREVIEW_LIMIT {
        return text.to_string();
    }
    let preview: String = text.chars().take(MESSAGE_PREVIEW_LIMIT).collect();
    format!("{preview}...")
}

fn map_request_error(err: reqwest::Error) -> CallError {
    if err.is_timeout() {
        CallError::network_fault("request timed out")
    } else if err.is_connect() {
        CallError::network_fault(format!("connection failed: {err}"))
    } else if err.is_builder() {
        CallError::client_fault(None, format!("request could not be built: {err}"))
    } else {
        CallError::network_fault(err.to_string())
    }
}
