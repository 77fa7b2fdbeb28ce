//! Port interfaces for call execution
//!
//! These traits define the boundaries between call orchestration
//! and the transport/credential implementations behind it.

use async_trait::async_trait;
use breakwater_domain::{Result, Verb};
use tokio_util::sync::CancellationToken;

/// One attempt of a remote call, as handed to a transport.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    /// Address of the remote operation, relative to the transport's base.
    pub address: String,
    /// Operation verb the transport maps onto its protocol.
    pub verb: Verb,
    /// Body to send, if any.
    pub payload: Option<serde_json::Value>,
    /// Headers accumulated for this attempt.
    pub headers: Vec<(String, String)>,
    /// Fires when the attempt should be abandoned.
    pub cancel: CancellationToken,
}

impl TransportRequest {
    pub fn new(address: impl Into<String>, verb: Verb, cancel: CancellationToken) -> Self {
        Self { address: address.into(), verb, payload: None, headers: Vec::new(), cancel }
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn push_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.push((name.into(), value.into()));
    }

    /// First header matching `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Successful response from a transport attempt.
#[derive(Debug, Clone)]
pub struct TransportReply {
    /// Protocol status code reported by the remote side.
    pub status: u16,
    /// Decoded response body; `Null` when the response had none.
    pub body: serde_json::Value,
}

/// Trait for carrying a call to the remote service
///
/// A transport performs exactly one attempt per `send`; retries, caching,
/// and deduplication happen above it.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform one attempt of the described call.
    ///
    /// Implementations watch `request.cancel` and give up promptly with
    /// [`CallError::Cancelled`](breakwater_domain::CallError::Cancelled)
    /// once it fires. Failures are reported already classified.
    async fn send(&self, request: TransportRequest) -> Result<TransportReply>;
}

/// Trait for supplying bearer credentials
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Current bearer token, or `None` when the call goes out
    /// unauthenticated.
    async fn bearer_token(&self) -> Result<Option<String>>;
}
