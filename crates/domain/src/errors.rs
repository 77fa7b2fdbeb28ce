//! Call error taxonomy and shared result alias
//!
//! Every failure surfaced by the call layer falls into one of five fault
//! classes. The class decides whether the coordinator may re-attempt the
//! call and what a caller is shown when the terminal outcome is a failure.

use std::time::Duration;

use thiserror::Error;

/// Fault classes retry decisions are based on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultClass {
    /// The invocation was withdrawn by its caller.
    Cancelled,
    /// The server signalled capacity exhaustion.
    RateLimit,
    /// The server reported an internal failure.
    Server,
    /// The request was rejected; retrying cannot help.
    Client,
    /// No response was received.
    Network,
}

/// Errors produced while executing an outbound call.
#[derive(Error, Debug, Clone)]
pub enum CallError {
    /// The invocation was withdrawn before it settled, either because a
    /// newer invocation from the same call-site superseded it or because
    /// the call-site was retired.
    #[error("call was cancelled")]
    Cancelled,

    /// The server asked the client to slow down.
    #[error("rate limited by the remote service")]
    RateLimited {
        /// Server-supplied delay before the next attempt, when present.
        retry_after: Option<Duration>,
    },

    /// The server failed while handling the request (5xx-class).
    #[error("server fault ({status}): {message}")]
    ServerFault { status: u16, message: String },

    /// The request itself was rejected (4xx-class other than rate-limit,
    /// or a request that could not be built).
    #[error("client fault: {message}")]
    ClientFault { status: Option<u16>, message: String },

    /// The request never produced a response.
    #[error("network fault: {message}")]
    NetworkFault { message: String },
}

impl CallError {
    /// Rate-limit failure carrying an optional server-supplied delay.
    pub fn rate_limited(retry_after: Option<Duration>) -> Self {
        Self::RateLimited { retry_after }
    }

    /// Server fault with the received status code.
    pub fn server_fault(status: u16, message: impl Into<String>) -> Self {
        Self::ServerFault { status, message: message.into() }
    }

    /// Client fault; `status` is absent for failures raised before a
    /// response existed (bad address, unserializable payload).
    pub fn client_fault(status: impl Into<Option<u16>>, message: impl Into<String>) -> Self {
        Self::ClientFault { status: status.into(), message: message.into() }
    }

    /// Failure without any response.
    pub fn network_fault(message: impl Into<String>) -> Self {
        Self::NetworkFault { message: message.into() }
    }

    /// Fault class of this error.
    pub fn class(&self) -> FaultClass {
        match self {
            Self::Cancelled => FaultClass::Cancelled,
            Self::RateLimited { .. } => FaultClass::RateLimit,
            Self::ServerFault { .. } => FaultClass::Server,
            Self::ClientFault { .. } => FaultClass::Client,
            Self::NetworkFault { .. } => FaultClass::Network,
        }
    }

    /// Whether the coordinator may re-attempt the call after this failure.
    ///
    /// Network faults count as retryable because no response was received;
    /// only cancellation and client faults are final on the first failure.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.class(),
            FaultClass::RateLimit | FaultClass::Server | FaultClass::Network
        )
    }

    /// Server-supplied delay attached to a rate-limit response.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }

    /// Status code associated with the failure, when a response carried one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::ServerFault { status, .. } => Some(*status),
            Self::ClientFault { status, .. } => *status,
            Self::RateLimited { .. } => Some(429),
            Self::Cancelled | Self::NetworkFault { .. } => None,
        }
    }

    /// Message shown to a caller when this failure is the terminal outcome.
    ///
    /// Transport detail stays internal; only the best-effort human-readable
    /// message extracted from the response travels upward.
    pub fn user_message(&self) -> String {
        match self {
            Self::Cancelled => "The request was cancelled.".to_string(),
            Self::RateLimited { .. } => {
                "The service is busy. Please try again shortly.".to_string()
            }
            Self::ServerFault { message, .. }
            | Self::ClientFault { message, .. }
            | Self::NetworkFault { message } => message.clone(),
        }
    }
}

impl From<serde_json::Error> for CallError {
    fn from(err: serde_json::Error) -> Self {
        Self::client_fault(None, format!("invalid payload: {}", err))
    }
}

/// Convenient result alias for call-layer operations.
pub type Result<T> = std::result::Result<T, CallError>;
