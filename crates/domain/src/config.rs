//! Configuration structures
//!
//! [`ClientConfig`] is the flat, serializable form loaded from files and
//! environment variables; [`CallPolicy`] is the resolved form the
//! coordinator runs with.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_CACHE_TTL_MS, DEFAULT_REQUEST_TIMEOUT_MS, DEFAULT_RETRY_BUDGET, DEFAULT_USER_AGENT,
    RETRY_BASE_DELAY_MS, RETRY_MAX_DELAY_MS,
};

/// Call-layer configuration in its file/environment form.
///
/// Every field except `base_url` has a usable default, so partial config
/// files merge cleanly with environment overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL the transport joins call addresses onto.
    pub base_url: String,
    /// Request timeout in milliseconds.
    pub request_timeout_ms: u64,
    /// Default freshness window for cached responses, in milliseconds.
    pub cache_ttl_ms: u64,
    /// Delay after the first failed attempt, in milliseconds.
    pub retry_base_ms: u64,
    /// Upper bound on any retry delay, in milliseconds.
    pub retry_cap_ms: u64,
    /// Additional attempts allowed after the first failure.
    pub max_retries: u32,
    /// User agent advertised by the transport.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            cache_ttl_ms: DEFAULT_CACHE_TTL_MS,
            retry_base_ms: RETRY_BASE_DELAY_MS,
            retry_cap_ms: RETRY_MAX_DELAY_MS,
            max_retries: DEFAULT_RETRY_BUDGET,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ClientConfig {
    /// Resolved policy consumed by the coordinator.
    pub fn policy(&self) -> CallPolicy {
        CallPolicy {
            default_ttl: Duration::from_millis(self.cache_ttl_ms),
            retry_base: Duration::from_millis(self.retry_base_ms),
            retry_cap: Duration::from_millis(self.retry_cap_ms),
            default_retries: self.max_retries,
        }
    }
}

/// Resolved durations and budgets the coordinator runs with.
#[derive(Debug, Clone)]
pub struct CallPolicy {
    /// Freshness window applied to cache reads without a per-spec override.
    pub default_ttl: Duration,
    /// Delay after the first failed attempt.
    pub retry_base: Duration,
    /// Upper bound on any retry delay.
    pub retry_cap: Duration,
    /// Additional attempts allowed after the first failure, without a
    /// per-spec override.
    pub default_retries: u32,
}

impl Default for CallPolicy {
    fn default() -> Self {
        ClientConfig::default().policy()
    }
}
