//! Call descriptor types
//!
//! A [`CallSpec`] describes one outbound call: where it goes, which verb it
//! uses, and how the coordinator should treat it (caching, deduplication,
//! retry budget, auth). Specs are immutable once built; per-invocation
//! variation happens through the execute-time payload override.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Verb an outbound call is issued with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verb {
    /// Fetch a resource; idempotent and cacheable.
    Read,
    /// Create a resource.
    Create,
    /// Replace a resource wholesale.
    Replace,
    /// Update part of a resource.
    Update,
    /// Remove a resource.
    Delete,
}

impl Verb {
    /// Whether the verb is idempotent and safe to serve from cache.
    pub fn is_read(self) -> bool {
        matches!(self, Self::Read)
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Read => "read",
            Self::Create => "create",
            Self::Replace => "replace",
            Self::Update => "update",
            Self::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// Immutable description of one outbound call.
///
/// Cheap to clone; the coordinator never mutates a spec. Fields left unset
/// fall back to the coordinator's policy defaults at execution time.
#[derive(Debug, Clone)]
pub struct CallSpec {
    /// Address the call targets, joined onto the transport's base URL.
    pub address: String,
    /// Verb the call is issued with.
    pub verb: Verb,
    /// Default payload, unless overridden per invocation.
    pub payload: Option<Value>,
    /// Explicit cache key; derived from verb and address when absent.
    pub cache_key: Option<String>,
    /// Freshness window applied when this call reads the cache.
    pub ttl: Option<Duration>,
    /// Deduplication override; defaults per verb when absent.
    pub dedup: Option<bool>,
    /// Additional attempts allowed after the first failure.
    pub retries: Option<u32>,
    /// Skip attaching the bearer credential.
    pub skip_auth: bool,
    /// Execute once in the background as soon as a call-site binds.
    pub auto_trigger: bool,
}

impl CallSpec {
    /// Spec for `verb` against `address` with every option defaulted.
    pub fn new(address: impl Into<String>, verb: Verb) -> Self {
        Self {
            address: address.into(),
            verb,
            payload: None,
            cache_key: None,
            ttl: None,
            dedup: None,
            retries: None,
            skip_auth: false,
            auto_trigger: false,
        }
    }

    /// Read spec for `address`.
    pub fn read(address: impl Into<String>) -> Self {
        Self::new(address, Verb::Read)
    }

    /// Create spec for `address`.
    pub fn create(address: impl Into<String>) -> Self {
        Self::new(address, Verb::Create)
    }

    /// Replace spec for `address`.
    pub fn replace(address: impl Into<String>) -> Self {
        Self::new(address, Verb::Replace)
    }

    /// Update spec for `address`.
    pub fn update(address: impl Into<String>) -> Self {
        Self::new(address, Verb::Update)
    }

    /// Delete spec for `address`.
    pub fn delete(address: impl Into<String>) -> Self {
        Self::new(address, Verb::Delete)
    }

    /// Attach a default payload.
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Cache under an explicit key instead of the derived one.
    pub fn with_cache_key(mut self, key: impl Into<String>) -> Self {
        self.cache_key = Some(key.into());
        self
    }

    /// Override the freshness window for cache reads.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Opt in to or out of single-flight deduplication.
    pub fn with_dedup(mut self, enabled: bool) -> Self {
        self.dedup = Some(enabled);
        self
    }

    /// Override the retry budget (additional attempts after the first).
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = Some(retries);
        self
    }

    /// Issue the call without a bearer credential.
    pub fn without_auth(mut self) -> Self {
        self.skip_auth = true;
        self
    }

    /// Execute once in the background when a call-site binds to this spec.
    pub fn with_auto_trigger(mut self) -> Self {
        self.auto_trigger = true;
        self
    }

    /// Cache key this call stores and looks up under.
    ///
    /// Defaults to `verb:address` when no explicit key was supplied.
    pub fn effective_cache_key(&self) -> String {
        match &self.cache_key {
            Some(key) => key.clone(),
            None => format!("{}:{}", self.verb, self.address),
        }
    }

    /// Whether single-flight deduplication applies to this call.
    ///
    /// Enabled by default for read verbs only; the `dedup` override wins
    /// either way.
    pub fn dedup_enabled(&self) -> bool {
        self.dedup.unwrap_or_else(|| self.verb.is_read())
    }
}
