//! Call coordination - caching, deduplication, and retry
//!
//! The coordinator walks every invocation through the same pipeline:
//! consult the response cache (read verbs only), attach to an in-flight
//! call for the same key when deduplication applies, otherwise execute the
//! call itself with classified retries. Exactly one terminal outcome is
//! reported per invocation; intermediate failures stay internal.

use std::sync::Arc;
use std::time::Duration;

use breakwater_common::{BackoffPolicy, InflightRegistry, Registration, ResponseCache};
use breakwater_domain::constants::AUTHORIZATION_HEADER;
use breakwater_domain::{CallError, CallPolicy, CallSpec, Result, Verb};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, instrument, warn};

use crate::ports::{TokenSource, Transport, TransportReply, TransportRequest};

/// Terminal success of one invocation.
///
/// `status` is the protocol status code of the attempt that produced the
/// value; it is absent when the value came from the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct CallOutcome {
    pub value: Value,
    pub status: Option<u16>,
}

/// Shared settlement type for owners and joiners of one flight.
pub type FlightResult = Result<CallOutcome>;

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait out the delay, then re-enter the executing state.
    Retry(Duration),
    /// Surface the failure as the terminal outcome.
    GiveUp,
}

/// Retry choice for `error` after the zero-indexed `attempt` has failed.
///
/// A server-supplied delay overrides the computed backoff; non-retryable
/// classes and an exhausted budget end the call.
pub fn decide(error: &CallError, attempt: u32, budget: u32, backoff: BackoffPolicy) -> RetryDecision {
    if !error.is_retryable() || attempt >= budget {
        return RetryDecision::GiveUp;
    }
    match error.retry_after() {
        Some(delay) => RetryDecision::Retry(delay),
        None => RetryDecision::Retry(backoff.delay_for(attempt)),
    }
}

/// Orchestrates outbound calls through one cache, one registry, and one
/// transport.
///
/// The coordinator owns its cache and registry; construct one per remote
/// service and share it (via `Arc`) across every call-site that talks to
/// that service.
pub struct CallCoordinator {
    transport: Arc<dyn Transport>,
    token_source: Option<Arc<dyn TokenSource>>,
    cache: ResponseCache<Value>,
    registry: InflightRegistry<FlightResult>,
    policy: CallPolicy,
}

/// Builder for [`CallCoordinator`].
pub struct CallCoordinatorBuilder {
    transport: Arc<dyn Transport>,
    token_source: Option<Arc<dyn TokenSource>>,
    policy: CallPolicy,
}

impl CallCoordinatorBuilder {
    /// Attach bearer credentials to calls that do not opt out.
    pub fn token_source(mut self, source: Arc<dyn TokenSource>) -> Self {
        self.token_source = Some(source);
        self
    }

    /// Replace the default TTL/retry policy.
    pub fn policy(mut self, policy: CallPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn build(self) -> CallCoordinator {
        CallCoordinator {
            transport: self.transport,
            token_source: self.token_source,
            cache: ResponseCache::new(),
            registry: InflightRegistry::new(),
            policy: self.policy,
        }
    }
}

impl CallCoordinator {
    pub fn builder(transport: Arc<dyn Transport>) -> CallCoordinatorBuilder {
        CallCoordinatorBuilder { transport, token_source: None, policy: CallPolicy::default() }
    }

    /// Coordinator with default policy and no credentials.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::builder(transport).build()
    }

    pub fn policy(&self) -> &CallPolicy {
        &self.policy
    }

    /// Run one invocation of `spec` to its terminal outcome.
    ///
    /// `cancel` withdraws the invocation: a fired token interrupts backoff
    /// waits, is handed to the transport, and suppresses any late success
    /// so a withdrawn call never populates the cache.
    #[instrument(skip_all, fields(key = %spec.effective_cache_key(), verb = %spec.verb))]
    pub async fn execute(&self, spec: &CallSpec, cancel: CancellationToken) -> FlightResult {
        let key = spec.effective_cache_key();
        let ttl = spec.ttl.unwrap_or(self.policy.default_ttl);

        if spec.verb.is_read() {
            if let Some(value) = self.cache.get(&key, ttl) {
                debug!("cache hit");
                return Ok(CallOutcome { value, status: None });
            }
        }

        let flight = self.flight(spec, key.clone(), cancel.clone());

        if !spec.dedup_enabled() {
            return flight.run().await;
        }

        match self.registry.register(key, cancel.clone(), flight.run()) {
            Registration::Owner { outcome, guard } => {
                let result = outcome.await;
                drop(guard);
                result
            }
            Registration::Joined(outcome) => {
                let result = tokio::select! {
                    () = cancel.cancelled() => Err(CallError::Cancelled),
                    result = outcome => result,
                };
                match result {
                    // The owner withdrew but this caller did not; report a
                    // retryable fault instead of a cancellation the caller
                    // never asked for.
                    Err(CallError::Cancelled) if !cancel.is_cancelled() => Err(
                        CallError::network_fault("in-flight call was abandoned before completing"),
                    ),
                    other => other,
                }
            }
        }
    }

    /// Drop the cached entry for `key`, returning whether one existed.
    pub fn invalidate(&self, key: &str) -> bool {
        self.cache.remove(key)
    }

    /// Drop every cached entry.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Drop cached entries whose key contains `pattern`, returning how many
    /// were removed.
    pub fn clear_cache_matching(&self, pattern: &str) -> usize {
        self.cache.remove_matching(pattern)
    }

    /// Whether a live flight is registered for `key`.
    pub fn in_flight(&self, key: &str) -> bool {
        self.registry.has(key)
    }

    fn flight(&self, spec: &CallSpec, cache_key: String, cancel: CancellationToken) -> Flight {
        Flight {
            transport: Arc::clone(&self.transport),
            token_source: self.token_source.clone(),
            cache: self.cache.clone(),
            backoff: BackoffPolicy::new(self.policy.retry_base, self.policy.retry_cap),
            address: spec.address.clone(),
            verb: spec.verb,
            payload: spec.payload.clone(),
            skip_auth: spec.skip_auth,
            cache_key,
            budget: spec.retries.unwrap_or(self.policy.default_retries),
            cancel,
        }
    }
}

impl std::fmt::Debug for CallCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallCoordinator")
            .field("policy", &self.policy)
            .field("cached_entries", &self.cache.len())
            .finish()
    }
}

/// One owned execution of a call, self-contained so it can live in the
/// registry as a shared future.
struct Flight {
    transport: Arc<dyn Transport>,
    token_source: Option<Arc<dyn TokenSource>>,
    cache: ResponseCache<Value>,
    backoff: BackoffPolicy,
    address: String,
    verb: Verb,
    payload: Option<Value>,
    skip_auth: bool,
    cache_key: String,
    budget: u32,
    cancel: CancellationToken,
}

impl Flight {
    async fn run(self) -> FlightResult {
        let mut attempt: u32 = 0;
        loop {
            if self.cancel.is_cancelled() {
                return Err(CallError::Cancelled);
            }

            match self.attempt_once().await {
                Ok(reply) => {
                    // Settled after the caller withdrew: the value is
                    // discarded, not published.
                    if self.cancel.is_cancelled() {
                        return Err(CallError::Cancelled);
                    }
                    if self.verb.is_read() {
                        self.cache.insert(self.cache_key.clone(), reply.body.clone());
                    }
                    return Ok(CallOutcome { value: reply.body, status: Some(reply.status) });
                }
                Err(CallError::Cancelled) => {
                    debug!(key = %self.cache_key, "call cancelled");
                    return Err(CallError::Cancelled);
                }
                Err(err) => match decide(&err, attempt, self.budget, self.backoff) {
                    RetryDecision::Retry(delay) => {
                        warn!(
                            key = %self.cache_key,
                            attempt,
                            ?delay,
                            error = %err,
                            "attempt failed, retrying"
                        );
                        tokio::select! {
                            () = self.cancel.cancelled() => return Err(CallError::Cancelled),
                            () = tokio::time::sleep(delay) => {}
                        }
                        attempt += 1;
                    }
                    RetryDecision::GiveUp => {
                        error!(key = %self.cache_key, attempt, error = %err, "call failed");
                        return Err(err);
                    }
                },
            }
        }
    }

    async fn attempt_once(&self) -> Result<TransportReply> {
        let mut request =
            TransportRequest::new(self.address.clone(), self.verb, self.cancel.clone());
        if let Some(payload) = &self.payload {
            request = request.with_payload(payload.clone());
        }
        if !self.skip_auth {
            if let Some(source) = &self.token_source {
                if let Some(token) = source.bearer_token().await? {
                    request.push_header(AUTHORIZATION_HEADER, format!("Bearer {token}"));
                }
            }
        }
        self.transport.send(request).await
    }
}
