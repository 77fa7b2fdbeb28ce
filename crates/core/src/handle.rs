//! Per-call-site invocation handles
//!
//! A [`CallHandle`] binds one call-site to a spec and owns that site's
//! invocation state: last value, pending flag, last error, last status.
//! Only the invocation that is still current may publish into the state;
//! superseded and retired invocations settle silently. Supersession is
//! tracked with a generation counter, so a slow first call can never
//! overwrite the outcome of a newer one.

use std::fmt;
use std::sync::Arc;

use breakwater_domain::{CallError, CallSpec};
use parking_lot::Mutex;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

use crate::coordinator::{CallCoordinator, FlightResult};

#[derive(Debug, Default)]
struct InvocationState {
    value: Option<Value>,
    pending: bool,
    error: Option<CallError>,
    status: Option<u16>,
    generation: u64,
    cancel: Option<CancellationToken>,
    retired: bool,
}

/// One call-site's view of a call.
///
/// Handles are not cloneable: one handle is one call-site, and dropping it
/// retires the site. The coordinator behind it is shared freely.
pub struct CallHandle {
    id: Uuid,
    spec: CallSpec,
    coordinator: Arc<CallCoordinator>,
    state: Arc<Mutex<InvocationState>>,
}

impl CallHandle {
    /// Bind a call-site to `spec`.
    ///
    /// When the spec carries `auto_trigger`, one background execution is
    /// started immediately; binding such a spec therefore requires a
    /// running tokio runtime.
    pub fn bind(coordinator: Arc<CallCoordinator>, spec: CallSpec) -> Self {
        let handle = Self {
            id: Uuid::new_v4(),
            spec,
            coordinator,
            state: Arc::new(Mutex::new(InvocationState::default())),
        };
        if handle.spec.auto_trigger {
            handle.trigger();
        }
        handle
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn spec(&self) -> &CallSpec {
        &self.spec
    }

    /// Last published value, if any. Kept across later invocations until
    /// they settle, so callers can keep showing stale data while a refresh
    /// is pending.
    pub fn value(&self) -> Option<Value> {
        self.state.lock().value.clone()
    }

    /// Whether an invocation is outstanding.
    pub fn is_pending(&self) -> bool {
        self.state.lock().pending
    }

    /// User-facing message of the last terminal failure.
    pub fn error(&self) -> Option<String> {
        self.state.lock().error.as_ref().map(CallError::user_message)
    }

    /// Full error of the last terminal failure.
    pub fn last_error(&self) -> Option<CallError> {
        self.state.lock().error.clone()
    }

    /// Status code of the last settled invocation, from the response on
    /// success or from the failure when it carried one. Absent after a
    /// cache hit.
    pub fn status(&self) -> Option<u16> {
        self.state.lock().status
    }

    pub fn is_retired(&self) -> bool {
        self.state.lock().retired
    }

    /// Execute the bound spec, returning the value or `None` on failure,
    /// cancellation, or supersession.
    pub async fn execute(&self) -> Option<Value> {
        self.run(self.spec.clone()).await
    }

    /// Execute with a payload override for this invocation only.
    pub async fn execute_with(&self, payload: Value) -> Option<Value> {
        let mut spec = self.spec.clone();
        spec.payload = Some(payload);
        self.run(spec).await
    }

    /// Fire-and-forget execution on a background task.
    ///
    /// Used for refreshes nobody awaits; the outcome lands in the handle
    /// state exactly as with [`execute`](Self::execute).
    pub fn trigger(&self) {
        let Some((token, generation)) = self.begin() else {
            return;
        };
        let coordinator = Arc::clone(&self.coordinator);
        let spec = self.spec.clone();
        let state = Arc::clone(&self.state);
        let id = self.id;
        tokio::spawn(async move {
            let result = coordinator.execute(&spec, token).await;
            if !Self::settle_in(&state, generation, &result) {
                debug!(handle = %id, "suppressed outcome of superseded invocation");
            }
        });
    }

    /// Clear local state and withdraw any outstanding invocation.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        if let Some(token) = state.cancel.take() {
            token.cancel();
        }
        state.generation = state.generation.wrapping_add(1);
        state.value = None;
        state.pending = false;
        state.error = None;
        state.status = None;
    }

    /// Drop the cached entry under this call-site's key, returning whether
    /// one existed.
    pub fn clear_cache(&self) -> bool {
        self.coordinator.invalidate(&self.spec.effective_cache_key())
    }

    /// Retire the call-site: cancel any outstanding invocation and refuse
    /// all further work. Idempotent; also runs on drop.
    pub fn retire(&self) {
        let mut state = self.state.lock();
        if state.retired {
            return;
        }
        state.retired = true;
        state.pending = false;
        if let Some(token) = state.cancel.take() {
            token.cancel();
        }
        debug!(handle = %self.id, "call-site retired");
    }

    async fn run(&self, spec: CallSpec) -> Option<Value> {
        let Some((token, generation)) = self.begin() else {
            return None;
        };
        let result = self.coordinator.execute(&spec, token).await;
        let published = Self::settle_in(&self.state, generation, &result);
        match result {
            Ok(outcome) if published => Some(outcome.value),
            _ => None,
        }
    }

    /// Start a new invocation, superseding any outstanding one.
    ///
    /// Clears error and status but keeps the last value visible while the
    /// new invocation is pending. Returns `None` on a retired handle.
    fn begin(&self) -> Option<(CancellationToken, u64)> {
        let mut state = self.state.lock();
        if state.retired {
            return None;
        }
        if let Some(previous) = state.cancel.take() {
            previous.cancel();
        }
        let token = CancellationToken::new();
        state.cancel = Some(token.clone());
        state.generation = state.generation.wrapping_add(1);
        state.pending = true;
        state.error = None;
        state.status = None;
        Some((token, state.generation))
    }

    /// Publish `result` into the state if `generation` is still current.
    ///
    /// Returns whether the outcome was published. A cancelled outcome is
    /// never recorded as an error even when current.
    fn settle_in(state: &Mutex<InvocationState>, generation: u64, result: &FlightResult) -> bool {
        let mut state = state.lock();
        if state.retired || state.generation != generation {
            return false;
        }
        state.pending = false;
        state.cancel = None;
        match result {
            Ok(outcome) => {
                state.value = Some(outcome.value.clone());
                state.status = outcome.status;
                state.error = None;
            }
            Err(CallError::Cancelled) => {}
            Err(err) => {
                state.error = Some(err.clone());
                state.status = err.status();
            }
        }
        true
    }
}

impl Drop for CallHandle {
    fn drop(&mut self) {
        self.retire();
    }
}

impl fmt::Debug for CallHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallHandle")
            .field("id", &self.id)
            .field("key", &self.spec.effective_cache_key())
            .finish()
    }
}
