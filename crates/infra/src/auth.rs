//! Token sources for bearer credentials
//!
//! Two implementations of [`TokenSource`]: a fixed credential for tools
//! and tests, and a shared slot an application updates as its user signs
//! in and out.

use std::sync::Arc;

use async_trait::async_trait;
use breakwater_core::TokenSource;
use breakwater_domain::Result;
use parking_lot::RwLock;

/// Token source with one fixed credential.
#[derive(Debug, Clone)]
pub struct StaticTokenSource {
    token: String,
}

impl StaticTokenSource {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

#[async_trait]
impl TokenSource for StaticTokenSource {
    async fn bearer_token(&self) -> Result<Option<String>> {
        Ok(Some(self.token.clone()))
    }
}

/// Token source backed by a shared slot.
///
/// Clones share the slot, so a transport holding one clone observes
/// credentials installed through another. While the slot is empty, calls
/// go out unauthenticated.
#[derive(Debug, Clone, Default)]
pub struct SharedTokenSource {
    slot: Arc<RwLock<Option<String>>>,
}

impl SharedTokenSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a credential, replacing any previous one.
    pub fn set(&self, token: impl Into<String>) {
        *self.slot.write() = Some(token.into());
    }

    /// Drop the credential.
    pub fn clear(&self) {
        *self.slot.write() = None;
    }

    pub fn is_set(&self) -> bool {
        self.slot.read().is_some()
    }
}

#[async_trait]
impl TokenSource for SharedTokenSource {
    async fn bearer_token(&self) -> Result<Option<String>> {
        Ok(self.slot.read().clone())
    }
}
