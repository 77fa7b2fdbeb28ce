//! # Breakwater Common
//!
//! Reusable mechanisms shared across the Breakwater crates: a time-bounded
//! response cache, an in-flight registry for single-flight deduplication,
//! retry/backoff policies, and clock abstractions for deterministic tests.
//!
//! These modules carry no domain knowledge; they are generic over the
//! values and outcomes they hold.

#![forbid(unsafe_code)]

pub mod cache;
pub mod clock;
pub mod flight;
pub mod retry;

// Re-export the primary types for convenient access
pub use cache::ResponseCache;
pub use clock::{Clock, MockClock, SystemClock};
pub use flight::{FlightGuard, InflightRegistry, Registration, SharedOutcome};
pub use retry::BackoffPolicy;
