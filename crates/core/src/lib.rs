//! # Breakwater Core
//!
//! Call orchestration layer - no transport dependencies.
//!
//! This crate contains:
//! - The call coordinator (caching, deduplication, retry)
//! - Port/adapter interfaces (traits) for transports and token sources
//! - Per-call-site invocation handles
//!
//! ## Architecture Principles
//! - Only depends on `breakwater-common` and `breakwater-domain`
//! - No HTTP or platform code
//! - All external dependencies via traits

pub mod coordinator;
pub mod handle;
pub mod ports;

pub use coordinator::{CallCoordinator, CallCoordinatorBuilder, CallOutcome, FlightResult};
pub use handle::CallHandle;
pub use ports::{TokenSource, Transport, TransportReply, TransportRequest};
