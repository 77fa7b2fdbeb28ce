//! HTTP transport implementation
//!
//! Carries outbound calls over HTTP with reqwest and classifies every
//! failure into the call error taxonomy.

pub mod transport;

// Re-export commonly used items
pub use transport::{HttpTransport, HttpTransportBuilder};
