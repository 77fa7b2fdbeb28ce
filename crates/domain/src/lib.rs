//! # Breakwater Domain
//!
//! Domain types for the outbound call layer.
//!
//! This crate contains:
//! - Call descriptors (`CallSpec`, `Verb`) and derived cache keys
//! - The call error taxonomy and `Result` alias
//! - Configuration structures and policy defaults
//!
//! ## Architecture
//! - No dependencies on other Breakwater crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
