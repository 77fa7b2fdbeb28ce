//! # Breakwater Infrastructure
//!
//! Infrastructure implementations of the core call-layer ports.
//!
//! This crate contains:
//! - The HTTP transport behind [`breakwater_core::Transport`]
//! - Token sources for bearer credentials
//! - Configuration loading from files and environment variables
//!
//! ## Architecture
//! - Implements traits defined in `breakwater-core`
//! - Contains all "impure" code (network I/O, filesystem, environment)

pub mod auth;
pub mod config;
pub mod http;

// Re-export commonly used items
pub use auth::{SharedTokenSource, StaticTokenSource};
pub use config::{load_config, load_from_file, probe_config_paths, validate, ConfigError};
pub use http::{HttpTransport, HttpTransportBuilder};
