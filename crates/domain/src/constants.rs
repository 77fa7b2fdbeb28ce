//! Call-layer constants
//!
//! Centralized location for the defaults used throughout the workspace.

// Cache defaults
pub const DEFAULT_CACHE_TTL_MS: u64 = 30_000;

// Retry defaults
pub const DEFAULT_RETRY_BUDGET: u32 = 3;
pub const RETRY_BASE_DELAY_MS: u64 = 1_000;
pub const RETRY_MAX_DELAY_MS: u64 = 10_000;

// Transport defaults
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_USER_AGENT: &str = "breakwater/0.1";

// Header names
pub const AUTHORIZATION_HEADER: &str = "Authorization";
pub const RETRY_AFTER_HEADER: &str = "Retry-After";
