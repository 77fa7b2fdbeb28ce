//! Configuration loader
//!
//! Resolves a ready-to-use [`ClientConfig`] from files and environment
//! variables.
//!
//! ## Loading Strategy
//! 1. Start from a config file when one is found, otherwise from defaults
//! 2. Apply `BREAKWATER_*` environment overrides on top
//! 3. Validate the merged result
//!
//! ## Environment Variables
//! - `BREAKWATER_CONFIG_PATH`: explicit config file path
//! - `BREAKWATER_BASE_URL`: base URL calls are joined onto
//! - `BREAKWATER_REQUEST_TIMEOUT_MS`: request timeout in milliseconds
//! - `BREAKWATER_CACHE_TTL_MS`: default cache freshness window
//! - `BREAKWATER_RETRY_BASE_MS`: delay after the first failed attempt
//! - `BREAKWATER_RETRY_CAP_MS`: upper bound on any retry delay
//! - `BREAKWATER_MAX_RETRIES`: additional attempts after the first failure
//! - `BREAKWATER_USER_AGENT`: user agent advertised by the transport
//!
//! ## File Locations
//! Without `BREAKWATER_CONFIG_PATH`, the loader probes (in order):
//! 1. `./breakwater.toml`, `./breakwater.json`
//! 2. `breakwater.toml` / `breakwater.json` next to the executable
//!
//! Format is chosen by file extension.

use std::path::{Path, PathBuf};

use breakwater_domain::ClientConfig;
use thiserror::Error;

/// Environment variable naming an explicit config file.
pub const ENV_CONFIG_PATH: &str = "BREAKWATER_CONFIG_PATH";
/// Environment override for [`ClientConfig::base_url`].
pub const ENV_BASE_URL: &str = "BREAKWATER_BASE_URL";
/// Environment override for [`ClientConfig::request_timeout_ms`].
pub const ENV_REQUEST_TIMEOUT_MS: &str = "BREAKWATER_REQUEST_TIMEOUT_MS";
/// Environment override for [`ClientConfig::cache_ttl_ms`].
pub const ENV_CACHE_TTL_MS: &str = "BREAKWATER_CACHE_TTL_MS";
/// Environment override for [`ClientConfig::retry_base_ms`].
pub const ENV_RETRY_BASE_MS: &str = "BREAKWATER_RETRY_BASE_MS";
/// Environment override for [`ClientConfig::retry_cap_ms`].
pub const ENV_RETRY_CAP_MS: &str = "BREAKWATER_RETRY_CAP_MS";
/// Environment override for [`ClientConfig::max_retries`].
pub const ENV_MAX_RETRIES: &str = "BREAKWATER_MAX_RETRIES";
/// Environment override for [`ClientConfig::user_agent`].
pub const ENV_USER_AGENT: &str = "BREAKWATER_USER_AGENT";

/// Failures while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    /// The config file exists but could not be parsed.
    #[error("failed to parse config: {0}")]
    Parse(String),
    /// The merged configuration fails validation.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Load configuration from files and environment variables.
///
/// Starts from `BREAKWATER_CONFIG_PATH` (or a probed `breakwater.toml` /
/// `breakwater.json`) when present, otherwise from defaults, then applies
/// environment overrides and validates the result.
///
/// # Errors
/// Returns [`ConfigError`] when a named file is missing or malformed, an
/// override has an invalid value, or the merged result fails validation.
pub fn load_config() -> Result<ClientConfig, ConfigError> {
    let mut config = match config_file_path() {
        Some(path) => {
            tracing::info!(path = %path.display(), "loading configuration file");
            load_from_file(&path)?
        }
        None => {
            tracing::debug!("no configuration file found, starting from defaults");
            ClientConfig::default()
        }
    };

    apply_env(&mut config)?;
    validate(&config)?;
    Ok(config)
}

/// Load configuration from one file, format chosen by extension.
///
/// # Errors
/// Returns [`ConfigError`] when the file cannot be read, has an
/// unsupported extension, or does not parse.
pub fn load_from_file(path: &Path) -> Result<ClientConfig, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents, path)
}

/// Check the invariants a usable configuration must satisfy.
///
/// # Errors
/// Returns [`ConfigError::Invalid`] for an empty base URL or a retry cap
/// below the retry base.
pub fn validate(config: &ClientConfig) -> Result<(), ConfigError> {
    if config.base_url.trim().is_empty() {
        return Err(ConfigError::Invalid("base_url must be set".to_string()));
    }
    if config.retry_cap_ms < config.retry_base_ms {
        return Err(ConfigError::Invalid(format!(
            "retry_cap_ms ({}) must be at least retry_base_ms ({})",
            config.retry_cap_ms, config.retry_base_ms
        )));
    }
    Ok(())
}

/// First config file found in the standard locations, if any.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.push(cwd.join("breakwater.toml"));
        candidates.push(cwd.join("breakwater.json"));
    }
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.push(exe_dir.join("breakwater.toml"));
            candidates.push(exe_dir.join("breakwater.json"));
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

fn config_file_path() -> Option<PathBuf> {
    if let Some(path) = env_string(ENV_CONFIG_PATH) {
        return Some(PathBuf::from(path));
    }
    probe_config_paths()
}

fn parse_config(contents: &str, path: &Path) -> Result<ClientConfig, ConfigError> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|err| ConfigError::Parse(format!("invalid TOML: {err}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|err| ConfigError::Parse(format!("invalid JSON: {err}"))),
        other => Err(ConfigError::Parse(format!("unsupported config format: {other}"))),
    }
}

fn apply_env(config: &mut ClientConfig) -> Result<(), ConfigError> {
    if let Some(value) = env_string(ENV_BASE_URL) {
        config.base_url = value;
    }
    if let Some(value) = env_u64(ENV_REQUEST_TIMEOUT_MS)? {
        config.request_timeout_ms = value;
    }
    if let Some(value) = env_u64(ENV_CACHE_TTL_MS)? {
        config.cache_ttl_ms = value;
    }
    if let Some(value) = env_u64(ENV_RETRY_BASE_MS)? {
        config.retry_base_ms = value;
    }
    if let Some(value) = env_u64(ENV_RETRY_CAP_MS)? {
        config.retry_cap_ms = value;
    }
    if let Some(value) = env_u32(ENV_MAX_RETRIES)? {
        config.max_retries = value;
    }
    if let Some(value) = env_string(ENV_USER_AGENT) {
        config.user_agent = value;
    }
    Ok(())
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn env_u64(key: &str) -> Result<Option<u64>, ConfigError> {
    match env_string(key) {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|err| ConfigError::Invalid(format!("{key} must be an integer: {err}"))),
        None => Ok(None),
    }
}

fn env_u32(key: &str) -> Result<Option<u32>, ConfigError> {
    match env_string(key) {
        Some(raw) => raw
            .trim()
            .parse::<u32>()
            .map(Some)
            .map_err(|err| ConfigError::Invalid(format!("{key} must be an integer: {err}"))),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Mutex;

    use once_cell::sync::Lazy;

    use super::*;

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    const ALL_VARS: [&str; 8] = [
        ENV_CONFIG_PATH,
        ENV_BASE_URL,
        ENV_REQUEST_TIMEOUT_MS,
        ENV_CACHE_TTL_MS,
        ENV_RETRY_BASE_MS,
        ENV_RETRY_CAP_MS,
        ENV_MAX_RETRIES,
        ENV_USER_AGENT,
    ];

    fn clear_env() {
        for key in ALL_VARS {
            std::env::remove_var(key);
        }
    }

    fn temp_config(extension: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(extension)
            .tempfile()
            .expect("temp config file");
        file.write_all(contents.as_bytes()).expect("write temp config");
        file
    }

    #[test]
    fn defaults_apply_when_only_the_base_url_is_given() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();
        std::env::set_var(ENV_BASE_URL, "https://api.example.test");

        let config = load_config().expect("config should load");
        assert_eq!(config.base_url, "https://api.example.test");
        assert_eq!(config.cache_ttl_ms, 30_000);
        assert_eq!(config.retry_base_ms, 1_000);
        assert_eq!(config.retry_cap_ms, 10_000);
        assert_eq!(config.max_retries, 3);

        clear_env();
    }

    #[test]
    fn env_overrides_take_precedence_over_the_file() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        let file = temp_config(
            ".toml",
            r#"
base_url = "https://file.example.test"
cache_ttl_ms = 5000
max_retries = 1
"#,
        );
        std::env::set_var(ENV_CONFIG_PATH, file.path());
        std::env::set_var(ENV_CACHE_TTL_MS, "1234");

        let config = load_config().expect("config should load");
        assert_eq!(config.base_url, "https://file.example.test");
        assert_eq!(config.cache_ttl_ms, 1234, "environment wins over the file");
        assert_eq!(config.max_retries, 1, "untouched file values survive");

        clear_env();
    }

    #[test]
    fn json_files_parse_by_extension() {
        let file = temp_config(
            ".json",
            r#"{"base_url": "https://json.example.test", "request_timeout_ms": 9000}"#,
        );

        let config = load_from_file(file.path()).expect("json config should parse");
        assert_eq!(config.base_url, "https://json.example.test");
        assert_eq!(config.request_timeout_ms, 9_000);
    }

    #[test]
    fn malformed_files_report_a_parse_error() {
        let file = temp_config(".toml", "base_url = [unclosed");

        let result = load_from_file(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn unsupported_extensions_are_rejected() {
        let file = temp_config(".yaml", "base_url: nope");

        let result = load_from_file(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn missing_explicit_file_is_an_io_error() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();
        std::env::set_var(ENV_CONFIG_PATH, "/nonexistent/breakwater.toml");

        let result = load_config();
        assert!(matches!(result, Err(ConfigError::Io(_))));

        clear_env();
    }

    #[test]
    fn invalid_numbers_in_the_environment_fail() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();
        std::env::set_var(ENV_BASE_URL, "https://api.example.test");
        std::env::set_var(ENV_MAX_RETRIES, "not-a-number");

        let result = load_config();
        assert!(matches!(result, Err(ConfigError::Invalid(_))));

        clear_env();
    }

    #[test]
    fn validation_rejects_an_empty_base_url() {
        let config = ClientConfig::default();
        assert!(matches!(validate(&config), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn validation_rejects_a_cap_below_the_base() {
        let config = ClientConfig {
            base_url: "https://api.example.test".to_string(),
            retry_base_ms: 2_000,
            retry_cap_ms: 500,
            ..Default::default()
        };
        assert!(matches!(validate(&config), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn validation_accepts_a_complete_config() {
        let config = ClientConfig {
            base_url: "https://api.example.test".to_string(),
            ..Default::default()
        };
        assert!(validate(&config).is_ok());
    }
}
