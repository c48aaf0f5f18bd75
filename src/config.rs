use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tokio::fs;

// ============================================================================
// Config (root)
// ============================================================================

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "warroom.toml";

/// Default investigation scenario when none is configured.
pub const DEFAULT_SCENARIO: &str = "telco-noc";

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub run: RunConfig,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("environment variable '{0}' is not set")]
    MissingEnvVar(String),

    #[error("unclosed variable reference '${{' (missing '}}')")]
    UnclosedVarReference,
}

impl Config {
    /// Load the config from a TOML file, expanding `${VAR}` references.
    ///
    /// A missing file is not an error; it yields the defaults.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = match fs::read_to_string(path).await {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(ConfigError::Io(e)),
        };
        let expanded = expand_env_vars(&contents)?;
        Ok(toml::from_str(&expanded)?)
    }
}

// ============================================================================
// Environment Variable Expansion
// ============================================================================

/// Expand environment variables in a string.
///
/// Supports the following syntax (shell-compatible):
/// - `${VAR}` - Required variable, errors if not set
/// - `${VAR:-default}` - Optional variable with default value
/// - `${VAR:-}` - Optional variable, empty string if not set
/// - `$$` - Escaped `$` (only needed before `{` to prevent expansion)
///
/// Nested expansion (`${VAR:-${DEFAULT}}`) is not supported, and an
/// unclosed `${` is an error.
fn expand_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(idx) = rest.find('$') {
        result.push_str(&rest[..idx]);
        rest = &rest[idx + 1..];

        if let Some(tail) = rest.strip_prefix('$') {
            // Escaped $ -> literal $
            result.push('$');
            rest = tail;
        } else if let Some(tail) = rest.strip_prefix('{') {
            let Some(end) = tail.find('}') else {
                return Err(ConfigError::UnclosedVarReference);
            };
            result.push_str(&resolve_var(&tail[..end])?);
            rest = &tail[end + 1..];
        } else {
            // Not a variable reference, keep literal $
            result.push('$');
        }
    }

    result.push_str(rest);
    Ok(result)
}

/// Resolve the inside of one `${...}` reference.
fn resolve_var(reference: &str) -> Result<String, ConfigError> {
    let (name, default) = match reference.split_once(":-") {
        Some((name, default)) => (name, Some(default)),
        None => (reference, None),
    };

    match std::env::var(name) {
        Ok(value) => Ok(value),
        Err(_) => default
            .map(str::to_string)
            .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string())),
    }
}

// ============================================================================
// BackendConfig
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the war-room backend.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Timeout for session CRUD requests. The run stream is exempt.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl BackendConfig {
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

// ============================================================================
// RunConfig
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct RunConfig {
    /// Scenario the backend should investigate under.
    #[serde(default = "default_scenario")]
    pub scenario: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            scenario: default_scenario(),
        }
    }
}

// ============================================================================
// Private Helpers (Serde Defaults)
// ============================================================================

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_scenario() -> String {
    DEFAULT_SCENARIO.to_string()
}

// ============================================================================
// Tests
// ============================================================================
