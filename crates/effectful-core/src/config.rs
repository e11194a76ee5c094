// Configuration for the interpreter set
//
// Built once at startup and shared by `Arc` into every adapter. Nothing in
// the core reads configuration from anywhere else.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use effectful_error::ErrorKind;

/// Default payload limit: 1 MiB
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 1024 * 1024;

/// Longest expiry any cache write may ask for: 365 days
pub const MAX_CACHE_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Errors raised while loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Per-kind overrides of the default retry classification
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryOverrides {
    /// Kinds always reported as retryable
    pub always: Vec<ErrorKind>,
    /// Kinds never reported as retryable
    pub never: Vec<ErrorKind>,
}

/// Configuration for the interpreter adapters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpreterConfig {
    /// Largest payload accepted by any write, publish or send
    pub max_payload_bytes: usize,

    /// Expiry applied to cache writes that do not carry their own
    pub default_cache_ttl_secs: Option<u64>,

    /// Prefix joined to every cache key as `namespace:key`
    pub cache_namespace: Option<String>,

    /// Retry classification overrides
    pub retry: RetryOverrides,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            default_cache_ttl_secs: None,
            cache_namespace: None,
            retry: RetryOverrides::default(),
        }
    }
}

impl InterpreterConfig {
    /// Create a new configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the payload limit
    pub fn with_max_payload_bytes(mut self, max: usize) -> Self {
        self.max_payload_bytes = max;
        self
    }

    /// Set the default cache expiry, rounded up to whole seconds
    pub fn with_default_cache_ttl(mut self, ttl: Duration) -> Self {
        let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
        self.default_cache_ttl_secs = Some(secs);
        self
    }

    /// Set the cache key namespace
    pub fn with_cache_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.cache_namespace = Some(namespace.into());
        self
    }

    /// Replace the retry overrides
    pub fn with_retry(mut self, retry: RetryOverrides) -> Self {
        self.retry = retry;
        self
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Check the configuration for contradictions
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_payload_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_payload_bytes must be positive".to_string(),
            ));
        }
        if self.default_cache_ttl_secs == Some(0) {
            return Err(ConfigError::Invalid(
                "default_cache_ttl_secs must be positive".to_string(),
            ));
        }
        if let Some(secs) = self.default_cache_ttl_secs {
            if secs > MAX_CACHE_TTL.as_secs() {
                return Err(ConfigError::Invalid(format!(
                    "default_cache_ttl_secs is {secs}, limit is {}",
                    MAX_CACHE_TTL.as_secs()
                )));
            }
        }
        if matches!(self.cache_namespace.as_deref(), Some("")) {
            return Err(ConfigError::Invalid(
                "cache_namespace must not be empty".to_string(),
            ));
        }
        if let Some(kind) = self.retry.always.iter().find(|k| self.retry.never.contains(k)) {
            return Err(ConfigError::Invalid(format!(
                "{kind} is listed as both always and never retryable"
            )));
        }
        Ok(())
    }

    /// Retry classification for a failure kind, overrides first
    pub fn is_retryable(&self, kind: ErrorKind) -> bool {
        if self.retry.always.contains(&kind) {
            return true;
        }
        if self.retry.never.contains(&kind) {
            return false;
        }
        kind.is_retryable_by_default()
    }

    pub fn default_cache_ttl(&self) -> Option<Duration> {
        self.default_cache_ttl_secs.map(Duration::from_secs)
    }

    /// The key actually handed to the cache store
    pub fn cache_key(&self, key: &str) -> String {
        match &self.cache_namespace {
            Some(namespace) => format!("{namespace}:{key}"),
            None => key.to_string(),
        }
    }
}
