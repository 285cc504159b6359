//! Session configuration

use crate::cache::DEFAULT_CACHE_CAPACITY;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Session configuration
///
/// ```toml
/// base_uri = "https://lims.example.org/api/v2"
/// cache_capacity = 10000
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Service base uri, used by [`Session::uri_for`](crate::Session::uri_for)
    pub base_uri: String,
    /// Maximum live entries in the identity cache
    pub cache_capacity: usize,
}

impl SessionConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With base uri
    #[inline]
    #[must_use]
    pub fn with_base_uri(mut self, base_uri: impl Into<String>) -> Self {
        self.base_uri = base_uri.into();
        self
    }

    /// With cache capacity
    #[inline]
    #[must_use]
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Parse and validate TOML
    ///
    /// # Errors
    /// Returns error on malformed TOML or out-of-range values
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or is invalid
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source =
            std::fs::read_to_string(path).map_err(|e| ConfigError::io_error(path, e))?;
        Self::from_toml_str(&source)
    }

    /// Check value ranges
    ///
    /// # Errors
    /// Returns error if the cache capacity is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "cache_capacity",
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            base_uri: String::new(),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_apply_to_missing_fields() {
        let config = SessionConfig::from_toml_str("base_uri = \"https://lims/api/v2\"").unwrap();
        assert_eq!(config.base_uri, "https://lims/api/v2");
        assert_eq!(config.cache_capacity, DEFAULT_CACHE_CAPACITY);
    }

    #[test]
    fn rejects_zero_capacity() {
        let err = SessionConfig::from_toml_str("cache_capacity = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "cache_capacity", .. }));
    }

    #[test]
    fn rejects_malformed_toml() {
        let err = SessionConfig::from_toml_str("cache_capacity = \"many\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "cache_capacity = 25").unwrap();

        let config = SessionConfig::from_file(file.path()).unwrap();
        assert_eq!(config, SessionConfig::new().with_cache_capacity(25));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = SessionConfig::from_file("/nonexistent/lims.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
