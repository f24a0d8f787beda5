//! Coalescer configuration.
//!
//! Loaded from the `[statement_keys]` table of a TOML file, or from the
//! root table when the file has no sections at all.

use std::path::Path;

use serde::Deserialize;

use crate::error::{KeyError, KeyResult};

/// Upper bound on pre-reserved buckets.
pub const MAX_INITIAL_CAPACITY: usize = 1 << 24;

/// Tuning for the coalescing store.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoalescerConfig {
    /// Buckets reserved up front.
    pub initial_capacity: usize,

    /// Insertions between full sweeps of dead entries (at least 1).
    pub sweep_interval: usize,
}

impl Default for CoalescerConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 256,
            sweep_interval: 1024,
        }
    }
}

impl CoalescerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of buckets reserved up front.
    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    /// Set the number of insertions between full sweeps.
    pub fn sweep_interval(mut self, interval: usize) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Parse from a TOML document.
    ///
    /// Reads the `[statement_keys]` table. Without one, a document holding
    /// only top-level keys is read as the config itself; a document with
    /// other sections (e.g. a shared pool file) yields the defaults.
    pub fn from_toml_str(content: &str) -> KeyResult<Self> {
        let mut table: toml::Table = toml::from_str(content).map_err(config_err)?;
        let section = match table.remove("statement_keys") {
            Some(section) => section,
            None if table.values().any(toml::Value::is_table) => {
                toml::Value::Table(toml::Table::new())
            }
            None => toml::Value::Table(table),
        };
        let config: CoalescerConfig = section.try_into().map_err(config_err)?;

        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> KeyResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> KeyResult<()> {
        if self.initial_capacity > MAX_INITIAL_CAPACITY {
            return Err(KeyError::Config(format!(
                "initial_capacity {} exceeds maximum {}",
                self.initial_capacity, MAX_INITIAL_CAPACITY
            )));
        }
        if self.sweep_interval == 0 {
            return Err(KeyError::Config(
                "sweep_interval must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn config_err(e: toml::de::Error) -> KeyError {
    KeyError::Config(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = CoalescerConfig::default();
        assert_eq!(config.initial_capacity, 256);
        assert_eq!(config.sweep_interval, 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_section() {
        let config = CoalescerConfig::from_toml_str(
            r#"
            [pool]
            max_connections = 10

            [statement_keys]
            sweep_interval = 64
            "#,
        )
        .unwrap();
        assert_eq!(config, CoalescerConfig::new().sweep_interval(64));
    }

    #[test]
    fn test_parse_root_table() {
        let config =
            CoalescerConfig::from_toml_str("initial_capacity = 16\nsweep_interval = 8").unwrap();
        assert_eq!(config.initial_capacity, 16);
        assert_eq!(config.sweep_interval, 8);
    }

    #[test]
    fn test_shared_file_without_section_uses_defaults() {
        let config = CoalescerConfig::from_toml_str(
            r#"
            [pool]
            max_connections = 10
            "#,
        )
        .unwrap();
        assert_eq!(config, CoalescerConfig::default());
    }

    #[test]
    fn test_rejects_zero_sweep_interval() {
        let err = CoalescerConfig::from_toml_str("sweep_interval = 0").unwrap_err();
        assert!(matches!(err, KeyError::Config(_)));
        assert!(CoalescerConfig::new().sweep_interval(0).validate().is_err());
    }

    #[test]
    fn test_rejects_bad_config() {
        let err = CoalescerConfig::from_toml_str("sweep_interval = \"often\"").unwrap_err();
        assert!(matches!(err, KeyError::Config(_)));

        let err = CoalescerConfig::from_toml_str("initial_capacity = 100000000").unwrap_err();
        assert!(err.to_string().contains("exceeds maximum"));

        let err = CoalescerConfig::from_toml_str("sweep_intervall = 3").unwrap_err();
        assert!(matches!(err, KeyError::Config(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = CoalescerConfig::load("/nonexistent/qail-stmt-key.toml").unwrap_err();
        assert!(matches!(err, KeyError::Io(_)));
    }
}
