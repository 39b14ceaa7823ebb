use std::env;

use crate::orchestrator::{DEFAULT_BATCH_MAX_RETRIES, DEFAULT_SCAN_CONCURRENCY};

/// Engine configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Table name override (default: the model's own table name)
    pub table_name: Option<String>,
    /// Key id data keys are generated under (default: none)
    pub kms_key_id: Option<String>,
    /// Retry rounds for unprocessed batch items (default: 5)
    pub batch_max_retries: u32,
    /// Concurrent segments for parallel scans (default: 4)
    pub scan_concurrency: usize,
}

impl EngineConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `DYNAMAP_TABLE_NAME` - Table name override
    /// - `DYNAMAP_KMS_KEY_ID` - Key id for encrypted fields
    /// - `DYNAMAP_BATCH_MAX_RETRIES` - Batch retry rounds (default: 5)
    /// - `DYNAMAP_SCAN_CONCURRENCY` - Parallel scan concurrency (default: 4)
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        Self {
            table_name: non_empty("DYNAMAP_TABLE_NAME"),
            kms_key_id: non_empty("DYNAMAP_KMS_KEY_ID"),
            batch_max_retries: lookup("DYNAMAP_BATCH_MAX_RETRIES")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_BATCH_MAX_RETRIES),
            scan_concurrency: lookup("DYNAMAP_SCAN_CONCURRENCY")
                .and_then(|v| v.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_SCAN_CONCURRENCY),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            table_name: None,
            kms_key_id: None,
            batch_max_retries: DEFAULT_BATCH_MAX_RETRIES,
            scan_concurrency: DEFAULT_SCAN_CONCURRENCY,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_default_values() {
        let config = EngineConfig::from_lookup(lookup(&[]));

        assert_eq!(config.table_name, None);
        assert_eq!(config.kms_key_id, None);
        assert_eq!(config.batch_max_retries, 5);
        assert_eq!(config.scan_concurrency, 4);
    }

    #[test]
    fn test_default_ignores_environment() {
        assert_eq!(EngineConfig::default(), EngineConfig::from_lookup(lookup(&[])));
    }

    #[test]
    fn test_values_from_variables() {
        let config = EngineConfig::from_lookup(lookup(&[
            ("DYNAMAP_TABLE_NAME", "orders"),
            ("DYNAMAP_KMS_KEY_ID", "alias/orders"),
            ("DYNAMAP_BATCH_MAX_RETRIES", "2"),
            ("DYNAMAP_SCAN_CONCURRENCY", "16"),
        ]));

        assert_eq!(config.table_name.as_deref(), Some("orders"));
        assert_eq!(config.kms_key_id.as_deref(), Some("alias/orders"));
        assert_eq!(config.batch_max_retries, 2);
        assert_eq!(config.scan_concurrency, 16);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = EngineConfig::from_lookup(lookup(&[
            ("DYNAMAP_TABLE_NAME", "  "),
            ("DYNAMAP_BATCH_MAX_RETRIES", "many"),
            ("DYNAMAP_SCAN_CONCURRENCY", "0"),
        ]));

        assert_eq!(config.table_name, None);
        assert_eq!(config.batch_max_retries, 5);
        assert_eq!(config.scan_concurrency, 4);
    }
}
