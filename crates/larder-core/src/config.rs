//! Configuration management for Larder.
//!
//! Configuration is loaded from (in priority order):
//! 1. Environment variables (`LARDER__` prefix, `__` separator)
//! 2. Config file (`larder.toml` by default)
//! 3. Defaults

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::Result;

/// Default config file prefix.
pub const DEFAULT_FILE_PREFIX: &str = "larder";

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "LARDER";

/// Store-level settings (`[store]` section).
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct StoreConfig {
    /// Graph opened (and created if missing) on initialization.
    #[serde(default = "default_graph_id")]
    pub graph_id: String,

    /// Default number of favourite recipes returned.
    #[serde(default = "default_limit")]
    pub favorites_limit: usize,

    /// Default number of distinct recommended recipes returned.
    #[serde(default = "default_limit")]
    pub recommend_limit: usize,

    /// Hold a per-edge lock across the read and write of a `selects` counter.
    #[serde(default)]
    pub serialize_edge_updates: bool,
}

fn default_graph_id() -> String {
    "larder".to_string()
}

fn default_limit() -> usize {
    5
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            graph_id: default_graph_id(),
            favorites_limit: default_limit(),
            recommend_limit: default_limit(),
            serialize_edge_updates: false,
        }
    }
}

/// Build the layered configuration for `file_prefix`.
pub fn load(file_prefix: &str) -> Result<config::Config> {
    let cfg = config::Config::builder()
        .add_source(config::File::with_name(file_prefix).required(false))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;
    Ok(cfg)
}

/// Deserialize `section`, falling back to `T::default()` when it is absent.
pub fn load_section<T>(file_prefix: &str, section: &str) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let cfg = load(file_prefix)?;
    match cfg.get::<T>(section) {
        Ok(value) => Ok(value),
        Err(config::ConfigError::NotFound(_)) => {
            tracing::debug!(section, "Config section absent, using defaults");
            Ok(T::default())
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_store_config() {
        let config = StoreConfig::default();
        assert_eq!(config.graph_id, "larder");
        assert_eq!(config.favorites_limit, 5);
        assert_eq!(config.recommend_limit, 5);
        assert!(!config.serialize_edge_updates);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("absent");
        let config: StoreConfig = load_section(prefix.to_str().unwrap(), "store").unwrap();
        assert_eq!(config, StoreConfig::default());
    }

    #[test]
    fn test_store_section_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("larder.toml");
        std::fs::write(
            &path,
            "[store]\ngraph_id = \"recipes_test\"\nrecommend_limit = 2\nserialize_edge_updates = true\n",
        )
        .unwrap();

        let prefix = dir.path().join("larder");
        let config: StoreConfig = load_section(prefix.to_str().unwrap(), "store").unwrap();
        assert_eq!(config.graph_id, "recipes_test");
        assert_eq!(config.recommend_limit, 2);
        assert_eq!(config.favorites_limit, 5);
        assert!(config.serialize_edge_updates);
    }
}
