//! Operator configuration from the environment.

use std::path::PathBuf;

/// Default data directory when `UPLINE_DATA_DIR` is unset.
pub const DEFAULT_DATA_DIR: &str = "./upline-data";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminConfig {
    /// RocksDB directory holding the hierarchy store
    pub data_dir: PathBuf,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl AdminConfig {
    /// Read `UPLINE_DATA_DIR`, falling back to [`DEFAULT_DATA_DIR`].
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let data_dir = lookup("UPLINE_DATA_DIR")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
        Self { data_dir }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_unset_or_blank() {
        let config = AdminConfig::from_lookup(|_| None);
        assert_eq!(config.data_dir, PathBuf::from(DEFAULT_DATA_DIR));

        let config = AdminConfig::from_lookup(|_| Some("  ".into()));
        assert_eq!(config.data_dir, PathBuf::from(DEFAULT_DATA_DIR));
    }

    #[test]
    fn reads_data_dir() {
        let config = AdminConfig::from_lookup(|key| {
            (key == "UPLINE_DATA_DIR").then(|| "/var/lib/upline".to_string())
        });
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/upline"));
    }
}
