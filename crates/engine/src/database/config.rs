//! Database configuration via `termstore.toml`
//!
//! On first open, a default `termstore.toml` is created in the data
//! directory. To change settings, edit the file and reopen.

use serde::{Deserialize, Serialize};
use std::path::Path;
use termstore_core::{Error, Result};

/// Config file name placed in the database data directory.
pub const CONFIG_FILE_NAME: &str = "termstore.toml";

/// Where index documents are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexMode {
    /// One worker thread per index kind; writes return before indexing
    Background,
    /// Index synchronously inside the write call
    Inline,
}

/// How nid-valued exact queries are encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NidQueryMode {
    /// Exact term OR width-1 numeric range
    Dual,
    /// Exact term only
    Exact,
}

/// Database configuration loaded from `termstore.toml`.
///
/// # Example
///
/// ```toml
/// index_mode = "background"
/// nid_query_mode = "dual"
/// strict_result_resolution = false
/// max_queue_depth = 65536
/// default_page_size = 100
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermstoreConfig {
    /// `"background"` or `"inline"`.
    #[serde(default = "default_index_mode")]
    pub index_mode: IndexMode,
    /// `"dual"` or `"exact"`.
    #[serde(default = "default_nid_query_mode")]
    pub nid_query_mode: NidQueryMode,
    /// Fail a query when a hit's nid cannot be read from its doc value.
    #[serde(default)]
    pub strict_result_resolution: bool,
    /// Pending index tasks per index kind before writers wait for the worker.
    #[serde(default = "default_max_queue_depth")]
    pub max_queue_depth: usize,
    /// Result limit when a query does not set one.
    #[serde(default = "default_page_size")]
    pub default_page_size: usize,
}

fn default_index_mode() -> IndexMode {
    IndexMode::Background
}

fn default_nid_query_mode() -> NidQueryMode {
    NidQueryMode::Dual
}

fn default_max_queue_depth() -> usize {
    65536
}

fn default_page_size() -> usize {
    100
}

impl Default for TermstoreConfig {
    fn default() -> Self {
        Self {
            index_mode: default_index_mode(),
            nid_query_mode: default_nid_query_mode(),
            strict_result_resolution: false,
            max_queue_depth: default_max_queue_depth(),
            default_page_size: default_page_size(),
        }
    }
}

impl TermstoreConfig {
    /// Configuration that indexes inside every write, for tests and tools.
    pub fn inline() -> Self {
        Self {
            index_mode: IndexMode::Inline,
            ..Self::default()
        }
    }

    /// Check values that serde cannot.
    ///
    /// # Errors
    ///
    /// Returns an error if a size is zero.
    pub fn validate(&self) -> Result<()> {
        if self.max_queue_depth == 0 {
            return Err(Error::ConfigError(
                "max_queue_depth must be at least 1".to_string(),
            ));
        }
        if self.default_page_size == 0 {
            return Err(Error::ConfigError(
                "default_page_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# termstore configuration
#
# Index mode: "background" (default) or "inline"
#   "background" = one worker per index kind, writes return immediately
#   "inline"     = documents are written before the write call returns
index_mode = "background"

# Nid query mode: "dual" (default) or "exact"
#   "dual"  = nid values match exact terms or numeric points
#   "exact" = exact terms only (after migrate_nid_encoding)
nid_query_mode = "dual"

# Fail queries whose hits lack the nid doc value instead of
# falling back to the stored field (default: false)
strict_result_resolution = false

# Pending index tasks per index kind before writers wait for the worker
max_queue_depth = 65536

# Result limit for queries that do not set one
default_page_size = 100
"#
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::ConfigError(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: TermstoreConfig = toml::from_str(&content).map_err(|e| {
            Error::ConfigError(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                Error::ConfigError(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            Error::ConfigError(format!(
                "Failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_is_background_dual() {
        let config = TermstoreConfig::default();
        assert_eq!(config.index_mode, IndexMode::Background);
        assert_eq!(config.nid_query_mode, NidQueryMode::Dual);
        assert!(!config.strict_result_resolution);
    }

    #[test]
    fn parse_inline_exact() {
        let config: TermstoreConfig =
            toml::from_str("index_mode = \"inline\"\nnid_query_mode = \"exact\"").unwrap();
        assert_eq!(config.index_mode, IndexMode::Inline);
        assert_eq!(config.nid_query_mode, NidQueryMode::Exact);
    }

    #[test]
    fn parse_invalid_mode_returns_error() {
        let parsed: std::result::Result<TermstoreConfig, _> =
            toml::from_str("index_mode = \"turbo\"");
        assert!(parsed.is_err());
    }

    #[test]
    fn zero_queue_depth_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "max_queue_depth = 0\n").unwrap();
        assert!(matches!(
            TermstoreConfig::from_file(&path),
            Err(Error::ConfigError(_))
        ));
    }

    #[test]
    fn default_toml_parses_correctly() {
        let config: TermstoreConfig = toml::from_str(TermstoreConfig::default_toml()).unwrap();
        assert_eq!(config, TermstoreConfig::default());
    }

    #[test]
    fn write_default_creates_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        assert!(!path.exists());

        TermstoreConfig::write_default_if_missing(&path).unwrap();
        assert!(path.exists());

        let config = TermstoreConfig::from_file(&path).unwrap();
        assert_eq!(config.index_mode, IndexMode::Background);
    }

    #[test]
    fn write_default_does_not_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);

        std::fs::write(&path, "index_mode = \"inline\"\n").unwrap();
        TermstoreConfig::write_default_if_missing(&path).unwrap();

        let config = TermstoreConfig::from_file(&path).unwrap();
        assert_eq!(config.index_mode, IndexMode::Inline);
    }

    #[test]
    fn from_file_with_missing_field_uses_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);

        // Empty config file: every field takes its default
        std::fs::write(&path, "").unwrap();

        let config = TermstoreConfig::from_file(&path).unwrap();
        assert_eq!(config, TermstoreConfig::default());
    }

    #[test]
    fn write_to_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);

        let config = TermstoreConfig {
            index_mode: IndexMode::Inline,
            nid_query_mode: NidQueryMode::Exact,
            strict_result_resolution: true,
            max_queue_depth: 16,
            default_page_size: 25,
        };

        config.write_to_file(&path).unwrap();
        let loaded = TermstoreConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }
}
