//! Application configuration for the enrichment pipeline.
//!
//! User config lives at `~/.matrikkel/matrikkel.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{MatrikkelError, Result};
use crate::types::DataSource;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "matrikkel.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".matrikkel";

// ---------------------------------------------------------------------------
// Config structs (matching matrikkel.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Source and cache locations.
    #[serde(default)]
    pub paths: PathsConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Which source tree to read when none is given: "raw" or "imputed".
    #[serde(default = "default_data_source")]
    pub data_source: String,

    /// Maximum number of municipality builds running at once.
    #[serde(default = "default_build_concurrency")]
    pub build_concurrency: u32,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            data_source: default_data_source(),
            build_concurrency: default_build_concurrency(),
        }
    }
}

fn default_data_source() -> String {
    "raw".into()
}
fn default_build_concurrency() -> u32 {
    4
}

/// `[paths]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory holding `{KNR}_{Kommune}_Properties.xlsx` files.
    #[serde(default = "default_raw_dir")]
    pub raw_dir: String,

    /// Directory holding `{KNR}_{Kommune}_Properties_Imputed.xlsx` files.
    #[serde(default = "default_imputed_dir")]
    pub imputed_dir: String,

    /// Cache root for results built from raw sources.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: String,

    /// Cache root for results built from imputed sources.
    #[serde(default = "default_imputed_cache_dir")]
    pub imputed_cache_dir: String,

    /// Optional override for the simplified-category mapping file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification_file: Option<String>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            raw_dir: default_raw_dir(),
            imputed_dir: default_imputed_dir(),
            cache_dir: default_cache_dir(),
            imputed_cache_dir: default_imputed_cache_dir(),
            classification_file: None,
        }
    }
}

fn default_raw_dir() -> String {
    "data/raw/norway/kartverket_data".into()
}
fn default_imputed_dir() -> String {
    "data/imputed/norway/kartverket_data".into()
}
fn default_cache_dir() -> String {
    "data/cache/kartverket".into()
}
fn default_imputed_cache_dir() -> String {
    "data/cache/kartverket_imputed".into()
}

impl AppConfig {
    /// Parse `defaults.data_source` into a [`DataSource`].
    pub fn default_source(&self) -> Result<DataSource> {
        self.defaults.data_source.parse()
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.matrikkel/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| MatrikkelError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.matrikkel/matrikkel.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| MatrikkelError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        MatrikkelError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    // Reject typos in data_source early rather than at build time.
    config.default_source()?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| MatrikkelError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| MatrikkelError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| MatrikkelError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("raw_dir"));
        assert!(toml_str.contains("kartverket_imputed"));
        assert!(!toml_str.contains("classification_file"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.defaults.build_concurrency, 4);
        assert_eq!(parsed.default_source().unwrap(), DataSource::Raw);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[defaults]
data_source = "imputed"

[paths]
raw_dir = "/srv/kartverket"
classification_file = "/srv/mapping.json"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.default_source().unwrap(), DataSource::Imputed);
        assert_eq!(config.paths.raw_dir, "/srv/kartverket");
        assert_eq!(config.paths.cache_dir, "data/cache/kartverket");
        assert_eq!(
            config.paths.classification_file.as_deref(),
            Some("/srv/mapping.json")
        );
    }

    #[test]
    fn bad_data_source_is_rejected() {
        let tmp = std::env::temp_dir().join(format!(
            "matrikkel_cfg_{}.toml",
            std::process::id()
        ));
        std::fs::write(&tmp, "[defaults]\ndata_source = \"cleaned\"\n").unwrap();
        let err = load_config_from(&tmp).unwrap_err();
        assert!(err.to_string().contains("cleaned"));
        let _ = std::fs::remove_file(&tmp);
    }
}
