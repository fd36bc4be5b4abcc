//! Document store configuration management.

use crate::chunker;
use crate::embeddings::EmbeddingConfig;
use semdoc_core::config::STATE_DIR;
use semdoc_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Per-store settings, kept in `.semdoc/stores/<name>/config.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreConfig {
    /// Store name (derived from the directory, not trusted from the file)
    #[serde(default)]
    pub name: String,

    /// Fragment window in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Characters shared between consecutive fragments
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Results returned when a caller does not ask for a count
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,

    #[serde(default)]
    pub embedding: EmbeddingConfig,
}

fn default_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    200
}

fn default_top_k() -> usize {
    5
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            name: semdoc_core::config::DEFAULT_STORE.to_string(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            default_top_k: default_top_k(),
            embedding: EmbeddingConfig::default(),
        }
    }
}

impl StoreConfig {
    pub fn validate(&self) -> AppResult<()> {
        chunker::validate_window(self.chunk_size, self.chunk_overlap)
            .map_err(|e| AppError::Config(format!("store '{}': {}", self.name, e)))?;

        if self.default_top_k == 0 {
            return Err(AppError::Config(
                "default_top_k must be greater than zero".to_string(),
            ));
        }

        self.embedding.validate()
    }
}

/// Load store configuration.
///
/// Reads `.semdoc/stores/<store>/config.yaml` if it exists, otherwise returns
/// the defaults under the given name.
pub fn load_config(workspace: &Path, store_name: &str) -> AppResult<StoreConfig> {
    let config_path = get_config_path(workspace, store_name);

    let config = if config_path.exists() {
        let content = fs::read_to_string(&config_path).map_err(|e| {
            AppError::Config(format!("Failed to read config at {:?}: {}", config_path, e))
        })?;

        let mut config: StoreConfig = serde_yaml::from_str(&content).map_err(|e| {
            AppError::Config(format!("Failed to parse config at {:?}: {}", config_path, e))
        })?;

        config.name = store_name.to_string();
        tracing::debug!("Loaded store config for '{}'", store_name);
        config
    } else {
        tracing::debug!(
            "Using default store config for '{}' (no config file found)",
            store_name
        );
        StoreConfig {
            name: store_name.to_string(),
            ..Default::default()
        }
    };

    config.validate()?;
    Ok(config)
}

/// Save store configuration.
pub fn save_config(workspace: &Path, config: &StoreConfig) -> AppResult<()> {
    config.validate()?;

    let config_path = get_config_path(workspace, &config.name);

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| AppError::Config(format!("Failed to create config directory: {}", e)))?;
    }

    let yaml = serde_yaml::to_string(config)?;

    fs::write(&config_path, yaml).map_err(|e| {
        AppError::Config(format!("Failed to write config to {:?}: {}", config_path, e))
    })?;

    tracing::debug!("Saved store config for '{}'", config.name);
    Ok(())
}

/// Get the directory holding everything for one store.
pub fn get_store_dir(workspace: &Path, store_name: &str) -> PathBuf {
    workspace.join(STATE_DIR).join("stores").join(store_name)
}

/// Get the path to a store's config file.
pub fn get_config_path(workspace: &Path, store_name: &str) -> PathBuf {
    get_store_dir(workspace, store_name).join("config.yaml")
}

/// Get the index location of a store.
pub fn get_index_location(workspace: &Path, store_name: &str) -> PathBuf {
    get_store_dir(workspace, store_name).join("index")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_default_config() {
        let temp = TempDir::new().unwrap();
        let config = load_config(temp.path(), "manual").unwrap();

        assert_eq!(config.name, "manual");
        assert_eq!(config.chunk_size, 1000);
        assert_eq!(config.chunk_overlap, 200);
        assert_eq!(config.embedding.provider, "hashing");
    }

    #[test]
    fn test_save_and_load_config() {
        let temp = TempDir::new().unwrap();
        let config = StoreConfig {
            name: "handbook".to_string(),
            chunk_size: 500,
            chunk_overlap: 50,
            ..Default::default()
        };

        save_config(temp.path(), &config).unwrap();

        let loaded = load_config(temp.path(), "handbook").unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let path = get_config_path(temp.path(), "partial");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "chunk_size: 300\nchunk_overlap: 30\n").unwrap();

        let config = load_config(temp.path(), "partial").unwrap();
        assert_eq!(config.chunk_size, 300);
        assert_eq!(config.default_top_k, 5);
        assert_eq!(config.embedding, EmbeddingConfig::default());
    }

    #[test]
    fn test_invalid_overlap_rejected() {
        let temp = TempDir::new().unwrap();
        let path = get_config_path(temp.path(), "broken");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "chunk_size: 100\nchunk_overlap: 100\n").unwrap();

        let result = load_config(temp.path(), "broken");
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_paths() {
        let workspace = Path::new("/work");
        assert_eq!(
            get_index_location(workspace, "default"),
            PathBuf::from("/work/.semdoc/stores/default/index")
        );
        assert_eq!(
            get_config_path(workspace, "default"),
            PathBuf::from("/work/.semdoc/stores/default/config.yaml")
        );
    }
}
