//! Configuration management for semdoc.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - Config files (.semdoc/config.yaml)
//! - Environment variables
//! - Command-line flags
//!
//! The configuration is workspace-centric, with all state stored in `.semdoc/`.
//! Per-store settings (chunking, embedding provider) live next to each store and
//! are handled by the store crate.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};
use crate::logging::LogFormat;

/// Name of the workspace state directory.
pub const STATE_DIR: &str = ".semdoc";

/// Store used when none is selected.
pub const DEFAULT_STORE: &str = "default";

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .semdoc/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Name of the active document store
    pub store: String,

    /// Log level override
    pub log_level: Option<String>,

    /// Log output format
    pub log_format: LogFormat,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    workspace: Option<WorkspaceSection>,
    logging: Option<LoggingSection>,
    store: Option<StoreSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceSection {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingSection {
    level: Option<String>,
    format: Option<LogFormat>,
    color: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoreSection {
    name: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            store: DEFAULT_STORE.to_string(),
            log_level: None,
            log_format: LogFormat::Text,
            verbose: false,
            no_color: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the YAML config file and environment variables.
    ///
    /// Environment variables:
    /// - `SEMDOC_WORKSPACE`: Override workspace path
    /// - `SEMDOC_CONFIG`: Path to config file
    /// - `SEMDOC_STORE`: Active store name
    /// - `SEMDOC_LOG_FORMAT`: `text` or `json`
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use semdoc_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Workspace: {:?}", config.workspace);
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_with(CliOverrides::default())
    }

    /// Load configuration with command-line overrides on top.
    ///
    /// `--workspace` and `--config` are resolved before the config file is
    /// chosen, so they decide which file gets merged.
    pub fn load_with(overrides: CliOverrides) -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(workspace) = std::env::var("SEMDOC_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }

        if let Ok(config_file) = std::env::var("SEMDOC_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }

        if let Some(workspace) = &overrides.workspace {
            config.workspace = workspace.clone();
        }

        if let Some(config_file) = &overrides.config_file {
            config.config_file = Some(config_file.clone());
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.state_dir().join("config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override YAML config
        if let Ok(store) = std::env::var("SEMDOC_STORE") {
            config.store = store;
        }

        if let Ok(format) = std::env::var("SEMDOC_LOG_FORMAT") {
            config.log_format = format.parse()?;
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config.with_overrides(overrides))
    }

    /// Merge a YAML configuration file into a copy of this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(path) = config_file.workspace.and_then(|ws| ws.path) {
            result.workspace = PathBuf::from(path);
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(format) = logging.format {
                result.log_format = format;
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        if let Some(name) = config_file.store.and_then(|s| s.name) {
            result.store = name;
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Command-line flags take precedence over environment variables and the
    /// config file.
    pub fn with_overrides(mut self, overrides: CliOverrides) -> Self {
        if let Some(workspace) = overrides.workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = overrides.config_file {
            self.config_file = Some(config_file);
        }

        if let Some(store) = overrides.store {
            self.store = store;
        }

        if let Some(log_level) = overrides.log_level {
            self.log_level = Some(log_level);
        }

        if let Some(log_format) = overrides.log_format {
            self.log_format = log_format;
        }

        if overrides.verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if overrides.no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .semdoc directory.
    pub fn state_dir(&self) -> PathBuf {
        self.workspace.join(STATE_DIR)
    }

    /// Ensure the .semdoc directory exists.
    pub fn ensure_state_dir(&self) -> AppResult<()> {
        let state_dir = self.state_dir();
        if !state_dir.exists() {
            std::fs::create_dir_all(&state_dir).map_err(|e| {
                AppError::Config(format!("Failed to create {} directory: {}", STATE_DIR, e))
            })?;
        }
        Ok(())
    }

    /// Validate the configuration.
    pub fn validate(&self) -> AppResult<()> {
        let name = self.store.as_str();
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

        if !valid {
            return Err(AppError::Config(format!(
                "Invalid store name: '{}'. Use letters, digits, '-' or '_'",
                name
            )));
        }

        Ok(())
    }
}

/// Command-line overrides collected by the CLI.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub workspace: Option<PathBuf>,
    pub config_file: Option<PathBuf>,
    pub store: Option<String>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub verbose: bool,
    pub no_color: bool,
}
