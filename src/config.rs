//! Configuration System
//!
//! Layered configuration loaded with the `config` crate. Later layers win:
//!
//! 1. Built-in defaults
//! 2. `$XDG_CONFIG_HOME/factflow/config.toml` (or `~/.config/factflow/config.toml`)
//! 3. `<workspace>/config/config.toml`
//! 4. `<workspace>/config/{FACTFLOW_ENV}.toml` (default env: `development`)
//! 5. `FACTFLOW_*` environment variables, `__` between keys
//!    (e.g. `FACTFLOW_FLOW__TERMINAL_ROUTE=/done`)

use crate::error::ApiError;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod merge;
mod sources;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FactflowConfig {
    /// Where the flow and fact dictionary are declared
    #[serde(default)]
    pub flow: FlowSourceConfig,

    /// System-wide settings
    #[serde(default)]
    pub system: SystemConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowSourceConfig {
    /// Flow declaration (JSON), relative to the workspace root
    #[serde(default = "default_flow_path")]
    pub flow_path: PathBuf,

    /// Fact dictionary (JSON), relative to the workspace root
    #[serde(default = "default_dictionary_path")]
    pub dictionary_path: PathBuf,

    /// Overrides the flow's declared terminal route
    #[serde(default)]
    pub terminal_route: Option<String>,
}

fn default_flow_path() -> PathBuf {
    PathBuf::from("flow.json")
}

fn default_dictionary_path() -> PathBuf {
    PathBuf::from("facts.json")
}

impl Default for FlowSourceConfig {
    fn default() -> Self {
        Self {
            flow_path: default_flow_path(),
            dictionary_path: default_dictionary_path(),
            terminal_route: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemConfig {
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Return store directory; the platform data directory when unset
    #[serde(default)]
    pub store_path: Option<PathBuf>,
}

impl StorageConfig {
    /// Store directory for a workspace
    ///
    /// A relative configured path is taken from the workspace root. Without
    /// one, the platform data directory is used, falling back to
    /// `<workspace>/.factflow/returns`.
    pub fn resolve_store_path(&self, workspace_root: &Path) -> PathBuf {
        match &self.store_path {
            Some(path) => resolve_in(workspace_root, path),
            None => directories::ProjectDirs::from("", "", "factflow")
                .map(|dirs| dirs.data_dir().join("returns"))
                .unwrap_or_else(|| workspace_root.join(".factflow").join("returns")),
        }
    }
}

fn resolve_in(workspace_root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        workspace_root.join(path)
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Flow(String),
    Storage(String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Flow(msg) => write!(f, "Flow: {}", msg),
            ValidationError::Storage(msg) => write!(f, "Storage: {}", msg),
            ValidationError::Logging(msg) => write!(f, "Logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl FactflowConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.flow.flow_path.as_os_str().is_empty() {
            errors.push(ValidationError::Flow("flow_path cannot be empty".to_string()));
        }
        if self.flow.dictionary_path.as_os_str().is_empty() {
            errors.push(ValidationError::Flow(
                "dictionary_path cannot be empty".to_string(),
            ));
        }
        if let Some(route) = &self.flow.terminal_route {
            if !route.starts_with('/') {
                errors.push(ValidationError::Flow(format!(
                    "terminal_route must start with '/': {}",
                    route
                )));
            }
        }
        if let Some(path) = &self.system.storage.store_path {
            if path.as_os_str().is_empty() {
                errors.push(ValidationError::Storage(
                    "store_path cannot be empty".to_string(),
                ));
            }
        }
        const LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];
        if !LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError::Logging(format!(
                "unknown level '{}'",
                self.logging.level
            )));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate, folding every finding into one error
    pub fn validated(self) -> Result<Self, ApiError> {
        self.validate().map_err(|errors| {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            ApiError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                messages.join("\n")
            ))
        })?;
        Ok(self)
    }

    pub fn flow_path(&self, workspace_root: &Path) -> PathBuf {
        resolve_in(workspace_root, &self.flow.flow_path)
    }

    pub fn dictionary_path(&self, workspace_root: &Path) -> PathBuf {
        resolve_in(workspace_root, &self.flow.dictionary_path)
    }
}

/// Loads [`FactflowConfig`] from its layered sources
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for a workspace
    pub fn load(workspace_root: &Path) -> Result<FactflowConfig, ApiError> {
        let builder = merge::merge_policy::builder_with_defaults()?;
        let builder = sources::global_file::add_to_builder(builder)?;
        let builder = sources::workspace_file::add_to_builder(builder, workspace_root)?;
        let builder = sources::environment::add_to_builder(builder);
        let config: FactflowConfig = builder.build()?.try_deserialize()?;
        config.validated()
    }

    /// Load a single file on top of the defaults
    pub fn load_from_file(path: &Path) -> Result<FactflowConfig, ApiError> {
        let config: FactflowConfig = merge::merge_policy::builder_with_defaults()?
            .add_source(config::File::from(path))
            .build()?
            .try_deserialize()?;
        config.validated()
    }

    /// Path of the user-level config file
    pub fn xdg_config_path() -> Option<PathBuf> {
        sources::global_file::global_config_path()
    }
}
