//! Configuration for the core crate
//!
//! This module provides configuration options for the core crate,
//! including the model names the dataset persister looks up, the
//! annotation source used by reflection, and editor messages.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Names of the model classes and conventions the engine relies on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Namespace holding the query parameter classes
    pub dataset_namespace: String,

    /// Class name of persisted dataset components
    pub component_class: String,

    /// Class name of user objects
    pub user_class: String,

    /// Annotation source scanned for UI hints
    pub annotation_source: String,

    /// Reference type that admits any object as a candidate
    pub wildcard_type: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig {
            dataset_namespace: "dataset".to_string(),
            component_class: "DatasetComponent".to_string(),
            user_class: "User".to_string(),
            annotation_source: "ru.neoflex.nfcore".to_string(),
            wildcard_type: "EObject".to_string(),
        }
    }
}

/// Query parameter editor configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorConfig {
    /// Message shown when rows fail validation
    pub correction_message: String,

    /// Whether fully blank rows pass validation as drafts
    pub allow_blank_drafts: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        EditorConfig {
            correction_message: "Please, correct the mistakes".to_string(),
            allow_blank_drafts: true,
        }
    }
}

/// Core configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Model naming configuration
    pub model: ModelConfig,

    /// Editor configuration
    pub editor: EditorConfig,

    /// Log level
    pub log_level: String,

    /// Whether to enable debug mode
    pub debug_mode: bool,
}

impl Default for CoreConfig {
    fn default() -> Self {
        CoreConfig {
            model: ModelConfig::default(),
            editor: EditorConfig::default(),
            log_level: "info".to_string(),
            debug_mode: false,
        }
    }
}

impl CoreConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a JSON file
    pub fn from_file(path: &str) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(CoreError::Io)?;

        let config = serde_json::from_reader(file).map_err(CoreError::Json)?;

        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn to_file(&self, path: &str) -> Result<()> {
        let file = std::fs::File::create(path).map_err(CoreError::Io)?;

        serde_json::to_writer_pretty(file, self).map_err(CoreError::Json)?;

        Ok(())
    }

    /// Create a development configuration
    pub fn development() -> Self {
        let mut config = Self::default();
        config.debug_mode = true;
        config.log_level = "debug".to_string();
        config
    }

    /// Create a production configuration
    pub fn production() -> Self {
        let mut config = Self::default();
        config.debug_mode = false;
        config.log_level = "info".to_string();
        config
    }

    /// Create a testing configuration
    pub fn testing() -> Self {
        let mut config = Self::default();
        config.debug_mode = true;
        config.log_level = "debug".to_string();
        config
    }
}
