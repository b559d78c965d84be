// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Configuration management for Taxis

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// One gibibyte in bytes
pub const GIB: u64 = 1024 * 1024 * 1024;

/// Default per-owner capacity (100 GiB)
pub const DEFAULT_LIMIT_BYTES: u64 = 100 * GIB;

/// Main application configuration
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    /// Storage organizer settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Feedback tracker settings
    #[serde(default)]
    pub feedback: FeedbackConfig,

    /// Classifier tuning
    #[serde(default)]
    pub classifier: ClassifierConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StorageConfig {
    /// Root directory; each owner gets a subdirectory
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,
    /// Hard per-owner capacity
    #[serde(default = "default_limit_bytes")]
    pub limit_bytes: u64,
}

/// Which persistence strategy backs the feedback log
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackBackend {
    #[default]
    Jsonl,
    Sqlite,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FeedbackConfig {
    #[serde(default)]
    pub backend: FeedbackBackend,
    /// Log location; unset means a backend-specific default in the working directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// How many recent corrections `stats` reports
    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,
    #[serde(default = "default_suggestion_limit")]
    pub suggestion_limit: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ClassifierConfig {
    /// Floor applied to keyword-derived confidence
    #[serde(default = "default_min_confidence")]
    pub min_confidence: u8,
    /// Confidence reported when only the extension decided the label
    #[serde(default = "default_extension_confidence")]
    pub extension_confidence: u8,
    /// Extracted text beyond this many characters is ignored
    #[serde(default = "default_max_extract_chars")]
    pub max_extract_chars: usize,
    /// Extra keywords keyed by "Category/Subcategory"
    #[serde(default)]
    pub extra_keywords: BTreeMap<String, Vec<String>>,
}

// Default value functions
fn default_storage_root() -> PathBuf { PathBuf::from("./storage") }
fn default_limit_bytes() -> u64 { DEFAULT_LIMIT_BYTES }
fn default_recent_limit() -> usize { 20 }
fn default_suggestion_limit() -> usize { 5 }
fn default_min_confidence() -> u8 { 30 }
fn default_extension_confidence() -> u8 { 50 }
fn default_max_extract_chars() -> usize { 200_000 }

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
            limit_bytes: default_limit_bytes(),
        }
    }
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            backend: FeedbackBackend::default(),
            path: None,
            recent_limit: default_recent_limit(),
            suggestion_limit: default_suggestion_limit(),
        }
    }
}

impl FeedbackBackend {
    /// Log file used when no explicit path is configured
    pub fn default_path(self) -> PathBuf {
        match self {
            FeedbackBackend::Jsonl => PathBuf::from("taxis_feedback.jsonl"),
            FeedbackBackend::Sqlite => PathBuf::from("taxis_feedback.db"),
        }
    }
}

impl FeedbackConfig {
    /// Configured log path, or the backend's default
    pub fn log_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(|| self.backend.default_path())
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            min_confidence: default_min_confidence(),
            extension_confidence: default_extension_confidence(),
            max_extract_chars: default_max_extract_chars(),
            extra_keywords: BTreeMap::new(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> crate::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = serde_json::from_str(&content)
                .map_err(|e| crate::TaxisError::Config(format!("Failed to parse config: {}", e)))?;
            config.validate()?;
            Ok(config)
        } else {
            tracing::info!("Config file not found at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject settings no service can run with
    pub fn validate(&self) -> crate::Result<()> {
        if self.storage.limit_bytes == 0 {
            return Err(crate::TaxisError::Config("storage.limit_bytes must be positive".to_string()));
        }
        if self.classifier.min_confidence > 100 || self.classifier.extension_confidence > 100 {
            return Err(crate::TaxisError::Config(
                "classifier confidences must be within 0..=100".to_string(),
            ));
        }
        for label in self.classifier.extra_keywords.keys() {
            if label.split('/').count() != 2 {
                return Err(crate::TaxisError::Config(format!(
                    "extra_keywords label '{}' must look like Category/Subcategory",
                    label
                )));
            }
        }
        Ok(())
    }
}
