//! Analysis configuration.
//!
//! Configuration is an explicit value passed into every entry point.
//! Nothing here is global, so concurrent analyses with different settings
//! cannot interfere with each other.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::types::ContractType;
use crate::AnalysisError;

/// Errors that can occur when loading configuration files.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] AnalysisError),
}

/// Core analysis configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisConfig {
    /// Contract type, selects the completeness checklist
    #[serde(default)]
    pub contract_type: ContractType,

    #[serde(default)]
    pub segmentation: SegmentationConfig,

    #[serde(default)]
    pub health: HealthConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            contract_type: ContractType::default(),
            segmentation: SegmentationConfig::default(),
            health: HealthConfig::default(),
        }
    }
}

impl AnalysisConfig {
    pub fn for_contract_type(contract_type: ContractType) -> Self {
        Self {
            contract_type,
            ..Self::default()
        }
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: AnalysisConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: AnalysisConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML or JSON file, chosen by extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        if path.extension().map(|e| e == "json").unwrap_or(false) {
            Self::from_json(&content)
        } else {
            Self::from_yaml(&content)
        }
    }

    /// Reject values no analysis can run with.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        self.segmentation.validate()?;
        self.health.validate()
    }
}

/// Clause segmentation limits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SegmentationConfig {
    /// Clauses longer than this many characters are split at sentence boundaries
    #[serde(default = "default_max_clause_len")]
    pub max_clause_len: usize,

    /// Fragments with fewer words are merged into a neighbouring clause
    #[serde(default = "default_min_clause_words")]
    pub min_clause_words: usize,
}

fn default_max_clause_len() -> usize {
    900
}

fn default_min_clause_words() -> usize {
    15
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            max_clause_len: 900,
            min_clause_words: 15,
        }
    }
}

impl SegmentationConfig {
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.max_clause_len == 0 {
            return Err(AnalysisError::InvalidConfig(
                "segmentation.max_clause_len must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Thresholds for contract-level health metrics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthConfig {
    /// Keyword Jaccard similarity at or above which two clauses are near-duplicates
    #[serde(default = "default_near_duplicate_threshold")]
    pub near_duplicate_threshold: f64,

    /// Clauses with fewer distinct keywords are never compared for duplication
    #[serde(default = "default_min_duplicate_keywords")]
    pub min_duplicate_keywords: usize,

    /// Maximum number of entries in `top_risks`
    #[serde(default = "default_top_risk_count")]
    pub top_risk_count: usize,
}

fn default_near_duplicate_threshold() -> f64 {
    0.8
}

fn default_min_duplicate_keywords() -> usize {
    5
}

fn default_top_risk_count() -> usize {
    3
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            near_duplicate_threshold: 0.8,
            min_duplicate_keywords: 5,
            top_risk_count: 3,
        }
    }
}

impl HealthConfig {
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if !(0.0..=1.0).contains(&self.near_duplicate_threshold) {
            return Err(AnalysisError::InvalidConfig(format!(
                "health.near_duplicate_threshold must be within 0..=1, got {}",
                self.near_duplicate_threshold
            )));
        }
        Ok(())
    }
}
