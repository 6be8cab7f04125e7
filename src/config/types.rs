//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Supports global (~/.config/stackforge/) and project (.stackforge/) level
//! configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::constants::models;
use crate::types::Stage;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// Model provider settings
    pub llm: LlmConfig,

    /// Generation settings
    pub generation: GenerationConfig,

    /// Output settings
    pub output: OutputConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            llm: LlmConfig::default(),
            generation: GenerationConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `ForgeError::Config` on validation failure.
    pub fn validate(&self) -> crate::types::Result<()> {
        if self.llm.timeout_secs == 0 {
            return Err(crate::types::ForgeError::Config(
                "llm timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.generation.max_attempts == 0 {
            return Err(crate::types::ForgeError::Config(
                "generation max_attempts must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

// =============================================================================
// Model Tier
// =============================================================================

/// Speed/quality tradeoff controlling which model each stage gets.
///
/// Classification-like stages (intent, context) tolerate cheaper models;
/// architecture and code generation benefit from stronger ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModelTier {
    /// Cheapest model everywhere, for previews
    Fast,
    /// Cheap classification, stronger generation (default)
    #[default]
    Balanced,
    /// Strongest models for architecture and code
    Quality,
}

impl ModelTier {
    /// Default model for a stage under this tier
    pub fn model_for(&self, stage: Stage) -> &'static str {
        let map = match self {
            ModelTier::Fast => &models::FAST,
            ModelTier::Balanced => &models::BALANCED,
            ModelTier::Quality => &models::QUALITY,
        };
        let index = match stage {
            Stage::Intent => 0,
            Stage::Architecture => 1,
            Stage::Code => 2,
            Stage::Context => 3,
        };
        map[index]
    }
}

impl std::fmt::Display for ModelTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelTier::Fast => write!(f, "fast"),
            ModelTier::Balanced => write!(f, "balanced"),
            ModelTier::Quality => write!(f, "quality"),
        }
    }
}

impl std::str::FromStr for ModelTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fast" => Ok(ModelTier::Fast),
            "balanced" => Ok(ModelTier::Balanced),
            "quality" => Ok(ModelTier::Quality),
            _ => Err(format!(
                "Unknown model tier: {}. Valid values: fast, balanced, quality",
                s
            )),
        }
    }
}

// =============================================================================
// LLM Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name
    pub provider: String,

    /// API key; falls back to ANTHROPIC_API_KEY when unset
    pub api_key: Option<String>,

    /// Override for the API base URL
    pub api_base: Option<String>,

    /// Per-stage model map selection
    pub tier: ModelTier,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "anthropic".to_string(),
            api_key: None,
            api_base: None,
            tier: ModelTier::Balanced,
            timeout_secs: 300,
        }
    }
}

// =============================================================================
// Generation Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Maximum attempts per model call (first try included)
    pub max_attempts: usize,

    /// Stream incremental output to the terminal
    pub stream: bool,

    /// Log the per-stage token-usage summary after each run
    pub log_token_usage: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_attempts: crate::constants::retry::MAX_ATTEMPTS,
            stream: false,
            log_token_usage: false,
        }
    }
}

// =============================================================================
// Output Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory generated projects are written into
    pub output_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("generated"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
