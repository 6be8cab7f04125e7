//! Caller input and intent classification types
//!
//! `ProjectInput` is supplied once by the caller and is immutable for the
//! whole run. `ProjectIntent` is the validated output of the intent stage,
//! read-only thereafter.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::{ForgeError, Result};

/// Free-text project description supplied by the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectInput {
    /// What the user wants built
    pub description: String,
    /// Optional explicit project name; derived from the intent when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
}

impl ProjectInput {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            project_name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.project_name = Some(name.into());
        self
    }

    /// Fail fast on unusable input, before any model call
    pub fn validate(&self) -> Result<()> {
        if self.description.trim().is_empty() {
            return Err(ForgeError::Input(
                "project description must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Complexity tier assigned during intent analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ComplexityTier {
    Simple,
    #[default]
    Moderate,
    Complex,
}

/// Structured classification of the user's request
///
/// Produced once by the intent stage; every later stage treats it as
/// read-only context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectIntent {
    /// Project category (e.g. "saas", "ecommerce", "portfolio")
    pub category: String,
    /// Suggested base template id for the architecture stage
    pub suggested_template: String,
    /// Classification confidence in 0.0..=1.0
    pub confidence: f32,
    /// Complexity tier, drives model/tier hints downstream
    #[serde(default)]
    pub complexity: ComplexityTier,
    /// Feature list extracted from the description
    #[serde(default)]
    pub features: Vec<String>,
    /// Key domain entities mentioned or implied
    #[serde(default)]
    pub key_entities: Vec<String>,
    /// Integration type -> provider, `None` when the type is needed but no
    /// provider was identified
    #[serde(default)]
    pub integrations: BTreeMap<String, Option<String>>,
}
