//! Architecture types
//!
//! The validated output of the architecture stage and the batch subsets the
//! planner carves out of it. Pages reference components by name; a referenced
//! name that is missing from `components` is treated as already available
//! from the base template.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Integration type -> provider id chosen for this project
pub type IntegrationMap = BTreeMap<String, String>;

/// Component template tag that marks a component as needing code generation.
/// Any other value names an existing template component to reuse as-is.
pub const CREATE_NEW: &str = "create-new";

/// A page of the generated application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSpec {
    pub name: String,
    /// Route path the page is mounted at (e.g. "/dashboard")
    pub path: String,
    #[serde(default)]
    pub description: String,
    /// Component names this page uses, by reference
    #[serde(default)]
    pub components: Vec<String>,
}

/// A UI component, either reused from the template or generated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// `"create-new"` for generated components, otherwise the id of an
    /// existing template component
    pub template: String,
}

impl ComponentSpec {
    /// Only create-new components require code generation
    pub fn requires_generation(&self) -> bool {
        self.template == CREATE_NEW
    }
}

/// Route kind; only API routes count toward generation work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RouteKind {
    #[default]
    Api,
    Page,
}

/// A server route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSpec {
    pub path: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub kind: RouteKind,
}

fn default_method() -> String {
    "GET".to_string()
}

impl RouteSpec {
    pub fn is_api(&self) -> bool {
        self.kind == RouteKind::Api
    }
}

/// Validated output of the architecture stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectArchitecture {
    /// Base template id the project is built from
    pub template: String,
    pub pages: Vec<PageSpec>,
    #[serde(default)]
    pub components: Vec<ComponentSpec>,
    #[serde(default)]
    pub routes: Vec<RouteSpec>,
    #[serde(default)]
    pub integrations: IntegrationMap,
}

// =============================================================================
// Generation Batch
// =============================================================================

/// A bounded unit of generation work: a strict subset of one architecture's
/// collections, sent to the model in a single call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationBatch {
    /// Human-readable composition summary for logging/streaming
    pub description: String,
    pub pages: Vec<PageSpec>,
    pub components: Vec<ComponentSpec>,
    pub routes: Vec<RouteSpec>,
}

impl GenerationBatch {
    pub fn new() -> Self {
        Self {
            description: String::new(),
            pages: Vec::new(),
            components: Vec::new(),
            routes: Vec::new(),
        }
    }

    /// Total items in the batch; never exceeds the planner's cap
    pub fn item_count(&self) -> usize {
        self.pages.len() + self.components.len() + self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.item_count() == 0
    }

    /// Label the batch with its composition counts
    pub fn describe(&mut self) {
        self.description = format!(
            "{} page(s), {} component(s), {} route(s)",
            self.pages.len(),
            self.components.len(),
            self.routes.len()
        );
    }
}

impl Default for GenerationBatch {
    fn default() -> Self {
        Self::new()
    }
}
