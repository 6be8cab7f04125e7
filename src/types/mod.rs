pub mod architecture;
pub mod code;
pub mod error;
pub mod intent;

pub use architecture::{
    ComponentSpec, GenerationBatch, IntegrationMap, PageSpec, ProjectArchitecture, RouteKind,
    RouteSpec,
};
pub use code::{FileDefinition, GeneratedCode, IntegrationCode, PreviousFileRef, ProjectContext};
pub use error::{
    ErrorCategory, ErrorClassifier, ForgeError, LlmError, Result, ValidationError,
};
pub use intent::{ComplexityTier, ProjectInput, ProjectIntent};

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Pipeline Stages
// =============================================================================

/// The four pipeline stages, in execution order.
///
/// Data flows strictly forward: each stage consumes only the validated output
/// of the previous stage(s) plus the original user input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Intent,
    Architecture,
    Code,
    Context,
}

impl Stage {
    /// All stages in execution order
    pub const ALL: [Stage; 4] = [Stage::Intent, Stage::Architecture, Stage::Code, Stage::Context];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Intent => "intent",
            Stage::Architecture => "architecture",
            Stage::Code => "code",
            Stage::Context => "context",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
