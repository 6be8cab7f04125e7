//! Stackforge - AI-Driven Project Generator
//!
//! Turns a free-text project description into a generated application
//! through a staged orchestration pipeline: intent classification,
//! architecture design, chunked code generation, and contextual docs.
//!
//! ## Core Features
//!
//! - **Staged Pipeline**: intent -> architecture -> code -> context, each
//!   stage validated before the next consumes it
//! - **Batch Planner**: large architectures are generated in bounded batches
//!   that keep pages co-located with the components they reference
//! - **Output Repair**: ordered repair chain recovers near-JSON model output
//!   with an audit trail of applied fixups
//! - **Typed Retry**: transient gateway failures back off and re-execute;
//!   validation failures fail fast
//! - **Usage Tracking**: per-run, per-stage token and cost accounting
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use stackforge::{AnthropicGateway, GenerateOptions, Pipeline, ProjectInput};
//!
//! let gateway = Arc::new(AnthropicGateway::from_env_or(None)?);
//! let pipeline = Pipeline::new(gateway);
//! let result = pipeline
//!     .generate_project(
//!         &ProjectInput::new("A recipe sharing site with search"),
//!         &GenerateOptions::default(),
//!     )
//!     .await?;
//! ```
//!
//! ## Modules
//!
//! - [`ai`]: model gateway, retry wrapper, output repair, prompt templates,
//!   usage tracking
//! - [`pipeline`]: stage orchestration, batch planning, schema validation,
//!   progress events
//! - [`config`]: layered configuration (defaults, TOML files, env vars)
//! - [`types`]: pipeline data model and the unified error type

pub mod ai;
pub mod cli;
pub mod config;
pub mod constants;
pub mod pipeline;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

// Configuration
pub use config::{Config, ConfigLoader, ModelTier};

// Error Types
pub use types::{ErrorCategory, ForgeError, Result, ValidationError};

// Pipeline Data Model
pub use types::{
    GeneratedCode, ProjectArchitecture, ProjectContext, ProjectInput, ProjectIntent, Stage,
};

// =============================================================================
// Pipeline Re-exports
// =============================================================================

pub use pipeline::{
    GenerateOptions, Pipeline, PipelineResult, ProgressEvent, ProgressKind, ProgressSink,
    RunStatus,
};

// =============================================================================
// AI Re-exports
// =============================================================================

pub use ai::{
    AnthropicGateway,
    CompletionRequest,
    CompletionResponse,
    ModelGateway,
    RetryPolicy,
    SharedGateway,
    TokenSummary,
    TokenTracker,
};
