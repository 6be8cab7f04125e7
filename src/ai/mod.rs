//! AI Integration Layer
//!
//! Gateway boundary, retry discipline, output repair, prompt templates, and
//! token accounting for the generation pipeline.

pub mod gateway;
pub mod prompt;
pub mod repair;
pub mod retry;
pub mod usage;

pub use gateway::{
    AnthropicGateway, ChunkCallback, CompletionRequest, CompletionResponse, GatewayUsage,
    Message, ModelGateway, Role, SharedGateway,
};
pub use prompt::{STRUCTURED_SYSTEM_PROMPT, StaticTemplates, TemplateStore};
pub use repair::{RepairFailure, RepairStep, Repaired, repair_and_parse};
pub use retry::{RetryPolicy, with_retry_policy};
pub use usage::{StageUsage, TokenSummary, TokenTracker, estimate_cost};
