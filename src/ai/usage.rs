//! Token Usage Tracking
//!
//! Per-run tracker of input/output tokens and estimated cost, keyed by
//! pipeline stage. Created at the start of `generate_project` and passed by
//! reference through all stage calls — never shared across concurrent runs.
//! Append-only during the run; `summary()` is read once at the end.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::RwLock;
use std::time::Instant;
use uuid::Uuid;

use crate::ai::gateway::GatewayUsage;
use crate::constants::pricing;
use crate::types::Stage;

// =============================================================================
// Cost Estimation
// =============================================================================

/// Estimate USD cost for one call from the per-model pricing table
pub fn estimate_cost(model: &str, usage: &GatewayUsage) -> f64 {
    let (input_rate, output_rate) = pricing::TABLE
        .iter()
        .find(|(prefix, _, _)| model.starts_with(prefix))
        .map(|(_, input, output)| (*input, *output))
        .unwrap_or((pricing::DEFAULT_INPUT, pricing::DEFAULT_OUTPUT));

    (usage.input_tokens as f64 * input_rate + usage.output_tokens as f64 * output_rate)
        / 1_000_000.0
}

// =============================================================================
// Token Tracker
// =============================================================================

/// Per-stage usage counters
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StageUsage {
    pub calls: u32,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub estimated_cost_usd: f64,
}

/// Per-run token tracker
///
/// Interior mutability keeps the pipeline signature clean; stages execute
/// sequentially so contention never occurs in practice.
pub struct TokenTracker {
    run_id: Uuid,
    started_at: DateTime<Utc>,
    started: Instant,
    stages: RwLock<BTreeMap<&'static str, StageUsage>>,
}

impl TokenTracker {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            started: Instant::now(),
            stages: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Record one gateway call's usage against a stage
    pub fn record(&self, stage: Stage, model: &str, usage: &GatewayUsage) {
        let cost = estimate_cost(model, usage);
        let mut stages = self.stages.write().expect("tracker lock poisoned");
        let entry = stages.entry(stage.as_str()).or_default();
        entry.calls += 1;
        entry.input_tokens += usage.input_tokens as u64;
        entry.output_tokens += usage.output_tokens as u64;
        entry.estimated_cost_usd += cost;
    }

    /// Snapshot for end-of-run reporting
    pub fn summary(&self) -> TokenSummary {
        let stages = self.stages.read().expect("tracker lock poisoned");
        let mut total = StageUsage::default();
        for usage in stages.values() {
            total.calls += usage.calls;
            total.input_tokens += usage.input_tokens;
            total.output_tokens += usage.output_tokens;
            total.estimated_cost_usd += usage.estimated_cost_usd;
        }

        TokenSummary {
            run_id: self.run_id,
            started_at: self.started_at,
            elapsed_ms: self.started.elapsed().as_millis() as u64,
            stages: stages
                .iter()
                .map(|(name, usage)| ((*name).to_string(), *usage))
                .collect(),
            total,
        }
    }
}

impl Default for TokenTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// End-of-run usage report
#[derive(Debug, Clone, Serialize)]
pub struct TokenSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    /// Stage name -> accumulated usage
    pub stages: BTreeMap<String, StageUsage>,
    pub total: StageUsage,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cost_estimation_by_prefix() {
        let usage = GatewayUsage {
            input_tokens: 1_000_000,
            output_tokens: 0,
        };
        let cost = estimate_cost("claude-3-5-haiku-latest", &usage);
        assert!((cost - 0.80).abs() < 1e-9);
    }

    #[test]
    fn test_cost_estimation_unknown_model() {
        let usage = GatewayUsage {
            input_tokens: 0,
            output_tokens: 1_000_000,
        };
        let cost = estimate_cost("some-future-model", &usage);
        assert!((cost - pricing::DEFAULT_OUTPUT).abs() < 1e-9);
    }

    #[test]
    fn test_accumulates_per_stage() {
        let tracker = TokenTracker::new();
        let usage = GatewayUsage {
            input_tokens: 100,
            output_tokens: 50,
        };
        tracker.record(Stage::Code, "claude-sonnet-4-20250514", &usage);
        tracker.record(Stage::Code, "claude-sonnet-4-20250514", &usage);
        tracker.record(Stage::Intent, "claude-3-5-haiku-latest", &usage);

        let summary = tracker.summary();
        assert_eq!(summary.stages["code"].calls, 2);
        assert_eq!(summary.stages["code"].input_tokens, 200);
        assert_eq!(summary.stages["intent"].output_tokens, 50);
        assert_eq!(summary.total.calls, 3);
        assert_eq!(summary.total.input_tokens, 300);
    }

    #[test]
    fn test_fresh_tracker_is_empty() {
        let summary = TokenTracker::new().summary();
        assert!(summary.stages.is_empty());
        assert_eq!(summary.total.calls, 0);
    }
}
