//! Stage Orchestrator
//!
//! Sequences the four pipeline stages (intent -> architecture -> code ->
//! context), selects a model per stage, threads the streaming callback and
//! the per-run token tracker, and decides between single-shot and chunked
//! code generation.
//!
//! Stages and batches execute strictly sequentially: each stage consumes the
//! previous stage's validated output, and each batch's prompt depends on the
//! list of files produced by earlier batches. Parallelizing would break the
//! "don't regenerate existing files" coherence guarantee.

pub mod batch;
pub mod progress;
pub mod schema;

pub use batch::{estimate_unit_count, plan_batches};
pub use progress::{Progress, ProgressEvent, ProgressKind, ProgressSink};

use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::ai::gateway::{CompletionRequest, SharedGateway};
use crate::ai::prompt::{STRUCTURED_SYSTEM_PROMPT, StaticTemplates, TemplateStore, names};
use crate::ai::repair::repair_and_parse;
use crate::ai::retry::{RetryPolicy, with_retry_policy};
use crate::ai::usage::{TokenSummary, TokenTracker};
use crate::config::ModelTier;
use crate::constants::pipeline::{BATCH_SIZE, MAX_OUTPUT_TOKENS, STRUCTURED_TEMPERATURE};
use crate::types::{
    ForgeError, GeneratedCode, PreviousFileRef, ProjectArchitecture, ProjectContext,
    ProjectInput, ProjectIntent, Result, Stage,
};

// =============================================================================
// Options and Result
// =============================================================================

/// Caller options for one pipeline run
#[derive(Clone, Default)]
pub struct GenerateOptions {
    /// Per-stage model map selection
    pub tier: ModelTier,
    /// Explicit model overrides, keyed by stage
    pub model_overrides: BTreeMap<Stage, String>,
    /// Deliver incremental text to the progress sink
    pub stream: bool,
    /// Optional progress sink
    pub on_progress: Option<ProgressSink>,
    /// Log the token-usage summary at the end of the run
    pub log_token_usage: bool,
}

/// How the run ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
    /// All stages finished
    Complete,
    /// Code generation stopped at a failing batch; `code` holds everything
    /// the earlier batches produced, and the context stage was skipped
    StoppedAtBatch {
        batch: usize,
        total: usize,
        reason: String,
    },
}

/// Validated output of a full pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub run_id: Uuid,
    pub project_name: String,
    pub intent: ProjectIntent,
    pub architecture: ProjectArchitecture,
    pub code: GeneratedCode,
    /// Present only when the run completed
    pub context: Option<ProjectContext>,
    pub status: RunStatus,
    pub usage: TokenSummary,
}

// =============================================================================
// Pipeline
// =============================================================================

/// The multi-stage orchestration pipeline
pub struct Pipeline {
    gateway: SharedGateway,
    templates: Arc<dyn TemplateStore>,
    retry_policy: RetryPolicy,
}

impl Pipeline {
    pub fn new(gateway: SharedGateway) -> Self {
        Self {
            gateway,
            templates: Arc::new(StaticTemplates::new()),
            retry_policy: RetryPolicy::default(),
        }
    }

    pub fn with_templates(mut self, templates: Arc<dyn TemplateStore>) -> Self {
        self.templates = templates;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Run the full pipeline: intent -> architecture -> code -> context.
    ///
    /// All entities live and die within this invocation; nothing persists
    /// except the returned result.
    #[instrument(skip_all, fields(stream = options.stream))]
    pub async fn generate_project(
        &self,
        input: &ProjectInput,
        options: &GenerateOptions,
    ) -> Result<PipelineResult> {
        input.validate()?;

        let tracker = TokenTracker::new();
        let progress = Progress::new(options.on_progress.clone());
        info!(run_id = %tracker.run_id(), "Starting generation run");

        // Stage 1: intent
        let intent = self
            .analyze_intent(input, options, &tracker, &progress)
            .await?;
        let project_name = input
            .project_name
            .clone()
            .unwrap_or_else(|| format!("{}-app", intent.category));

        // Stage 2: architecture
        let architecture = self
            .generate_architecture(input, &intent, &project_name, options, &tracker, &progress)
            .await?;

        // Stage 3: code (single-shot or chunked)
        let (code, status) = self
            .generate_code(&architecture, &project_name, options, &tracker, &progress)
            .await?;

        // Stage 4: context, only for complete runs
        let context = match status {
            RunStatus::Complete => Some(
                self.build_context(
                    &intent,
                    &architecture,
                    &code,
                    &project_name,
                    options,
                    &tracker,
                    &progress,
                )
                .await?,
            ),
            RunStatus::StoppedAtBatch { batch, total, .. } => {
                warn!(batch, total, "Run stopped mid-generation, skipping context stage");
                None
            }
        };

        let usage = tracker.summary();
        if options.log_token_usage {
            info!(
                run_id = %usage.run_id,
                calls = usage.total.calls,
                input_tokens = usage.total.input_tokens,
                output_tokens = usage.total.output_tokens,
                cost_usd = usage.total.estimated_cost_usd,
                "Token usage summary"
            );
        }

        Ok(PipelineResult {
            run_id: usage.run_id,
            project_name,
            intent,
            architecture,
            code,
            context,
            status,
            usage,
        })
    }

    // =========================================================================
    // Stages
    // =========================================================================

    async fn analyze_intent(
        &self,
        input: &ProjectInput,
        options: &GenerateOptions,
        tracker: &TokenTracker,
        progress: &Progress,
    ) -> Result<ProjectIntent> {
        let stage = Stage::Intent;
        progress.emit(ProgressEvent::start(stage, "Analyzing project intent"));

        let prompt = self.templates.render(
            names::INTENT_ANALYSIS,
            &vars([("description", input.description.clone())]),
        )?;

        let intent = self
            .run_stage(stage, &prompt, options, tracker, progress, schema::validate_intent)
            .await?;

        progress.emit(ProgressEvent::complete(
            stage,
            format!("Classified as '{}'", intent.category),
        ));
        Ok(intent)
    }

    async fn generate_architecture(
        &self,
        input: &ProjectInput,
        intent: &ProjectIntent,
        project_name: &str,
        options: &GenerateOptions,
        tracker: &TokenTracker,
        progress: &Progress,
    ) -> Result<ProjectArchitecture> {
        let stage = Stage::Architecture;
        progress.emit(ProgressEvent::start(stage, "Designing architecture"));

        let prompt = self.templates.render(
            names::ARCHITECTURE_GENERATION,
            &vars([
                ("description", input.description.clone()),
                ("intent", serde_json::to_string_pretty(intent)?),
                ("project_name", project_name.to_string()),
            ]),
        )?;

        let architecture = self
            .run_stage(
                stage,
                &prompt,
                options,
                tracker,
                progress,
                schema::validate_architecture,
            )
            .await?;

        progress.emit(ProgressEvent::complete(
            stage,
            format!(
                "{} pages, {} components, {} routes",
                architecture.pages.len(),
                architecture.components.len(),
                architecture.routes.len()
            ),
        ));
        Ok(architecture)
    }

    /// Generate code for the whole architecture, chunking when the estimated
    /// unit count exceeds the batch cap.
    async fn generate_code(
        &self,
        architecture: &ProjectArchitecture,
        project_name: &str,
        options: &GenerateOptions,
        tracker: &TokenTracker,
        progress: &Progress,
    ) -> Result<(GeneratedCode, RunStatus)> {
        let stage = Stage::Code;
        let units = estimate_unit_count(architecture);

        if units <= BATCH_SIZE {
            progress.emit(ProgressEvent::start(stage, "Generating code"));

            let prompt = self.templates.render(
                names::CODE_GENERATION,
                &vars([
                    ("project_name", project_name.to_string()),
                    ("architecture", serde_json::to_string_pretty(architecture)?),
                    ("previous_files", render_file_refs(&[])),
                    ("batch_note", String::new()),
                ]),
            )?;

            let code = self
                .run_stage(stage, &prompt, options, tracker, progress, schema::validate_code)
                .await?;

            progress.emit(ProgressEvent::complete(
                stage,
                format!("Generated {} files", code.files.len()),
            ));
            return Ok((code, RunStatus::Complete));
        }

        // Chunked path: sequential batches, each seeing only lossy refs to
        // files the earlier batches produced
        let batches = plan_batches(architecture);
        let total = batches.len();
        progress.emit(ProgressEvent::start(
            stage,
            format!("Generating code in {} batches ({} units)", total, units),
        ));

        let mut code = GeneratedCode::new();
        for (index, batch) in batches.iter().enumerate() {
            let number = index + 1;
            info!(batch = number, total, composition = %batch.description, "Generating batch");

            let prompt = self.templates.render(
                names::CODE_GENERATION,
                &vars([
                    ("project_name", project_name.to_string()),
                    ("architecture", serde_json::to_string_pretty(batch)?),
                    ("previous_files", render_file_refs(&code.file_refs())),
                    (
                        "batch_note",
                        format!(
                            "This is batch {} of {}. Generate only this batch's files. \
                             Do not regenerate any previously listed file.",
                            number, total
                        ),
                    ),
                ]),
            )?;

            match self
                .run_stage(stage, &prompt, options, tracker, progress, schema::validate_code)
                .await
            {
                Ok(batch_code) => {
                    info!(
                        batch = number,
                        files = batch_code.files.len(),
                        "Batch complete"
                    );
                    code.extend(batch_code);
                }
                Err(err) => {
                    // Deliver what the earlier batches built instead of
                    // discarding it; the caller decides whether to retry the
                    // remainder
                    warn!(batch = number, total, error = %err, "Batch failed, stopping generation");
                    return Ok((
                        code,
                        RunStatus::StoppedAtBatch {
                            batch: number,
                            total,
                            reason: err.to_string(),
                        },
                    ));
                }
            }
        }

        progress.emit(ProgressEvent::complete(
            stage,
            format!("Generated {} files across {} batches", code.files.len(), total),
        ));
        Ok((code, RunStatus::Complete))
    }

    #[allow(clippy::too_many_arguments)]
    async fn build_context(
        &self,
        intent: &ProjectIntent,
        architecture: &ProjectArchitecture,
        code: &GeneratedCode,
        project_name: &str,
        options: &GenerateOptions,
        tracker: &TokenTracker,
        progress: &Progress,
    ) -> Result<ProjectContext> {
        let stage = Stage::Context;
        progress.emit(ProgressEvent::start(stage, "Building project context"));

        let file_list = code
            .files
            .iter()
            .map(|f| f.path.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let prompt = self.templates.render(
            names::CONTEXT_BUILDING,
            &vars([
                ("project_name", project_name.to_string()),
                ("intent", serde_json::to_string_pretty(intent)?),
                ("architecture", serde_json::to_string_pretty(architecture)?),
                ("file_list", file_list),
            ]),
        )?;

        let context = self
            .run_stage(stage, &prompt, options, tracker, progress, schema::validate_context)
            .await?;

        progress.emit(ProgressEvent::complete(stage, "Context ready"));
        Ok(context)
    }

    // =========================================================================
    // Stage Execution
    // =========================================================================

    /// One retried unit of work: call gateway -> repair -> validate.
    ///
    /// Validation and malformed-output failures are fatal and propagate from
    /// the first attempt; only transient gateway errors re-execute.
    async fn run_stage<T>(
        &self,
        stage: Stage,
        prompt: &str,
        options: &GenerateOptions,
        tracker: &TokenTracker,
        progress: &Progress,
        validate: impl Fn(Value) -> Result<T>,
    ) -> Result<T> {
        let model = self.model_for(stage, options);
        let validate = &validate;

        with_retry_policy(&self.retry_policy, stage.as_str(), || {
            let request = self.build_request(stage, &model, prompt, options, progress);
            let model = model.clone();
            async move {
                let response = self.gateway.complete(request).await?;
                tracker.record(stage, &model, &response.usage);

                let repaired = repair_and_parse(&response.text).map_err(|failure| {
                    ForgeError::MalformedOutput {
                        stage,
                        message: failure.message,
                        preview: failure.preview,
                    }
                })?;
                if repaired.repaired {
                    warn!(stage = %stage, repairs = ?repaired.repairs, "Output needed repair");
                }

                validate(repaired.value)
            }
        })
        .await
    }

    fn build_request(
        &self,
        stage: Stage,
        model: &str,
        prompt: &str,
        options: &GenerateOptions,
        progress: &Progress,
    ) -> CompletionRequest {
        let mut request = CompletionRequest::new(model, prompt)
            .with_system(STRUCTURED_SYSTEM_PROMPT)
            .with_temperature(STRUCTURED_TEMPERATURE)
            .with_max_output_tokens(MAX_OUTPUT_TOKENS);

        if options.stream && progress.is_active() {
            let progress = progress.clone();
            request = request.with_chunk_callback(Arc::new(move |chunk, accumulated| {
                progress.emit(ProgressEvent::chunk(stage, chunk, accumulated));
            }));
        }

        request
    }

    /// Stage model: explicit override, else the tier's per-stage map
    fn model_for(&self, stage: Stage, options: &GenerateOptions) -> String {
        options
            .model_overrides
            .get(&stage)
            .cloned()
            .unwrap_or_else(|| options.tier.model_for(stage).to_string())
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn vars<const N: usize>(pairs: [(&str, String); N]) -> HashMap<String, String> {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

fn render_file_refs(refs: &[PreviousFileRef]) -> String {
    if refs.is_empty() {
        return "(none yet)".to_string();
    }
    refs.iter()
        .map(|r| format!("- {}: {}", r.path, r.description))
        .collect::<Vec<_>>()
        .join("\n")
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::gateway::{
        CompletionRequest, CompletionResponse, GatewayUsage, ModelGateway,
    };
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    // A gateway scripted with canned responses, recording every request
    struct MockGateway {
        responses: Mutex<VecDeque<Result<CompletionResponse>>>,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl MockGateway {
        fn new(responses: Vec<Result<CompletionResponse>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn ok(text: impl Into<String>) -> Result<CompletionResponse> {
            Ok(CompletionResponse {
                text: text.into(),
                usage: GatewayUsage {
                    input_tokens: 100,
                    output_tokens: 200,
                },
            })
        }

        fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        fn prompt(&self, index: usize) -> String {
            self.requests.lock().unwrap()[index].messages[0].content.clone()
        }
    }

    #[async_trait]
    impl ModelGateway for MockGateway {
        async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
            self.requests.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| MockGateway::ok("{}"))
        }

        fn name(&self) -> &str {
            "mock"
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }
    }

    fn intent_json() -> String {
        json!({
            "category": "recipes",
            "suggested_template": "content-site",
            "confidence": 0.93,
            "complexity": "moderate",
            "features": ["browse", "search"],
            "key_entities": ["recipe"],
            "integrations": {}
        })
        .to_string()
    }

    fn small_architecture_json() -> String {
        json!({
            "template": "content-site",
            "pages": [{"name": "Home", "path": "/", "components": []}],
            "components": [],
            "routes": []
        })
        .to_string()
    }

    fn large_architecture_json() -> String {
        // 3 pages, 6 create-new components, 2 api routes: 11 units
        json!({
            "template": "content-site",
            "pages": [
                {"name": "Home", "path": "/", "components": ["Hero", "CardGrid"]},
                {"name": "Detail", "path": "/detail", "components": ["Card", "Comments"]},
                {"name": "Admin", "path": "/admin", "components": ["Table", "Filters"]}
            ],
            "components": [
                {"name": "Hero", "template": "create-new"},
                {"name": "CardGrid", "template": "create-new"},
                {"name": "Card", "template": "create-new"},
                {"name": "Comments", "template": "create-new"},
                {"name": "Table", "template": "create-new"},
                {"name": "Filters", "template": "create-new"}
            ],
            "routes": [
                {"path": "/api/recipes", "method": "GET", "kind": "api"},
                {"path": "/api/comments", "method": "POST", "kind": "api"}
            ]
        })
        .to_string()
    }

    fn code_json(paths: &[&str]) -> String {
        json!({
            "files": paths.iter().map(|p| json!({"path": p, "content": "export {}"})).collect::<Vec<_>>(),
            "integration_code": []
        })
        .to_string()
    }

    fn context_json() -> String {
        json!({
            "summary": "A recipe site.",
            "structure": "Pages in src/pages, components in src/components.",
            "next_steps": ["Add auth"]
        })
        .to_string()
    }

    fn pipeline(gateway: Arc<MockGateway>) -> Pipeline {
        Pipeline::new(gateway).with_retry_policy(RetryPolicy::immediate(3))
    }

    fn options() -> GenerateOptions {
        GenerateOptions::default()
    }

    #[tokio::test]
    async fn test_single_shot_path_issues_one_code_call() {
        let gateway = Arc::new(MockGateway::new(vec![
            MockGateway::ok(intent_json()),
            MockGateway::ok(small_architecture_json()),
            MockGateway::ok(code_json(&["src/pages/Home.tsx"])),
            MockGateway::ok(context_json()),
        ]));
        let result = pipeline(gateway.clone())
            .generate_project(&ProjectInput::new("A recipe sharing site"), &options())
            .await
            .unwrap();

        // intent + architecture + one code call + context
        assert_eq!(gateway.request_count(), 4);
        assert_eq!(result.status, RunStatus::Complete);
        assert_eq!(result.code.files.len(), 1);
        assert!(result.context.is_some());
        // The one code prompt is not annotated as a batch
        assert!(!gateway.prompt(2).contains("This is batch"));
    }

    #[tokio::test]
    async fn test_chunked_path_carries_previous_files_forward() {
        let gateway = Arc::new(MockGateway::new(vec![
            MockGateway::ok(intent_json()),
            MockGateway::ok(large_architecture_json()),
            MockGateway::ok(code_json(&["src/pages/Home.tsx", "src/components/Hero.tsx"])),
            MockGateway::ok(code_json(&["src/pages/Detail.tsx"])),
            MockGateway::ok(code_json(&["src/pages/Admin.tsx"])),
            MockGateway::ok(context_json()),
        ]));
        let result = pipeline(gateway.clone())
            .generate_project(&ProjectInput::new("A large recipe platform"), &options())
            .await
            .unwrap();

        // intent + architecture + 3 batches + context
        assert_eq!(gateway.request_count(), 6);
        assert_eq!(result.status, RunStatus::Complete);
        assert_eq!(result.code.files.len(), 4);

        // Batch annotations and forward-carried refs
        assert!(gateway.prompt(2).contains("This is batch 1 of 3"));
        assert!(gateway.prompt(2).contains("(none yet)"));
        assert!(gateway.prompt(3).contains("This is batch 2 of 3"));
        assert!(gateway.prompt(3).contains("src/pages/Home.tsx"));
        assert!(gateway.prompt(4).contains("This is batch 3 of 3"));
        assert!(gateway.prompt(4).contains("src/pages/Detail.tsx"));
        // A batch never sees its own output
        assert!(!gateway.prompt(4).contains("src/pages/Admin.tsx"));
    }

    #[tokio::test]
    async fn test_batch_failure_returns_partial_code() {
        let gateway = Arc::new(MockGateway::new(vec![
            MockGateway::ok(intent_json()),
            MockGateway::ok(large_architecture_json()),
            MockGateway::ok(code_json(&["src/pages/Home.tsx"])),
            // Batch 2 emits unrepairable output: fatal, no retry
            MockGateway::ok("I cannot generate that."),
        ]));
        let result = pipeline(gateway.clone())
            .generate_project(&ProjectInput::new("A large recipe platform"), &options())
            .await
            .unwrap();

        assert_eq!(gateway.request_count(), 4);
        match &result.status {
            RunStatus::StoppedAtBatch { batch, total, reason } => {
                assert_eq!(*batch, 2);
                assert_eq!(*total, 3);
                assert!(reason.contains("Malformed"));
            }
            other => panic!("expected stopped status, got {:?}", other),
        }
        // Batch 1's output survives; context stage skipped
        assert_eq!(result.code.files.len(), 1);
        assert!(result.context.is_none());
    }

    #[tokio::test]
    async fn test_empty_description_fails_before_any_call() {
        let gateway = Arc::new(MockGateway::new(vec![]));
        let err = pipeline(gateway.clone())
            .generate_project(&ProjectInput::new("  "), &options())
            .await
            .unwrap_err();

        assert!(matches!(err, ForgeError::Input(_)));
        assert_eq!(gateway.request_count(), 0);
    }

    #[tokio::test]
    async fn test_intent_validation_failure_aborts_run() {
        let gateway = Arc::new(MockGateway::new(vec![MockGateway::ok(
            json!({"category": "saas", "suggested_template": "x", "confidence": 7.0}).to_string(),
        )]));
        let err = pipeline(gateway.clone())
            .generate_project(&ProjectInput::new("A thing"), &options())
            .await
            .unwrap_err();

        // Fatal: exactly one attempt, no downstream stages
        assert_eq!(gateway.request_count(), 1);
        assert!(matches!(err, ForgeError::Validation(_)));
    }

    #[tokio::test]
    async fn test_fenced_output_repaired_and_accepted() {
        let fenced = format!("```json\n{}\n```", intent_json());
        let gateway = Arc::new(MockGateway::new(vec![
            MockGateway::ok(fenced),
            MockGateway::ok(small_architecture_json()),
            MockGateway::ok(code_json(&["src/pages/Home.tsx"])),
            MockGateway::ok(context_json()),
        ]));
        let result = pipeline(gateway)
            .generate_project(&ProjectInput::new("A recipe site"), &options())
            .await
            .unwrap();
        assert_eq!(result.intent.category, "recipes");
    }

    #[tokio::test]
    async fn test_usage_tracked_per_stage() {
        let gateway = Arc::new(MockGateway::new(vec![
            MockGateway::ok(intent_json()),
            MockGateway::ok(small_architecture_json()),
            MockGateway::ok(code_json(&["a.ts"])),
            MockGateway::ok(context_json()),
        ]));
        let result = pipeline(gateway)
            .generate_project(&ProjectInput::new("A recipe site"), &options())
            .await
            .unwrap();

        assert_eq!(result.usage.total.calls, 4);
        assert_eq!(result.usage.stages["intent"].input_tokens, 100);
        assert_eq!(result.usage.stages["code"].output_tokens, 200);
        assert!(result.usage.total.estimated_cost_usd > 0.0);
    }

    #[tokio::test]
    async fn test_progress_events_in_stage_order() {
        let events: Arc<Mutex<Vec<(Stage, ProgressKind)>>> = Arc::new(Mutex::new(Vec::new()));
        let sink_events = events.clone();
        let mut opts = options();
        opts.on_progress = Some(Arc::new(move |event: ProgressEvent| {
            sink_events.lock().unwrap().push((event.stage, event.kind));
        }));

        let gateway = Arc::new(MockGateway::new(vec![
            MockGateway::ok(intent_json()),
            MockGateway::ok(small_architecture_json()),
            MockGateway::ok(code_json(&["a.ts"])),
            MockGateway::ok(context_json()),
        ]));
        pipeline(gateway)
            .generate_project(&ProjectInput::new("A recipe site"), &opts)
            .await
            .unwrap();

        let seen = events.lock().unwrap();
        let expected = vec![
            (Stage::Intent, ProgressKind::Start),
            (Stage::Intent, ProgressKind::Complete),
            (Stage::Architecture, ProgressKind::Start),
            (Stage::Architecture, ProgressKind::Complete),
            (Stage::Code, ProgressKind::Start),
            (Stage::Code, ProgressKind::Complete),
            (Stage::Context, ProgressKind::Start),
            (Stage::Context, ProgressKind::Complete),
        ];
        assert_eq!(*seen, expected);
    }

    #[tokio::test]
    async fn test_model_override_wins_over_tier() {
        let gateway = Arc::new(MockGateway::new(vec![
            MockGateway::ok(intent_json()),
            MockGateway::ok(small_architecture_json()),
            MockGateway::ok(code_json(&["a.ts"])),
            MockGateway::ok(context_json()),
        ]));
        let mut opts = options();
        opts.model_overrides
            .insert(Stage::Code, "custom-model".to_string());

        pipeline(gateway.clone())
            .generate_project(&ProjectInput::new("A recipe site"), &opts)
            .await
            .unwrap();

        let requests = gateway.requests.lock().unwrap();
        assert_eq!(requests[2].model, "custom-model");
        assert_ne!(requests[0].model, "custom-model");
    }
}
