//! Generate Command
//!
//! Runs the full pipeline for one project description and writes the
//! generated files, contextual docs, and a run manifest to the output
//! directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use console::style;
use tokio::runtime::Runtime;
use tracing::info;

use crate::ai::gateway::{AnthropicGateway, SharedGateway};
use crate::ai::usage::TokenSummary;
use crate::config::{ConfigLoader, ModelTier};
use crate::pipeline::{
    GenerateOptions, Pipeline, PipelineResult, ProgressEvent, ProgressKind, RunStatus,
};
use crate::types::{ProjectInput, Result};

/// Generate run options (consolidated parameters)
#[derive(Debug, Clone, Default)]
pub struct GenerateRunOptions {
    /// Free-text project description
    pub description: String,
    /// Explicit project name
    pub name: Option<String>,
    /// Tier override: fast, balanced, quality
    pub tier: Option<ModelTier>,
    /// Stream incremental model output
    pub stream: bool,
    /// Output directory override
    pub output: Option<PathBuf>,
    /// Print the token-usage table after the run
    pub log_usage: bool,
}

/// Run project generation with options
pub fn run(options: GenerateRunOptions) -> Result<()> {
    let config = ConfigLoader::load()?;

    let tier = options.tier.unwrap_or(config.llm.tier);
    let stream = options.stream || config.generation.stream;
    let log_usage = options.log_usage || config.generation.log_token_usage;
    let output_dir = options
        .output
        .unwrap_or_else(|| config.output.output_dir.clone());

    let gateway = build_gateway(config.llm.api_key.clone(), config.llm.api_base.as_deref())?;
    let pipeline = Pipeline::new(gateway);

    let mut input = ProjectInput::new(options.description);
    if let Some(name) = options.name {
        input = input.with_name(name);
    }

    let pipeline_options = GenerateOptions {
        tier,
        model_overrides: Default::default(),
        stream,
        on_progress: Some(progress_sink(stream)),
        log_token_usage: log_usage,
    };

    let rt = Runtime::new()?;
    let result = rt.block_on(pipeline.generate_project(&input, &pipeline_options))?;

    let project_dir = write_project(&output_dir, &result)?;
    report(&result, &project_dir);

    if log_usage {
        print_usage_table(&result.usage);
    }

    Ok(())
}

fn build_gateway(api_key: Option<String>, api_base: Option<&str>) -> Result<SharedGateway> {
    let gateway = match api_base {
        Some(base) => {
            let key = api_key
                .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok())
                .ok_or_else(|| {
                    crate::types::ForgeError::Config(
                        "API key not found. Set ANTHROPIC_API_KEY env var or provide in config"
                            .to_string(),
                    )
                })?;
            AnthropicGateway::with_api_base(key, base)?
        }
        None => AnthropicGateway::from_env_or(api_key)?,
    };
    Ok(Arc::new(gateway))
}

/// Terminal progress rendering: one line per stage transition, a dot per
/// streamed chunk
fn progress_sink(stream: bool) -> Arc<dyn Fn(ProgressEvent) + Send + Sync> {
    Arc::new(move |event: ProgressEvent| match event.kind {
        ProgressKind::Start => {
            let message = event.message.unwrap_or_default();
            println!(
                "{} {} {}",
                style("▸").cyan().bold(),
                style(event.stage.as_str()).cyan(),
                message
            );
        }
        ProgressKind::Chunk => {
            if stream {
                print!(".");
            }
        }
        ProgressKind::Complete => {
            if stream {
                println!();
            }
            let message = event.message.unwrap_or_default();
            println!(
                "{} {} {}",
                style("✓").green().bold(),
                style(event.stage.as_str()).green(),
                message
            );
        }
    })
}

/// Write generated files, context docs, and the run manifest
fn write_project(output_dir: &Path, result: &PipelineResult) -> Result<PathBuf> {
    let project_dir = output_dir.join(&result.project_name);
    fs::create_dir_all(&project_dir)?;

    let entries = result
        .code
        .files
        .iter()
        .map(|f| (f.path.as_str(), f.content.as_str()))
        .chain(
            result
                .code
                .integration_code
                .iter()
                .map(|i| (i.path.as_str(), i.content.as_str())),
        );
    for (rel_path, content) in entries {
        let path = project_dir.join(rel_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;
    }

    if let Some(context) = &result.context {
        let mut doc = format!("# {}\n\n{}\n", result.project_name, context.summary);
        if !context.structure.is_empty() {
            doc.push_str(&format!("\n## Structure\n\n{}\n", context.structure));
        }
        if !context.next_steps.is_empty() {
            doc.push_str("\n## Next steps\n\n");
            for step in &context.next_steps {
                doc.push_str(&format!("- {}\n", step));
            }
        }
        fs::write(project_dir.join("CONTEXT.md"), doc)?;
    }

    // Run manifest with everything except file contents
    let manifest = serde_json::json!({
        "run_id": result.run_id,
        "project_name": result.project_name,
        "status": result.status,
        "intent": result.intent,
        "architecture": result.architecture,
        "files": result.code.files.iter().map(|f| &f.path).collect::<Vec<_>>(),
        "usage": result.usage,
    });
    fs::write(
        project_dir.join("stackforge.json"),
        serde_json::to_string_pretty(&manifest)?,
    )?;

    info!(dir = %project_dir.display(), "Wrote generated project");
    Ok(project_dir)
}

fn report(result: &PipelineResult, project_dir: &Path) {
    println!();
    match &result.status {
        RunStatus::Complete => {
            println!(
                "{} Generated {} files into {}",
                style("✓").green().bold(),
                result.code.files.len(),
                style(project_dir.display()).bold()
            );
        }
        RunStatus::StoppedAtBatch {
            batch,
            total,
            reason,
        } => {
            println!(
                "{} Generation stopped at batch {}/{}: {}",
                style("⚠").yellow().bold(),
                batch,
                total,
                reason
            );
            println!(
                "  {} files from completed batches were kept in {}",
                result.code.files.len(),
                style(project_dir.display()).bold()
            );
        }
    }
}

fn print_usage_table(usage: &TokenSummary) {
    println!();
    println!("{}", style("Token usage").bold());
    println!(
        "  {:<14} {:>6} {:>12} {:>12} {:>10}",
        "stage", "calls", "input", "output", "cost"
    );
    for (stage, stats) in &usage.stages {
        println!(
            "  {:<14} {:>6} {:>12} {:>12} {:>9.4}$",
            stage, stats.calls, stats.input_tokens, stats.output_tokens, stats.estimated_cost_usd
        );
    }
    println!(
        "  {:<14} {:>6} {:>12} {:>12} {:>9.4}$",
        style("total").bold(),
        usage.total.calls,
        usage.total.input_tokens,
        usage.total.output_tokens,
        usage.total.estimated_cost_usd
    );
    println!("  elapsed: {}ms, run: {}", usage.elapsed_ms, usage.run_id);
}
