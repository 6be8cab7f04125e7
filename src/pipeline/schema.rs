//! Schema Validator
//!
//! Validates a repaired JSON value against the stage's expected shape.
//! Applied only after the repair chain succeeds. On mismatch, raises a
//! `ValidationError` with field-level complaints — a different kind from a
//! transport error, and never retried.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::types::{
    GeneratedCode, ProjectArchitecture, ProjectContext, ProjectIntent, Result, Stage,
    ValidationError,
};

/// Deserialize `value` into the stage's typed schema
fn decode<T: DeserializeOwned>(stage: Stage, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| {
        ValidationError::new(stage, format!("response does not match schema: {}", e)).into()
    })
}

/// Validate the intent stage output
pub fn validate_intent(value: Value) -> Result<ProjectIntent> {
    let intent: ProjectIntent = decode(Stage::Intent, value)?;

    if intent.category.trim().is_empty() {
        return Err(ValidationError::new(Stage::Intent, "must not be empty")
            .with_field("category")
            .into());
    }
    if !(0.0..=1.0).contains(&intent.confidence) {
        return Err(
            ValidationError::new(Stage::Intent, "confidence out of range")
                .with_field("confidence")
                .with_comparison("0.0..=1.0", intent.confidence.to_string())
                .into(),
        );
    }

    Ok(intent)
}

/// Validate the architecture stage output
pub fn validate_architecture(value: Value) -> Result<ProjectArchitecture> {
    let architecture: ProjectArchitecture = decode(Stage::Architecture, value)?;

    if architecture.template.trim().is_empty() {
        return Err(
            ValidationError::new(Stage::Architecture, "must name a base template")
                .with_field("template")
                .into(),
        );
    }
    if architecture.pages.is_empty() {
        return Err(
            ValidationError::new(Stage::Architecture, "must contain at least one page")
                .with_field("pages")
                .into(),
        );
    }
    for page in &architecture.pages {
        if page.name.trim().is_empty() || page.path.trim().is_empty() {
            return Err(ValidationError::new(
                Stage::Architecture,
                "every page needs a name and a path",
            )
            .with_field("pages")
            .into());
        }
    }
    for component in &architecture.components {
        if component.name.trim().is_empty() {
            return Err(
                ValidationError::new(Stage::Architecture, "component with empty name")
                    .with_field("components")
                    .into(),
            );
        }
    }

    Ok(architecture)
}

/// Validate one code-generation call's output (whole-architecture or batch)
pub fn validate_code(value: Value) -> Result<GeneratedCode> {
    let code: GeneratedCode = decode(Stage::Code, value)?;

    if code.files.is_empty() {
        return Err(
            ValidationError::new(Stage::Code, "must contain at least one file")
                .with_field("files")
                .into(),
        );
    }
    for file in &code.files {
        if file.path.trim().is_empty() {
            return Err(ValidationError::new(Stage::Code, "file with empty path")
                .with_field("files")
                .into());
        }
    }

    Ok(code)
}

/// Validate the context stage output
pub fn validate_context(value: Value) -> Result<ProjectContext> {
    let context: ProjectContext = decode(Stage::Context, value)?;

    if context.summary.trim().is_empty() {
        return Err(ValidationError::new(Stage::Context, "must not be empty")
            .with_field("summary")
            .into());
    }

    Ok(context)
}

// =============================================================================
// Tests
// =============================================================================
