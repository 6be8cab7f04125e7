//! Prompt Template Store
//!
//! External-collaborator boundary for prompt assembly: the orchestrator hands
//! over a template name and a variable map, and gets back the final prompt
//! string. Templating never leaks into pipeline control flow.

use std::collections::HashMap;

use crate::types::{ForgeError, Result};

/// Boundary to the template store
pub trait TemplateStore: Send + Sync {
    /// Interpolate `vars` into the named template and return the final prompt
    fn render(&self, name: &str, vars: &HashMap<String, String>) -> Result<String>;
}

// =============================================================================
// Built-in Templates
// =============================================================================

/// Template names used by the pipeline stages
pub mod names {
    pub const INTENT_ANALYSIS: &str = "intent_analysis";
    pub const ARCHITECTURE_GENERATION: &str = "architecture_generation";
    pub const CODE_GENERATION: &str = "code_generation";
    pub const CONTEXT_BUILDING: &str = "context_building";
}

/// System prompt shared by all structured-output stages
pub const STRUCTURED_SYSTEM_PROMPT: &str = "You are an expert full-stack application generator. \
    Respond with exactly one JSON value and nothing else: no prose, no markdown fences, \
    no explanations before or after the JSON.";

const INTENT_TEMPLATE: &str = r#"Analyze this project description and classify the user's intent.

## Project description

{{description}}

Return a JSON object with these fields:
- "category": project category (e.g. "saas", "ecommerce", "portfolio", "blog", "internal-tool")
- "suggested_template": the base template id best suited to this project
- "confidence": classification confidence between 0.0 and 1.0
- "complexity": one of "simple", "moderate", "complex"
- "features": array of concrete features the description asks for
- "key_entities": array of domain entities (e.g. "recipe", "order", "user")
- "integrations": object mapping integration type to provider name, or null when
  the type is needed but no provider is implied (e.g. {"auth": "clerk", "payments": null})"#;

const ARCHITECTURE_TEMPLATE: &str = r#"Design the architecture for "{{project_name}}".

## Project description

{{description}}

## Validated intent

{{intent}}

Return a JSON object with:
- "template": the base template id to build from
- "pages": array of { "name", "path", "description", "components": [component names] }
- "components": array of { "name", "description", "template" } where "template" is
  "create-new" for components that must be generated, or an existing template
  component id to reuse
- "routes": array of { "path", "method", "description", "kind": "api" | "page" }
- "integrations": object mapping integration type to the chosen provider id

Every component name referenced by a page must either appear in "components" or
name a component the base template already provides."#;

const CODE_TEMPLATE: &str = r#"Generate source files for "{{project_name}}".

## Architecture to implement

{{architecture}}

## Files that already exist

{{previous_files}}

{{batch_note}}

Return a JSON object with:
- "files": array of { "path", "content" } with complete, runnable file contents
- "integration_code": array of { "integration", "provider", "path", "content" }
  for any integration wiring these files need

Generate every page, create-new component, and api route listed in the
architecture above. Do not regenerate any file from the existing-files list."#;

const CONTEXT_TEMPLATE: &str = r#"Write contextual documentation for "{{project_name}}".

## Intent

{{intent}}

## Architecture

{{architecture}}

## Generated files

{{file_list}}

Return a JSON object with:
- "summary": two-paragraph overview of what was built and why
- "structure": explanation of how the files fit together
- "next_steps": array of suggested follow-up tasks for the user"#;

/// Built-in template store with the four stage templates
#[derive(Debug, Default)]
pub struct StaticTemplates;

impl StaticTemplates {
    pub fn new() -> Self {
        Self
    }

    fn template(&self, name: &str) -> Result<&'static str> {
        match name {
            names::INTENT_ANALYSIS => Ok(INTENT_TEMPLATE),
            names::ARCHITECTURE_GENERATION => Ok(ARCHITECTURE_TEMPLATE),
            names::CODE_GENERATION => Ok(CODE_TEMPLATE),
            names::CONTEXT_BUILDING => Ok(CONTEXT_TEMPLATE),
            other => Err(ForgeError::Template(format!("unknown template '{}'", other))),
        }
    }
}

impl TemplateStore for StaticTemplates {
    fn render(&self, name: &str, vars: &HashMap<String, String>) -> Result<String> {
        let template = self.template(name)?;
        interpolate(template, vars)
            .map_err(|var| ForgeError::Template(format!("template '{}' missing variable '{}'", name, var)))
    }
}

/// Replace every `{{var}}` placeholder; returns the first missing variable
/// name on failure
fn interpolate(template: &str, vars: &HashMap<String, String>) -> std::result::Result<String, String> {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        output.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            // Unterminated placeholder; emit literally
            output.push_str(&rest[start..]);
            return Ok(output);
        };

        let key = after[..end].trim();
        match vars.get(key) {
            Some(value) => output.push_str(value),
            None => return Err(key.to_string()),
        }
        rest = &after[end + 2..];
    }

    output.push_str(rest);
    Ok(output)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_interpolation() {
        let out = interpolate("hello {{name}}, {{name}}!", &vars(&[("name", "world")])).unwrap();
        assert_eq!(out, "hello world, world!");
    }

    #[test]
    fn test_missing_variable_is_error() {
        let err = interpolate("{{a}} {{b}}", &vars(&[("a", "x")])).unwrap_err();
        assert_eq!(err, "b");
    }

    #[test]
    fn test_render_intent_template() {
        let store = StaticTemplates::new();
        let prompt = store
            .render(
                names::INTENT_ANALYSIS,
                &vars(&[("description", "A recipe sharing site")]),
            )
            .unwrap();
        assert!(prompt.contains("A recipe sharing site"));
        assert!(!prompt.contains("{{"));
    }

    #[test]
    fn test_unknown_template_rejected() {
        let store = StaticTemplates::new();
        assert!(store.render("nope", &HashMap::new()).is_err());
    }
}
