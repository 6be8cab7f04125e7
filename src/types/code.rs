//! Generated code types
//!
//! `GeneratedCode` accumulates across batches, append-only during a run.
//! `PreviousFileRef` is the deliberately lossy summary (name plus parent
//! folder, never content) shown to later batches so the model knows what
//! already exists without inflating the prompt.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// One generated source file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileDefinition {
    /// Project-relative path (e.g. "src/pages/Home.tsx")
    pub path: String,
    pub content: String,
}

/// Integration wiring emitted alongside page/component code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrationCode {
    /// Integration type (e.g. "auth", "payments")
    pub integration: String,
    /// Provider the wiring targets (e.g. "stripe")
    pub provider: String,
    pub path: String,
    pub content: String,
}

/// Lossy reference to a file produced by an earlier batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviousFileRef {
    pub path: String,
    /// Filename plus parent folder, never file content
    pub description: String,
}

impl PreviousFileRef {
    /// Summarize a generated file down to name + parent folder
    pub fn from_path(path: &str) -> Self {
        let p = Path::new(path);
        let name = p
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string());
        let parent = p
            .parent()
            .and_then(|d| d.file_name())
            .map(|d| d.to_string_lossy().into_owned());

        let description = match parent {
            Some(dir) => format!("{} (in {}/)", name, dir),
            None => name,
        };

        Self {
            path: path.to_string(),
            description,
        }
    }
}

/// All code produced by the code-generation stage
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneratedCode {
    pub files: Vec<FileDefinition>,
    #[serde(default)]
    pub integration_code: Vec<IntegrationCode>,
}

impl GeneratedCode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one batch's output; files accumulate in batch order
    pub fn extend(&mut self, other: GeneratedCode) {
        self.files.extend(other.files);
        self.integration_code.extend(other.integration_code);
    }

    /// Lossy refs for every file generated so far, in generation order
    pub fn file_refs(&self) -> Vec<PreviousFileRef> {
        self.files
            .iter()
            .map(|f| PreviousFileRef::from_path(&f.path))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.integration_code.is_empty()
    }
}

/// Contextual documentation built from the final intent, architecture, and code
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectContext {
    /// Overview of what was built and why
    pub summary: String,
    /// How the generated files fit together
    #[serde(default)]
    pub structure: String,
    /// Suggested follow-up tasks for the user
    #[serde(default)]
    pub next_steps: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_previous_file_ref_summary() {
        let r = PreviousFileRef::from_path("src/pages/Home.tsx");
        assert_eq!(r.path, "src/pages/Home.tsx");
        assert_eq!(r.description, "Home.tsx (in pages/)");
    }

    #[test]
    fn test_previous_file_ref_bare_name() {
        let r = PreviousFileRef::from_path("README.md");
        assert_eq!(r.description, "README.md");
    }

    #[test]
    fn test_extend_preserves_order() {
        let mut code = GeneratedCode::new();
        code.extend(GeneratedCode {
            files: vec![FileDefinition {
                path: "a.ts".into(),
                content: String::new(),
            }],
            integration_code: vec![],
        });
        code.extend(GeneratedCode {
            files: vec![FileDefinition {
                path: "b.ts".into(),
                content: String::new(),
            }],
            integration_code: vec![],
        });
        let refs = code.file_refs();
        assert_eq!(refs[0].path, "a.ts");
        assert_eq!(refs[1].path, "b.ts");
    }
}
