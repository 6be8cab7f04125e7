//! Unified Error Type System
//!
//! Centralized error types for the entire pipeline.
//! Retry decisions are routed through typed categories, never string matching:
//! the gateway classifies raw provider errors once at the boundary, and every
//! layer above reads `ErrorCategory` off the typed error.
//!
//! ## Error Categories
//!
//! - **Transient**: temporary server issues (retry with backoff)
//! - **RateLimit**: provider rate limiting (wait and retry)
//! - **Network**: connectivity/timeout issues (retry with backoff)
//! - **Auth**: authentication failures (fail fast)
//! - **BadRequest**: invalid request (fail fast, fix request)
//! - **MalformedOutput**: repair chain exhausted (fatal — deterministic
//!   generation reproduces the same malformed text)
//! - **Validation**: schema mismatch (fatal, carries field diagnostics)

use std::time::Duration;
use thiserror::Error;

use crate::types::Stage;

// =============================================================================
// Error Categories
// =============================================================================

/// Unified error categories for retry routing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Rate limited - wait then retry
    RateLimit,
    /// Network/connectivity issues - retry with backoff
    Network,
    /// Temporary server issues (5xx, overloaded) - retry
    Transient,
    /// Authentication failed - fail fast, don't retry
    Auth,
    /// Invalid request - don't retry, fix request
    BadRequest,
    /// Repair chain exhausted without a parse - fatal
    MalformedOutput,
    /// Parsed JSON does not match the stage schema - fatal
    Validation,
    /// Unknown error - not retried
    Unknown,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RateLimit => write!(f, "RATE_LIMIT"),
            Self::Network => write!(f, "NETWORK"),
            Self::Transient => write!(f, "TRANSIENT"),
            Self::Auth => write!(f, "AUTH"),
            Self::BadRequest => write!(f, "BAD_REQUEST"),
            Self::MalformedOutput => write!(f, "MALFORMED_OUTPUT"),
            Self::Validation => write!(f, "VALIDATION"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl ErrorCategory {
    /// Check if this category is worth re-attempting with the same inputs
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimit | Self::Network | Self::Transient)
    }

    /// Get recommended retry delay for this category
    pub fn recommended_delay(&self) -> Duration {
        match self {
            Self::RateLimit => Duration::from_secs(30),
            Self::Network => Duration::from_secs(5),
            Self::Transient => Duration::from_secs(2),
            _ => Duration::from_millis(500),
        }
    }
}

// =============================================================================
// LLM Error
// =============================================================================

/// Structured gateway error with category and retry hints
#[derive(Debug, Clone)]
pub struct LlmError {
    /// Error category for retry routing
    pub category: ErrorCategory,
    /// Detailed error message
    pub message: String,
    /// Model that produced the error
    pub model: Option<String>,
    /// Suggested wait time before retry (e.g. from a retry-after header)
    pub retry_after: Option<Duration>,
}

impl std::fmt::Display for LlmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(model) = &self.model {
            write!(f, "[{}:{}] {}", model, self.category, self.message)
        } else {
            write!(f, "[{}] {}", self.category, self.message)
        }
    }
}

impl std::error::Error for LlmError {}

impl LlmError {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            model: None,
            retry_after: None,
        }
    }

    /// Add model context to existing error
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Add suggested retry delay
    pub fn retry_after(mut self, duration: Duration) -> Self {
        self.retry_after = Some(duration);
        self
    }

    pub fn is_retryable(&self) -> bool {
        self.category.is_retryable()
    }

    pub fn recommended_delay(&self) -> Duration {
        self.retry_after
            .unwrap_or_else(|| self.category.recommended_delay())
    }
}

// =============================================================================
// Gateway Error Classifier
// =============================================================================

/// Classifier for raw provider errors, used only inside the gateway.
///
/// Everything above the gateway works with the already-typed category; the
/// string patterns here exist because provider error bodies arrive as text.
pub struct ErrorClassifier;

impl ErrorClassifier {
    /// Classify an error message from the provider
    pub fn classify(message: &str, model: &str) -> LlmError {
        let lower = message.to_lowercase();

        if lower.contains("rate limit")
            || lower.contains("429")
            || lower.contains("too many requests")
            || lower.contains("quota exceeded")
        {
            return LlmError::new(ErrorCategory::RateLimit, message)
                .model(model)
                .retry_after(Duration::from_secs(30));
        }

        if lower.contains("auth")
            || lower.contains("401")
            || lower.contains("403")
            || lower.contains("api key")
            || lower.contains("unauthorized")
            || lower.contains("permission denied")
        {
            return LlmError::new(ErrorCategory::Auth, message).model(model);
        }

        if lower.contains("network")
            || lower.contains("connection")
            || lower.contains("dns")
            || lower.contains("timeout")
            || lower.contains("timed out")
            || lower.contains("unreachable")
        {
            return LlmError::new(ErrorCategory::Network, message)
                .model(model)
                .retry_after(Duration::from_secs(5));
        }

        if lower.contains("500")
            || lower.contains("502")
            || lower.contains("503")
            || lower.contains("504")
            || lower.contains("overloaded")
            || lower.contains("server error")
            || lower.contains("internal error")
            || lower.contains("temporary")
        {
            return LlmError::new(ErrorCategory::Transient, message)
                .model(model)
                .retry_after(Duration::from_secs(2));
        }

        if lower.contains("400") || lower.contains("bad request") || lower.contains("invalid") {
            return LlmError::new(ErrorCategory::BadRequest, message).model(model);
        }

        LlmError::new(ErrorCategory::Unknown, message).model(model)
    }

    /// Classify HTTP status code directly (more accurate than string matching).
    /// Statuses with no fixed meaning fall back to the error body text.
    pub fn classify_http_status(status: u16, message: &str, model: &str) -> LlmError {
        match status {
            429 => LlmError::new(ErrorCategory::RateLimit, message)
                .model(model)
                .retry_after(Duration::from_secs(30)),
            401 | 403 => LlmError::new(ErrorCategory::Auth, message).model(model),
            400 | 404 | 422 => LlmError::new(ErrorCategory::BadRequest, message).model(model),
            // 500 series are transient - can retry
            500..=599 => LlmError::new(ErrorCategory::Transient, message)
                .model(model)
                .retry_after(Duration::from_secs(5)),
            _ => Self::classify(message, model),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Structured validation error with field-level context
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Stage whose schema was violated
    pub stage: Stage,
    /// Field or collection that failed validation
    pub field: Option<String>,
    /// Detailed message
    pub message: String,
    /// Expected value or format
    pub expected: Option<String>,
    /// Actual value received
    pub actual: Option<String>,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(field) = &self.field {
            write!(
                f,
                "{} schema validation failed for '{}': {}",
                self.stage, field, self.message
            )
        } else {
            write!(
                f,
                "{} schema validation failed: {}",
                self.stage, self.message
            )
        }
    }
}

impl std::error::Error for ValidationError {}

impl ValidationError {
    pub fn new(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            field: None,
            message: message.into(),
            expected: None,
            actual: None,
        }
    }

    /// Add field context
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Add expected/actual values
    pub fn with_comparison(
        mut self,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        self.expected = Some(expected.into());
        self.actual = Some(actual.into());
        self
    }
}

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum ForgeError {
    // -------------------------------------------------------------------------
    // System Errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // -------------------------------------------------------------------------
    // Gateway Errors
    // -------------------------------------------------------------------------
    /// Structured gateway error with category and retry hints
    #[error("LLM error: {0}")]
    Llm(LlmError),

    // -------------------------------------------------------------------------
    // Pipeline Errors
    // -------------------------------------------------------------------------
    /// Model output could not be parsed even after the full repair chain
    #[error("Malformed model output in {stage} stage: {message}")]
    MalformedOutput {
        stage: Stage,
        message: String,
        /// Bounded excerpt of the offending raw text, for prompt tuning
        preview: String,
    },

    #[error("{0}")]
    Validation(ValidationError),

    /// Stage-level failure with context
    #[error("Pipeline error in {stage} stage: {message}")]
    Pipeline { stage: Stage, message: String },

    // -------------------------------------------------------------------------
    // Caller Errors
    // -------------------------------------------------------------------------
    /// Invalid caller input - fail fast before any model call
    #[error("Invalid input: {0}")]
    Input(String),

    #[error("Config error: {0}")]
    Config(String),

    /// Template variable missing or template unknown
    #[error("Template error: {0}")]
    Template(String),
}

impl From<LlmError> for ForgeError {
    fn from(err: LlmError) -> Self {
        ForgeError::Llm(err)
    }
}

impl From<ValidationError> for ForgeError {
    fn from(err: ValidationError) -> Self {
        ForgeError::Validation(err)
    }
}

pub type Result<T> = std::result::Result<T, ForgeError>;

// =============================================================================
// Helper Functions
// =============================================================================

impl ForgeError {
    /// Create a pipeline error
    pub fn pipeline(stage: Stage, message: impl Into<String>) -> Self {
        Self::Pipeline {
            stage,
            message: message.into(),
        }
    }

    /// Create a malformed-output error with a bounded text excerpt
    pub fn malformed(stage: Stage, message: impl Into<String>, raw: &str) -> Self {
        Self::MalformedOutput {
            stage,
            message: message.into(),
            preview: raw.chars().take(200).collect(),
        }
    }

    /// Effective category of this error, for retry routing
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Llm(e) => e.category,
            Self::MalformedOutput { .. } => ErrorCategory::MalformedOutput,
            Self::Validation(_) => ErrorCategory::Validation,
            Self::Io(_) => ErrorCategory::Network,
            _ => ErrorCategory::Unknown,
        }
    }

    /// Check if this error is worth retrying with the same inputs
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }

    /// Recommended delay before the next attempt
    pub fn recommended_delay(&self) -> Duration {
        match self {
            Self::Llm(e) => e.recommended_delay(),
            other => other.category().recommended_delay(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category_display() {
        assert_eq!(ErrorCategory::RateLimit.to_string(), "RATE_LIMIT");
        assert_eq!(ErrorCategory::Validation.to_string(), "VALIDATION");
        assert_eq!(ErrorCategory::Auth.to_string(), "AUTH");
    }

    #[test]
    fn test_error_category_retryable() {
        assert!(ErrorCategory::RateLimit.is_retryable());
        assert!(ErrorCategory::Network.is_retryable());
        assert!(ErrorCategory::Transient.is_retryable());
        assert!(!ErrorCategory::Auth.is_retryable());
        assert!(!ErrorCategory::Validation.is_retryable());
        assert!(!ErrorCategory::MalformedOutput.is_retryable());
    }

    #[test]
    fn test_classify_rate_limit() {
        let err = ErrorClassifier::classify("Rate limit exceeded, please retry", "sonnet");
        assert_eq!(err.category, ErrorCategory::RateLimit);
        assert!(err.is_retryable());
    }

    #[test]
    fn test_classify_auth() {
        let err = ErrorClassifier::classify("Invalid API key provided", "sonnet");
        assert_eq!(err.category, ErrorCategory::Auth);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_classify_network() {
        let err = ErrorClassifier::classify("Connection timed out after 30s", "haiku");
        assert_eq!(err.category, ErrorCategory::Network);
        assert!(err.is_retryable());
    }

    #[test]
    fn test_classify_http_status() {
        let rate_limit = ErrorClassifier::classify_http_status(429, "Rate limited", "sonnet");
        assert_eq!(rate_limit.category, ErrorCategory::RateLimit);

        let auth = ErrorClassifier::classify_http_status(401, "Unauthorized", "sonnet");
        assert_eq!(auth.category, ErrorCategory::Auth);

        let server_error = ErrorClassifier::classify_http_status(503, "Overloaded", "sonnet");
        assert_eq!(server_error.category, ErrorCategory::Transient);
        assert!(server_error.is_retryable());
    }

    #[test]
    fn test_inconclusive_status_falls_back_to_body_text() {
        let rate_limit =
            ErrorClassifier::classify_http_status(418, "quota exceeded for this org", "sonnet");
        assert_eq!(rate_limit.category, ErrorCategory::RateLimit);

        let opaque = ErrorClassifier::classify_http_status(418, "teapot", "sonnet");
        assert_eq!(opaque.category, ErrorCategory::Unknown);
    }

    #[test]
    fn test_malformed_preview_bounded() {
        let raw = "x".repeat(500);
        let err = ForgeError::malformed(Stage::Code, "no parse", &raw);
        if let ForgeError::MalformedOutput { preview, .. } = &err {
            assert_eq!(preview.chars().count(), 200);
        } else {
            panic!("wrong variant");
        }
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::new(Stage::Intent, "confidence out of range")
            .with_field("confidence")
            .with_comparison("0.0..=1.0", "1.4");
        assert!(err.to_string().contains("confidence"));
        assert!(err.to_string().contains("intent"));
    }

    #[test]
    fn test_recommended_delay() {
        let rate_limit = LlmError::new(ErrorCategory::RateLimit, "test");
        assert!(rate_limit.recommended_delay() >= Duration::from_secs(30));

        let custom =
            LlmError::new(ErrorCategory::Unknown, "test").retry_after(Duration::from_secs(100));
        assert_eq!(custom.recommended_delay(), Duration::from_secs(100));
    }
}
