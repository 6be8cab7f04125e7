//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! All magic numbers should be defined here with documentation.

/// Pipeline constants
pub mod pipeline {
    /// Maximum items (pages + components + routes) per generation batch.
    /// Also the chunking threshold: architectures at or below this size are
    /// generated in a single call.
    pub const BATCH_SIZE: usize = 5;

    /// Temperature for all structured-output stages (deterministic)
    pub const STRUCTURED_TEMPERATURE: f32 = 0.0;

    /// Maximum output tokens per generation call
    pub const MAX_OUTPUT_TOKENS: usize = 8192;
}

/// Retry constants
pub mod retry {
    /// Maximum attempts per operation (first try included)
    pub const MAX_ATTEMPTS: usize = 3;

    /// Base delay for exponential backoff (milliseconds)
    pub const BASE_DELAY_MS: u64 = 500;

    /// Maximum delay between attempts (seconds)
    pub const MAX_DELAY_SECS: u64 = 30;

    /// Backoff multiplier
    pub const BACKOFF_FACTOR: f32 = 2.0;

    /// Jitter fraction applied to each delay (0.0..=1.0)
    pub const JITTER_FRACTION: f64 = 0.25;
}

/// Output repair constants
pub mod repair {
    /// Maximum characters of raw text carried in a malformed-output error
    pub const MAX_PREVIEW_CHARS: usize = 200;
}

/// Per-stage model maps by tier
pub mod models {
    /// Fast tier: cheapest model everywhere
    pub const FAST: [&str; 4] = [
        "claude-3-5-haiku-latest",
        "claude-3-5-haiku-latest",
        "claude-3-5-haiku-latest",
        "claude-3-5-haiku-latest",
    ];

    /// Balanced tier: cheap classification, stronger generation
    pub const BALANCED: [&str; 4] = [
        "claude-3-5-haiku-latest",
        "claude-sonnet-4-20250514",
        "claude-sonnet-4-20250514",
        "claude-3-5-haiku-latest",
    ];

    /// Quality tier: strongest model for architecture and code
    pub const QUALITY: [&str; 4] = [
        "claude-sonnet-4-20250514",
        "claude-opus-4-20250514",
        "claude-opus-4-20250514",
        "claude-sonnet-4-20250514",
    ];
}

/// Model pricing (USD per million tokens) for cost estimation
pub mod pricing {
    /// (model prefix, input cost, output cost)
    pub const TABLE: [(&str, f64, f64); 3] = [
        ("claude-3-5-haiku", 0.80, 4.00),
        ("claude-sonnet-4", 3.00, 15.00),
        ("claude-opus-4", 15.00, 75.00),
    ];

    /// Fallback pricing for unknown models
    pub const DEFAULT_INPUT: f64 = 3.00;
    pub const DEFAULT_OUTPUT: f64 = 15.00;
}

/// HTTP/Network constants
pub mod network {
    /// Default request timeout (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

    /// Connection timeout (seconds)
    pub const CONNECTION_TIMEOUT_SECS: u64 = 30;
}
