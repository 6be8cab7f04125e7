//! Model Gateway
//!
//! Thin boundary to the completion service: one request in, raw text plus
//! token-usage counters out. Stateless, no retry logic of its own — the
//! retry wrapper owns re-execution, the gateway only classifies errors into
//! typed categories at the HTTP boundary.

use async_trait::async_trait;
use futures::StreamExt;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::constants::network;
use crate::types::{ErrorCategory, ErrorClassifier, ForgeError, LlmError, Result};

const DEFAULT_API_BASE: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";

// =============================================================================
// Request / Response Types
// =============================================================================

/// Conversation role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One conversation message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Streaming callback: receives (chunk, accumulated-so-far)
pub type ChunkCallback = Arc<dyn Fn(&str, &str) + Send + Sync>;

/// A single completion request
#[derive(Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub system: String,
    pub temperature: f32,
    pub max_output_tokens: usize,
    /// When set, chunk/accumulated pairs are delivered before the final
    /// response resolves
    pub on_chunk: Option<ChunkCallback>,
}

impl std::fmt::Debug for CompletionRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionRequest")
            .field("model", &self.model)
            .field("messages", &self.messages.len())
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("streaming", &self.on_chunk.is_some())
            .finish()
    }
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: vec![Message::user(prompt)],
            system: String::new(),
            temperature: 0.0,
            max_output_tokens: crate::constants::pipeline::MAX_OUTPUT_TOKENS,
            on_chunk: None,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = system.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_output_tokens(mut self, max: usize) -> Self {
        self.max_output_tokens = max;
        self
    }

    pub fn with_chunk_callback(mut self, callback: ChunkCallback) -> Self {
        self.on_chunk = Some(callback);
        self
    }
}

/// Token usage counters reported by the provider
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct GatewayUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl GatewayUsage {
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

/// Raw completion result
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub text: String,
    pub usage: GatewayUsage,
}

// =============================================================================
// Gateway Trait
// =============================================================================

/// Boundary to the underlying generative service
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Send one completion request and return text plus usage counters
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Gateway name for logging
    fn name(&self) -> &str;

    /// Check if the service is reachable
    async fn health_check(&self) -> Result<bool>;
}

/// Shared gateway handle threaded through the pipeline
pub type SharedGateway = Arc<dyn ModelGateway>;

// =============================================================================
// Anthropic Gateway
// =============================================================================

/// Messages API transport with secure API key handling
pub struct AnthropicGateway {
    /// API key stored securely - never exposed in logs or debug output
    api_key: SecretString,
    api_base: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for AnthropicGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicGateway")
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl AnthropicGateway {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_api_base(api_key, DEFAULT_API_BASE)
    }

    pub fn with_api_base(api_key: impl Into<String>, api_base: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(network::DEFAULT_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(network::CONNECTION_TIMEOUT_SECS))
            .build()
            .map_err(|e| ForgeError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key: SecretString::from(api_key.into()),
            api_base: api_base.into(),
            client,
        })
    }

    /// Resolve the key from config or the ANTHROPIC_API_KEY env var
    pub fn from_env_or(api_key: Option<String>) -> Result<Self> {
        let key = api_key
            .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok())
            .ok_or_else(|| {
                ForgeError::Config(
                    "API key not found. Set ANTHROPIC_API_KEY env var or provide in config"
                        .to_string(),
                )
            })?;
        Self::new(key)
    }

    fn build_body(&self, request: &CompletionRequest, stream: bool) -> MessagesRequest {
        MessagesRequest {
            model: request.model.clone(),
            max_tokens: request.max_output_tokens,
            temperature: request.temperature,
            system: if request.system.is_empty() {
                None
            } else {
                Some(request.system.clone())
            },
            messages: request.messages.clone(),
            stream,
        }
    }

    fn map_transport_error(&self, err: reqwest::Error, model: &str) -> ForgeError {
        let category = if err.is_timeout() || err.is_connect() {
            ErrorCategory::Network
        } else {
            ErrorCategory::Transient
        };
        LlmError::new(category, format!("request failed: {}", err))
            .model(model)
            .into()
    }

    async fn complete_oneshot(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        let body = self.build_body(request, false);
        let response = self
            .send(&body, &request.model)
            .await?
            .json::<MessagesResponse>()
            .await
            .map_err(|e| {
                ForgeError::from(
                    LlmError::new(
                        ErrorCategory::Transient,
                        format!("failed to decode response: {}", e),
                    )
                    .model(&request.model),
                )
            })?;

        let text = response
            .content
            .iter()
            .filter_map(|block| block.text.as_deref())
            .collect::<String>();

        if text.is_empty() {
            return Err(LlmError::new(
                ErrorCategory::Transient,
                "no text content in response",
            )
            .model(&request.model)
            .into());
        }

        Ok(CompletionResponse {
            text,
            usage: GatewayUsage {
                input_tokens: response.usage.input_tokens,
                output_tokens: response.usage.output_tokens,
            },
        })
    }

    async fn complete_streaming(
        &self,
        request: &CompletionRequest,
        on_chunk: &ChunkCallback,
    ) -> Result<CompletionResponse> {
        let body = self.build_body(request, true);
        let response = self.send(&body, &request.model).await?;

        let mut decoder = SseDecoder::new();
        let mut stream = response.bytes_stream();

        while let Some(bytes) = stream.next().await {
            let bytes = bytes.map_err(|e| self.map_transport_error(e, &request.model))?;
            decoder.push(&bytes, on_chunk);
        }
        decoder.finish(on_chunk);

        if decoder.accumulated.is_empty() {
            return Err(LlmError::new(
                ErrorCategory::Transient,
                "stream ended without text content",
            )
            .model(&request.model)
            .into());
        }

        Ok(CompletionResponse {
            text: decoder.accumulated,
            usage: decoder.usage,
        })
    }

    async fn send(&self, body: &MessagesRequest, model: &str) -> Result<reqwest::Response> {
        let url = format!("{}/messages", self.api_base);
        debug!(model, "Sending request to messages API");

        let response = self
            .client
            .post(&url)
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e, model))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ErrorClassifier::classify_http_status(status, &body, model).into());
        }

        Ok(response)
    }
}

#[async_trait]
impl ModelGateway for AnthropicGateway {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        info!(
            model = %request.model,
            temperature = request.temperature,
            streaming = request.on_chunk.is_some(),
            "Issuing completion request"
        );

        match request.on_chunk.clone() {
            Some(callback) => self.complete_streaming(&request, &callback).await,
            None => self.complete_oneshot(&request).await,
        }
    }

    fn name(&self) -> &str {
        "anthropic"
    }

    async fn health_check(&self) -> Result<bool> {
        // A request with no key or a bad model still proves reachability;
        // only transport-level failures count as unhealthy.
        let url = format!("{}/messages", self.api_base);
        match self.client.post(&url).send().await {
            Ok(_) => Ok(true),
            Err(e) => {
                warn!("Gateway health check failed: {}", e);
                Ok(false)
            }
        }
    }
}

// =============================================================================
// SSE Decoding
// =============================================================================

/// Incremental decoder for the newline-delimited SSE response body.
/// Partial lines stay buffered across pushes.
struct SseDecoder {
    buffer: String,
    accumulated: String,
    usage: GatewayUsage,
}

impl SseDecoder {
    fn new() -> Self {
        Self {
            buffer: String::new(),
            accumulated: String::new(),
            usage: GatewayUsage::default(),
        }
    }

    fn push(&mut self, bytes: &[u8], on_chunk: &ChunkCallback) {
        self.buffer.push_str(&String::from_utf8_lossy(bytes));

        while let Some(newline) = self.buffer.find('\n') {
            let line = self.buffer[..newline].trim().to_string();
            self.buffer.drain(..=newline);
            self.handle_line(&line, on_chunk);
        }
    }

    /// Process a final event that arrived without a trailing newline
    fn finish(&mut self, on_chunk: &ChunkCallback) {
        let line = std::mem::take(&mut self.buffer);
        self.handle_line(line.trim(), on_chunk);
    }

    fn handle_line(&mut self, line: &str, on_chunk: &ChunkCallback) {
        let Some(data) = line.strip_prefix("data: ") else {
            return;
        };
        let Ok(event) = serde_json::from_str::<StreamEvent>(data) else {
            debug!("skipping unparseable stream event");
            return;
        };

        match event {
            StreamEvent::MessageStart { message } => {
                self.usage.input_tokens = message.usage.input_tokens;
            }
            StreamEvent::ContentBlockDelta { delta } => {
                if let Some(text) = delta.text {
                    self.accumulated.push_str(&text);
                    on_chunk(&text, &self.accumulated);
                }
            }
            StreamEvent::MessageDelta { usage } => {
                self.usage.output_tokens = usage.output_tokens;
            }
            StreamEvent::Other => {}
        }
    }
}

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: usize,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Message>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    usage: WireUsage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct WireUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StreamEvent {
    MessageStart { message: StreamMessage },
    ContentBlockDelta { delta: StreamDelta },
    MessageDelta { usage: WireUsage },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct StreamMessage {
    #[serde(default)]
    usage: WireUsage,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let req = CompletionRequest::new("claude-3-5-haiku-latest", "hello")
            .with_system("be terse")
            .with_temperature(0.0)
            .with_max_output_tokens(1024);
        assert_eq!(req.messages.len(), 1);
        assert_eq!(req.messages[0].role, Role::User);
        assert_eq!(req.system, "be terse");
        assert_eq!(req.max_output_tokens, 1024);
        assert!(req.on_chunk.is_none());
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let gateway = AnthropicGateway::new("sk-secret-key").unwrap();
        let debug = format!("{:?}", gateway);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("sk-secret-key"));
    }

    #[test]
    fn test_stream_event_parse() {
        let event: StreamEvent = serde_json::from_str(
            r#"{"type": "content_block_delta", "index": 0, "delta": {"type": "text_delta", "text": "hi"}}"#,
        )
        .unwrap();
        match event {
            StreamEvent::ContentBlockDelta { delta } => {
                assert_eq!(delta.text.as_deref(), Some("hi"));
            }
            _ => panic!("wrong event"),
        }
    }

    #[test]
    fn test_unknown_stream_event_tolerated() {
        let event: StreamEvent = serde_json::from_str(r#"{"type": "ping"}"#).unwrap();
        assert!(matches!(event, StreamEvent::Other));
    }

    fn noop_chunk() -> ChunkCallback {
        Arc::new(|_, _| {})
    }

    fn delta_line(text: &str) -> String {
        format!(
            "data: {{\"type\": \"content_block_delta\", \"delta\": {{\"type\": \"text_delta\", \"text\": \"{}\"}}}}",
            text
        )
    }

    #[test]
    fn test_decoder_accumulates_deltas() {
        let on_chunk = noop_chunk();
        let mut decoder = SseDecoder::new();
        decoder.push(format!("{}\n{}\n", delta_line("hel"), delta_line("lo")).as_bytes(), &on_chunk);
        decoder.finish(&on_chunk);
        assert_eq!(decoder.accumulated, "hello");
    }

    #[test]
    fn test_decoder_buffers_line_split_across_pushes() {
        let on_chunk = noop_chunk();
        let mut decoder = SseDecoder::new();
        let line = format!("{}\n", delta_line("split"));
        let (head, tail) = line.split_at(20);
        decoder.push(head.as_bytes(), &on_chunk);
        assert!(decoder.accumulated.is_empty());
        decoder.push(tail.as_bytes(), &on_chunk);
        assert_eq!(decoder.accumulated, "split");
    }

    #[test]
    fn test_decoder_flushes_final_event_without_newline() {
        let on_chunk = noop_chunk();
        let mut decoder = SseDecoder::new();
        decoder.push(format!("{}\n", delta_line("first ")).as_bytes(), &on_chunk);
        // Last event arrives with no trailing newline
        decoder.push(delta_line("last").as_bytes(), &on_chunk);
        assert_eq!(decoder.accumulated, "first ");
        decoder.finish(&on_chunk);
        assert_eq!(decoder.accumulated, "first last");
        assert!(decoder.buffer.is_empty());
    }

    #[test]
    fn test_decoder_tracks_usage_events() {
        let on_chunk = noop_chunk();
        let mut decoder = SseDecoder::new();
        decoder.push(
            b"data: {\"type\": \"message_start\", \"message\": {\"usage\": {\"input_tokens\": 42}}}\n",
            &on_chunk,
        );
        decoder.push(
            b"data: {\"type\": \"message_delta\", \"usage\": {\"output_tokens\": 7}}",
            &on_chunk,
        );
        decoder.finish(&on_chunk);
        assert_eq!(decoder.usage.input_tokens, 42);
        assert_eq!(decoder.usage.output_tokens, 7);
    }
}
