//! OpenRouter provider - `ChatProvider` over an OpenAI-compatible API.
//!
//! Targets OpenRouter's unified chat-completions endpoint, which fronts
//! many upstream vendors behind `<provider>/<model>` ids. Any other
//! OpenAI-compatible server works by overriding the base URL.
//!
//! # Streaming
//!
//! Uses Server-Sent Events. Each event is a `data: <json>` line carrying a
//! `choices[0].delta.content` fragment; the final line is `data: [DONE]`.
//! Usage arrives on the last JSON event when the upstream reports it.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

use crate::ports::{
    ChatProvider, ChunkStream, Completion, ProviderChunk, ProviderError, ProviderRequest,
};

/// Configuration for the OpenRouter provider.
#[derive(Debug, Clone)]
pub struct OpenRouterConfig {
    /// API key for authentication.
    api_key: Secret<String>,
    /// Base URL for the API (default: https://openrouter.ai/api/v1).
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Pooled connections kept per upstream host.
    pub max_connections_per_server: usize,
    /// Idle lifetime before a pooled connection is recycled.
    pub connection_lifetime: Duration,
    /// Whether to allow HTTP/2 (negotiated via ALPN).
    pub use_http2: bool,
}

impl OpenRouterConfig {
    /// Creates a configuration with the given API key and defaults.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Secret::new(api_key.into()),
            base_url: "https://openrouter.ai/api/v1".to_string(),
            timeout: Duration::from_secs(60),
            max_connections_per_server: 100,
            connection_lifetime: Duration::from_secs(5 * 60),
            use_http2: true,
        }
    }

    /// Sets the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the pooled connection cap per host.
    pub fn with_max_connections_per_server(mut self, max: usize) -> Self {
        self.max_connections_per_server = max;
        self
    }

    /// Sets the pooled connection lifetime.
    pub fn with_connection_lifetime(mut self, lifetime: Duration) -> Self {
        self.connection_lifetime = lifetime;
        self
    }

    /// Enables or disables HTTP/2.
    pub fn with_http2(mut self, use_http2: bool) -> Self {
        self.use_http2 = use_http2;
        self
    }

    fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }
}

/// OpenRouter API provider implementation.
///
/// Holds one pooled HTTP client shared by all concurrent requests.
pub struct OpenRouterProvider {
    config: OpenRouterConfig,
    client: Client,
}

impl OpenRouterProvider {
    /// Creates a provider, building the shared pooled client.
    pub fn new(config: OpenRouterConfig) -> Result<Self, ProviderError> {
        let mut builder = Client::builder()
            .timeout(config.timeout)
            .pool_max_idle_per_host(config.max_connections_per_server)
            .pool_idle_timeout(config.connection_lifetime);
        if !config.use_http2 {
            builder = builder.http1_only();
        }
        let client = builder
            .build()
            .map_err(|e| ProviderError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url)
    }

    fn to_api_request(&self, request: &ProviderRequest, stream: bool) -> ApiRequest {
        ApiRequest {
            model: request.model.as_str().to_string(),
            messages: request
                .messages
                .iter()
                .map(|m| ApiMessage {
                    role: match m.role {
                        crate::domain::chat::Role::System => "system",
                        crate::domain::chat::Role::User => "user",
                        crate::domain::chat::Role::Assistant => "assistant",
                    }
                    .to_string(),
                    content: Some(m.content.clone()),
                })
                .collect(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream,
        }
    }

    async fn send_request(
        &self,
        request: &ProviderRequest,
        stream: bool,
    ) -> Result<Response, ProviderError> {
        let api_request = self.to_api_request(request, stream);

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(self.config.api_key())
            .json(&api_request)
            .send()
            .await
            .map_err(|e| self.classify_transport_error(e))?;

        self.handle_response_status(response).await
    }

    fn classify_transport_error(&self, error: reqwest::Error) -> ProviderError {
        if error.is_timeout() {
            ProviderError::Timeout {
                timeout_secs: self.config.timeout.as_secs(),
            }
        } else if error.is_connect() {
            ProviderError::Network(format!("connection failed: {error}"))
        } else {
            ProviderError::Network(error.to_string())
        }
    }

    async fn handle_response_status(&self, response: Response) -> Result<Response, ProviderError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        Err(ProviderError::Status {
            code: status.as_u16(),
            message: truncate_message(&message),
        })
    }
}

/// Error bodies can be arbitrarily large; keep log and client payloads sane.
fn truncate_message(message: &str) -> String {
    const MAX: usize = 512;
    if message.len() <= MAX {
        message.to_string()
    } else {
        let mut end = MAX;
        while !message.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}…", &message[..end])
    }
}

#[async_trait]
impl ChatProvider for OpenRouterProvider {
    async fn complete(&self, request: ProviderRequest) -> Result<Completion, ProviderError> {
        let response = self.send_request(&request, false).await?;

        let body: ApiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(format!("failed to decode response: {e}")))?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .unwrap_or_default();

        let (input_tokens, output_tokens) = body
            .usage
            .map(|u| (u.prompt_tokens, u.completion_tokens))
            .unwrap_or((0, 0));

        Ok(Completion {
            content,
            input_tokens,
            output_tokens,
        })
    }

    async fn complete_stream(
        &self,
        request: ProviderRequest,
    ) -> Result<ChunkStream, ProviderError> {
        let response = self.send_request(&request, true).await?;
        let mut bytes_stream = response.bytes_stream();

        let (tx, rx) = mpsc::channel::<Result<ProviderChunk, ProviderError>>(32);
        let timeout_secs = self.config.timeout.as_secs();

        // SSE events may split across TCP reads; buffer and emit per line.
        tokio::spawn(async move {
            let mut buffer = String::new();
            while let Some(next) = bytes_stream.next().await {
                let bytes = match next {
                    Ok(bytes) => bytes,
                    Err(error) => {
                        let mapped = if error.is_timeout() {
                            ProviderError::Timeout { timeout_secs }
                        } else {
                            ProviderError::Network(format!("stream error: {error}"))
                        };
                        let _ = tx.send(Err(mapped)).await;
                        return;
                    }
                };
                buffer.push_str(&String::from_utf8_lossy(&bytes));

                while let Some(newline) = buffer.find('\n') {
                    let line = buffer[..newline].trim_end_matches('\r').to_string();
                    buffer.drain(..=newline);
                    match parse_stream_line(&line) {
                        Some(StreamLine::Done) => return,
                        Some(StreamLine::Chunk(chunk)) => {
                            if tx.send(Ok(chunk)).await.is_err() {
                                // Consumer hung up; drop the connection.
                                return;
                            }
                        }
                        None => {}
                    }
                }
            }
            debug!("upstream stream ended without a DONE marker");
        });

        Ok(Box::pin(ReceiverStream::new(rx)))
    }
}

/// One parsed SSE line of an OpenAI-compatible stream.
#[derive(Debug, PartialEq, Eq)]
enum StreamLine {
    /// The `[DONE]` terminator.
    Done,
    /// A content or usage chunk.
    Chunk(ProviderChunk),
}

/// Parses a single SSE line; comments, blank lines, and malformed events
/// are skipped.
fn parse_stream_line(line: &str) -> Option<StreamLine> {
    let data = line.strip_prefix("data: ").or_else(|| line.strip_prefix("data:"))?;
    let data = data.trim();
    if data == "[DONE]" {
        return Some(StreamLine::Done);
    }

    let event: StreamEvent = serde_json::from_str(data).ok()?;
    let content = event
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta)
        .and_then(|delta| delta.content)
        .unwrap_or_default();

    let chunk = match event.usage {
        Some(usage) => ProviderChunk {
            content,
            usage: Some(crate::ports::ChunkUsage {
                input_tokens: usage.prompt_tokens,
                output_tokens: usage.completion_tokens,
            }),
        },
        None => ProviderChunk::content(content),
    };
    Some(StreamLine::Chunk(chunk))
}

// ----- OpenAI-compatible API types -----

#[derive(Debug, Serialize)]
struct ApiRequest {
    model: String,
    messages: Vec<ApiMessage>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    choices: Vec<ApiChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    #[serde(default)]
    message: Option<ApiMessage>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct StreamEvent {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Option<StreamDelta>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}
