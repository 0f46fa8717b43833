/// LLM Client — the single point of entry for all completion-service calls in Herald.
///
/// ARCHITECTURAL RULE: No other module may call the Anthropic API directly.
/// All LLM interactions MUST go through the `CompletionService` trait, so the
/// pipeline can be exercised against a scripted mock in tests.
///
/// Model: claude-sonnet-4-5 (hardcoded — do not make configurable to prevent drift)
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod json_guard;
pub mod prompts;
pub mod retry;

use retry::{with_retry, RetryPolicy};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// The model used for all LLM calls in Herald.
/// This is intentionally hardcoded to prevent accidental drift.
pub const MODEL: &str = "claude-sonnet-4-5";
const DEFAULT_MAX_TOKENS: u32 = 4096;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("LLM returned empty content")]
    EmptyContent,
}

impl LlmError {
    /// Transient errors (rate limit, 5xx, timeout, transport) are retried with
    /// backoff; everything else fails the call immediately.
    pub fn is_transient(&self) -> bool {
        match self {
            LlmError::Api { status, .. } => *status == 429 || *status >= 500,
            LlmError::Timeout { .. } | LlmError::Http(_) => true,
            _ => false,
        }
    }

    /// The Anthropic API rejects custom temperature for some models with a 400.
    /// Those calls are retried once with temperature omitted.
    fn is_temperature_unsupported(&self) -> bool {
        matches!(
            self,
            LlmError::Api { status: 400, message } if message.to_lowercase().contains("temperature")
        )
    }
}

/// Per-call options for the completion service.
#[derive(Debug, Clone)]
pub struct CompletionOptions {
    pub temperature: Option<f32>,
    /// When set, the system prompt is extended with a JSON-only instruction.
    /// The response *should* be a JSON object but is still untrusted; callers
    /// must funnel it through `json_guard::parse_model_json`.
    pub response_format_json: bool,
    pub max_output_tokens: Option<u32>,
    pub timeout_ms: u64,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: None,
            response_format_json: false,
            max_output_tokens: None,
            timeout_ms: 45_000,
        }
    }
}

/// The completion-service interface the pipeline depends on.
///
/// Carried in `AppState` as `Arc<dyn CompletionService>` so tests can swap in
/// a scripted mock without touching call sites.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(
        &self,
        prompt: &str,
        system: &str,
        options: &CompletionOptions,
    ) -> Result<String, LlmError>;
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

impl AnthropicResponse {
    fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

/// The production completion service: the Anthropic Messages API wrapped with
/// a retry policy (exponential backoff + jitter) and a per-call timeout.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    retry: RetryPolicy,
}

impl LlmClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::builder()
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
            retry: RetryPolicy::default(),
        }
    }

    /// Sends a single request; classification of the outcome (transient vs
    /// terminal) is left to the retry combinator.
    async fn send_once(
        &self,
        prompt: &str,
        system: &str,
        temperature: Option<f32>,
        options: &CompletionOptions,
    ) -> Result<String, LlmError> {
        let request_body = AnthropicRequest {
            model: MODEL,
            max_tokens: options.max_output_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            system,
            temperature,
            messages: vec![AnthropicMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .timeout(std::time::Duration::from_millis(options.timeout_ms))
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout {
                        timeout_ms: options.timeout_ms,
                    }
                } else {
                    LlmError::Http(e)
                }
            })?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<AnthropicError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: AnthropicResponse = response.json().await?;

        debug!(
            "LLM call succeeded: input_tokens={}, output_tokens={}",
            parsed.usage.input_tokens, parsed.usage.output_tokens
        );

        parsed
            .text()
            .map(str::to_string)
            .ok_or(LlmError::EmptyContent)
    }
}

#[async_trait]
impl CompletionService for LlmClient {
    async fn complete(
        &self,
        prompt: &str,
        system: &str,
        options: &CompletionOptions,
    ) -> Result<String, LlmError> {
        let system = if options.response_format_json {
            format!("{system}\n\n{}", prompts::JSON_ONLY_SYSTEM)
        } else {
            system.to_string()
        };

        let result = with_retry(&self.retry, LlmError::is_transient, |_attempt| {
            self.send_once(prompt, &system, options.temperature, options)
        })
        .await;

        // Some models reject a custom temperature outright; retry once without it.
        match result {
            Err(e) if options.temperature.is_some() && e.is_temperature_unsupported() => {
                warn!("Model rejected custom temperature — retrying once with default");
                with_retry(&self.retry, LlmError::is_transient, |_attempt| {
                    self.send_once(prompt, &system, None, options)
                })
                .await
            }
            other => other,
        }
    }
}

#[cfg(test)]
pub mod testing {
    //! Scripted completion-service double shared by pipeline tests.

    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    /// Replays a fixed script of responses, then falls back to `repeat` if set.
    /// Records every prompt it receives so tests can assert on prompt content.
    pub struct MockCompletion {
        script: Mutex<VecDeque<Result<String, u16>>>,
        repeat: Option<String>,
        pub prompts: Mutex<Vec<String>>,
    }

    impl MockCompletion {
        pub fn scripted(responses: Vec<Result<String, u16>>) -> Self {
            Self {
                script: Mutex::new(responses.into_iter().collect()),
                repeat: None,
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn repeating(text: &str) -> Self {
            Self {
                script: Mutex::new(VecDeque::new()),
                repeat: Some(text.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        /// Every call fails with the given status (script empty, no fallback).
        pub fn failing(status: u16) -> Self {
            Self::scripted(vec![Err(status), Err(status), Err(status)])
        }
    }

    #[async_trait]
    impl CompletionService for MockCompletion {
        async fn complete(
            &self,
            prompt: &str,
            _system: &str,
            _options: &CompletionOptions,
        ) -> Result<String, LlmError> {
            self.prompts.lock().unwrap().push(prompt.to_string());

            if let Some(next) = self.script.lock().unwrap().pop_front() {
                return next.map_err(|status| LlmError::Api {
                    status,
                    message: "scripted failure".to_string(),
                });
            }
            match &self.repeat {
                Some(text) => Ok(text.clone()),
                None => Err(LlmError::Api {
                    status: 500,
                    message: "mock script exhausted".to_string(),
                }),
            }
        }
    }
}
