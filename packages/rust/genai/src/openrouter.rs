//! OpenRouter chat-completions client.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use docforge_shared::{DocforgeError, GenerationConfig, Result};

use crate::{Generation, GenerationRequest, Generator};

const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// User-Agent string for generation requests.
const USER_AGENT: &str = concat!("docforge/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[derive(Debug, Deserialize, Default)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Production [`Generator`] backed by the OpenRouter chat-completions API.
pub struct OpenRouterClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenRouterClient {
    /// Create a client from the `[generation]` config section, reading the
    /// API key from the env var it names.
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            DocforgeError::config(format!(
                "generation API key not found. Set the {} environment variable.",
                config.api_key_env
            ))
        })?;
        if api_key.is_empty() {
            return Err(DocforgeError::config(format!(
                "{} is set but empty",
                config.api_key_env
            )));
        }

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DocforgeError::Generation(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: OPENROUTER_BASE_URL.into(),
            api_key,
            model: config.model.clone(),
        })
    }

    /// Point the client at a different endpoint (for tests with mock servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

impl Generator for OpenRouterClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
            max_tokens: request.max_tokens,
        };

        debug!(model = %self.model, max_tokens = request.max_tokens, "sending generation request");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| DocforgeError::Generation(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            let mut end = detail.len().min(500);
            while !detail.is_char_boundary(end) {
                end -= 1;
            }
            return Err(DocforgeError::Generation(format!(
                "HTTP {status}: {}",
                &detail[..end]
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| DocforgeError::Generation(format!("invalid response body: {e}")))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| DocforgeError::Generation("response contained no choices".into()))?;

        let usage = parsed.usage.unwrap_or_default();

        Ok(Generation {
            text: choice.message.content,
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
            model: self.model.clone(),
        })
    }
}
