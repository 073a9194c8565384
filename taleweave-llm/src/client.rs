//! LLM Client: one interface over Ollama and OpenAI-compatible backends.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use taleweave_core::config::LlmConfig;
use tracing::{debug, warn};

use crate::error::LlmError;
use crate::prompt::PromptTemplate;
use crate::provider::GenerationProvider;
use crate::types::{GenerationContext, LlmRequest, LlmResponse};

/// Provider backend for LLM inference.
#[derive(Debug, Clone)]
pub enum LlmProvider {
    /// Ollama running locally (recommended).
    Ollama {
        /// e.g. `http://localhost:11434`.
        base_url: String,
    },
    /// OpenAI-compatible API (also llama.cpp server, vLLM, LM Studio).
    OpenAiCompatible {
        /// Server root, without `/v1`.
        base_url: String,
        /// Bearer token; local servers usually need none.
        api_key: Option<String>,
    },
    /// No LLM available. Every call fails, so every turn takes the fallback reply.
    None,
}

/// Routes narrator requests to the configured backend.
pub struct LlmClient {
    provider: LlmProvider,
    http: Client,
    model: String,
    prompt: PromptTemplate,
    max_retries: u32,
    max_tokens: u32,
    temperature: f32,
    timeout_ms: u64,
}

impl std::fmt::Debug for LlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmClient")
            .field("provider", &self.provider_name())
            .field("model", &self.model)
            .field("max_retries", &self.max_retries)
            .field("timeout_ms", &self.timeout_ms)
            .finish_non_exhaustive()
    }
}

impl LlmClient {
    /// Create a new LLM client with the built-in narrator prompt.
    #[must_use]
    pub fn new(provider: LlmProvider, model: impl Into<String>, max_retries: u32) -> Self {
        Self {
            provider,
            http: Client::new(),
            model: model.into(),
            prompt: PromptTemplate::builtin(),
            max_retries,
            max_tokens: 300,
            temperature: 0.8,
            timeout_ms: 60_000,
        }
    }

    /// Create a client with no LLM backend (all calls fail into the fallback reply).
    #[must_use]
    pub fn none() -> Self {
        Self::new(LlmProvider::None, String::new(), 0)
    }

    /// Build a client from the `[llm]` config section.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::ConfigError`] for an unknown provider name or an
    /// unreadable prompt file.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        let provider = match config.provider.to_ascii_lowercase().as_str() {
            "ollama" => LlmProvider::Ollama { base_url },
            "openai" | "openai_compatible" => LlmProvider::OpenAiCompatible {
                base_url,
                api_key: config.api_key.clone(),
            },
            "none" => LlmProvider::None,
            other => return Err(LlmError::ConfigError(format!("unknown LLM provider '{other}'"))),
        };

        let prompt = match &config.prompt_file {
            Some(path) => PromptTemplate::from_file(path)?,
            None => PromptTemplate::builtin(),
        };

        let mut client = Self::new(provider, config.model.clone(), config.max_retries).with_prompt(prompt);
        client.max_tokens = config.max_tokens;
        client.temperature = config.temperature;
        client.timeout_ms = config.request_timeout_ms;
        Ok(client)
    }

    /// Replace the narrator prompt.
    #[must_use]
    pub fn with_prompt(mut self, prompt: PromptTemplate) -> Self {
        self.prompt = prompt;
        self
    }

    /// Check if the LLM client has a backend configured.
    #[must_use]
    pub fn is_available(&self) -> bool {
        !matches!(self.provider, LlmProvider::None)
    }

    fn provider_name(&self) -> &'static str {
        match self.provider {
            LlmProvider::Ollama { .. } => "ollama",
            LlmProvider::OpenAiCompatible { .. } => "openai",
            LlmProvider::None => "none",
        }
    }

    /// Render the narrator prompt for `context` with this client's sampling settings.
    #[must_use]
    pub fn build_request(&self, context: &GenerationContext) -> LlmRequest {
        self.prompt
            .render(context)
            .with_max_tokens(self.max_tokens)
            .with_temperature(self.temperature)
            .with_timeout(self.timeout_ms)
    }

    /// Send a rendered request.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Unavailable`] without a backend, or
    /// [`LlmError::RetriesExhausted`] once every attempt failed.
    pub async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        match &self.provider {
            LlmProvider::None => Err(LlmError::Unavailable("No LLM provider configured".into())),
            LlmProvider::Ollama { base_url } => {
                let url = format!("{base_url}/api/generate");
                let body = json!({
                    "model": self.model,
                    "prompt": format!("{}\n\n{}", request.system, request.user),
                    "stream": false,
                    "options": {
                        "temperature": request.temperature,
                        "num_predict": request.max_tokens,
                    }
                });
                self.post_with_retries(&url, None, &body, request.timeout_ms, |json| {
                    (json["response"].as_str().map(str::to_string), json["eval_count"].as_u64())
                })
                .await
            }
            LlmProvider::OpenAiCompatible { base_url, api_key } => {
                let url = format!("{base_url}/v1/chat/completions");
                let body = json!({
                    "model": self.model,
                    "messages": [
                        { "role": "system", "content": request.system },
                        { "role": "user", "content": request.user },
                    ],
                    "max_tokens": request.max_tokens,
                    "temperature": request.temperature,
                });
                self.post_with_retries(&url, api_key.as_deref(), &body, request.timeout_ms, |json| {
                    (
                        json["choices"][0]["message"]["content"].as_str().map(str::to_string),
                        json["usage"]["completion_tokens"].as_u64(),
                    )
                })
                .await
            }
        }
    }

    async fn post_with_retries(
        &self,
        url: &str,
        bearer: Option<&str>,
        body: &Value,
        timeout_ms: u64,
        read: impl Fn(&Value) -> (Option<String>, Option<u64>),
    ) -> Result<LlmResponse, LlmError> {
        let provider = self.provider_name();
        let mut last_error = String::new();

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                debug!(provider, attempt = attempt + 1, of = self.max_retries + 1, "Retrying LLM call");
            }

            let start = Instant::now();
            let mut builder = self.http.post(url).json(body).timeout(Duration::from_millis(timeout_ms));
            if let Some(key) = bearer {
                builder = builder.bearer_auth(key);
            }
            let result = builder.send().await;
            let latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

            match result {
                Ok(resp) if resp.status().is_success() => {
                    let json: Value = resp.json().await.map_err(|e| LlmError::ParseError(e.to_string()))?;
                    let (text, tokens) = read(&json);
                    let text = text.ok_or_else(|| LlmError::ParseError(format!("no reply text in {json}")))?;
                    return Ok(LlmResponse {
                        text,
                        tokens_generated: tokens.and_then(|t| u32::try_from(t).ok()).unwrap_or(0),
                        latency_ms,
                        model: self.model.clone(),
                    });
                }
                Ok(resp) => {
                    let status = resp.status();
                    last_error = format!("HTTP {status}: {}", resp.text().await.unwrap_or_default());
                    warn!(provider, %status, "LLM backend returned error");
                }
                Err(e) => {
                    last_error = e.to_string();
                    if e.is_timeout() {
                        warn!(provider, timeout_ms, "LLM request timed out");
                    } else {
                        warn!(provider, error = %e, "LLM request failed");
                    }
                }
            }
        }

        Err(LlmError::RetriesExhausted {
            attempts: self.max_retries + 1,
            last_error,
        })
    }
}

#[async_trait]
impl GenerationProvider for LlmClient {
    async fn generate(&self, context: &GenerationContext) -> Result<String, LlmError> {
        let request = self.build_request(context);
        let response = self.complete(&request).await?;
        debug!(
            model = %response.model,
            tokens = response.tokens_generated,
            latency_ms = response.latency_ms,
            "Narrator reply generated"
        );
        let text = response.text.trim();
        if text.is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(text.to_string())
    }

    fn name(&self) -> &str {
        self.provider_name()
    }
}
