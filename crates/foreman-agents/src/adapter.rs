//! Generation adapters.
//!
//! Every backend sits behind the `Generator` trait; the orchestrator never
//! matches on provider names. `HttpGenerator` covers the OpenAI-compatible
//! chat-completions dialect that Claude proxies, Gemini's compat endpoint,
//! Copilot, and most self-hosted gateways all speak.

use crate::error::{AgentError, Result};
use crate::types::{GenerateRequest, GenerateResponse, Provider};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

// ─── Generator ────────────────────────────────────────────────────────────

/// A text-completion backend. Implementations must be cheap to clone behind
/// an `Arc` and safe to call concurrently.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Execute one generation. Transport and API failures surface as `Err`;
    /// a returned `GenerateResponse` is always a usable completion.
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse>;

    /// Which provider family this adapter serves.
    fn provider(&self) -> Provider;
}

// ─── AdapterSet ───────────────────────────────────────────────────────────

/// Provider → adapter lookup, built once at startup and shared read-only.
#[derive(Clone, Default)]
pub struct AdapterSet {
    adapters: BTreeMap<Provider, Arc<dyn Generator>>,
}

impl AdapterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, adapter: Arc<dyn Generator>) -> Self {
        self.adapters.insert(adapter.provider(), adapter);
        self
    }

    pub fn insert(&mut self, adapter: Arc<dyn Generator>) {
        self.adapters.insert(adapter.provider(), adapter);
    }

    pub fn get(&self, provider: Provider) -> Result<Arc<dyn Generator>> {
        self.adapters
            .get(&provider)
            .cloned()
            .ok_or(AgentError::NoAdapter(provider))
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl std::fmt::Debug for AdapterSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterSet")
            .field("providers", &self.adapters.keys().collect::<Vec<_>>())
            .finish()
    }
}

// ─── HttpGenerator ────────────────────────────────────────────────────────

/// Configuration for an OpenAI-compatible chat-completions endpoint.
#[derive(Debug, Clone)]
pub struct HttpGeneratorConfig {
    pub provider: Provider,
    pub endpoint: String,
    pub api_key: String,
    pub default_model: String,
    pub timeout_secs: u64,
}

impl HttpGeneratorConfig {
    /// Read the API key from `api_key_env`; errors when unset so that a
    /// misconfigured roster fails at startup rather than mid-pipeline.
    pub fn from_env(
        provider: Provider,
        endpoint: impl Into<String>,
        api_key_env: &str,
        default_model: impl Into<String>,
    ) -> Result<Self> {
        let api_key = std::env::var(api_key_env).map_err(|_| {
            AgentError::NotConfigured(format!("environment variable {api_key_env} is not set"))
        })?;
        Ok(Self {
            provider,
            endpoint: endpoint.into(),
            api_key,
            default_model: default_model.into(),
            timeout_secs: 120,
        })
    }
}

/// Chat-completions adapter over reqwest.
pub struct HttpGenerator {
    config: HttpGeneratorConfig,
    client: reqwest::Client,
}

impl HttpGenerator {
    pub fn new(config: HttpGeneratorConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AgentError::Network(e.to_string()))?;
        Ok(Self { config, client })
    }
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

#[derive(Deserialize)]
struct ChatUsage {
    #[serde(default)]
    total_tokens: u64,
}

#[async_trait]
impl Generator for HttpGenerator {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse> {
        let model = request
            .model
            .clone()
            .unwrap_or_else(|| self.config.default_model.clone());

        let mut messages = Vec::new();
        if let Some(system) = &request.system_instruction {
            messages.push(json!({"role": "system", "content": system}));
        }
        messages.push(json!({"role": "user", "content": request.prompt}));

        let body = json!({
            "model": model,
            "messages": messages,
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        });

        debug!(provider = %self.config.provider, %model, "sending generation request");

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AgentError::Timeout(self.config.timeout_secs * 1000)
                } else {
                    AgentError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AgentError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| AgentError::InvalidResponse(e.to_string()))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::InvalidResponse("response contained no choices".into()))?;

        Ok(GenerateResponse {
            content: choice.message.content,
            tokens_used: parsed.usage.map(|u| u.total_tokens).unwrap_or(0),
            finish_reason: choice.finish_reason.unwrap_or_else(|| "stop".into()),
        })
    }

    fn provider(&self) -> Provider {
        self.config.provider
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────
