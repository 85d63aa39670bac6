//! HTTP clients for the Anthropic Messages and OpenAI Chat Completions APIs.
//!
//! Backends return the raw reply body; text extraction lives in
//! `strudel_ai_core::response` so it can be tested without a network.

use crate::config::Config;
use crate::openai::{with_openai_max_tokens, with_openai_temperature};
use serde_json::{json, Map, Value};
use std::future::Future;
use std::pin::Pin;
use strudel_ai_core::Provider;
use thiserror::Error;
use url::Url;

pub const ANTHROPIC_VERSION: &str = "2023-06-01";
const ANTHROPIC_MESSAGES_PATH: &str = "v1/messages";
const OPENAI_CHAT_PATH: &str = "v1/chat/completions";

/// One completion call: a system prompt and a single user turn.
#[derive(Clone)]
pub struct ChatRequest {
    pub provider: Provider,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
    pub system: String,
    pub user: String,
}

impl std::fmt::Debug for ChatRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatRequest")
            .field("provider", &self.provider)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("user_len", &self.user.len())
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ProviderError {
    /// The request never produced an HTTP response (DNS, connect, timeout).
    #[error("Failed to reach {} API.", .provider.label())]
    Transport { provider: Provider, detail: String },

    /// The provider answered with a non-success status.
    #[error("{message}")]
    Upstream {
        provider: Provider,
        status: u16,
        message: String,
    },

    #[error("invalid {} base URL: {detail}", .provider.label())]
    InvalidBaseUrl { provider: Provider, detail: String },

    #[error("failed to create HTTP client: {0}")]
    Client(String),
}

/// Message for a failed upstream call: the body's `error.message`, or a
/// generic `"<Provider> API error."`.
pub fn upstream_error_message(provider: Provider, body: &Value) -> String {
    body.get("error")
        .and_then(|error| error.get("message"))
        .and_then(Value::as_str)
        .filter(|message| !message.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("{} API error.", provider.label()))
}

/// Something that can run a [`ChatRequest`] against a provider.
pub trait LlmBackend: Send + Sync {
    fn complete<'a>(
        &'a self,
        request: &'a ChatRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Value, ProviderError>> + Send + 'a>>;
}

pub fn anthropic_body(request: &ChatRequest) -> Value {
    json!({
        "model": request.model,
        "max_tokens": request.max_tokens,
        "temperature": request.temperature,
        "system": request.system,
        "messages": [{
            "role": "user",
            "content": [{"type": "text", "text": request.user}],
        }],
    })
}

pub fn openai_body(request: &ChatRequest) -> Value {
    let mut body = Map::new();
    body.insert("model".to_string(), Value::from(request.model.as_str()));
    body.insert(
        "messages".to_string(),
        json!([
            {"role": "system", "content": request.system},
            {"role": "user", "content": request.user},
        ]),
    );
    with_openai_max_tokens(&mut body, &request.model, request.max_tokens);
    with_openai_temperature(&mut body, &request.model, request.temperature);
    Value::Object(body)
}

fn endpoint(provider: Provider, base: &Url, path: &str) -> Result<Url, ProviderError> {
    base.join(path).map_err(|err| ProviderError::InvalidBaseUrl {
        provider,
        detail: err.to_string(),
    })
}

/// reqwest-backed [`LlmBackend`].
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    anthropic_url: Url,
    openai_url: Url,
}

impl HttpBackend {
    pub fn new(config: &Config) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ProviderError::Client(e.to_string()))?;
        Ok(Self {
            client,
            anthropic_url: endpoint(
                Provider::Claude,
                config.base_url(Provider::Claude),
                ANTHROPIC_MESSAGES_PATH,
            )?,
            openai_url: endpoint(
                Provider::OpenAi,
                config.base_url(Provider::OpenAi),
                OPENAI_CHAT_PATH,
            )?,
        })
    }

    pub fn endpoint_for(&self, provider: Provider) -> &Url {
        match provider {
            Provider::Claude => &self.anthropic_url,
            Provider::OpenAi => &self.openai_url,
        }
    }

    async fn send(&self, request: &ChatRequest) -> Result<Value, ProviderError> {
        let provider = request.provider;
        let builder = match provider {
            Provider::Claude => self
                .client
                .post(self.anthropic_url.clone())
                .header("x-api-key", &request.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(&anthropic_body(request)),
            Provider::OpenAi => self
                .client
                .post(self.openai_url.clone())
                .bearer_auth(&request.api_key)
                .json(&openai_body(request)),
        };

        let response = builder.send().await.map_err(|err| {
            tracing::warn!(%provider, error = %err, "upstream request failed");
            ProviderError::Transport {
                provider,
                detail: err.to_string(),
            }
        })?;

        let status = response.status();
        // Error bodies are not always JSON; treat unreadable ones as empty.
        let body = response
            .json::<Value>()
            .await
            .unwrap_or_else(|_| Value::Object(Map::new()));

        if !status.is_success() {
            let message = upstream_error_message(provider, &body);
            tracing::warn!(%provider, status = status.as_u16(), %message, "upstream returned an error");
            return Err(ProviderError::Upstream {
                provider,
                status: status.as_u16(),
                message,
            });
        }
        Ok(body)
    }
}

impl LlmBackend for HttpBackend {
    fn complete<'a>(
        &'a self,
        request: &'a ChatRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Value, ProviderError>> + Send + 'a>> {
        Box::pin(self.send(request))
    }
}
