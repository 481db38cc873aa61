//! Chat-completion backends.

use thiserror::Error;

#[cfg(feature = "llm-openai")]
use crate::config::GenerationConfig;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("llm configuration error: {0}")]
    Config(String),

    #[error("failed to reach llm endpoint: {0}")]
    Network(String),

    #[error("llm http error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("invalid llm response: {0}")]
    InvalidResponse(String),
}

/// A service that turns one user prompt into one reply.
pub trait CompletionBackend {
    fn complete(&self, prompt: &str) -> Result<String, LlmError>;
}

impl<B: CompletionBackend + ?Sized> CompletionBackend for Box<B> {
    fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        (**self).complete(prompt)
    }
}

/// Content of `choices[0].message.content` in a chat-completions reply.
pub fn extract_chat_content(v: &serde_json::Value) -> Result<String, LlmError> {
    v.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(str::to_string)
        .ok_or_else(|| LlmError::InvalidResponse("no choices[0].message.content in response".to_string()))
}

/// OpenAI-compatible `/chat/completions` client (blocking).
#[cfg(feature = "llm-openai")]
pub struct OpenAiChatClient {
    client: reqwest::blocking::Client,
    url: String,
    api_key: String,
    model: String,
    temperature: f32,
}

#[cfg(feature = "llm-openai")]
impl OpenAiChatClient {
    /// Client for `model`, keyed from the environment variable named by
    /// `config.api_key_env`.
    pub fn from_config(config: &GenerationConfig, model: &str) -> Result<Self, LlmError> {
        let api_key = std::env::var(&config.api_key_env).unwrap_or_default();
        let api_key = api_key.trim().to_string();
        if api_key.is_empty() {
            return Err(LlmError::Config(format!(
                "{} is not set (export the API key; do not put it in the config file)",
                config.api_key_env
            )));
        }
        Self::new(config, model, api_key)
    }

    pub fn new(config: &GenerationConfig, model: &str, api_key: String) -> Result<Self, LlmError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::Config(format!("failed to build http client: {e}")))?;
        Ok(Self {
            client,
            url: format!("{}/chat/completions", config.normalized_base_url()),
            api_key,
            model: model.to_string(),
            temperature: config.temperature,
        })
    }

    fn send(&self, body: &serde_json::Value) -> Result<reqwest::blocking::Response, LlmError> {
        self.client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .map_err(|e| LlmError::Network(format!("{}: {e}", self.url)))
    }
}

#[cfg(feature = "llm-openai")]
impl CompletionBackend for OpenAiChatClient {
    fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let mut body = serde_json::json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": self.temperature,
        });

        let mut resp = self.send(&body)?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let text = resp.text().unwrap_or_default();
            // Some deployments pin sampling and reject `temperature`; retry once without it.
            if !(text.contains("temperature") && status == 400) {
                return Err(LlmError::Api { status, body: text });
            }
            if let Some(obj) = body.as_object_mut() {
                obj.remove("temperature");
            }
            tracing::debug!(model = %self.model, "retrying completion without temperature");
            resp = self.send(&body)?;
            if !resp.status().is_success() {
                let status = resp.status().as_u16();
                let text = resp.text().unwrap_or_default();
                return Err(LlmError::Api { status, body: text });
            }
        }

        let v: serde_json::Value = resp
            .json()
            .map_err(|e| LlmError::InvalidResponse(format!("invalid JSON: {e}")))?;
        extract_chat_content(&v)
    }
}
