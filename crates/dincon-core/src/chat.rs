//! Chat completion client for OpenAI-compatible APIs

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::settings::LlmSettings;

/// Prompt in, text out
pub trait ChatCompletion {
    fn complete(&self, prompt: &str) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Blocking client for `POST {base_url}/chat/completions`
#[derive(Debug, Clone)]
pub struct ChatClient {
    base_url: String,
    model: String,
    api_key: String,
    client: reqwest::blocking::Client,
}

impl ChatClient {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            base_url: base_url.into(),
            model: model.into(),
            api_key: api_key.into(),
            client,
        })
    }

    /// Build a client from settings, reading the API key from the environment
    pub fn from_settings(settings: &LlmSettings) -> Result<Self> {
        let api_key = std::env::var(&settings.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .with_context(|| {
                format!(
                    "Missing API key: set {} in the environment or a .env file",
                    settings.api_key_env
                )
            })?;

        Self::new(
            settings.base_url.as_str(),
            settings.model.as_str(),
            api_key,
            Duration::from_secs(settings.timeout_secs),
        )
    }
}

impl<T: ChatCompletion + ?Sized> ChatCompletion for &T {
    fn complete(&self, prompt: &str) -> Result<String> {
        (**self).complete(prompt)
    }
}

impl ChatCompletion for ChatClient {
    fn complete(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        debug!(url = %url, model = %self.model, prompt_len = prompt.len(), "Sending chat request");

        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .context("Failed to call chat completion API")?
            .error_for_status()
            .context("Chat completion API returned an error status")?;

        let payload: ChatResponse = resp.json().context("Invalid chat completion response")?;

        match payload.choices.into_iter().next() {
            Some(Choice {
                message: ResponseMessage {
                    content: Some(text),
                },
            }) => {
                debug!(response_len = text.len(), "Received chat response");
                Ok(text)
            }
            _ => bail!("Unexpected chat completion response: no message content"),
        }
    }
}
