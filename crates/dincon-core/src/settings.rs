//! Optional settings for the chat endpoint and login page
//!
//! Configuration file: ~/.dincon/settings.toml. Every field has a default,
//! so the file may be absent or partial.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::io::read_optional;

pub const SETTINGS_FILE: &str = "settings.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub llm: LlmSettings,

    #[serde(default)]
    pub auth: AuthSettings,
}

/// Chat completion endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    /// Base URL of an OpenAI-compatible API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Name of the environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSettings {
    /// Page opened by `login`
    #[serde(default = "default_login_url")]
    pub login_url: String,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-3.5-turbo-1106".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_login_url() -> String {
    "https://example.com/login".to_string()
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            login_url: default_login_url(),
        }
    }
}

impl Settings {
    /// Load settings.toml from the config directory, defaults if missing
    pub fn load(config_dir: &Path) -> Result<Self> {
        let path = config_dir.join(SETTINGS_FILE);

        let Some(content) = read_optional(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?
        else {
            debug!(path = %path.display(), "No settings file, using defaults");
            return Ok(Self::default());
        };

        toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }
}
