//! Command-line flags shared by the binaries.

use std::{sync::Arc, time::Duration};

use convochat_core::{ChatModel, ModelError};

use crate::{
    ApiKey, ConfigError, ModelConfig, OpenAiChatModel, ScriptedChatModel,
    config::{
        DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_TEMPERATURE, ENV_API_KEY, ENV_BASE_URL,
        ENV_MODEL, ENV_TEMPERATURE, ENV_TIMEOUT_SECS,
    },
};

/// Model selection flags, each with an environment fallback.
#[derive(Debug, Clone, clap::Args)]
pub struct ModelArgs {
    /// API key for the chat completion endpoint
    #[arg(long, env = ENV_API_KEY, hide_env_values = true)]
    pub api_key: Option<String>,

    /// Model name
    #[arg(long, env = ENV_MODEL, default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Base URL of an OpenAI-compatible API
    #[arg(long, env = ENV_BASE_URL, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Sampling temperature (0.0 to 2.0)
    #[arg(long, env = ENV_TEMPERATURE, default_value_t = DEFAULT_TEMPERATURE)]
    pub temperature: f32,

    /// Request timeout in seconds
    #[arg(long, env = ENV_TIMEOUT_SECS, default_value_t = 60)]
    pub timeout_secs: u64,

    /// Override the system prompt
    #[arg(long)]
    pub system_prompt: Option<String>,

    /// Answer locally by echoing input instead of calling the API
    #[arg(long)]
    pub offline: bool,
}

/// Failure turning flags into a model.
#[derive(Debug, thiserror::Error)]
pub enum ModelArgsError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Model(#[from] ModelError),
}

impl ModelArgs {
    /// Build a [`ModelConfig`] from the flags.
    ///
    /// # Errors
    /// Returns error if the key is missing or the temperature is out of range.
    pub fn to_config(&self) -> Result<ModelConfig, ConfigError> {
        let api_key = self
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        let mut config = ModelConfig::new(ApiKey::new(api_key)).with_temperature(self.temperature)?;
        config.model.clone_from(&self.model);
        config.base_url.clone_from(&self.base_url);
        config.timeout = Duration::from_secs(self.timeout_secs);
        if let Some(prompt) = &self.system_prompt {
            config.system_prompt.clone_from(prompt);
        }
        Ok(config)
    }

    /// System prompt to use, for offline mode as well.
    #[must_use]
    pub fn system_prompt(&self) -> String {
        self.system_prompt
            .clone()
            .unwrap_or_else(|| convochat_core::prompt::DEFAULT_SYSTEM_PROMPT.to_string())
    }

    /// Build the model the flags describe.
    ///
    /// # Errors
    /// Returns error if configuration is invalid or the client cannot be built.
    pub fn build_model(&self) -> Result<Arc<dyn ChatModel>, ModelArgsError> {
        if self.offline {
            tracing::info!("offline mode: replies echo the input");
            return Ok(Arc::new(ScriptedChatModel::new()));
        }

        let config = self.to_config()?;
        tracing::info!(model = %config.model, base_url = %config.base_url, "using chat completion endpoint");
        Ok(Arc::new(OpenAiChatModel::new(&config)?))
    }
}
