//! Model configuration.

use std::{fmt, time::Duration};

use convochat_core::prompt::DEFAULT_SYSTEM_PROMPT;
use thiserror::Error;

pub const DEFAULT_MODEL: &str = "meta-llama/Llama-4-Maverick-17B-128E-Instruct-FP8";
pub const DEFAULT_BASE_URL: &str = "https://api.together.xyz/v1";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

pub const ENV_API_KEY: &str = "TOGETHER_API_KEY";
pub const ENV_MODEL: &str = "CONVOCHAT_MODEL";
pub const ENV_BASE_URL: &str = "CONVOCHAT_BASE_URL";
pub const ENV_TEMPERATURE: &str = "CONVOCHAT_TEMPERATURE";
pub const ENV_TIMEOUT_SECS: &str = "CONVOCHAT_TIMEOUT_SECS";

/// Configuration error.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Missing API key (set {ENV_API_KEY})")]
    MissingApiKey,
    #[error("Temperature must be within 0.0..=2.0, got {0}")]
    InvalidTemperature(f32),
}

/// Credential for the chat completion endpoint. `Debug` never prints it.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Settings for one chat completion endpoint.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub model: String,
    pub base_url: String,
    pub api_key: ApiKey,
    pub temperature: f32,
    pub timeout: Duration,
    pub system_prompt: String,
}

impl ModelConfig {
    /// Config with the default endpoint and model.
    #[must_use]
    pub fn new(api_key: ApiKey) -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key,
            temperature: DEFAULT_TEMPERATURE,
            timeout: DEFAULT_TIMEOUT,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }

    /// Override the sampling temperature.
    ///
    /// # Errors
    /// Returns error if `temperature` is outside `0.0..=2.0`.
    pub fn with_temperature(mut self, temperature: f32) -> Result<Self, ConfigError> {
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ConfigError::InvalidTemperature(temperature));
        }
        self.temperature = temperature;
        Ok(self)
    }

    /// Full chat completions endpoint URL.
    #[must_use]
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ModelConfig::new(ApiKey::new("secret"));
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert!((config.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert_eq!(config.system_prompt, DEFAULT_SYSTEM_PROMPT);
        assert_eq!(
            config.completions_url(),
            "https://api.together.xyz/v1/chat/completions"
        );
    }

    #[test]
    fn test_trailing_slash_in_base_url() {
        let mut config = ModelConfig::new(ApiKey::new("secret"));
        config.base_url = "http://localhost:1234/v1/".into();
        assert_eq!(config.completions_url(), "http://localhost:1234/v1/chat/completions");
    }

    #[test]
    fn test_temperature_range() {
        let config = ModelConfig::new(ApiKey::new("k"));
        assert!(config.clone().with_temperature(0.0).is_ok());
        assert!(config.clone().with_temperature(2.0).is_ok());
        assert_eq!(
            config.with_temperature(3.5).unwrap_err(),
            ConfigError::InvalidTemperature(3.5)
        );
    }

    #[test]
    fn test_key_is_redacted() {
        let config = ModelConfig::new(ApiKey::new("sk-very-secret"));
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-very-secret"));
        assert!(debug.contains("ApiKey(***)"));
    }
}
