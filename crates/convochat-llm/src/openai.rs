//! OpenAI-compatible chat completions client.

use async_trait::async_trait;
use convochat_core::{ChatMessage, ChatModel, ModelError, ModelOutput};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{ApiKey, ModelConfig};

#[derive(Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

/// HTTP client for `POST {base_url}/chat/completions`.
///
/// Works with any OpenAI-compatible provider (Together AI by default,
/// also OpenAI itself, LM Studio, vLLM). One request per call, no retry.
pub struct OpenAiChatModel {
    client: reqwest::Client,
    api_key: ApiKey,
    model: String,
    temperature: f32,
    url: String,
}

impl OpenAiChatModel {
    /// Build a client from configuration.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be constructed.
    pub fn new(config: &ModelConfig) -> Result<Self, ModelError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ModelError::Config(e.to_string()))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            url: config.completions_url(),
        })
    }

    /// Pull `choices[0].message.content` out of a response body.
    fn extract_content(body: &Value) -> Option<String> {
        body.get("choices")?
            .get(0)?
            .get("message")?
            .get("content")?
            .as_str()
            .map(ToString::to_string)
    }
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    async fn invoke(&self, messages: &[ChatMessage]) -> Result<ModelOutput, ModelError> {
        let request = ApiRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
        };

        debug!(model = %self.model, messages = messages.len(), "sending chat completion");

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(self.api_key.expose())
            .json(&request)
            .send()
            .await
            .map_err(|e| ModelError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("Chat completion returned {status}: {body}");
            return Err(ModelError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ModelError::Decode(e.to_string()))?;

        match Self::extract_content(&body) {
            Some(content) => Ok(ModelOutput {
                content: Some(content),
                raw: body,
            }),
            None => {
                warn!("Chat completion response has no message content");
                Ok(ModelOutput::raw(body))
            }
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{Json, Router, extract::State, http::HeaderMap, http::StatusCode, routing::post};
    use serde_json::json;

    use super::*;

    #[derive(Clone, Default)]
    struct Captured {
        requests: Arc<Mutex<Vec<(Option<String>, Value)>>>,
    }

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/v1")
    }

    fn config(base_url: String) -> ModelConfig {
        let mut config = ModelConfig::new(ApiKey::new("test-key"));
        config.base_url = base_url;
        config.model = "test-model".to_string();
        config
    }

    #[tokio::test]
    async fn test_sends_request_and_reads_content() {
        let captured = Captured::default();
        let router = Router::new()
            .route(
                "/v1/chat/completions",
                post(
                    |State(captured): State<Captured>, headers: HeaderMap, Json(body): Json<Value>| async move {
                        let auth = headers
                            .get("authorization")
                            .and_then(|v| v.to_str().ok())
                            .map(ToString::to_string);
                        captured.requests.lock().unwrap().push((auth, body));
                        Json(json!({
                            "choices": [{"message": {"role": "assistant", "content": "Hi there!"}}]
                        }))
                    },
                ),
            )
            .with_state(captured.clone());

        let model = OpenAiChatModel::new(&config(serve(router).await)).unwrap();
        let out = model
            .invoke(&[ChatMessage::system("sys"), ChatMessage::user("hello")])
            .await
            .unwrap();

        assert_eq!(out.content.as_deref(), Some("Hi there!"));

        let requests = captured.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        let (auth, body) = &requests[0];
        assert_eq!(auth.as_deref(), Some("Bearer test-key"));
        assert_eq!(body["model"], "test-model");
        assert_eq!(body["messages"][0], json!({"role": "system", "content": "sys"}));
        assert_eq!(body["messages"][1], json!({"role": "user", "content": "hello"}));
        assert!((body["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_missing_content_falls_back_to_raw() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|| async { Json(json!({"choices": [{"message": {"role": "assistant"}}]})) }),
        );

        let model = OpenAiChatModel::new(&config(serve(router).await)).unwrap();
        let out = model.invoke(&[ChatMessage::user("hello")]).await.unwrap();

        assert!(out.content.is_none());
        assert!(out.into_text().contains("\"choices\""));
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|| async { (StatusCode::UNAUTHORIZED, "bad key") }),
        );

        let model = OpenAiChatModel::new(&config(serve(router).await)).unwrap();
        let err = model.invoke(&[ChatMessage::user("hello")]).await.unwrap_err();

        match err {
            ModelError::Status { status, body } => {
                assert_eq!(status, 401);
                assert_eq!(body, "bad key");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_extract_content() {
        let body = json!({"choices": [{"message": {"content": "x"}}]});
        assert_eq!(OpenAiChatModel::extract_content(&body).as_deref(), Some("x"));
        assert!(OpenAiChatModel::extract_content(&json!({"choices": []})).is_none());
        assert!(
            OpenAiChatModel::extract_content(&json!({"choices": [{"message": {"content": null}}]}))
                .is_none()
        );
    }
}
