//! Scripted chat model for tests and offline runs.

use std::{
    collections::VecDeque,
    sync::{Mutex, PoisonError},
};

use async_trait::async_trait;
use convochat_core::{ChatMessage, ChatModel, ModelError, ModelOutput, Role};

/// Replays queued outputs in order.
///
/// Once the queue is empty it echoes the last user message back. Every
/// request is recorded so callers can assert on what the model saw.
#[derive(Default)]
pub struct ScriptedChatModel {
    script: Mutex<VecDeque<Result<ModelOutput, ModelError>>>,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedChatModel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Model that answers with each reply in turn.
    #[must_use]
    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let model = Self::new();
        for reply in replies {
            model.push_output(ModelOutput::text(reply));
        }
        model
    }

    /// Queue an output.
    pub fn push_output(&self, output: ModelOutput) {
        self.push_result(Ok(output));
    }

    /// Queue a failure.
    pub fn push_error(&self, error: ModelError) {
        self.push_result(Err(error));
    }

    fn push_result(&self, result: Result<ModelOutput, ModelError>) {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(result);
    }

    /// Every message list passed to [`ChatModel::invoke`], oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedChatModel {
    async fn invoke(&self, messages: &[ChatMessage]) -> Result<ModelOutput, ModelError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(messages.to_vec());

        let next = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();

        next.unwrap_or_else(|| {
            let echo = messages
                .iter()
                .rev()
                .find(|m| m.role == Role::User)
                .map(|m| format!("You said: {}", m.content))
                .unwrap_or_default();
            Ok(ModelOutput::text(echo))
        })
    }

    fn model_name(&self) -> &'static str {
        "scripted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replays_then_echoes() {
        let model = ScriptedChatModel::with_replies(["first"]);
        model.push_error(ModelError::Request("down".into()));

        let out = model.invoke(&[ChatMessage::user("a")]).await.unwrap();
        assert_eq!(out.into_text(), "first");

        assert!(model.invoke(&[ChatMessage::user("b")]).await.is_err());

        let out = model.invoke(&[ChatMessage::user("c")]).await.unwrap();
        assert_eq!(out.into_text(), "You said: c");

        assert_eq!(model.requests().len(), 3);
    }
}
