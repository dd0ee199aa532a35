//! History-aware conversation runner.

use convochat_core::{
    ChatHistory, ChatMessage, ChatModel, ChatPromptTemplate, HistoryError, ModelError,
    PromptError, PromptValues,
    prompt::{DEFAULT_SYSTEM_PROMPT, HISTORY_KEY, INPUT_KEY},
};
use tracing::debug;

/// Conversation error.
#[derive(Debug, thiserror::Error)]
pub enum ConversationError {
    #[error("Prompt error: {0}")]
    Prompt(#[from] PromptError),
    #[error("History error: {0}")]
    History(#[from] HistoryError),
    #[error("Model error: {0}")]
    Model(#[from] ModelError),
}

/// Wraps a prompt template and a model so each call sees prior turns.
///
/// Per call: the stored history and the new input are formatted through
/// the template, the model is called once, and on success the input and
/// reply are appended to the history. A failed call leaves it untouched.
pub struct Conversation<M> {
    prompt: ChatPromptTemplate,
    model: M,
    input_key: String,
    history_key: String,
}

impl<M: ChatModel> Conversation<M> {
    /// Conversation with the default system prompt.
    #[must_use]
    pub fn new(model: M) -> Self {
        Self::with_system_prompt(model, DEFAULT_SYSTEM_PROMPT)
    }

    /// Conversation with `[system, history, user "{input}"]` layout.
    #[must_use]
    pub fn with_system_prompt(model: M, system: impl Into<String>) -> Self {
        Self::with_prompt(model, ChatPromptTemplate::conversational(system))
    }

    /// Conversation over an arbitrary template that uses the `input` and
    /// `history` keys.
    #[must_use]
    pub fn with_prompt(model: M, prompt: ChatPromptTemplate) -> Self {
        Self {
            prompt,
            model,
            input_key: INPUT_KEY.to_string(),
            history_key: HISTORY_KEY.to_string(),
        }
    }

    /// Rename the variables the template reads input and history from.
    #[must_use]
    pub fn with_keys(mut self, input_key: impl Into<String>, history_key: impl Into<String>) -> Self {
        self.input_key = input_key.into();
        self.history_key = history_key.into();
        self
    }

    #[must_use]
    pub const fn model(&self) -> &M {
        &self.model
    }

    #[must_use]
    pub const fn prompt(&self) -> &ChatPromptTemplate {
        &self.prompt
    }

    /// Run one turn against `history` and return the reply text.
    ///
    /// # Errors
    /// Returns error if templating, the history backend, or the model fails.
    pub async fn invoke(
        &self,
        history: &dyn ChatHistory,
        input: &str,
    ) -> Result<String, ConversationError> {
        let prior = history.messages().await?;
        let turns = prior.len();

        let values = PromptValues::new()
            .with_messages(self.history_key.clone(), prior)
            .with_text(self.input_key.clone(), input);
        let messages = self.prompt.format(&values)?;

        debug!(
            model = self.model.model_name(),
            prior_messages = turns,
            "invoking conversation"
        );

        let reply = self.model.invoke(&messages).await?.into_text();

        history
            .add_messages(vec![ChatMessage::user(input), ChatMessage::assistant(reply.clone())])
            .await?;

        Ok(reply)
    }
}
