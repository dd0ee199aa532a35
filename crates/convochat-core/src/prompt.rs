//! Generic chat prompt templating.
//!
//! A [`ChatPromptTemplate`] is an ordered list of parts. Message parts are
//! role-tagged text templates with `{name}` variables (`{{` and `}}` are
//! literal braces). Placeholder parts splice in a whole list of messages,
//! typically the conversation history.

use std::collections::HashMap;

use thiserror::Error;

use crate::{ChatMessage, Role};

/// Default system prompt for the conversational template.
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful AI assistant. Have a natural conversation with the user.";

/// Placeholder name the conversational template uses for prior turns.
pub const HISTORY_KEY: &str = "history";

/// Variable name the conversational template uses for the new user text.
pub const INPUT_KEY: &str = "input";

/// Prompt error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PromptError {
    #[error("Unclosed '{{' at byte {0}")]
    UnclosedBrace(usize),
    #[error("Unmatched '}}' at byte {0}")]
    UnmatchedBrace(usize),
    #[error("Empty variable name at byte {0}")]
    EmptyVariable(usize),
    #[error("Missing value for variable: {0}")]
    MissingVariable(String),
    #[error("Missing messages for placeholder: {0}")]
    MissingPlaceholder(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Variable(String),
}

/// A parsed text template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextTemplate {
    segments: Vec<Segment>,
}

impl TextTemplate {
    /// Parse a template string.
    ///
    /// # Errors
    /// Returns error on unbalanced braces or an empty `{}`.
    pub fn parse(source: &str) -> Result<Self, PromptError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.char_indices().peekable();

        while let Some((pos, c)) = chars.next() {
            match c {
                '{' if chars.peek().is_some_and(|&(_, n)| n == '{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek().is_some_and(|&(_, n)| n == '}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for (_, n) in chars.by_ref() {
                        if n == '}' {
                            closed = true;
                            break;
                        }
                        name.push(n);
                    }
                    if !closed {
                        return Err(PromptError::UnclosedBrace(pos));
                    }
                    let name = name.trim();
                    if name.is_empty() {
                        return Err(PromptError::EmptyVariable(pos));
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Variable(name.to_string()));
                }
                '}' => return Err(PromptError::UnmatchedBrace(pos)),
                _ => literal.push(c),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Ok(Self { segments })
    }

    /// A template that renders `text` verbatim, braces included.
    #[must_use]
    pub fn literal(text: impl Into<String>) -> Self {
        Self {
            segments: vec![Segment::Literal(text.into())],
        }
    }

    fn variables(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Variable(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Render with the given values.
    ///
    /// # Errors
    /// Returns error if a referenced variable has no value.
    pub fn render(&self, values: &PromptValues) -> Result<String, PromptError> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Variable(name) => {
                    let value = values
                        .text
                        .get(name)
                        .ok_or_else(|| PromptError::MissingVariable(name.clone()))?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }
}

/// One part of a chat prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptPart {
    /// A single role-tagged message rendered from a template.
    Message { role: Role, template: TextTemplate },
    /// A list of messages supplied at format time.
    Placeholder { name: String, optional: bool },
}

/// Values supplied when formatting a prompt.
#[derive(Debug, Clone, Default)]
pub struct PromptValues {
    text: HashMap<String, String>,
    messages: HashMap<String, Vec<ChatMessage>>,
}

impl PromptValues {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a text variable.
    #[must_use]
    pub fn with_text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.text.insert(name.into(), value.into());
        self
    }

    /// Set the messages for a placeholder.
    #[must_use]
    pub fn with_messages(mut self, name: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        self.messages.insert(name.into(), messages);
        self
    }
}

/// Ordered chat prompt template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatPromptTemplate {
    parts: Vec<PromptPart>,
}

impl ChatPromptTemplate {
    /// Create an empty template.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from already-constructed parts.
    #[must_use]
    pub const fn from_parts(parts: Vec<PromptPart>) -> Self {
        Self { parts }
    }

    /// Append a message template.
    ///
    /// # Errors
    /// Returns error if `template` is malformed.
    pub fn message(mut self, role: Role, template: &str) -> Result<Self, PromptError> {
        self.parts.push(PromptPart::Message {
            role,
            template: TextTemplate::parse(template)?,
        });
        Ok(self)
    }

    /// Append a required messages placeholder.
    #[must_use]
    pub fn placeholder(mut self, name: impl Into<String>) -> Self {
        self.parts.push(PromptPart::Placeholder {
            name: name.into(),
            optional: false,
        });
        self
    }

    /// Append a placeholder that renders nothing when no value is given.
    #[must_use]
    pub fn optional_placeholder(mut self, name: impl Into<String>) -> Self {
        self.parts.push(PromptPart::Placeholder {
            name: name.into(),
            optional: true,
        });
        self
    }

    /// System prompt, prior turns, then the new user input.
    ///
    /// The system text is taken literally.
    #[must_use]
    pub fn conversational(system: impl Into<String>) -> Self {
        Self::from_parts(vec![
            PromptPart::Message {
                role: Role::System,
                template: TextTemplate::literal(system),
            },
            PromptPart::Placeholder {
                name: HISTORY_KEY.to_string(),
                optional: false,
            },
            PromptPart::Message {
                role: Role::User,
                template: TextTemplate {
                    segments: vec![Segment::Variable(INPUT_KEY.to_string())],
                },
            },
        ])
    }

    #[must_use]
    pub fn parts(&self) -> &[PromptPart] {
        &self.parts
    }

    /// Every variable and placeholder name, in order of first appearance.
    #[must_use]
    pub fn input_variables(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for part in &self.parts {
            match part {
                PromptPart::Message { template, .. } => {
                    for name in template.variables() {
                        if !names.iter().any(|n| n == name) {
                            names.push(name.to_string());
                        }
                    }
                }
                PromptPart::Placeholder { name, .. } => {
                    if !names.contains(name) {
                        names.push(name.clone());
                    }
                }
            }
        }
        names
    }

    /// Render the template into a message list.
    ///
    /// # Errors
    /// Returns error if a variable or required placeholder has no value.
    pub fn format(&self, values: &PromptValues) -> Result<Vec<ChatMessage>, PromptError> {
        let mut out = Vec::with_capacity(self.parts.len());
        for part in &self.parts {
            match part {
                PromptPart::Message { role, template } => {
                    out.push(ChatMessage::new(*role, template.render(values)?));
                }
                PromptPart::Placeholder { name, optional } => match values.messages.get(name) {
                    Some(messages) => out.extend(messages.iter().cloned()),
                    None if *optional => {}
                    None => return Err(PromptError::MissingPlaceholder(name.clone())),
                },
            }
        }
        Ok(out)
    }
}
