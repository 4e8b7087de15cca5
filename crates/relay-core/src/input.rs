//! Invocation Input

use serde_json::Value;

use crate::message::MessageBag;

/// What a platform invocation is asked to process
#[derive(Clone, Debug)]
pub enum PlatformInput {
    /// Raw text (embedding models, plain completion)
    Text(String),
    /// A conversation
    Messages(MessageBag),
    /// Provider-shaped payload passed through untouched
    Json(Value),
}

impl PlatformInput {
    pub const fn as_messages(&self) -> Option<&MessageBag> {
        match self {
            Self::Messages(messages) => Some(messages),
            _ => None,
        }
    }
}

impl From<&str> for PlatformInput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for PlatformInput {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<MessageBag> for PlatformInput {
    fn from(messages: MessageBag) -> Self {
        Self::Messages(messages)
    }
}

impl From<&MessageBag> for PlatformInput {
    fn from(messages: &MessageBag) -> Self {
        Self::Messages(messages.clone())
    }
}

impl From<Value> for PlatformInput {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}
