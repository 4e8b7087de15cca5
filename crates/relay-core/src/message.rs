//! Conversation Messages
//!
//! Standard message format used across the relay crates. A [`MessageBag`]
//! is append-only and guards two invariants on every push:
//!
//! - at most one system message, and only in first position;
//! - a tool result must answer a tool call issued by an earlier assistant
//!   message of the same conversation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::content::Content;
use crate::contract::ContentType;
use crate::error::{RelayError, Result};
use crate::tool::ToolCall;

/// Role of a message sender
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System prompt/instructions
    System,
    /// User input
    User,
    /// Assistant (model) response
    Assistant,
    /// Tool result
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
            Self::Tool => write!(f, "tool"),
        }
    }
}

/// Role-specific message body
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum MessageKind {
    System {
        content: String,
    },
    User {
        content: Vec<Content>,
    },
    Assistant {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
    },
    ToolResult {
        tool_call: ToolCall,
        content: String,
    },
}

/// A single message in a conversation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    #[serde(flatten)]
    pub kind: MessageKind,
}

impl Message {
    pub fn new(kind: MessageKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            kind,
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageKind::System {
            content: content.into(),
        })
    }

    /// Create a plain-text user message
    pub fn user(text: impl Into<String>) -> Self {
        Self::user_with(vec![Content::text(text)])
    }

    /// Create a user message from arbitrary content items
    pub fn user_with(content: Vec<Content>) -> Self {
        Self::new(MessageKind::User { content })
    }

    /// Create a text assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageKind::Assistant {
            content: Some(content.into()),
            tool_calls: Vec::new(),
        })
    }

    /// Create an assistant message requesting tool calls
    pub fn assistant_tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self::new(MessageKind::Assistant {
            content: None,
            tool_calls,
        })
    }

    /// Create a tool result message answering `tool_call`
    pub fn tool_result(tool_call: ToolCall, content: impl Into<String>) -> Self {
        Self::new(MessageKind::ToolResult {
            tool_call,
            content: content.into(),
        })
    }

    pub const fn role(&self) -> Role {
        match self.kind {
            MessageKind::System { .. } => Role::System,
            MessageKind::User { .. } => Role::User,
            MessageKind::Assistant { .. } => Role::Assistant,
            MessageKind::ToolResult { .. } => Role::Tool,
        }
    }

    pub const fn content_type(&self) -> ContentType {
        match self.kind {
            MessageKind::System { .. } => ContentType::SystemMessage,
            MessageKind::User { .. } => ContentType::UserMessage,
            MessageKind::Assistant { .. } => ContentType::AssistantMessage,
            MessageKind::ToolResult { .. } => ContentType::ToolResultMessage,
        }
    }

    /// Text carried by the message, if any (user text items are joined by newlines)
    pub fn text(&self) -> Option<String> {
        match &self.kind {
            MessageKind::System { content } | MessageKind::ToolResult { content, .. } => {
                Some(content.clone())
            }
            MessageKind::Assistant { content, .. } => content.clone(),
            MessageKind::User { content } => {
                let mut texts = Vec::new();
                for item in content {
                    item.collect_text(&mut texts);
                }
                (!texts.is_empty()).then(|| texts.join("\n"))
            }
        }
    }

    /// Tool calls requested by an assistant message
    pub fn tool_calls(&self) -> &[ToolCall] {
        match &self.kind {
            MessageKind::Assistant { tool_calls, .. } => tool_calls,
            _ => &[],
        }
    }
}

/// Ordered, append-only conversation
///
/// Serialized as a plain message list; deserializing replays every message
/// through [`MessageBag::push`].
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<Message>", into = "Vec<Message>")]
pub struct MessageBag {
    messages: Vec<Message>,
}

impl TryFrom<Vec<Message>> for MessageBag {
    type Error = RelayError;

    fn try_from(messages: Vec<Message>) -> Result<Self> {
        Self::from_messages(messages)
    }
}

impl From<MessageBag> for Vec<Message> {
    fn from(bag: MessageBag) -> Self {
        bag.messages
    }
}

impl MessageBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a conversation, validating each message in order
    pub fn from_messages(messages: impl IntoIterator<Item = Message>) -> Result<Self> {
        let mut bag = Self::new();
        for message in messages {
            bag.push(message)?;
        }
        Ok(bag)
    }

    pub fn with_system_prompt(prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(prompt)],
        }
    }

    /// Append a message
    pub fn push(&mut self, message: Message) -> Result<()> {
        match &message.kind {
            MessageKind::System { .. } if !self.messages.is_empty() => {
                return Err(RelayError::InvalidArgument(
                    "a system message is only allowed as the first message".into(),
                ));
            }
            MessageKind::ToolResult { tool_call, .. } if !self.has_tool_call(&tool_call.id) => {
                return Err(RelayError::InvalidArgument(format!(
                    "tool result references unknown tool call '{}'",
                    tool_call.id
                )));
            }
            _ => {}
        }

        self.messages.push(message);
        Ok(())
    }

    /// Insert a system message in front of an existing conversation
    pub fn prepend_system(&mut self, prompt: impl Into<String>) -> Result<()> {
        if self.system().is_some() {
            return Err(RelayError::InvalidArgument(
                "conversation already has a system message".into(),
            ));
        }
        self.messages.insert(0, Message::system(prompt));
        Ok(())
    }

    /// The system prompt, if the conversation has one
    pub fn system(&self) -> Option<&str> {
        match self.messages.first().map(|m| &m.kind) {
            Some(MessageKind::System { content }) => Some(content),
            _ => None,
        }
    }

    /// Text of the most recent user message
    pub fn last_user_text(&self) -> Option<String> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role() == Role::User)
            .and_then(Message::text)
    }

    fn has_tool_call(&self, id: &str) -> bool {
        self.messages
            .iter()
            .flat_map(Message::tool_calls)
            .any(|call| call.id == id)
    }

    /// Get all messages
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    /// Get the last message
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Number of messages
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl<'a> IntoIterator for &'a MessageBag {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    #[test]
    fn test_message_creation() {
        let msg = Message::user("Hello");
        assert_eq!(msg.role(), Role::User);
        assert_eq!(msg.text().as_deref(), Some("Hello"));
    }

    #[test]
    fn test_conversation() {
        let mut conv = MessageBag::with_system_prompt("You are helpful.");
        conv.push(Message::user("Hi")).unwrap();
        conv.push(Message::assistant("Hello!")).unwrap();

        assert_eq!(conv.len(), 3);
        assert_eq!(conv.system(), Some("You are helpful."));
        assert_eq!(conv.last().unwrap().role(), Role::Assistant);
    }

    #[test]
    fn test_system_message_must_be_first() {
        let mut conv = MessageBag::new();
        conv.push(Message::user("Hi")).unwrap();

        assert!(conv.push(Message::system("late")).is_err());
        assert!(conv.prepend_system("early").is_ok());
        assert!(conv.prepend_system("again").is_err());
        assert_eq!(conv.system(), Some("early"));
    }

    #[test]
    fn test_tool_result_requires_preceding_call() {
        let call = ToolCall::new("call_1", "clock", Map::new());

        let mut conv = MessageBag::new();
        conv.push(Message::user("What time is it?")).unwrap();
        assert!(conv.push(Message::tool_result(call.clone(), "noon")).is_err());

        conv.push(Message::assistant_tool_calls(vec![call.clone()])).unwrap();
        conv.push(Message::tool_result(call, "noon")).unwrap();
        assert_eq!(conv.len(), 3);
    }

    #[test]
    fn test_deserialize_replays_invariants() {
        let call = ToolCall::new("call_1", "clock", Map::new());
        let valid = MessageBag::from_messages([
            Message::system("helper"),
            Message::user("What time is it?"),
            Message::assistant_tool_calls(vec![call.clone()]),
            Message::tool_result(call.clone(), "noon"),
        ])
        .unwrap();

        let json = serde_json::to_value(&valid).unwrap();
        assert!(json.is_array());
        let restored: MessageBag = serde_json::from_value(json).unwrap();
        assert_eq!(restored.len(), 4);
        assert_eq!(restored.system(), Some("helper"));

        let late_system = serde_json::to_value(vec![Message::user("Hi"), Message::system("late")]).unwrap();
        let err = serde_json::from_value::<MessageBag>(late_system).unwrap_err();
        assert!(err.to_string().contains("first message"));

        let orphan = serde_json::to_value(vec![Message::user("Hi"), Message::tool_result(call, "noon")]).unwrap();
        assert!(serde_json::from_value::<MessageBag>(orphan).is_err());
    }

    #[test]
    fn test_last_user_text() {
        let conv = MessageBag::from_messages([
            Message::system("helper"),
            Message::user("first"),
            Message::assistant("ok"),
            Message::user("second"),
        ])
        .unwrap();

        assert_eq!(conv.last_user_text().as_deref(), Some("second"));
    }
}
