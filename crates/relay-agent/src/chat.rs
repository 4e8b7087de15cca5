//! Chat
//!
//! Persistent conversations on top of an agent: each submitted message is
//! appended to the stored conversation, answered and saved back.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use relay_core::error::{RelayError, Result};
use relay_core::{Message, MessageBag, Options, ResultContent};

use crate::agent::AgentInterface;

/// Unique conversation identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(String);

impl ConversationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Conversation persistence
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn save(&self, id: &ConversationId, messages: &MessageBag) -> Result<()>;

    async fn load(&self, id: &ConversationId) -> Result<Option<MessageBag>>;

    async fn clear(&self, id: &ConversationId) -> Result<()>;
}

/// In-memory message store (for development/testing)
#[derive(Debug, Default)]
pub struct InMemoryMessageStore {
    conversations: RwLock<HashMap<ConversationId, MessageBag>>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn save(&self, id: &ConversationId, messages: &MessageBag) -> Result<()> {
        self.conversations
            .write()
            .await
            .insert(id.clone(), messages.clone());
        Ok(())
    }

    async fn load(&self, id: &ConversationId) -> Result<Option<MessageBag>> {
        Ok(self.conversations.read().await.get(id).cloned())
    }

    async fn clear(&self, id: &ConversationId) -> Result<()> {
        self.conversations.write().await.remove(id);
        Ok(())
    }
}

/// A stored conversation answered by an agent
pub struct Chat {
    id: ConversationId,
    agent: Arc<dyn AgentInterface>,
    store: Arc<dyn MessageStore>,
}

impl Chat {
    pub fn new(agent: Arc<dyn AgentInterface>, store: Arc<dyn MessageStore>) -> Self {
        Self::with_id(ConversationId::new(), agent, store)
    }

    pub fn with_id(
        id: ConversationId,
        agent: Arc<dyn AgentInterface>,
        store: Arc<dyn MessageStore>,
    ) -> Self {
        Self { id, agent, store }
    }

    pub const fn id(&self) -> &ConversationId {
        &self.id
    }

    /// Start over from `messages`
    pub async fn initiate(&self, messages: MessageBag) -> Result<()> {
        self.store.clear(&self.id).await?;
        self.store.save(&self.id, &messages).await
    }

    /// Append a user message, answer it and store the reply
    pub async fn submit(&self, message: Message) -> Result<Message> {
        let mut messages = self.messages().await?;
        messages.push(message)?;

        let result = self.agent.call(&mut messages, Options::new()).await?;
        let reply = match result.into_content() {
            ResultContent::Text(text) => Message::assistant(text),
            ResultContent::Stream(stream) => stream.collect().await?.to_message(),
            other => {
                return Err(RelayError::UnexpectedResult(format!(
                    "chat cannot reply with a {} result",
                    other.kind()
                )));
            }
        };

        messages.push(reply.clone())?;
        self.store.save(&self.id, &messages).await?;

        tracing::debug!(conversation = %self.id, messages = messages.len(), "Chat reply stored");
        Ok(reply)
    }

    /// The stored conversation (empty if nothing was stored yet)
    pub async fn messages(&self) -> Result<MessageBag> {
        Ok(self.store.load(&self.id).await?.unwrap_or_default())
    }
}
