//! Invocation Results
//!
//! A converter turns the provider-shaped [`RawResult`] into a [`ModelResult`]:
//! typed content, a metadata side map and the raw body it came from.

mod raw;
mod stream;

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use raw::{RawBody, RawResult, RawStream};
pub use stream::{AssembledStream, ResultStream, StreamDelta};

use crate::error::{RelayError, Result};
use crate::tool::ToolCall;

/// Metadata key under which token usage is recorded
pub const TOKEN_USAGE: &str = "token_usage";

/// Side map attached to a result
///
/// Entries can be added and replaced but never removed.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata(BTreeMap<String, Value>);

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Embedding vector
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Vector(pub Vec<f32>);

impl Vector {
    pub fn dimensions(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }
}

/// Token usage statistics
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    pub const fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// Reads token usage out of a provider's raw response body
pub trait TokenUsageExtractor: Send + Sync {
    fn extract(&self, raw: &Value) -> Option<TokenUsage>;
}

/// Typed result content
pub enum ResultContent {
    Text(String),
    Vector(Vec<Vector>),
    /// The model asks for tools to be invoked
    ToolCalls(Vec<ToolCall>),
    Binary { data: Vec<u8>, mime_type: String },
    Object(Value),
    Stream(ResultStream),
}

impl ResultContent {
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Vector(_) => "vector",
            Self::ToolCalls(_) => "tool calls",
            Self::Binary { .. } => "binary",
            Self::Object(_) => "object",
            Self::Stream(_) => "stream",
        }
    }
}

impl std::fmt::Debug for ResultContent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Vector(vectors) => f.debug_tuple("Vector").field(vectors).finish(),
            Self::ToolCalls(calls) => f.debug_tuple("ToolCalls").field(calls).finish(),
            Self::Binary { data, mime_type } => f
                .debug_struct("Binary")
                .field("len", &data.len())
                .field("mime_type", mime_type)
                .finish(),
            Self::Object(value) => f.debug_tuple("Object").field(value).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Converted outcome of an invocation
#[derive(Debug)]
pub struct ModelResult {
    content: ResultContent,
    metadata: Metadata,
    raw: Option<Value>,
}

impl ModelResult {
    pub fn new(content: ResultContent) -> Self {
        Self {
            content,
            metadata: Metadata::new(),
            raw: None,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(ResultContent::Text(text.into()))
    }

    pub fn tool_calls_result(calls: Vec<ToolCall>) -> Self {
        Self::new(ResultContent::ToolCalls(calls))
    }

    pub fn object(value: Value) -> Self {
        Self::new(ResultContent::Object(value))
    }

    pub fn vectors(vectors: Vec<Vector>) -> Self {
        Self::new(ResultContent::Vector(vectors))
    }

    pub fn stream(stream: ResultStream) -> Self {
        Self::new(ResultContent::Stream(stream))
    }

    /// Keep the provider body the result was converted from
    #[must_use]
    pub fn with_raw(mut self, raw: Value) -> Self {
        self.raw = Some(raw);
        self
    }

    pub const fn content(&self) -> &ResultContent {
        &self.content
    }

    pub fn into_content(self) -> ResultContent {
        self.content
    }

    /// Replace the content, keeping metadata and raw body
    pub fn set_content(&mut self, content: ResultContent) {
        self.content = content;
    }

    /// Swap the content out, keeping metadata and raw body
    pub fn replace_content(&mut self, content: ResultContent) -> ResultContent {
        std::mem::replace(&mut self.content, content)
    }

    pub const fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub const fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }

    pub const fn raw(&self) -> Option<&Value> {
        self.raw.as_ref()
    }

    pub fn as_text(&self) -> Option<&str> {
        match &self.content {
            ResultContent::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn tool_calls(&self) -> Option<&[ToolCall]> {
        match &self.content {
            ResultContent::ToolCalls(calls) => Some(calls),
            _ => None,
        }
    }

    /// Deserialize an Object result, or a Text result holding JSON
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        match &self.content {
            ResultContent::Object(value) => {
                serde_json::from_value(value.clone()).map_err(|e| RelayError::Parse(e.to_string()))
            }
            ResultContent::Text(text) => {
                serde_json::from_str(text).map_err(|e| RelayError::Parse(e.to_string()))
            }
            other => Err(RelayError::UnexpectedResult(format!(
                "cannot deserialize a {} result",
                other.kind()
            ))),
        }
    }
}
