//! Normalizer Contract
//!
//! Converts domain objects (conversations, content, tool definitions) into
//! the JSON a particular model family expects on the wire.
//!
//! ```text
//!   Contract ──► [normalizer 0] supports(content_type, model)? ──► normalize
//!            └─► [normalizer 1] ...
//!            └─► [defaults]     chat-completions format
//! ```
//!
//! Selection is first match in registration order and is model-aware: the
//! same image can normalize differently for two families. Provider-specific
//! normalizers are therefore registered ahead of the defaults
//! ([`Contract::create`]).

mod chat;

use std::sync::Arc;

use serde_json::Value;

pub use chat::default_normalizers;

use crate::content::Content;
use crate::error::{RelayError, Result};
use crate::input::PlatformInput;
use crate::message::{Message, MessageBag};
use crate::model::Model;
use crate::tool::{ToolCall, ToolDefinition};

/// Kind of a normalizable item
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContentType {
    MessageBag,
    SystemMessage,
    UserMessage,
    AssistantMessage,
    ToolResultMessage,
    Text,
    Image,
    ImageUrl,
    Audio,
    Document,
    Collection,
    ToolCall,
    ToolDefinition,
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::MessageBag => "message bag",
            Self::SystemMessage => "system message",
            Self::UserMessage => "user message",
            Self::AssistantMessage => "assistant message",
            Self::ToolResultMessage => "tool result message",
            Self::Text => "text content",
            Self::Image => "image content",
            Self::ImageUrl => "image url content",
            Self::Audio => "audio content",
            Self::Document => "document content",
            Self::Collection => "content collection",
            Self::ToolCall => "tool call",
            Self::ToolDefinition => "tool definition",
        };
        f.write_str(name)
    }
}

/// Borrowed item handed to a normalizer
#[derive(Clone, Copy, Debug)]
pub enum Normalizable<'a> {
    MessageBag(&'a MessageBag),
    Message(&'a Message),
    Content(&'a Content),
    ToolCall(&'a ToolCall),
    ToolDefinition(&'a ToolDefinition),
}

impl Normalizable<'_> {
    pub const fn content_type(&self) -> ContentType {
        match self {
            Self::MessageBag(_) => ContentType::MessageBag,
            Self::Message(message) => message.content_type(),
            Self::Content(content) => content.content_type(),
            Self::ToolCall(_) => ContentType::ToolCall,
            Self::ToolDefinition(_) => ContentType::ToolDefinition,
        }
    }

    /// Error for a normalizer handed an item it did not claim
    pub fn mismatch(&self, expected: ContentType) -> RelayError {
        RelayError::InvalidArgument(format!(
            "normalizer for {expected} received {}",
            self.content_type()
        ))
    }
}

/// Context passed to a normalizer
pub struct NormalizeContext<'a> {
    model: &'a Model,
    contract: &'a Contract,
}

impl NormalizeContext<'_> {
    pub const fn model(&self) -> &Model {
        self.model
    }

    /// Normalize a nested item through the same contract
    pub fn normalize(&self, item: Normalizable<'_>) -> Result<Value> {
        self.contract.normalize(item, self.model)
    }
}

/// Converts one kind of item for the models it supports
pub trait Normalizer: Send + Sync {
    fn supports(&self, content_type: ContentType, model: &Model) -> bool;

    fn normalize(&self, item: Normalizable<'_>, ctx: &NormalizeContext<'_>) -> Result<Value>;
}

/// Ordered normalizer registry
#[derive(Clone)]
pub struct Contract {
    normalizers: Vec<Arc<dyn Normalizer>>,
}

impl Default for Contract {
    fn default() -> Self {
        Self::new(default_normalizers())
    }
}

impl Contract {
    /// Use exactly these normalizers, in this order
    pub fn new(normalizers: Vec<Arc<dyn Normalizer>>) -> Self {
        Self { normalizers }
    }

    /// Provider-specific normalizers first, then the defaults
    pub fn create(extra: Vec<Arc<dyn Normalizer>>) -> Self {
        let mut normalizers = extra;
        normalizers.extend(default_normalizers());
        Self::new(normalizers)
    }

    /// Normalize one item with the first normalizer supporting it for `model`
    pub fn normalize(&self, item: Normalizable<'_>, model: &Model) -> Result<Value> {
        let content_type = item.content_type();

        let normalizer = self
            .normalizers
            .iter()
            .find(|n| n.supports(content_type, model))
            .ok_or_else(|| RelayError::NoNormalizer {
                content_type,
                model: model.name().to_string(),
            })?;

        normalizer.normalize(
            item,
            &NormalizeContext {
                model,
                contract: self,
            },
        )
    }

    /// Wire payload for an invocation input
    pub fn create_request_payload(&self, model: &Model, input: &PlatformInput) -> Result<Value> {
        match input {
            PlatformInput::Messages(messages) => {
                self.normalize(Normalizable::MessageBag(messages), model)
            }
            PlatformInput::Text(text) => Ok(Value::String(text.clone())),
            PlatformInput::Json(value) => Ok(value.clone()),
        }
    }

    /// Wire value for the `tools` option
    pub fn create_tool_option(&self, tools: &[ToolDefinition], model: &Model) -> Result<Value> {
        tools
            .iter()
            .map(|tool| self.normalize(Normalizable::ToolDefinition(tool), model))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array)
    }

    pub fn len(&self) -> usize {
        self.normalizers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.normalizers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::Capability;
    use crate::content::Image;
    use serde_json::json;

    /// Writes images as bare base64 for one family only
    struct BareImageNormalizer;

    impl Normalizer for BareImageNormalizer {
        fn supports(&self, content_type: ContentType, model: &Model) -> bool {
            content_type == ContentType::Image && model.family() == "bare"
        }

        fn normalize(&self, item: Normalizable<'_>, _ctx: &NormalizeContext<'_>) -> Result<Value> {
            match item {
                Normalizable::Content(Content::Image(image)) => Ok(json!(image.to_base64())),
                other => Err(other.mismatch(ContentType::Image)),
            }
        }
    }

    #[test]
    fn test_selection_is_model_aware() {
        let contract = Contract::create(vec![Arc::new(BareImageNormalizer)]);
        let image = Content::Image(Image::new(b"abc".to_vec(), "image/png"));

        let bare = Model::new("bare", "m", [Capability::InputImage]);
        let other = Model::new("chat", "m", [Capability::InputImage]);

        assert_eq!(
            contract.normalize(Normalizable::Content(&image), &bare).unwrap(),
            json!("YWJj")
        );
        assert_eq!(
            contract.normalize(Normalizable::Content(&image), &other).unwrap()["type"],
            "image_url"
        );
    }

    #[test]
    fn test_no_supporting_normalizer_is_an_error() {
        let contract = Contract::new(vec![Arc::new(BareImageNormalizer)]);
        let model = Model::new("chat", "m", []);
        let text = Content::text("hi");

        let err = contract.normalize(Normalizable::Content(&text), &model).unwrap_err();
        assert!(matches!(
            err,
            RelayError::NoNormalizer {
                content_type: ContentType::Text,
                ..
            }
        ));
    }

    #[test]
    fn test_request_payload_for_text_input_passes_through() {
        let contract = Contract::default();
        let model = Model::new("chat", "m", []);
        let payload = contract
            .create_request_payload(&model, &PlatformInput::Text("embed me".into()))
            .unwrap();
        assert_eq!(payload, json!("embed me"));
    }
}
