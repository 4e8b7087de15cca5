//! Default normalizers producing the widely-used chat-completions format.
//!
//! They support every model, so they belong at the end of a contract.

use std::sync::Arc;

use serde_json::{json, Value};

use super::{ContentType, NormalizeContext, Normalizable, Normalizer};
use crate::content::Content;
use crate::error::Result;
use crate::message::MessageKind;
use crate::model::Model;

/// The default normalizer set, in registration order
pub fn default_normalizers() -> Vec<Arc<dyn Normalizer>> {
    vec![
        Arc::new(MessageBagNormalizer),
        Arc::new(SystemMessageNormalizer),
        Arc::new(UserMessageNormalizer),
        Arc::new(AssistantMessageNormalizer),
        Arc::new(ToolResultMessageNormalizer),
        Arc::new(TextNormalizer),
        Arc::new(ImageNormalizer),
        Arc::new(ImageUrlNormalizer),
        Arc::new(AudioNormalizer),
        Arc::new(DocumentNormalizer),
        Arc::new(ToolCallNormalizer),
        Arc::new(ToolDefinitionNormalizer),
    ]
}

/// Conversation → array of messages, each delegated back to the contract
pub struct MessageBagNormalizer;

impl Normalizer for MessageBagNormalizer {
    fn supports(&self, content_type: ContentType, _model: &Model) -> bool {
        content_type == ContentType::MessageBag
    }

    fn normalize(&self, item: Normalizable<'_>, ctx: &NormalizeContext<'_>) -> Result<Value> {
        let Normalizable::MessageBag(messages) = item else {
            return Err(item.mismatch(ContentType::MessageBag));
        };

        messages
            .iter()
            .map(|message| ctx.normalize(Normalizable::Message(message)))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array)
    }
}

pub struct SystemMessageNormalizer;

impl Normalizer for SystemMessageNormalizer {
    fn supports(&self, content_type: ContentType, _model: &Model) -> bool {
        content_type == ContentType::SystemMessage
    }

    fn normalize(&self, item: Normalizable<'_>, _ctx: &NormalizeContext<'_>) -> Result<Value> {
        match item {
            Normalizable::Message(message) => match &message.kind {
                MessageKind::System { content } => Ok(json!({
                    "role": "system",
                    "content": content,
                })),
                _ => Err(item.mismatch(ContentType::SystemMessage)),
            },
            _ => Err(item.mismatch(ContentType::SystemMessage)),
        }
    }
}

/// A single text item collapses to a plain string, anything else becomes a
/// content-part array. Collections are flattened into the array.
pub struct UserMessageNormalizer;

impl Normalizer for UserMessageNormalizer {
    fn supports(&self, content_type: ContentType, _model: &Model) -> bool {
        content_type == ContentType::UserMessage
    }

    fn normalize(&self, item: Normalizable<'_>, ctx: &NormalizeContext<'_>) -> Result<Value> {
        let Normalizable::Message(message) = item else {
            return Err(item.mismatch(ContentType::UserMessage));
        };
        let MessageKind::User { content } = &message.kind else {
            return Err(item.mismatch(ContentType::UserMessage));
        };

        if let [Content::Text { text }] = content.as_slice() {
            return Ok(json!({ "role": "user", "content": text }));
        }

        let mut parts = Vec::with_capacity(content.len());
        for part in content {
            match ctx.normalize(Normalizable::Content(part))? {
                Value::Array(nested) => parts.extend(nested),
                value => parts.push(value),
            }
        }

        Ok(json!({ "role": "user", "content": parts }))
    }
}

pub struct AssistantMessageNormalizer;

impl Normalizer for AssistantMessageNormalizer {
    fn supports(&self, content_type: ContentType, _model: &Model) -> bool {
        content_type == ContentType::AssistantMessage
    }

    fn normalize(&self, item: Normalizable<'_>, ctx: &NormalizeContext<'_>) -> Result<Value> {
        let Normalizable::Message(message) = item else {
            return Err(item.mismatch(ContentType::AssistantMessage));
        };
        let MessageKind::Assistant { content, tool_calls } = &message.kind else {
            return Err(item.mismatch(ContentType::AssistantMessage));
        };

        let mut normalized = json!({ "role": "assistant", "content": content });
        if !tool_calls.is_empty() {
            let calls = tool_calls
                .iter()
                .map(|call| ctx.normalize(Normalizable::ToolCall(call)))
                .collect::<Result<Vec<_>>>()?;
            normalized["tool_calls"] = Value::Array(calls);
        }

        Ok(normalized)
    }
}

pub struct ToolResultMessageNormalizer;

impl Normalizer for ToolResultMessageNormalizer {
    fn supports(&self, content_type: ContentType, _model: &Model) -> bool {
        content_type == ContentType::ToolResultMessage
    }

    fn normalize(&self, item: Normalizable<'_>, _ctx: &NormalizeContext<'_>) -> Result<Value> {
        let Normalizable::Message(message) = item else {
            return Err(item.mismatch(ContentType::ToolResultMessage));
        };
        let MessageKind::ToolResult { tool_call, content } = &message.kind else {
            return Err(item.mismatch(ContentType::ToolResultMessage));
        };

        Ok(json!({
            "role": "tool",
            "tool_call_id": tool_call.id,
            "content": content,
        }))
    }
}

pub struct TextNormalizer;

impl Normalizer for TextNormalizer {
    fn supports(&self, content_type: ContentType, _model: &Model) -> bool {
        content_type == ContentType::Text
    }

    fn normalize(&self, item: Normalizable<'_>, _ctx: &NormalizeContext<'_>) -> Result<Value> {
        match item {
            Normalizable::Content(Content::Text { text }) => Ok(json!({ "type": "text", "text": text })),
            _ => Err(item.mismatch(ContentType::Text)),
        }
    }
}

pub struct ImageNormalizer;

impl Normalizer for ImageNormalizer {
    fn supports(&self, content_type: ContentType, _model: &Model) -> bool {
        content_type == ContentType::Image
    }

    fn normalize(&self, item: Normalizable<'_>, _ctx: &NormalizeContext<'_>) -> Result<Value> {
        match item {
            Normalizable::Content(Content::Image(image)) => Ok(json!({
                "type": "image_url",
                "image_url": { "url": image.data_url() },
            })),
            _ => Err(item.mismatch(ContentType::Image)),
        }
    }
}

pub struct ImageUrlNormalizer;

impl Normalizer for ImageUrlNormalizer {
    fn supports(&self, content_type: ContentType, _model: &Model) -> bool {
        content_type == ContentType::ImageUrl
    }

    fn normalize(&self, item: Normalizable<'_>, _ctx: &NormalizeContext<'_>) -> Result<Value> {
        match item {
            Normalizable::Content(Content::ImageUrl { url }) => Ok(json!({
                "type": "image_url",
                "image_url": { "url": url },
            })),
            _ => Err(item.mismatch(ContentType::ImageUrl)),
        }
    }
}

pub struct AudioNormalizer;

impl Normalizer for AudioNormalizer {
    fn supports(&self, content_type: ContentType, _model: &Model) -> bool {
        content_type == ContentType::Audio
    }

    fn normalize(&self, item: Normalizable<'_>, _ctx: &NormalizeContext<'_>) -> Result<Value> {
        match item {
            Normalizable::Content(Content::Audio(audio)) => Ok(json!({
                "type": "input_audio",
                "input_audio": { "data": audio.to_base64(), "format": audio.format },
            })),
            _ => Err(item.mismatch(ContentType::Audio)),
        }
    }
}

pub struct DocumentNormalizer;

impl Normalizer for DocumentNormalizer {
    fn supports(&self, content_type: ContentType, _model: &Model) -> bool {
        matches!(content_type, ContentType::Document | ContentType::Collection)
    }

    fn normalize(&self, item: Normalizable<'_>, ctx: &NormalizeContext<'_>) -> Result<Value> {
        match item {
            Normalizable::Content(Content::Document(document)) => Ok(json!({
                "type": "file",
                "file": {
                    "filename": document.filename.as_deref().unwrap_or("document"),
                    "file_data": document.data_url(),
                },
            })),
            // nested collections flatten into the surrounding part list
            Normalizable::Content(Content::Collection { items }) => items
                .iter()
                .map(|nested| ctx.normalize(Normalizable::Content(nested)))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            _ => Err(item.mismatch(ContentType::Document)),
        }
    }
}

/// Arguments are sent as a JSON-encoded string
pub struct ToolCallNormalizer;

impl Normalizer for ToolCallNormalizer {
    fn supports(&self, content_type: ContentType, _model: &Model) -> bool {
        content_type == ContentType::ToolCall
    }

    fn normalize(&self, item: Normalizable<'_>, _ctx: &NormalizeContext<'_>) -> Result<Value> {
        let Normalizable::ToolCall(call) = item else {
            return Err(item.mismatch(ContentType::ToolCall));
        };

        Ok(json!({
            "id": call.id,
            "type": "function",
            "function": {
                "name": call.name,
                "arguments": serde_json::to_string(&call.arguments)?,
            },
        }))
    }
}

pub struct ToolDefinitionNormalizer;

impl Normalizer for ToolDefinitionNormalizer {
    fn supports(&self, content_type: ContentType, _model: &Model) -> bool {
        content_type == ContentType::ToolDefinition
    }

    fn normalize(&self, item: Normalizable<'_>, _ctx: &NormalizeContext<'_>) -> Result<Value> {
        let Normalizable::ToolDefinition(tool) = item else {
            return Err(item.mismatch(ContentType::ToolDefinition));
        };

        let mut function = json!({
            "name": tool.name,
            "description": tool.description,
        });
        if let Some(parameters) = &tool.parameters {
            function["parameters"] = parameters.clone();
        }

        Ok(json!({ "type": "function", "function": function }))
    }
}

#[cfg(test)]
mod tests {
    use crate::content::{Content, Image};
    use crate::contract::{Contract, Normalizable};
    use crate::message::{Message, MessageBag};
    use crate::model::Model;
    use crate::tool::{ToolCall, ToolDefinition};
    use serde_json::{json, Map};

    fn model() -> Model {
        Model::new("chat", "gpt", [])
    }

    #[test]
    fn test_conversation_round() {
        let call = ToolCall::new("call_1", "clock", Map::new());
        let bag = MessageBag::from_messages([
            Message::system("helper"),
            Message::user("time?"),
            Message::assistant_tool_calls(vec![call.clone()]),
            Message::tool_result(call, "12:00"),
        ])
        .unwrap();

        let wire = Contract::default()
            .normalize(Normalizable::MessageBag(&bag), &model())
            .unwrap();

        assert_eq!(wire[0], json!({ "role": "system", "content": "helper" }));
        assert_eq!(wire[1], json!({ "role": "user", "content": "time?" }));
        assert_eq!(wire[2]["tool_calls"][0]["function"]["name"], "clock");
        assert_eq!(wire[2]["tool_calls"][0]["function"]["arguments"], "{}");
        assert_eq!(
            wire[3],
            json!({ "role": "tool", "tool_call_id": "call_1", "content": "12:00" })
        );
    }

    #[test]
    fn test_multimodal_user_message_flattens_collections() {
        let message = Message::user_with(vec![
            Content::text("describe"),
            Content::collection(vec![
                Content::Image(Image::new(b"abc".to_vec(), "image/jpeg")),
                Content::image_url("https://example.com/a.png"),
            ]),
        ]);

        let wire = Contract::default()
            .normalize(Normalizable::Message(&message), &model())
            .unwrap();

        let parts = wire["content"].as_array().unwrap();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0]["type"], "text");
        assert_eq!(parts[1]["image_url"]["url"], "data:image/jpeg;base64,YWJj");
        assert_eq!(parts[2]["image_url"]["url"], "https://example.com/a.png");
    }

    #[test]
    fn test_tool_definition() {
        let tool = ToolDefinition::new("clock", "Current time").with_schema(json!({"type": "object"}));
        let wire = Contract::default()
            .create_tool_option(&[tool], &model())
            .unwrap();

        assert_eq!(wire[0]["type"], "function");
        assert_eq!(wire[0]["function"]["name"], "clock");
        assert_eq!(wire[0]["function"]["parameters"]["type"], "object");
    }
}
