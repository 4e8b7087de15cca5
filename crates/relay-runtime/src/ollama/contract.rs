//! Ollama message format
//!
//! Ollama takes one `content` string per message with inline images as a
//! base64 `images` array, object-valued tool call arguments, and tool results
//! keyed by tool name instead of call id.

use std::sync::Arc;

use serde_json::{json, Value};

use relay_core::error::{RelayError, Result};
use relay_core::{
    Content, ContentType, Contract, MessageKind, Model, Normalizable, NormalizeContext, Normalizer,
};

use super::FAMILY;

/// Ollama normalizers ahead of the chat-completions defaults
pub fn contract() -> Contract {
    Contract::create(vec![
        Arc::new(OllamaUserMessageNormalizer),
        Arc::new(OllamaAssistantMessageNormalizer),
        Arc::new(OllamaToolResultNormalizer),
    ])
}

fn is_ollama(model: &Model) -> bool {
    model.family() == FAMILY
}

pub struct OllamaUserMessageNormalizer;

impl OllamaUserMessageNormalizer {
    fn collect(
        part: &Content,
        model: &Model,
        text: &mut Vec<String>,
        images: &mut Vec<String>,
    ) -> Result<()> {
        match part {
            Content::Text { text: t } => text.push(t.clone()),
            Content::Image(image) => images.push(image.to_base64()),
            Content::Collection { items } => {
                for item in items {
                    Self::collect(item, model, text, images)?;
                }
            }
            other => {
                return Err(RelayError::InvalidArgument(format!(
                    "Ollama model '{}' accepts text and inline images, not {}",
                    model.name(),
                    other.content_type()
                )));
            }
        }
        Ok(())
    }
}

impl Normalizer for OllamaUserMessageNormalizer {
    fn supports(&self, content_type: ContentType, model: &Model) -> bool {
        content_type == ContentType::UserMessage && is_ollama(model)
    }

    fn normalize(&self, item: Normalizable<'_>, ctx: &NormalizeContext<'_>) -> Result<Value> {
        let Normalizable::Message(message) = item else {
            return Err(item.mismatch(ContentType::UserMessage));
        };
        let MessageKind::User { content } = &message.kind else {
            return Err(item.mismatch(ContentType::UserMessage));
        };

        let mut text = Vec::new();
        let mut images = Vec::new();
        for part in content {
            Self::collect(part, ctx.model(), &mut text, &mut images)?;
        }

        let mut normalized = json!({ "role": "user", "content": text.join("\n") });
        if !images.is_empty() {
            normalized["images"] = json!(images);
        }
        Ok(normalized)
    }
}

pub struct OllamaAssistantMessageNormalizer;

impl Normalizer for OllamaAssistantMessageNormalizer {
    fn supports(&self, content_type: ContentType, model: &Model) -> bool {
        content_type == ContentType::AssistantMessage && is_ollama(model)
    }

    fn normalize(&self, item: Normalizable<'_>, _ctx: &NormalizeContext<'_>) -> Result<Value> {
        let Normalizable::Message(message) = item else {
            return Err(item.mismatch(ContentType::AssistantMessage));
        };
        let MessageKind::Assistant { content, tool_calls } = &message.kind else {
            return Err(item.mismatch(ContentType::AssistantMessage));
        };

        let mut normalized = json!({
            "role": "assistant",
            "content": content.as_deref().unwrap_or_default(),
        });
        if !tool_calls.is_empty() {
            let calls: Vec<Value> = tool_calls
                .iter()
                .map(|call| {
                    json!({
                        "function": { "name": call.name, "arguments": call.arguments },
                    })
                })
                .collect();
            normalized["tool_calls"] = Value::Array(calls);
        }
        Ok(normalized)
    }
}

pub struct OllamaToolResultNormalizer;

impl Normalizer for OllamaToolResultNormalizer {
    fn supports(&self, content_type: ContentType, model: &Model) -> bool {
        content_type == ContentType::ToolResultMessage && is_ollama(model)
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
            "tool_name": tool_call.name,
            "content": content,
        }))
    }
}
