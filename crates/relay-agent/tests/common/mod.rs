//! Scripted platform used by the integration tests
//!
//! The client replays canned bodies in order and records every request; the
//! converter understands `{"text": ...}`, `{"object": ...}`,
//! `{"tool_calls": [...]}` and `{"stream": {"text": [...], "tool_calls": [...]}}`
//! bodies.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use relay_agent::AgentInterface;
use relay_core::error::{RelayError, Result};
use relay_core::{
    Capability, MessageBag, Model, ModelClient, ModelResult, Options, Platform, RawBody,
    RawResult, ResultConverter, ResultStream, StaticCatalog, StreamDelta, TokenUsage,
    TokenUsageExtractor, ToolCall,
};

pub const FAMILY: &str = "scripted";

#[derive(Clone, Debug)]
pub struct Request {
    pub model: String,
    pub payload: Value,
    pub options: Map<String, Value>,
}

#[derive(Default)]
pub struct Script {
    responses: Mutex<VecDeque<Value>>,
    requests: Mutex<Vec<Request>>,
}

impl Script {
    pub fn new(responses: Vec<Value>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

pub fn text(text: &str) -> Value {
    json!({ "text": text, "usage": { "prompt": 12, "completion": 3 } })
}

pub fn object(value: Value) -> Value {
    json!({ "object": value })
}

pub fn tool_calls(calls: &[(&str, &str, Value)]) -> Value {
    let calls: Vec<Value> = calls
        .iter()
        .map(|(id, name, arguments)| json!({ "id": id, "name": name, "arguments": arguments }))
        .collect();
    json!({ "tool_calls": calls })
}

/// Streamed answer: text chunks followed by tool calls
pub fn streamed(chunks: &[&str], calls: &[(&str, &str, Value)]) -> Value {
    json!({ "stream": { "text": chunks, "tool_calls": tool_calls(calls)["tool_calls"] } })
}

pub struct ScriptedClient(pub Arc<Script>);

#[async_trait]
impl ModelClient for ScriptedClient {
    fn supports(&self, model: &Model) -> bool {
        model.family() == FAMILY
    }

    async fn request(
        &self,
        model: &Model,
        payload: Value,
        options: &Map<String, Value>,
    ) -> Result<RawResult> {
        self.0.requests.lock().unwrap().push(Request {
            model: model.name().to_string(),
            payload,
            options: options.clone(),
        });

        let body = self
            .0
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| RelayError::Runtime("script exhausted".into()))?;
        Ok(RawResult::json(200, body))
    }
}

pub struct ScriptedConverter;

impl ResultConverter for ScriptedConverter {
    fn supports(&self, model: &Model) -> bool {
        model.family() == FAMILY
    }

    fn convert(&self, raw: RawResult, _options: &Map<String, Value>) -> Result<ModelResult> {
        let RawBody::Json(body) = raw.body else {
            return Err(RelayError::UnexpectedResult("stream".into()));
        };

        let result = if let Some(stream) = body.get("stream") {
            let chunks: Vec<String> = serde_json::from_value(stream["text"].clone())?;
            let calls: Vec<ToolCall> = serde_json::from_value(stream["tool_calls"].clone())?;
            let deltas = chunks
                .into_iter()
                .map(StreamDelta::Text)
                .chain(calls.into_iter().map(StreamDelta::ToolCall))
                .collect();
            ModelResult::stream(ResultStream::from_deltas(deltas))
        } else if let Some(calls) = body.get("tool_calls") {
            let calls: Vec<ToolCall> = serde_json::from_value(calls.clone())?;
            ModelResult::tool_calls_result(calls)
        } else if let Some(value) = body.get("object") {
            ModelResult::object(value.clone())
        } else {
            let text = body.get("text").and_then(Value::as_str).unwrap_or_default();
            ModelResult::text(text)
        };

        Ok(result.with_raw(body))
    }
}

pub struct ScriptedUsage;

impl TokenUsageExtractor for ScriptedUsage {
    fn extract(&self, raw: &Value) -> Option<TokenUsage> {
        let usage = raw.get("usage")?;
        let prompt = u32::try_from(usage.get("prompt")?.as_u64()?).ok()?;
        let completion = u32::try_from(usage.get("completion")?.as_u64()?).ok()?;
        Some(TokenUsage::new(prompt, completion))
    }
}

pub fn catalog() -> StaticCatalog {
    StaticCatalog::new(FAMILY)
        .with_model(
            "smart",
            [
                Capability::InputMessages,
                Capability::OutputText,
                Capability::OutputStructured,
                Capability::ToolCalling,
            ],
        )
        .with_model("basic", [Capability::InputMessages, Capability::OutputText])
}

pub fn platform(script: &Arc<Script>) -> Arc<Platform> {
    Arc::new(
        Platform::builder(catalog())
            .client(ScriptedClient(Arc::clone(script)))
            .converter(ScriptedConverter)
            .build(),
    )
}

/// Agent stand-in that answers with a fixed text and counts its calls
pub struct CountingAgent {
    name: String,
    reply: Value,
    calls: Mutex<Vec<MessageBag>>,
}

impl CountingAgent {
    pub fn new(name: &str, reply: Value) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            reply,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn received(&self) -> Vec<MessageBag> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AgentInterface for CountingAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn call(&self, messages: &mut MessageBag, _options: Options) -> Result<ModelResult> {
        self.calls.lock().unwrap().push(messages.clone());
        Ok(match &self.reply {
            Value::String(text) => ModelResult::text(text.clone()),
            other => ModelResult::object(other.clone()),
        })
    }
}
