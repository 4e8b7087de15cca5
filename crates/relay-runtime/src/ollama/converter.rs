//! Ollama result conversion

use futures::StreamExt;
use serde_json::{Map, Value};

use relay_core::error::{RelayError, Result};
use relay_core::{
    Model, ModelResult, RawBody, RawResult, ResultConverter, ResultStream, StreamDelta,
    TokenUsage, TokenUsageExtractor, ToolCall, Vector,
};

use super::FAMILY;

/// Metadata key for why generation stopped (`stop`, `length`, ...)
pub const DONE_REASON: &str = "done_reason";

/// Converts `/api/chat` and `/api/embed` responses
pub struct OllamaConverter;

impl OllamaConverter {
    /// Map an error status onto the provider error taxonomy
    fn error(raw: &RawResult, body: &Value) -> RelayError {
        let message = body
            .get("error")
            .and_then(Value::as_str)
            .map_or_else(|| format!("status {}", raw.status), ToString::to_string);

        match raw.status {
            401 | 403 => RelayError::Authentication(message),
            400 | 404 | 422 => RelayError::BadRequest(message),
            429 => RelayError::RateLimited {
                message,
                retry_after: raw.header("retry-after").and_then(|s| s.trim().parse().ok()),
            },
            _ => RelayError::Runtime(message),
        }
    }

    fn convert_body(body: Value) -> Result<ModelResult> {
        if let Some(error) = body.get("error").and_then(Value::as_str) {
            return Err(RelayError::Runtime(error.to_string()));
        }

        let mut result = if let Some(embeddings) = body.get("embeddings") {
            let vectors: Vec<Vec<f32>> = serde_json::from_value(embeddings.clone())?;
            ModelResult::vectors(vectors.into_iter().map(Vector).collect())
        } else {
            let message = body
                .get("message")
                .ok_or_else(|| RelayError::UnexpectedResult("response has no message".into()))?;

            let calls = tool_calls(message)?;
            if calls.is_empty() {
                let content = message.get("content").and_then(Value::as_str).unwrap_or_default();
                ModelResult::text(content)
            } else {
                ModelResult::tool_calls_result(calls)
            }
        };

        if let Some(reason) = body.get(DONE_REASON).and_then(Value::as_str) {
            result.metadata_mut().add(DONE_REASON, reason);
        }
        if let Some(model) = body.get("model").and_then(Value::as_str) {
            result.metadata_mut().add("model", model);
        }

        Ok(result.with_raw(body))
    }
}

impl ResultConverter for OllamaConverter {
    fn supports(&self, model: &Model) -> bool {
        model.family() == FAMILY
    }

    fn convert(&self, raw: RawResult, _options: &Map<String, Value>) -> Result<ModelResult> {
        if !raw.is_success() {
            let body = match &raw.body {
                RawBody::Json(body) => body.clone(),
                RawBody::Stream(_) => Value::Null,
            };
            return Err(Self::error(&raw, &body));
        }

        match raw.body {
            RawBody::Json(body) => Self::convert_body(body),
            RawBody::Stream(chunks) => {
                let deltas = chunks.flat_map(|chunk| futures::stream::iter(stream_deltas(chunk)));
                Ok(ModelResult::stream(ResultStream::new(deltas)))
            }
        }
    }
}

/// Tool calls of an assistant message; ids are generated when Ollama omits them
fn tool_calls(message: &Value) -> Result<Vec<ToolCall>> {
    let Some(calls) = message.get("tool_calls").and_then(Value::as_array) else {
        return Ok(Vec::new());
    };

    calls
        .iter()
        .map(|call| {
            let function = call.get("function").unwrap_or(call);
            let name = function
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| RelayError::UnexpectedResult("tool call without a name".into()))?;

            let arguments = match function.get("arguments") {
                Some(Value::Object(arguments)) => arguments.clone(),
                Some(Value::String(encoded)) => serde_json::from_str(encoded)
                    .map_err(|e| RelayError::Parse(format!("tool call arguments for '{name}': {e}")))?,
                _ => Map::new(),
            };

            let id = call
                .get("id")
                .and_then(Value::as_str)
                .map_or_else(|| format!("call_{}", uuid::Uuid::new_v4().simple()), ToString::to_string);

            Ok(ToolCall::new(id, name, arguments))
        })
        .collect()
}

fn stream_deltas(chunk: Result<Value>) -> Vec<Result<StreamDelta>> {
    let chunk = match chunk {
        Ok(chunk) => chunk,
        Err(e) => return vec![Err(e)],
    };
    if let Some(error) = chunk.get("error").and_then(Value::as_str) {
        return vec![Err(RelayError::Runtime(error.to_string()))];
    }
    let Some(message) = chunk.get("message") else {
        return Vec::new();
    };

    let mut deltas = Vec::new();
    if let Some(text) = message.get("content").and_then(Value::as_str) {
        if !text.is_empty() {
            deltas.push(Ok(StreamDelta::Text(text.to_string())));
        }
    }
    match tool_calls(message) {
        Ok(calls) => deltas.extend(calls.into_iter().map(|call| Ok(StreamDelta::ToolCall(call)))),
        Err(e) => deltas.push(Err(e)),
    }
    deltas
}

/// Reads `prompt_eval_count` and `eval_count`
pub struct OllamaUsageExtractor;

impl TokenUsageExtractor for OllamaUsageExtractor {
    fn extract(&self, raw: &Value) -> Option<TokenUsage> {
        let count = |key: &str| raw.get(key).and_then(Value::as_u64).and_then(|n| u32::try_from(n).ok());

        let prompt = count("prompt_eval_count");
        let completion = count("eval_count");
        if prompt.is_none() && completion.is_none() {
            return None;
        }
        Some(TokenUsage::new(prompt.unwrap_or(0), completion.unwrap_or(0)))
    }
}
