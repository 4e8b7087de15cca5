//! Ollama HTTP client

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use relay_core::error::{RelayError, Result};
use relay_core::options::{MODEL, RESPONSE_FORMAT, STREAM, TOOLS};
use relay_core::{Capability, Model, ModelClient, RawResult, RawStream};

use super::{OllamaConfig, FAMILY};

/// Request keys Ollama reads at the top level; everything else is a model option
const TOP_LEVEL: [&str; 4] = [STREAM, TOOLS, "format", "keep_alive"];

/// A model installed on the Ollama server
#[derive(Clone, Debug, Deserialize)]
pub struct LocalModel {
    pub name: String,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub modified_at: Option<String>,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<LocalModel>,
}

/// Talks to `/api/chat` and `/api/embed`
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
}

impl OllamaClient {
    pub fn new(config: &OllamaConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RelayError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.base_url(),
        })
    }

    /// Create with default localhost settings
    pub fn localhost() -> Result<Self> {
        Self::new(&OllamaConfig::default())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether the server answers `/api/tags`
    pub async fn health_check(&self) -> Result<bool> {
        match self.list_models().await {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::warn!("Ollama health check failed: {}", e);
                Ok(false)
            }
        }
    }

    /// Models installed on the server
    pub async fn list_models(&self) -> Result<Vec<LocalModel>> {
        let response = self
            .http
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(RelayError::Runtime(format!("Listing models failed: {status}")));
        }

        let tags: TagsResponse = response.json().await.map_err(transport)?;
        Ok(tags.models)
    }

    fn is_embedding(model: &Model) -> bool {
        model.supports(Capability::Embeddings) && !model.supports(Capability::OutputText)
    }

    /// Model defaults first, call options on top; known keys are lifted out
    fn split_options(model: &Model, options: &Map<String, Value>) -> (Map<String, Value>, Map<String, Value>) {
        let mut top = Map::new();
        let mut rest = model.options().clone();

        for (key, value) in options {
            if TOP_LEVEL.contains(&key.as_str()) {
                top.insert(key.clone(), value.clone());
            } else if key == RESPONSE_FORMAT {
                if let Some(format) = response_format(value) {
                    top.insert("format".into(), format);
                }
            } else if key != MODEL {
                rest.insert(key.clone(), value.clone());
            }
        }

        (top, rest)
    }

    fn chat_body(model: &Model, payload: Value, options: &Map<String, Value>) -> Value {
        let messages = match payload {
            Value::String(text) => json!([{ "role": "user", "content": text }]),
            other => other,
        };
        let (top, rest) = Self::split_options(model, options);

        let mut body = json!({ "model": model.name(), "messages": messages, "stream": false });
        if let Value::Object(fields) = &mut body {
            fields.extend(top);
            if !rest.is_empty() {
                fields.insert("options".into(), Value::Object(rest));
            }
        }
        body
    }

    fn embed_body(model: &Model, payload: Value, options: &Map<String, Value>) -> Value {
        let (top, rest) = Self::split_options(model, options);

        let mut body = json!({ "model": model.name(), "input": payload });
        if let Value::Object(fields) = &mut body {
            if let Some(keep_alive) = top.get("keep_alive") {
                fields.insert("keep_alive".into(), keep_alive.clone());
            }
            if !rest.is_empty() {
                fields.insert("options".into(), Value::Object(rest));
            }
        }
        body
    }
}

#[async_trait]
impl ModelClient for OllamaClient {
    fn supports(&self, model: &Model) -> bool {
        model.family() == FAMILY
    }

    async fn request(
        &self,
        model: &Model,
        payload: Value,
        options: &Map<String, Value>,
    ) -> Result<RawResult> {
        let (endpoint, body) = if Self::is_embedding(model) {
            ("embed", Self::embed_body(model, payload, options))
        } else {
            ("chat", Self::chat_body(model, payload, options))
        };
        let streaming = body.get(STREAM).and_then(Value::as_bool).unwrap_or(false);

        tracing::debug!(model = %model, endpoint, streaming, "Sending Ollama request");

        let response = self
            .http
            .post(format!("{}/api/{endpoint}", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status().as_u16();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();

        let mut raw = if streaming && response.status().is_success() {
            RawResult::stream(status, ndjson(response))
        } else {
            let text = response.text().await.map_err(transport)?;
            let body = serde_json::from_str(&text).unwrap_or_else(|_| json!({ "error": text }));
            RawResult::json(status, body)
        };
        raw.headers = headers;

        Ok(raw)
    }
}

/// Ollama's `format` for a `response_format` option
fn response_format(value: &Value) -> Option<Value> {
    match value.get("type").and_then(Value::as_str) {
        Some("json_schema") => value.pointer("/json_schema/schema").cloned(),
        Some("json_object") => Some(json!("json")),
        _ => None,
    }
}

fn transport(err: reqwest::Error) -> RelayError {
    RelayError::Runtime(format!("Ollama request failed: {err}"))
}

/// Decode a newline-delimited JSON body lazily
fn ndjson(response: reqwest::Response) -> RawStream {
    Box::pin(async_stream::stream! {
        let mut bytes = response.bytes_stream();
        let mut buffer: Vec<u8> = Vec::new();

        while let Some(chunk) = bytes.next().await {
            match chunk {
                Ok(chunk) => buffer.extend_from_slice(&chunk),
                Err(e) => {
                    yield Err(RelayError::Runtime(format!("Stream error: {e}")));
                    return;
                }
            }

            while let Some(end) = buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=end).collect();
                if let Some(chunk) = decode_line(&line) {
                    yield chunk;
                }
            }
        }

        if let Some(chunk) = decode_line(&buffer) {
            yield chunk;
        }
    })
}

fn decode_line(line: &[u8]) -> Option<Result<Value>> {
    let line = line.trim_ascii();
    if line.is_empty() {
        return None;
    }
    Some(
        serde_json::from_slice(line)
            .map_err(|e| RelayError::Parse(format!("Invalid stream chunk: {e}"))),
    )
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use relay_core::RawBody;

    fn model() -> Model {
        Model::new(FAMILY, "llama3.2", [Capability::InputMessages, Capability::OutputText])
            .with_option("temperature", 0.2)
    }

    fn client(server: &MockServer) -> OllamaClient {
        OllamaClient::new(&OllamaConfig::new(server.uri(), 0)).unwrap()
    }

    #[test]
    fn test_chat_body_splits_options() {
        let mut options = Map::new();
        options.insert(STREAM.into(), json!(true));
        options.insert("seed".into(), json!(7));
        options.insert("temperature".into(), json!(0.9));
        options.insert(
            RESPONSE_FORMAT.into(),
            json!({ "type": "json_schema", "json_schema": { "name": "a", "schema": { "type": "object" } } }),
        );

        let body = OllamaClient::chat_body(&model(), json!([]), &options);

        assert_eq!(body["model"], "llama3.2");
        assert_eq!(body["stream"], true);
        assert_eq!(body["format"], json!({ "type": "object" }));
        assert_eq!(body["options"], json!({ "seed": 7, "temperature": 0.9 }));
        assert!(body.get(RESPONSE_FORMAT).is_none());
    }

    #[test]
    fn test_text_payload_becomes_a_user_message() {
        let body = OllamaClient::chat_body(&model(), json!("hello"), &Map::new());
        assert_eq!(body["messages"], json!([{ "role": "user", "content": "hello" }]));
        assert_eq!(body["options"], json!({ "temperature": 0.2 }));
    }

    #[test]
    fn test_decode_line() {
        assert!(decode_line(b"  \n").is_none());
        assert_eq!(decode_line(b"{\"a\":1}\n").unwrap().unwrap(), json!({ "a": 1 }));
        assert!(matches!(decode_line(b"{oops"), Some(Err(RelayError::Parse(_)))));
    }

    #[tokio::test]
    async fn test_chat_request_on_the_wire() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(json!({ "model": "llama3.2", "stream": false })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message": { "role": "assistant", "content": "Hi!" },
                "done": true,
            })))
            .expect(1)
            .mount(&server)
            .await;

        let raw = client(&server)
            .request(&model(), json!([{ "role": "user", "content": "hello" }]), &Map::new())
            .await
            .unwrap();

        assert_eq!(raw.status, 200);
        assert!(matches!(raw.body, RawBody::Json(ref body) if body["message"]["content"] == "Hi!"));
    }

    #[tokio::test]
    async fn test_stream_is_decoded_per_line() {
        let server = MockServer::start().await;
        let body = concat!(
            "{\"message\":{\"content\":\"Hel\"},\"done\":false}\n",
            "{\"message\":{\"content\":\"lo\"},\"done\":false}\n",
            "{\"message\":{\"content\":\"\"},\"done\":true}",
        );
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/x-ndjson"))
            .mount(&server)
            .await;

        let mut options = Map::new();
        options.insert(STREAM.into(), json!(true));
        let raw = client(&server).request(&model(), json!([]), &options).await.unwrap();

        let RawBody::Stream(stream) = raw.body else {
            panic!("expected a stream body");
        };
        let chunks: Vec<Value> = stream.map(|chunk| chunk.unwrap()).collect().await;
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[1]["message"]["content"], "lo");
        assert_eq!(chunks[2]["done"], true);
    }

    #[tokio::test]
    async fn test_embedding_models_use_embed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embed"))
            .and(body_partial_json(json!({ "model": "nomic-embed-text", "input": "hello" })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "embeddings": [[0.1, 0.2]] })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let embed = Model::new(FAMILY, "nomic-embed-text", [Capability::InputText, Capability::Embeddings]);
        let raw = client(&server).request(&embed, json!("hello"), &Map::new()).await.unwrap();
        assert!(raw.is_success());
    }

    #[tokio::test]
    async fn test_error_bodies_keep_status_and_headers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(
                ResponseTemplate::new(429)
                    .insert_header("Retry-After", "7")
                    .set_body_string("slow down"),
            )
            .mount(&server)
            .await;

        let mut options = Map::new();
        options.insert(STREAM.into(), json!(true));
        let raw = client(&server).request(&model(), json!([]), &options).await.unwrap();

        assert_eq!(raw.status, 429);
        assert_eq!(raw.header("retry-after"), Some("7"));
        assert!(matches!(raw.body, RawBody::Json(ref body) if body["error"] == "slow down"));
    }

    #[tokio::test]
    async fn test_list_models_and_health() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "models": [{ "name": "llama3.2:latest", "size": 2019393189_u64 }],
            })))
            .mount(&server)
            .await;

        let client = client(&server);
        let models = client.list_models().await.unwrap();
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].name, "llama3.2:latest");
        assert!(client.health_check().await.unwrap());
    }

    #[tokio::test]
    async fn test_health_check_reports_unreachable_server() {
        let server = MockServer::start().await;
        let client = client(&server);
        drop(server);

        assert!(!client.health_check().await.unwrap());
    }
}
