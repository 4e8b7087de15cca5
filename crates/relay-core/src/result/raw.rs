use std::collections::HashMap;
use std::pin::Pin;

use futures::Stream;
use serde_json::Value;

use crate::error::Result;

/// Stream of decoded provider chunks
pub type RawStream = Pin<Box<dyn Stream<Item = Result<Value>> + Send>>;

pub enum RawBody {
    Json(Value),
    Stream(RawStream),
}

/// Provider-shaped response handed from a client to a converter
pub struct RawResult {
    pub status: u16,
    /// Header names are lowercase
    pub headers: HashMap<String, String>,
    pub body: RawBody,
}

impl RawResult {
    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: RawBody::Json(body),
        }
    }

    pub fn stream(status: u16, stream: RawStream) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: RawBody::Stream(stream),
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

impl std::fmt::Debug for RawResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let body: &dyn std::fmt::Debug = match &self.body {
            RawBody::Json(value) => value,
            RawBody::Stream(_) => &"<stream>",
        };
        f.debug_struct("RawResult")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body", body)
            .finish()
    }
}
