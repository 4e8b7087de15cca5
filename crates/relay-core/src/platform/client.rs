use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::Result;
use crate::model::Model;
use crate::result::{ModelResult, RawResult};

/// Transport adapter for one family of models
///
/// Implement this trait to talk to a new backend. The payload is already in
/// the model's wire format; `options` are the wire options (tool definitions
/// normalized, passthrough keys verbatim).
#[async_trait]
pub trait ModelClient: Send + Sync {
    fn supports(&self, model: &Model) -> bool;

    async fn request(
        &self,
        model: &Model,
        payload: Value,
        options: &Map<String, Value>,
    ) -> Result<RawResult>;
}

/// Decodes a client's raw response into a typed result
///
/// Converters also translate provider error statuses into the
/// authentication / bad-request / rate-limit / runtime error taxonomy.
pub trait ResultConverter: Send + Sync {
    fn supports(&self, model: &Model) -> bool;

    fn convert(&self, raw: RawResult, options: &Map<String, Value>) -> Result<ModelResult>;
}
