use std::sync::Arc;

use serde_json::{Map, Value};

use super::client::{ModelClient, ResultConverter};
use crate::error::{RelayError, Result};
use crate::model::Model;
use crate::result::ModelResult;

/// Everything needed to perform the round trip later
struct PendingCall {
    client: Arc<dyn ModelClient>,
    converter: Arc<dyn ResultConverter>,
    model: Model,
    payload: Value,
    options: Map<String, Value>,
}

impl PendingCall {
    async fn fetch(&self) -> Result<ModelResult> {
        tracing::debug!(model = %self.model, "Requesting model");

        let raw = self
            .client
            .request(&self.model, self.payload.clone(), &self.options)
            .await?;
        self.converter.convert(raw, &self.options)
    }
}

enum State {
    Pending(PendingCall),
    Resolved(ModelResult),
}

/// Result of an invocation whose network call has not necessarily happened
///
/// The request is sent on the first [`resolve`](Self::resolve) or
/// [`into_result`](Self::into_result); the converted result is cached. A
/// failed fetch leaves the result pending.
pub struct DeferredResult {
    state: State,
}

impl DeferredResult {
    pub(crate) fn pending(
        client: Arc<dyn ModelClient>,
        converter: Arc<dyn ResultConverter>,
        model: Model,
        payload: Value,
        options: Map<String, Value>,
    ) -> Self {
        Self {
            state: State::Pending(PendingCall {
                client,
                converter,
                model,
                payload,
                options,
            }),
        }
    }

    /// Wrap an already available result
    pub const fn resolved(result: ModelResult) -> Self {
        Self {
            state: State::Resolved(result),
        }
    }

    pub const fn is_resolved(&self) -> bool {
        matches!(self.state, State::Resolved(_))
    }

    /// The result, if the round trip already happened
    pub const fn result(&self) -> Option<&ModelResult> {
        match &self.state {
            State::Resolved(result) => Some(result),
            State::Pending(_) => None,
        }
    }

    /// Perform the round trip if needed and borrow the result
    pub async fn resolve(&mut self) -> Result<&mut ModelResult> {
        if let State::Pending(call) = &self.state {
            let result = call.fetch().await?;
            self.state = State::Resolved(result);
        }

        match &mut self.state {
            State::Resolved(result) => Ok(result),
            State::Pending(call) => Err(RelayError::Runtime(format!(
                "result for '{}' is still pending",
                call.model
            ))),
        }
    }

    /// Perform the round trip if needed and take the result
    pub async fn into_result(self) -> Result<ModelResult> {
        match self.state {
            State::Resolved(result) => Ok(result),
            State::Pending(call) => call.fetch().await,
        }
    }
}

impl std::fmt::Debug for DeferredResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.state {
            State::Pending(call) => write!(f, "DeferredResult(pending {})", call.model),
            State::Resolved(result) => f.debug_tuple("DeferredResult").field(result).finish(),
        }
    }
}
