//! Platform Dispatch
//!
//! Single entry point for invoking any model.
//!
//! ```text
//!   invoke(name) ─► catalog ─► pre-middleware ─► contract (payload + tools)
//!                                                   │
//!        ┌──────────────────────────────────────────┘
//!        ▼
//!   first client supporting model ─► first converter supporting model
//!        │
//!        ▼
//!   DeferredResult ─► post-middleware ─► caller
//! ```
//!
//! Clients and converters are tried in registration order. A missing client
//! or converter is reported before any network call.

mod client;
mod deferred;
mod middleware;

use std::sync::Arc;

pub use client::{ModelClient, ResultConverter};
pub use deferred::DeferredResult;
pub use middleware::{InvocationMiddleware, MessagesInputMiddleware, PostInvocation, PreInvocation};

use crate::catalog::ModelCatalog;
use crate::contract::Contract;
use crate::error::{RelayError, Result};
use crate::input::PlatformInput;
use crate::model::Model;
use crate::options::{Options, TOOLS};

/// More than one component claims the same model
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ambiguity {
    pub model: String,
    /// "client" or "converter"
    pub component: &'static str,
    pub candidates: usize,
}

/// Model dispatch façade
#[derive(Clone)]
pub struct Platform {
    catalog: Arc<dyn ModelCatalog>,
    contract: Contract,
    clients: Vec<Arc<dyn ModelClient>>,
    converters: Vec<Arc<dyn ResultConverter>>,
    middleware: Vec<Arc<dyn InvocationMiddleware>>,
}

impl Platform {
    pub fn builder(catalog: impl ModelCatalog + 'static) -> PlatformBuilder {
        PlatformBuilder::new(Arc::new(catalog))
    }

    pub fn catalog(&self) -> Arc<dyn ModelCatalog> {
        Arc::clone(&self.catalog)
    }

    pub const fn contract(&self) -> &Contract {
        &self.contract
    }

    /// Resolve a model name (with optional `?key=value` overrides) and invoke it
    pub async fn invoke(
        &self,
        model: &str,
        input: impl Into<PlatformInput>,
        options: Options,
    ) -> Result<DeferredResult> {
        let model = self.catalog.get_model(model)?;
        self.invoke_model(model, input, options).await
    }

    /// Invoke an already resolved model
    pub async fn invoke_model(
        &self,
        model: Model,
        input: impl Into<PlatformInput>,
        options: Options,
    ) -> Result<DeferredResult> {
        let mut pre = PreInvocation {
            model,
            input: input.into(),
            options,
        };
        for middleware in &self.middleware {
            middleware.before_invoke(&mut pre).await?;
        }
        let PreInvocation {
            model,
            input,
            options,
        } = pre;

        let payload = self.contract.create_request_payload(&model, &input)?;
        let mut wire = options.values().clone();
        if !options.tools().is_empty() {
            let tools = self.contract.create_tool_option(options.tools(), &model)?;
            wire.insert(TOOLS.into(), tools);
        }

        let client = self
            .clients
            .iter()
            .find(|c| c.supports(&model))
            .ok_or_else(|| RelayError::NoClient(model.name().to_string()))?;
        let converter = self
            .converters
            .iter()
            .find(|c| c.supports(&model))
            .ok_or_else(|| RelayError::NoConverter(model.name().to_string()))?;

        tracing::debug!(
            model = %model,
            family = model.family(),
            tools = options.tools().len(),
            "Dispatching invocation"
        );

        let result = DeferredResult::pending(
            Arc::clone(client),
            Arc::clone(converter),
            model.clone(),
            payload,
            wire,
        );

        let mut post = PostInvocation {
            model,
            result,
            options,
        };
        for middleware in &self.middleware {
            middleware.after_invoke(&mut post).await?;
        }

        Ok(post.result)
    }

    /// Known models claimed by more than one client or converter
    pub fn ambiguities(&self) -> Vec<Ambiguity> {
        let mut found = Vec::new();
        for model in self.catalog.models() {
            let clients = self.clients.iter().filter(|c| c.supports(&model)).count();
            let converters = self.converters.iter().filter(|c| c.supports(&model)).count();

            if clients > 1 {
                found.push(Ambiguity {
                    model: model.name().to_string(),
                    component: "client",
                    candidates: clients,
                });
            }
            if converters > 1 {
                found.push(Ambiguity {
                    model: model.name().to_string(),
                    component: "converter",
                    candidates: converters,
                });
            }
        }
        found
    }
}

impl std::fmt::Debug for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Platform")
            .field("normalizers", &self.contract.len())
            .field("clients", &self.clients.len())
            .field("converters", &self.converters.len())
            .field("middleware", &self.middleware.len())
            .finish()
    }
}

/// Builder for [`Platform`]
pub struct PlatformBuilder {
    catalog: Arc<dyn ModelCatalog>,
    contract: Contract,
    clients: Vec<Arc<dyn ModelClient>>,
    converters: Vec<Arc<dyn ResultConverter>>,
    middleware: Vec<Arc<dyn InvocationMiddleware>>,
}

impl PlatformBuilder {
    pub fn new(catalog: Arc<dyn ModelCatalog>) -> Self {
        Self {
            catalog,
            contract: Contract::default(),
            clients: Vec::new(),
            converters: Vec::new(),
            middleware: Vec::new(),
        }
    }

    #[must_use]
    pub fn contract(mut self, contract: Contract) -> Self {
        self.contract = contract;
        self
    }

    #[must_use]
    pub fn client(mut self, client: impl ModelClient + 'static) -> Self {
        self.clients.push(Arc::new(client));
        self
    }

    #[must_use]
    pub fn converter(mut self, converter: impl ResultConverter + 'static) -> Self {
        self.converters.push(Arc::new(converter));
        self
    }

    #[must_use]
    pub fn middleware(mut self, middleware: impl InvocationMiddleware + 'static) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    pub fn build(self) -> Platform {
        Platform {
            catalog: self.catalog,
            contract: self.contract,
            clients: self.clients,
            converters: self.converters,
            middleware: self.middleware,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::Capability;
    use crate::catalog::StaticCatalog;
    use crate::message::MessageBag;
    use crate::result::{ModelResult, RawResult};
    use crate::tool::ToolDefinition;
    use async_trait::async_trait;
    use serde_json::{json, Map, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns `{"client": tag, "payload": ..., "options": ...}` and counts calls
    struct TagClient {
        tag: &'static str,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ModelClient for TagClient {
        fn supports(&self, model: &Model) -> bool {
            model.family() == "test"
        }

        async fn request(
            &self,
            _model: &Model,
            payload: Value,
            options: &Map<String, Value>,
        ) -> Result<RawResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(RawResult::json(
                200,
                json!({ "client": self.tag, "payload": payload, "options": options }),
            ))
        }
    }

    struct ObjectConverter;

    impl ResultConverter for ObjectConverter {
        fn supports(&self, model: &Model) -> bool {
            model.family() == "test"
        }

        fn convert(&self, raw: RawResult, _options: &Map<String, Value>) -> Result<ModelResult> {
            match raw.body {
                crate::result::RawBody::Json(value) => Ok(ModelResult::object(value)),
                crate::result::RawBody::Stream(_) => Err(RelayError::UnexpectedResult("stream".into())),
            }
        }
    }

    /// Upper-cases text input
    struct ShoutMiddleware;

    #[async_trait]
    impl InvocationMiddleware for ShoutMiddleware {
        async fn before_invoke(&self, invocation: &mut PreInvocation) -> Result<()> {
            if let PlatformInput::Text(text) = &invocation.input {
                invocation.input = PlatformInput::Text(text.to_uppercase());
            }
            Ok(())
        }
    }

    fn catalog() -> StaticCatalog {
        StaticCatalog::new("test")
            .with_model("chat", [Capability::InputText, Capability::OutputText])
            .with_model("messages-only", [Capability::InputMessages, Capability::OutputText])
    }

    fn object(result: &ModelResult) -> &Value {
        match result.content() {
            crate::result::ResultContent::Object(value) => value,
            other => panic!("expected object, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_first_registered_client_wins() {
        let calls = Arc::new(AtomicUsize::new(0));
        let platform = Platform::builder(catalog())
            .client(TagClient { tag: "first", calls: Arc::clone(&calls) })
            .client(TagClient { tag: "second", calls: Arc::clone(&calls) })
            .converter(ObjectConverter)
            .build();

        let result = platform
            .invoke("chat", "hello", Options::new())
            .await
            .unwrap()
            .into_result()
            .await
            .unwrap();

        assert_eq!(object(&result)["client"], "first");
        assert_eq!(platform.ambiguities().len(), 2);
        assert_eq!(platform.ambiguities()[0].component, "client");
    }

    #[tokio::test]
    async fn test_missing_components_fail_before_network() {
        let calls = Arc::new(AtomicUsize::new(0));

        let no_client = Platform::builder(catalog()).converter(ObjectConverter).build();
        let err = no_client.invoke("chat", "hi", Options::new()).await.unwrap_err();
        assert!(matches!(err, RelayError::NoClient(name) if name == "chat"));

        let no_converter = Platform::builder(catalog())
            .client(TagClient { tag: "only", calls: Arc::clone(&calls) })
            .build();
        let err = no_converter.invoke("chat", "hi", Options::new()).await.unwrap_err();
        assert!(matches!(err, RelayError::NoConverter(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_model_in_static_catalog() {
        let platform = Platform::builder(catalog()).build();
        let err = platform.invoke("gpt-9", "hi", Options::new()).await.unwrap_err();
        assert!(matches!(err, RelayError::ModelNotFound(_)));
    }

    #[tokio::test]
    async fn test_result_is_deferred_and_cached() {
        let calls = Arc::new(AtomicUsize::new(0));
        let platform = Platform::builder(catalog())
            .client(TagClient { tag: "only", calls: Arc::clone(&calls) })
            .converter(ObjectConverter)
            .build();

        let mut deferred = platform.invoke("chat", "hi", Options::new()).await.unwrap();
        assert!(!deferred.is_resolved());
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        deferred.resolve().await.unwrap();
        deferred.resolve().await.unwrap();
        assert!(deferred.is_resolved());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_pre_middleware_rewrites_input_before_normalization() {
        let calls = Arc::new(AtomicUsize::new(0));
        let platform = Platform::builder(catalog())
            .client(TagClient { tag: "only", calls })
            .converter(ObjectConverter)
            .middleware(ShoutMiddleware)
            .middleware(MessagesInputMiddleware)
            .build();

        let chat = platform
            .invoke("chat", "hi", Options::new())
            .await
            .unwrap()
            .into_result()
            .await
            .unwrap();
        assert_eq!(object(&chat)["payload"], "HI");

        let wrapped = platform
            .invoke("messages-only", "hi", Options::new())
            .await
            .unwrap()
            .into_result()
            .await
            .unwrap();
        assert_eq!(
            object(&wrapped)["payload"],
            json!([{ "role": "user", "content": "HI" }])
        );
    }

    #[tokio::test]
    async fn test_tools_and_passthrough_options_reach_the_wire() {
        let calls = Arc::new(AtomicUsize::new(0));
        let platform = Platform::builder(catalog())
            .client(TagClient { tag: "only", calls })
            .converter(ObjectConverter)
            .build();

        let options = Options::new()
            .with("temperature", 0.1)
            .with_tools(vec![ToolDefinition::new("clock", "Current time")]);
        let result = platform
            .invoke("chat?seed=3", MessageBag::new(), options)
            .await
            .unwrap()
            .into_result()
            .await
            .unwrap();

        let wire = &object(&result)["options"];
        assert_eq!(wire["temperature"], 0.1);
        assert_eq!(wire["tools"][0]["function"]["name"], "clock");
    }
}
