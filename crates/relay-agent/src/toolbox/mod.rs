//! Tool System
//!
//! Executable tools for agents. A [`Tool`] pairs the definition a model sees
//! with an async handler; a [`Toolbox`] holds a fixed set of them and turns
//! tool calls into [`ToolResult`]s.
//!
//! Failure taxonomy:
//!
//! - an unknown tool name is fatal ([`RelayError::ToolNotFound`]);
//! - missing arguments or a failing handler produce a *failed* result whose
//!   description is fed back to the model, so it can recover.

mod clock;
mod factory;

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use relay_core::error::{RelayError, Result};
use relay_core::{Message, ToolCall, ToolDefinition};

pub use clock::Clock;
pub use factory::{ChainFactory, MemoryToolFactory, ProviderToolFactory, ToolFactory, ToolProvider};

/// Async callable behind a tool
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, arguments: Map<String, Value>) -> anyhow::Result<Value>;
}

struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> ToolHandler for FnHandler<F>
where
    F: Fn(Map<String, Value>) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Value>> + Send,
{
    async fn call(&self, arguments: Map<String, Value>) -> anyhow::Result<Value> {
        (self.0)(arguments).await
    }
}

/// Adapt an async closure into a [`ToolHandler`]
pub fn tool_fn<F, Fut>(f: F) -> Arc<dyn ToolHandler>
where
    F: Fn(Map<String, Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
{
    Arc::new(FnHandler(f))
}

/// Where a tool's behavior lives (`target::method`)
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ExecutionRef {
    pub target: String,
    pub method: String,
}

impl ExecutionRef {
    pub fn new(target: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            method: method.into(),
        }
    }
}

impl std::fmt::Display for ExecutionRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}::{}", self.target, self.method)
    }
}

/// An executable tool
#[derive(Clone)]
pub struct Tool {
    pub definition: ToolDefinition,
    pub reference: ExecutionRef,
    handler: Arc<dyn ToolHandler>,
}

impl Tool {
    pub fn new(
        definition: ToolDefinition,
        reference: ExecutionRef,
        handler: Arc<dyn ToolHandler>,
    ) -> Self {
        Self {
            definition,
            reference,
            handler,
        }
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }
}

impl std::fmt::Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.definition.name)
            .field("reference", &self.reference)
            .finish_non_exhaustive()
    }
}

/// Result from tool execution
#[derive(Clone, Debug)]
pub struct ToolResult {
    /// Call this result answers
    pub call: ToolCall,

    /// Whether execution succeeded
    pub success: bool,

    /// Output (rendered value or error description)
    pub output: String,

    /// Structured value returned by the handler
    pub data: Option<Value>,
}

impl ToolResult {
    pub fn success(call: ToolCall, data: Value) -> Self {
        let output = match &data {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        };
        Self {
            call,
            success: true,
            output,
            data: Some(data),
        }
    }

    pub fn failure(call: ToolCall, error: impl Into<String>) -> Self {
        Self {
            call,
            success: false,
            output: error.into(),
            data: None,
        }
    }

    /// Tool result message answering the call
    pub fn into_message(self) -> Message {
        let content = if self.success {
            self.output
        } else {
            format!("Tool '{}' failed: {}", self.call.name, self.output)
        };
        Message::tool_result(self.call, content)
    }
}

/// Observed outcome of a tool execution
#[derive(Debug)]
pub enum ToolEvent<'a> {
    Succeeded { call: &'a ToolCall, value: &'a Value },
    Failed { call: &'a ToolCall, error: &'a str },
}

/// Observer notified after every executed tool call
pub trait ToolListener: Send + Sync {
    fn on_event(&self, event: &ToolEvent<'_>);
}

/// Fixed set of uniquely named tools
#[derive(Clone, Default)]
pub struct Toolbox {
    tools: Vec<Tool>,
    listeners: Vec<Arc<dyn ToolListener>>,
}

impl Toolbox {
    /// Create a toolbox, rejecting duplicate tool names
    pub fn new(tools: Vec<Tool>) -> Result<Self> {
        for (i, tool) in tools.iter().enumerate() {
            if tools[..i].iter().any(|t| t.name() == tool.name()) {
                return Err(RelayError::InvalidArgument(format!(
                    "duplicate tool name '{}'",
                    tool.name()
                )));
            }
        }

        Ok(Self {
            tools,
            listeners: Vec::new(),
        })
    }

    /// Resolve every reference through a factory
    pub fn from_factory(factory: &dyn ToolFactory, references: &[&str]) -> Result<Self> {
        let mut tools = Vec::new();
        for reference in references {
            let resolved = factory
                .resolve(reference)
                .ok_or_else(|| RelayError::ToolReferenceNotFound((*reference).to_string()))?;
            tools.extend(resolved);
        }
        Self::new(tools)
    }

    #[must_use]
    pub fn with_listener(mut self, listener: Arc<dyn ToolListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Definitions handed to the model
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition.clone()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.iter().find(|t| t.name() == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(Tool::name).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Execute a tool call
    pub async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
        let tool = self
            .get(&call.name)
            .ok_or_else(|| RelayError::ToolNotFound(call.name.clone()))?;

        let missing: Vec<&str> = tool
            .definition
            .required_parameters()
            .into_iter()
            .filter(|name| !call.arguments.contains_key(*name))
            .collect();

        let result = if missing.is_empty() {
            match tool.handler.call(call.arguments.clone()).await {
                Ok(value) => ToolResult::success(call.clone(), value),
                Err(e) => ToolResult::failure(call.clone(), format!("{e:#}")),
            }
        } else {
            ToolResult::failure(
                call.clone(),
                format!("Missing required parameter: {}", missing.join(", ")),
            )
        };

        if result.success {
            tracing::debug!(tool = %call.name, reference = %tool.reference, "Tool succeeded");
        } else {
            tracing::warn!(tool = %call.name, error = %result.output, "Tool failed");
        }
        self.notify(&result);

        Ok(result)
    }

    fn notify(&self, result: &ToolResult) {
        if self.listeners.is_empty() {
            return;
        }

        let event = match &result.data {
            Some(value) if result.success => ToolEvent::Succeeded {
                call: &result.call,
                value,
            },
            _ => ToolEvent::Failed {
                call: &result.call,
                error: &result.output,
            },
        };
        for listener in &self.listeners {
            listener.on_event(&event);
        }
    }

    /// System prompt section describing the available tools
    pub fn describe(&self) -> String {
        let mut prompt = String::from("## Available Tools\n\n");

        for tool in &self.tools {
            let definition = &tool.definition;
            prompt.push_str(&format!("### {}\n", definition.name));
            prompt.push_str(&format!("{}\n", definition.description));

            let required = definition.required_parameters();
            let properties = definition
                .parameters
                .as_ref()
                .and_then(|schema| schema.get("properties"))
                .and_then(Value::as_object);

            if let Some(properties) = properties.filter(|p| !p.is_empty()) {
                prompt.push_str("**Parameters:**\n");
                for (name, property) in properties {
                    let param_type = property.get("type").and_then(Value::as_str).unwrap_or("any");
                    let description = property
                        .get("description")
                        .and_then(Value::as_str)
                        .unwrap_or_default();
                    let marker = if required.contains(&name.as_str()) {
                        " (required)"
                    } else {
                        ""
                    };
                    prompt.push_str(&format!("- `{name}` ({param_type}){marker}: {description}\n"));
                }
            }
            prompt.push('\n');
        }

        prompt
    }
}

impl std::fmt::Debug for Toolbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Toolbox")
            .field("tools", &self.names())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
