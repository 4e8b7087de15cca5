//! Agent
//!
//! An [`Agent`] binds a model to a platform and wraps each invocation in two
//! processor chains:
//!
//! ```text
//!   Input { model, messages, options, state }
//!     │  input processors (registration order)
//!     ▼
//!   Platform::invoke_model ─► DeferredResult::into_result
//!     │
//!     ▼  output processors (registration order)
//!   Output { agent, model, messages, options, state, result }
//! ```
//!
//! `state` is a per-call side map that lets an input processor leave a note
//! for its output half.

use std::sync::Arc;

use async_trait::async_trait;

use relay_core::error::{RelayError, Result};
use relay_core::options::OUTPUT_STRUCTURE;
use relay_core::{MessageBag, Metadata, Model, ModelResult, Options, Platform};

use crate::toolbox::Toolbox;
use crate::tool_loop::ToolCallProcessor;

/// Anything that can answer a conversation
#[async_trait]
pub trait AgentInterface: Send + Sync {
    fn name(&self) -> &str;

    async fn call(&self, messages: &mut MessageBag, options: Options) -> Result<ModelResult>;
}

/// Invocation as seen by input processors
pub struct Input<'a> {
    pub model: Model,
    pub messages: &'a mut MessageBag,
    pub options: Options,
    pub state: Metadata,
    depth: usize,
}

impl Input<'_> {
    /// 0 for a top-level call, higher inside the tool loop
    pub const fn depth(&self) -> usize {
        self.depth
    }
}

/// Invocation as seen by output processors
pub struct Output<'a> {
    pub agent: &'a Agent,
    pub model: Model,
    pub messages: &'a mut MessageBag,
    /// Options the agent was called with, before input processing
    pub options: Options,
    pub state: Metadata,
    pub result: ModelResult,
    depth: usize,
}

impl Output<'_> {
    pub const fn depth(&self) -> usize {
        self.depth
    }
}

#[async_trait]
pub trait InputProcessor: Send + Sync {
    async fn process_input(&self, input: &mut Input<'_>) -> Result<()>;
}

#[async_trait]
pub trait OutputProcessor: Send + Sync {
    async fn process_output(&self, output: &mut Output<'_>) -> Result<()>;
}

/// Model bound to a platform plus processor chains
pub struct Agent {
    name: String,
    platform: Arc<Platform>,
    model: Model,
    input_processors: Vec<Arc<dyn InputProcessor>>,
    output_processors: Vec<Arc<dyn OutputProcessor>>,
}

impl Agent {
    pub fn builder(platform: Arc<Platform>) -> AgentBuilder {
        AgentBuilder::new(platform)
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    /// Re-enter the agent from inside an enclosing call
    pub(crate) async fn call_nested(
        &self,
        messages: &mut MessageBag,
        options: Options,
        depth: usize,
    ) -> Result<ModelResult> {
        Box::pin(self.run(messages, options, depth)).await
    }

    async fn run(
        &self,
        messages: &mut MessageBag,
        options: Options,
        depth: usize,
    ) -> Result<ModelResult> {
        tracing::debug!(agent = %self.name, model = %self.model, depth, "Calling agent");

        let mut input = Input {
            model: self.model.clone(),
            messages,
            options: options.clone(),
            state: Metadata::new(),
            depth,
        };
        for processor in &self.input_processors {
            processor.process_input(&mut input).await?;
        }
        let Input {
            model,
            messages,
            options: mut call_options,
            state,
            ..
        } = input;

        // never a provider passthrough key
        if call_options.remove(OUTPUT_STRUCTURE).is_some() {
            tracing::warn!(
                agent = %self.name,
                "No processor consumed the output structure, dropping it"
            );
        }

        let result = self
            .platform
            .invoke_model(model.clone(), &*messages, call_options)
            .await?
            .into_result()
            .await?;

        let mut output = Output {
            agent: self,
            model,
            messages,
            options,
            state,
            result,
            depth,
        };
        for processor in &self.output_processors {
            processor.process_output(&mut output).await?;
        }

        Ok(output.result)
    }
}

#[async_trait]
impl AgentInterface for Agent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn call(&self, messages: &mut MessageBag, options: Options) -> Result<ModelResult> {
        self.run(messages, options, 0).await
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("model", &self.model)
            .field("input_processors", &self.input_processors.len())
            .field("output_processors", &self.output_processors.len())
            .finish()
    }
}

enum ModelChoice {
    Model(Model),
    Name(String),
}

/// Builder for [`Agent`]
pub struct AgentBuilder {
    platform: Arc<Platform>,
    name: String,
    model: Option<ModelChoice>,
    input_processors: Vec<Arc<dyn InputProcessor>>,
    output_processors: Vec<Arc<dyn OutputProcessor>>,
}

impl AgentBuilder {
    pub fn new(platform: Arc<Platform>) -> Self {
        Self {
            platform,
            name: "agent".into(),
            model: None,
            input_processors: Vec::new(),
            output_processors: Vec::new(),
        }
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn model(mut self, model: Model) -> Self {
        self.model = Some(ModelChoice::Model(model));
        self
    }

    /// Model string resolved through the platform's catalog on build
    #[must_use]
    pub fn model_name(mut self, name: impl Into<String>) -> Self {
        self.model = Some(ModelChoice::Name(name.into()));
        self
    }

    #[must_use]
    pub fn input_processor(mut self, processor: impl InputProcessor + 'static) -> Self {
        self.input_processors.push(Arc::new(processor));
        self
    }

    #[must_use]
    pub fn output_processor(mut self, processor: impl OutputProcessor + 'static) -> Self {
        self.output_processors.push(Arc::new(processor));
        self
    }

    /// Register a processor on both sides
    #[must_use]
    pub fn processor<P>(mut self, processor: P) -> Self
    where
        P: InputProcessor + OutputProcessor + 'static,
    {
        let processor = Arc::new(processor);
        self.input_processors.push(processor.clone());
        self.output_processors.push(processor);
        self
    }

    /// Shorthand for a [`ToolCallProcessor`] over `toolbox`
    #[must_use]
    pub fn toolbox(self, toolbox: Toolbox) -> Self {
        self.processor(ToolCallProcessor::new(toolbox))
    }

    pub fn build(self) -> Result<Agent> {
        let model = match self.model {
            Some(ModelChoice::Model(model)) => model,
            Some(ModelChoice::Name(name)) => self.platform.catalog().get_model(&name)?,
            None => return Err(RelayError::Config("Model is required".into())),
        };

        Ok(Agent {
            name: self.name,
            platform: self.platform,
            model,
            input_processors: self.input_processors,
            output_processors: self.output_processors,
        })
    }
}
