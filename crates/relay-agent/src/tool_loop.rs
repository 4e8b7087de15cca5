//! Tool-Call Loop
//!
//! While the model answers with tool calls, execute them and ask again:
//!
//! ```text
//!   result = ToolCalls(calls) | Stream(.., ToolCall, ..)
//!     ├─ resolve every call; an unknown tool aborts before anything is written
//!     ├─ execute each call in order
//!     ├─ append the assistant message carrying `calls`, then one result per call
//!     └─ re-invoke the agent with the original options ─► result
//! ```
//!
//! Streams are drained to find their tool calls. A drained stream without
//! any is handed back re-wrapped, so the caller still appends the answer.
//!
//! Only the outermost call drives the loop; re-invocations report their
//! tool calls back to it instead of looping themselves.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use relay_core::error::{RelayError, Result};
use relay_core::options::TOOLS;
use relay_core::{
    Capability, Message, ModelResult, ResultContent, ResultStream, StreamDelta, ToolCall,
};

use crate::agent::{AgentInterface, Input, InputProcessor, Output, OutputProcessor};
use crate::toolbox::{ToolResult, Toolbox};

/// Default bound on tool rounds per call
pub const DEFAULT_MAX_ITERATIONS: usize = 10;

pub struct ToolCallProcessor {
    toolbox: Arc<Toolbox>,
    max_iterations: usize,
}

impl ToolCallProcessor {
    pub fn new(toolbox: Toolbox) -> Self {
        Self {
            toolbox: Arc::new(toolbox),
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    #[must_use]
    pub const fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn toolbox(&self) -> &Toolbox {
        &self.toolbox
    }

    /// Assistant message opening the next tool round, if the result asks for one
    async fn pending_round(&self, result: &mut ModelResult) -> Result<Option<Message>> {
        if let ResultContent::ToolCalls(calls) = result.content() {
            return Ok(Some(Message::assistant_tool_calls(calls.clone())));
        }
        if !matches!(result.content(), ResultContent::Stream(_)) || self.toolbox.is_empty() {
            return Ok(None);
        }

        let stream = match result.replace_content(ResultContent::Text(String::new())) {
            ResultContent::Stream(stream) => stream,
            other => {
                result.set_content(other);
                return Ok(None);
            }
        };
        let assembled = stream.collect().await?;
        if !assembled.tool_calls.is_empty() {
            return Ok(Some(assembled.to_message()));
        }

        let deltas = if assembled.text.is_empty() {
            Vec::new()
        } else {
            vec![StreamDelta::Text(assembled.text)]
        };
        result.set_content(ResultContent::Stream(ResultStream::from_deltas(deltas)));
        Ok(None)
    }

    /// Execute a whole round, failing before any handler runs if a tool is unknown
    async fn execute_round(&self, calls: &[ToolCall]) -> Result<Vec<ToolResult>> {
        if let Some(unknown) = calls.iter().find(|call| self.toolbox.get(&call.name).is_none()) {
            return Err(RelayError::ToolNotFound(unknown.name.clone()));
        }

        let mut results = Vec::with_capacity(calls.len());
        for call in calls {
            results.push(self.toolbox.execute(call).await?);
        }
        Ok(results)
    }
}

#[async_trait]
impl InputProcessor for ToolCallProcessor {
    async fn process_input(&self, input: &mut Input<'_>) -> Result<()> {
        if self.toolbox.is_empty() {
            return Ok(());
        }
        input.model.require(Capability::ToolCalling)?;

        // a `tools` option narrows the toolbox down to the listed names
        let definitions = match input.options.remove(TOOLS) {
            None => self.toolbox.definitions(),
            Some(Value::Array(names)) => {
                let names: Vec<&str> = names.iter().filter_map(Value::as_str).collect();
                self.toolbox
                    .definitions()
                    .into_iter()
                    .filter(|d| names.contains(&d.name.as_str()))
                    .collect()
            }
            Some(other) => {
                return Err(RelayError::InvalidArgument(format!(
                    "the '{TOOLS}' option must list tool names, got {other}"
                )));
            }
        };

        input.options.set_tools(definitions);
        Ok(())
    }
}

#[async_trait]
impl OutputProcessor for ToolCallProcessor {
    async fn process_output(&self, output: &mut Output<'_>) -> Result<()> {
        if output.depth() > 0 {
            return Ok(());
        }

        let mut iteration = 0;
        while let Some(request) = self.pending_round(&mut output.result).await? {
            iteration += 1;
            if iteration > self.max_iterations {
                return Err(RelayError::ToolLoopExceeded(self.max_iterations));
            }

            tracing::debug!(
                agent = %output.agent.name(),
                iteration,
                calls = request.tool_calls().len(),
                "Executing tool calls"
            );

            let results = self.execute_round(request.tool_calls()).await?;
            output.messages.push(request)?;
            for result in results {
                output.messages.push(result.into_message())?;
            }

            output.result = output
                .agent
                .call_nested(output.messages, output.options.clone(), output.depth() + 1)
                .await?;
        }

        Ok(())
    }
}
