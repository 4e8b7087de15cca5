//! Structured Output
//!
//! An `output_structure` option (`{"name": ..., "schema": {...}}`) asks for
//! a JSON answer matching a schema. The input half validates the request and
//! rewrites it into the `response_format` wire option; the output half
//! decodes the model's text into an object.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use relay_core::error::{RelayError, Result};
use relay_core::options::{OUTPUT_STRUCTURE, RESPONSE_FORMAT};
use relay_core::{Capability, ResultContent};

use crate::agent::{Input, InputProcessor, Output, OutputProcessor};

/// Requested shape of a structured answer
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutputStructure {
    pub name: String,
    pub schema: Value,
}

impl OutputStructure {
    pub fn new(name: impl Into<String>, schema: Value) -> Self {
        Self {
            name: name.into(),
            schema,
        }
    }

    fn response_format(&self) -> Value {
        json!({
            "type": "json_schema",
            "json_schema": {
                "name": self.name,
                "schema": self.schema,
                "strict": true,
            },
        })
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct StructuredOutputProcessor;

#[async_trait]
impl InputProcessor for StructuredOutputProcessor {
    async fn process_input(&self, input: &mut Input<'_>) -> Result<()> {
        let Some(requested) = input.options.remove(OUTPUT_STRUCTURE) else {
            return Ok(());
        };

        input.model.require(Capability::OutputStructured)?;
        if input.options.stream() {
            return Err(RelayError::InvalidArgument(
                "structured output cannot be combined with streaming".into(),
            ));
        }

        let structure: OutputStructure = serde_json::from_value(requested)
            .map_err(|e| RelayError::InvalidArgument(format!("invalid output structure: {e}")))?;

        input.options.insert(RESPONSE_FORMAT, structure.response_format());
        input.state.add(OUTPUT_STRUCTURE, structure.name);
        Ok(())
    }
}

#[async_trait]
impl OutputProcessor for StructuredOutputProcessor {
    async fn process_output(&self, output: &mut Output<'_>) -> Result<()> {
        if !output.state.contains(OUTPUT_STRUCTURE) {
            return Ok(());
        }

        let ResultContent::Text(text) = output.result.content() else {
            return Ok(());
        };

        let value: Value = serde_json::from_str(text)
            .map_err(|e| RelayError::Parse(format!("structured output is not valid JSON: {e}")))?;
        output.result.set_content(ResultContent::Object(value));
        Ok(())
    }
}
