//! Invocation Options
//!
//! String-keyed JSON values plus the typed tool list. Keys without a meaning
//! to the runtime are provider passthrough keys and reach the wire unchanged.

use serde_json::{Map, Value};

use crate::tool::ToolDefinition;

/// Request a streamed result
pub const STREAM: &str = "stream";
/// Structured output request (`{name, schema}`)
pub const OUTPUT_STRUCTURE: &str = "output_structure";
/// Per-call model override
pub const MODEL: &str = "model";
/// Tool definitions (wire form) or, on agent calls, a list of tool names
pub const TOOLS: &str = "tools";
/// Structured output in wire form
pub const RESPONSE_FORMAT: &str = "response_format";

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Options {
    values: Map<String, Value>,
    tools: Vec<ToolDefinition>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Whether a streamed result was requested
    pub fn stream(&self) -> bool {
        self.values.get(STREAM).and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn set_tools(&mut self, tools: Vec<ToolDefinition>) {
        self.tools = tools;
    }

    #[must_use]
    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    pub fn tools(&self) -> &[ToolDefinition] {
        &self.tools
    }

    pub fn take_tools(&mut self) -> Vec<ToolDefinition> {
        std::mem::take(&mut self.tools)
    }

    pub const fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    /// Wire options without the typed tool list
    pub fn into_map(self) -> Map<String, Value> {
        self.values
    }
}

impl From<Map<String, Value>> for Options {
    fn from(values: Map<String, Value>) -> Self {
        Self {
            values,
            tools: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_flag() {
        assert!(!Options::new().stream());
        assert!(Options::new().with(STREAM, true).stream());
        assert!(!Options::new().with(STREAM, "yes").stream());
    }

    #[test]
    fn test_passthrough_keys_survive() {
        let options = Options::new().with("temperature", 0.2).with("seed", 7);
        let map = options.into_map();
        assert_eq!(map["temperature"], 0.2);
        assert_eq!(map["seed"], 7);
    }
}
