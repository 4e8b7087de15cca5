use serde_json::{json, Value};

use relay_core::{ParameterSchema, ToolDefinition};

use super::{tool_fn, ExecutionRef, Tool, ToolProvider};

/// Built-in provider of the `clock` tool (current date and time)
#[derive(Clone, Copy, Debug, Default)]
pub struct Clock;

impl ToolProvider for Clock {
    fn target(&self) -> &str {
        "clock"
    }

    fn tools(&self) -> Vec<Tool> {
        let definition = ToolDefinition::new("clock", "Get the current date and time").with_parameters(&[
            ParameterSchema::new("format", "string", "Output format: 'iso', 'human', or 'unix'")
                .with_default(json!("human"))
                .with_enum(vec![json!("iso"), json!("human"), json!("unix")]),
        ]);

        let handler = tool_fn(|arguments| async move {
            let format = arguments
                .get("format")
                .and_then(Value::as_str)
                .unwrap_or("human");
            Ok(Value::String(now(format)))
        });

        vec![Tool::new(definition, ExecutionRef::new("clock", "now"), handler)]
    }
}

fn now(format: &str) -> String {
    let now = chrono::Utc::now();
    match format {
        "iso" => now.to_rfc3339(),
        "unix" => now.timestamp().to_string(),
        _ => now.format("%A, %B %d, %Y at %H:%M:%S UTC").to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toolbox::Toolbox;
    use relay_core::ToolCall;
    use serde_json::Map;

    #[tokio::test]
    async fn test_unix_format() {
        let toolbox = Toolbox::new(Clock.tools()).unwrap();
        let mut arguments = Map::new();
        arguments.insert("format".into(), json!("unix"));

        let result = toolbox
            .execute(&ToolCall::new("call_1", "clock", arguments))
            .await
            .unwrap();

        assert!(result.success);
        assert!(result.output.parse::<i64>().is_ok());
    }
}
