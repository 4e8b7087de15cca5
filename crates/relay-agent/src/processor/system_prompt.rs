use std::sync::Arc;

use async_trait::async_trait;

use relay_core::error::Result;

use crate::agent::{Input, InputProcessor};
use crate::toolbox::Toolbox;

const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant.

Use the available tools when they help answer the request.
After receiving tool results, synthesize them into a helpful response.
If you can answer directly without tools, do so.
Be concise and accurate.";

/// Inserts a system message into conversations that have none
pub struct SystemPromptProcessor {
    prompt: String,
    toolbox: Option<Arc<Toolbox>>,
}

impl Default for SystemPromptProcessor {
    fn default() -> Self {
        Self::new(DEFAULT_SYSTEM_PROMPT)
    }
}

impl SystemPromptProcessor {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            toolbox: None,
        }
    }

    /// Append a description of the toolbox's tools to the prompt
    #[must_use]
    pub fn with_toolbox(mut self, toolbox: Arc<Toolbox>) -> Self {
        self.toolbox = Some(toolbox);
        self
    }

    fn build_prompt(&self) -> String {
        let mut prompt = self.prompt.clone();

        if let Some(toolbox) = self.toolbox.as_ref().filter(|t| !t.is_empty()) {
            prompt.push_str("\n\n");
            prompt.push_str(&toolbox.describe());
        }

        prompt
    }
}

#[async_trait]
impl InputProcessor for SystemPromptProcessor {
    async fn process_input(&self, input: &mut Input<'_>) -> Result<()> {
        if input.messages.system().is_some() {
            tracing::debug!("Conversation already has a system prompt");
            return Ok(());
        }

        input.messages.prepend_system(self.build_prompt())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toolbox::{Clock, ToolProvider};

    #[test]
    fn test_prompt_includes_tools() {
        let toolbox = Arc::new(Toolbox::new(Clock.tools()).unwrap());
        let prompt = SystemPromptProcessor::new("Be brief.")
            .with_toolbox(toolbox)
            .build_prompt();

        assert!(prompt.starts_with("Be brief."));
        assert!(prompt.contains("### clock"));
    }

    #[test]
    fn test_empty_toolbox_adds_nothing() {
        let prompt = SystemPromptProcessor::new("Be brief.")
            .with_toolbox(Arc::new(Toolbox::default()))
            .build_prompt();
        assert_eq!(prompt, "Be brief.");
    }
}
