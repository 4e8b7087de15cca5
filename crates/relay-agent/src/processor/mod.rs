//! Built-in Processors

mod model_override;
mod structured_output;
mod system_prompt;
mod token_usage;

pub use model_override::ModelOverrideProcessor;
pub use structured_output::{OutputStructure, StructuredOutputProcessor};
pub use system_prompt::SystemPromptProcessor;
pub use token_usage::TokenUsageProcessor;
