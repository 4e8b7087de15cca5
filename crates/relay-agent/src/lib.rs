//! # relay-agent
//!
//! Agents on top of the relay platform.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       MultiAgent                            │
//! │  orchestrator ──► classification ──► hand-off │ fallback    │
//! │  ┌─────────────────────────────────────────────────────┐    │
//! │  │                      Agent                          │    │
//! │  │  input processors ─► Platform ─► output processors  │    │
//! │  │                                  └─ ToolCallProcessor    │
//! │  │                                       └─ Toolbox    │    │
//! │  └─────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Agents never depend on a concrete provider; everything model-specific
//! stays behind the [`Platform`](relay_core::Platform).

pub mod agent;
pub mod chat;
pub mod multi_agent;
pub mod processor;
pub mod tool_loop;
pub mod toolbox;

pub use agent::{Agent, AgentBuilder, AgentInterface, Input, InputProcessor, Output, OutputProcessor};
pub use chat::{Chat, ConversationId, InMemoryMessageStore, MessageStore};
pub use multi_agent::{Classification, Handoff, MultiAgent};
pub use processor::{
    ModelOverrideProcessor, OutputStructure, StructuredOutputProcessor, SystemPromptProcessor,
    TokenUsageProcessor,
};
pub use tool_loop::{ToolCallProcessor, DEFAULT_MAX_ITERATIONS};
pub use toolbox::{
    tool_fn, ChainFactory, Clock, ExecutionRef, MemoryToolFactory, ProviderToolFactory, Tool,
    ToolEvent, ToolFactory, ToolHandler, ToolListener, ToolProvider, ToolResult, Toolbox,
};
