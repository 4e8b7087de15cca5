//! # relay-core
//!
//! Provider-agnostic building blocks for invoking LLM backends.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Platform                             │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐  │
//! │  │   Model     │  │  Contract   │  │ ModelClient +       │  │
//! │  │   Catalog   │──│ (normalizer │──│ ResultConverter     │  │
//! │  │             │  │  registry)  │  │ (first match)       │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! A model's `family` selects its normalizers, client and converter, so
//! supporting a new backend means registering components, never changing
//! the dispatch code.

pub mod capability;
pub mod catalog;
pub mod content;
pub mod contract;
pub mod error;
pub mod input;
pub mod message;
pub mod model;
pub mod options;
pub mod platform;
pub mod result;
pub mod tool;

pub use capability::Capability;
pub use catalog::{FallbackCatalog, ModelCatalog, StaticCatalog};
pub use content::{Audio, Content, Document, Image};
pub use contract::{ContentType, Contract, Normalizable, NormalizeContext, Normalizer};
pub use error::{RelayError, Result};
pub use input::PlatformInput;
pub use message::{Message, MessageBag, MessageKind, Role};
pub use model::Model;
pub use options::Options;
pub use platform::{
    DeferredResult, InvocationMiddleware, MessagesInputMiddleware, ModelClient, Platform,
    PlatformBuilder, PostInvocation, PreInvocation, ResultConverter,
};
pub use result::{
    AssembledStream, Metadata, ModelResult, RawBody, RawResult, RawStream, ResultContent,
    ResultStream, StreamDelta, TokenUsage, TokenUsageExtractor, Vector,
};
pub use tool::{ParameterSchema, ToolCall, ToolDefinition};
