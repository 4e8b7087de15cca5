//! # relay-runtime
//!
//! Concrete backends and process setup for relay.
//!
//! ## Providers
//!
//! - **Ollama** (default): local inference via the Ollama HTTP API
//!
//! ## Usage
//!
//! ```rust,ignore
//! use relay_runtime::{config, ollama, telemetry};
//!
//! config::load_env();
//! telemetry::init_tracing("info")?;
//!
//! let settings = config::RuntimeConfig::from_env()?;
//! let platform = Arc::new(ollama::platform(&settings.ollama)?);
//! let agent = Agent::builder(platform)
//!     .model_name(&settings.model)
//!     .build()?;
//! ```

pub mod config;
pub mod ollama;
pub mod telemetry;

pub use config::{load_env, RuntimeConfig};
pub use ollama::{OllamaClient, OllamaConfig, OllamaConverter, OllamaUsageExtractor};
pub use telemetry::init_tracing;

// Re-export core types for convenience
pub use relay_core::{Platform, RelayError, Result};
