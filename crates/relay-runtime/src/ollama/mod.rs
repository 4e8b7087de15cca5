//! Ollama Bridge
//!
//! Local inference through the Ollama HTTP API, expressed as relay platform
//! components:
//!
//! - [`catalog`]: known models, unknown names are trusted
//! - [`contract`]: Ollama's message format ahead of the defaults
//! - [`OllamaClient`]: `/api/chat`, `/api/embed`, `/api/tags`
//! - [`OllamaConverter`]: bodies and NDJSON streams into results
//! - [`OllamaUsageExtractor`]: `prompt_eval_count` / `eval_count`

mod client;
mod contract;
mod converter;

use relay_core::error::Result;
use relay_core::{Capability, FallbackCatalog, MessagesInputMiddleware, Platform};

pub use client::{LocalModel, OllamaClient};
pub use contract::{
    contract, OllamaAssistantMessageNormalizer, OllamaToolResultNormalizer,
    OllamaUserMessageNormalizer,
};
pub use converter::{OllamaConverter, OllamaUsageExtractor, DONE_REASON};

/// Model family served by this bridge
pub const FAMILY: &str = "ollama";

const CHAT: [Capability; 5] = [
    Capability::InputMessages,
    Capability::OutputText,
    Capability::OutputStreaming,
    Capability::OutputStructured,
    Capability::ToolCalling,
];

const VISION: [Capability; 4] = [
    Capability::InputMessages,
    Capability::InputImage,
    Capability::OutputText,
    Capability::OutputStreaming,
];

const EMBEDDING: [Capability; 3] = [
    Capability::InputText,
    Capability::InputMultiple,
    Capability::Embeddings,
];

/// Ollama provider configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OllamaConfig {
    /// Ollama host URL
    pub host: String,

    /// Ollama port
    pub port: u16,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost".into(),
            port: 11434,
            timeout_secs: 120,
        }
    }
}

impl OllamaConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Read `OLLAMA_HOST`, `OLLAMA_PORT` and `OLLAMA_TIMEOUT_SECS`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            host: lookup("OLLAMA_HOST").unwrap_or(defaults.host),
            port: lookup("OLLAMA_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            timeout_secs: lookup("OLLAMA_TIMEOUT_SECS")
                .and_then(|t| t.parse().ok())
                .unwrap_or(defaults.timeout_secs),
        }
    }

    /// `host:port`, unless the host already names a port
    pub fn base_url(&self) -> String {
        let host = self.host.trim_end_matches('/');
        let authority = host.split_once("://").map_or(host, |(_, rest)| rest);

        if authority.contains(':') {
            host.to_string()
        } else {
            format!("{host}:{}", self.port)
        }
    }
}

/// Known Ollama models; any other name resolves with every capability
pub fn catalog() -> FallbackCatalog {
    FallbackCatalog::new(FAMILY)
        .with_model("llama3.2", CHAT)
        .with_model("qwen2.5", CHAT)
        .with_model("llava", VISION)
        .with_model("nomic-embed-text", EMBEDDING)
        .with_model("mxbai-embed-large", EMBEDDING)
}

/// Platform wired for a local Ollama server
pub fn platform(config: &OllamaConfig) -> Result<Platform> {
    tracing::debug!(url = %config.base_url(), "Assembling Ollama platform");

    Ok(Platform::builder(catalog())
        .contract(contract())
        .client(OllamaClient::new(config)?)
        .converter(OllamaConverter)
        .middleware(MessagesInputMiddleware)
        .build())
}
