//! Error Types

use thiserror::Error;

use crate::capability::Capability;
use crate::contract::ContentType;

/// Result type alias for relay operations
pub type Result<T> = std::result::Result<T, RelayError>;

/// Relay error types
///
/// Grouped the way callers need to react to them: configuration errors are
/// raised before any network call, tool resolution errors abort the tool loop,
/// and provider errors are translated by each converter into the small
/// authentication / bad-request / rate-limit / runtime taxonomy.
#[derive(Error, Debug)]
pub enum RelayError {
    /// Malformed input (empty model name, broken conversation invariant, ...)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Model name unknown to a static catalog
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// An option or input needs a capability the model does not declare
    #[error("Model '{model}' does not support {capability}")]
    MissingCapability { model: String, capability: Capability },

    /// No registered client supports the model
    #[error("No client registered for model '{0}'")]
    NoClient(String),

    /// No registered converter supports the model
    #[error("No result converter registered for model '{0}'")]
    NoConverter(String),

    /// No normalizer supports the content for the model
    #[error("No normalizer supports {content_type} for model '{model}'")]
    NoNormalizer {
        content_type: ContentType,
        model: String,
    },

    /// No tool source declares the reference
    #[error("Tool reference not found: {0}")]
    ToolReferenceNotFound(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Tool not found in toolbox
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// The model kept requesting tools past the configured bound
    #[error("Tool call loop exceeded {0} iterations")]
    ToolLoopExceeded(usize),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Provider rejected the request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Rate limited
    #[error("Rate limited: {message}")]
    RateLimited {
        message: String,
        retry_after: Option<u64>,
    },

    /// Generic provider/transport failure
    #[error("Provider error: {0}")]
    Runtime(String),

    /// A result kind the caller cannot handle
    #[error("Unexpected result: {0}")]
    UnexpectedResult(String),

    /// Parse error (e.g., structured output decoding)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Message store error
    #[error("Message store error: {0}")]
    Store(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other/unknown error
    #[error("{0}")]
    Other(String),
}

impl RelayError {
    /// Check if error is retryable
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Runtime(_))
    }

    /// Whether the error was raised because of how the runtime is wired or called
    pub const fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidArgument(_)
                | Self::ModelNotFound(_)
                | Self::MissingCapability { .. }
                | Self::NoClient(_)
                | Self::NoConverter(_)
                | Self::NoNormalizer { .. }
                | Self::ToolReferenceNotFound(_)
                | Self::Config(_)
        )
    }

    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            Self::ModelNotFound(name) => format!("The model '{name}' is not available."),
            Self::MissingCapability { model, capability } => {
                format!("The model '{model}' cannot handle this request ({capability}).")
            }
            Self::NoClient(_) | Self::NoConverter(_) | Self::NoNormalizer { .. } => {
                "No backend is configured for this model.".into()
            }
            Self::ToolNotFound(name) => format!("The tool '{name}' is not available."),
            Self::ToolLoopExceeded(_) => {
                "The request took too long to process. Please try a simpler query.".into()
            }
            Self::Authentication(_) => "Authentication failed. Please check your credentials.".into(),
            Self::BadRequest(msg) => format!("The AI service rejected the request: {msg}"),
            Self::RateLimited { .. } => "You've made too many requests. Please wait a moment.".into(),
            Self::Runtime(msg) => format!("The AI service encountered an error: {msg}"),
            _ => "An unexpected error occurred.".into(),
        }
    }
}

impl From<anyhow::Error> for RelayError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(format!("{err:#}"))
    }
}
