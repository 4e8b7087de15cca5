//! Model Capabilities

use serde::{Deserialize, Serialize};

/// A feature a model declares support for
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    InputText,
    InputMessages,
    InputImage,
    InputAudio,
    InputPdf,
    InputMultiple,
    OutputText,
    OutputStreaming,
    OutputStructured,
    OutputImage,
    OutputAudio,
    ToolCalling,
    Embeddings,
}

impl Capability {
    /// Every capability, used when a model has to be trusted blindly
    pub const ALL: [Self; 13] = [
        Self::InputText,
        Self::InputMessages,
        Self::InputImage,
        Self::InputAudio,
        Self::InputPdf,
        Self::InputMultiple,
        Self::OutputText,
        Self::OutputStreaming,
        Self::OutputStructured,
        Self::OutputImage,
        Self::OutputAudio,
        Self::ToolCalling,
        Self::Embeddings,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InputText => "input-text",
            Self::InputMessages => "input-messages",
            Self::InputImage => "input-image",
            Self::InputAudio => "input-audio",
            Self::InputPdf => "input-pdf",
            Self::InputMultiple => "input-multiple",
            Self::OutputText => "output-text",
            Self::OutputStreaming => "output-streaming",
            Self::OutputStructured => "output-structured",
            Self::OutputImage => "output-image",
            Self::OutputAudio => "output-audio",
            Self::ToolCalling => "tool-calling",
            Self::Embeddings => "embeddings",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
