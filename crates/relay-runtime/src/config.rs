//! Environment Configuration
//!
//! Variables come from the process environment, optionally seeded from a
//! `.env` file with [`load_env`].

use std::path::PathBuf;

use relay_core::error::{RelayError, Result};

use crate::ollama::OllamaConfig;

/// Default model string when `RELAY_MODEL` is unset
pub const DEFAULT_MODEL: &str = "llama3.2";

/// Default tool-call loop bound when `RELAY_MAX_TOOL_ITERATIONS` is unset
pub const DEFAULT_MAX_TOOL_ITERATIONS: usize = 10;

/// Load a `.env` file into the environment, if there is one
pub fn load_env() -> Option<PathBuf> {
    match dotenvy::dotenv() {
        Ok(path) => {
            tracing::debug!(path = %path.display(), "Loaded environment file");
            Some(path)
        }
        Err(e) if e.not_found() => None,
        Err(e) => {
            tracing::warn!("Ignoring unreadable environment file: {}", e);
            None
        }
    }
}

/// Runtime settings read from the environment
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub ollama: OllamaConfig,

    /// Model string, may carry `?key=value` overrides
    pub model: String,

    pub max_tool_iterations: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            ollama: OllamaConfig::default(),
            model: DEFAULT_MODEL.into(),
            max_tool_iterations: DEFAULT_MAX_TOOL_ITERATIONS,
        }
    }
}

impl RuntimeConfig {
    /// Read `RELAY_MODEL`, `RELAY_MAX_TOOL_ITERATIONS` and the Ollama variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let max_tool_iterations = match lookup("RELAY_MAX_TOOL_ITERATIONS") {
            None => DEFAULT_MAX_TOOL_ITERATIONS,
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(RelayError::Config(format!(
                        "RELAY_MAX_TOOL_ITERATIONS must be a positive integer, got '{raw}'"
                    )));
                }
            },
        };

        let model = lookup("RELAY_MODEL")
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.into());

        Ok(Self {
            ollama: OllamaConfig::from_lookup(&lookup),
            model,
            max_tool_iterations,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, RuntimeConfig::default());
    }

    #[test]
    fn test_reads_every_variable() {
        let config = RuntimeConfig::from_lookup(lookup(&[
            ("RELAY_MODEL", "qwen2.5?temperature=0.1"),
            ("RELAY_MAX_TOOL_ITERATIONS", "4"),
            ("OLLAMA_PORT", "9999"),
        ]))
        .unwrap();

        assert_eq!(config.model, "qwen2.5?temperature=0.1");
        assert_eq!(config.max_tool_iterations, 4);
        assert_eq!(config.ollama.port, 9999);
    }

    #[test]
    fn test_rejects_bad_iteration_bound() {
        for bad in ["0", "-1", "many"] {
            let err = RuntimeConfig::from_lookup(lookup(&[("RELAY_MAX_TOOL_ITERATIONS", bad)]))
                .unwrap_err();
            assert!(err.is_configuration());
        }
    }
}
