//! Model Descriptors
//!
//! A [`Model`] names a backend, the wire family it speaks and the
//! capabilities it declares. Models are built once (usually by a
//! [`ModelCatalog`](crate::catalog::ModelCatalog)) and never mutated afterwards;
//! per-call changes produce a new value.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::capability::Capability;
use crate::error::{RelayError, Result};

/// Immutable model descriptor
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Model {
    /// Wire family (e.g. "ollama"); adapters select on it
    family: String,

    /// Model identifier as the provider knows it (e.g. "llama3.2")
    name: String,

    /// Declared capabilities
    capabilities: BTreeSet<Capability>,

    /// Free-form options, forwarded to the provider
    #[serde(default)]
    options: Map<String, Value>,
}

impl Model {
    pub fn new(
        family: impl Into<String>,
        name: impl Into<String>,
        capabilities: impl IntoIterator<Item = Capability>,
    ) -> Self {
        Self {
            family: family.into(),
            name: name.into(),
            capabilities: capabilities.into_iter().collect(),
            options: Map::new(),
        }
    }

    /// Replace all options
    #[must_use]
    pub fn with_options(mut self, options: Map<String, Value>) -> Self {
        self.options = options;
        self
    }

    /// Set a single option
    #[must_use]
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn capabilities(&self) -> &BTreeSet<Capability> {
        &self.capabilities
    }

    pub const fn options(&self) -> &Map<String, Value> {
        &self.options
    }

    pub fn supports(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    /// Fail with [`RelayError::MissingCapability`] unless the capability is declared
    pub fn require(&self, capability: Capability) -> Result<()> {
        if self.supports(capability) {
            Ok(())
        } else {
            Err(RelayError::MissingCapability {
                model: self.name.clone(),
                capability,
            })
        }
    }
}

impl std::fmt::Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.family, self.name)
    }
}

/// Split a model string of the form `name?key=value&...` into the bare name
/// and the parsed option overrides.
///
/// Values are coerced: `true`/`false` become booleans, integers and finite
/// floats become numbers, everything else stays a string.
pub fn parse_model_name(input: &str) -> Result<(String, Map<String, Value>)> {
    let (name, query) = input.split_once('?').unwrap_or((input, ""));
    let name = name.trim();

    if name.is_empty() {
        return Err(RelayError::InvalidArgument(format!(
            "model name must not be empty (got '{input}')"
        )));
    }

    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query).map_err(|e| {
        RelayError::InvalidArgument(format!("invalid model options in '{input}': {e}"))
    })?;

    let options = pairs
        .into_iter()
        .map(|(key, value)| (key, coerce_option_value(&value)))
        .collect();

    Ok((name.to_string(), options))
}

fn coerce_option_value(raw: &str) -> Value {
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => {
            if let Ok(int) = raw.parse::<i64>() {
                return Value::Number(int.into());
            }
            raw.parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map_or_else(|| Value::String(raw.to_string()), Value::Number)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_plain_name() {
        let (name, options) = parse_model_name("llama3.2").unwrap();
        assert_eq!(name, "llama3.2");
        assert!(options.is_empty());
    }

    #[test]
    fn test_parse_overrides_are_coerced() {
        let (name, options) =
            parse_model_name("gpt-4o?temperature=0.5&max_tokens=300&stream=true&tag=a%20b").unwrap();

        assert_eq!(name, "gpt-4o");
        assert_eq!(options["temperature"], json!(0.5));
        assert_eq!(options["max_tokens"], json!(300));
        assert_eq!(options["stream"], json!(true));
        assert_eq!(options["tag"], json!("a b"));
    }

    #[test]
    fn test_parse_empty_name_is_rejected() {
        assert!(matches!(
            parse_model_name("?temperature=1"),
            Err(RelayError::InvalidArgument(_))
        ));
        assert!(matches!(
            parse_model_name("   "),
            Err(RelayError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_require_capability() {
        let model = Model::new("test", "tiny", [Capability::InputMessages]);
        assert!(model.require(Capability::InputMessages).is_ok());

        let err = model.require(Capability::OutputStructured).unwrap_err();
        assert!(matches!(
            err,
            RelayError::MissingCapability {
                capability: Capability::OutputStructured,
                ..
            }
        ));
    }
}
