//! Model Catalogs
//!
//! Resolve a model string (optionally carrying `?key=value` overrides) to a
//! concrete [`Model`].
//!
//! - [`StaticCatalog`] only knows what was registered and fails with
//!   [`RelayError::ModelNotFound`] otherwise.
//! - [`FallbackCatalog`] trusts unknown names and synthesizes a model with
//!   every capability, for providers whose model list is not enumerable.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value};

use crate::capability::Capability;
use crate::error::{RelayError, Result};
use crate::model::{parse_model_name, Model};

/// Resolves model names to models
pub trait ModelCatalog: Send + Sync {
    /// Resolve a model string such as `llama3.2?temperature=0.2`
    fn get_model(&self, name: &str) -> Result<Model>;

    /// All models the catalog knows by name
    fn models(&self) -> Vec<Model>;
}

/// A registered catalog entry
#[derive(Clone, Debug, Default)]
pub struct CatalogEntry {
    pub capabilities: BTreeSet<Capability>,
    pub options: Map<String, Value>,
}

/// Catalog of explicitly registered models for one family
#[derive(Clone, Debug)]
pub struct StaticCatalog {
    family: String,
    entries: BTreeMap<String, CatalogEntry>,
}

impl StaticCatalog {
    pub fn new(family: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Register a model
    #[must_use]
    pub fn with_model(
        self,
        name: impl Into<String>,
        capabilities: impl IntoIterator<Item = Capability>,
    ) -> Self {
        self.with_model_options(name, capabilities, Map::new())
    }

    /// Register a model with default options
    #[must_use]
    pub fn with_model_options(
        mut self,
        name: impl Into<String>,
        capabilities: impl IntoIterator<Item = Capability>,
        options: Map<String, Value>,
    ) -> Self {
        self.entries.insert(
            name.into(),
            CatalogEntry {
                capabilities: capabilities.into_iter().collect(),
                options,
            },
        );
        self
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Build the registered model with overrides merged over its defaults
    fn build(&self, name: &str, overrides: Map<String, Value>) -> Option<Model> {
        let entry = self.entries.get(name)?;

        let mut options = entry.options.clone();
        options.extend(overrides);

        Some(
            Model::new(&self.family, name, entry.capabilities.iter().copied())
                .with_options(options),
        )
    }
}

impl ModelCatalog for StaticCatalog {
    fn get_model(&self, name: &str) -> Result<Model> {
        let (bare, overrides) = parse_model_name(name)?;
        self.build(&bare, overrides)
            .ok_or(RelayError::ModelNotFound(bare))
    }

    fn models(&self) -> Vec<Model> {
        self.entries
            .keys()
            .filter_map(|name| self.build(name, Map::new()))
            .collect()
    }
}

/// Catalog that synthesizes a permissive model for unknown names
#[derive(Clone, Debug)]
pub struct FallbackCatalog {
    known: StaticCatalog,
}

impl FallbackCatalog {
    pub fn new(family: impl Into<String>) -> Self {
        Self {
            known: StaticCatalog::new(family),
        }
    }

    /// Start from a set of known models
    pub const fn from_static(known: StaticCatalog) -> Self {
        Self { known }
    }

    /// Register a known model; unknown ones still resolve
    #[must_use]
    pub fn with_model(
        self,
        name: impl Into<String>,
        capabilities: impl IntoIterator<Item = Capability>,
    ) -> Self {
        Self {
            known: self.known.with_model(name, capabilities),
        }
    }
}

impl ModelCatalog for FallbackCatalog {
    fn get_model(&self, name: &str) -> Result<Model> {
        let (bare, overrides) = parse_model_name(name)?;

        if let Some(model) = self.known.build(&bare, overrides.clone()) {
            return Ok(model);
        }

        tracing::debug!(
            family = %self.known.family(),
            model = %bare,
            "Synthesizing model with full capability set"
        );

        Ok(Model::new(self.known.family(), bare, Capability::ALL).with_options(overrides))
    }

    fn models(&self) -> Vec<Model> {
        self.known.models()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn catalog() -> StaticCatalog {
        let mut defaults = Map::new();
        defaults.insert("temperature".into(), json!(0.7));
        defaults.insert("top_p".into(), json!(0.9));

        StaticCatalog::new("test").with_model_options(
            "chat-small",
            [Capability::InputMessages, Capability::OutputText],
            defaults,
        )
    }

    #[test]
    fn test_static_catalog_merges_overrides() {
        let model = catalog().get_model("chat-small?temperature=0.1").unwrap();

        assert_eq!(model.name(), "chat-small");
        assert_eq!(model.family(), "test");
        assert_eq!(model.options()["temperature"], json!(0.1));
        assert_eq!(model.options()["top_p"], json!(0.9));
        assert!(model.supports(Capability::InputMessages));
        assert!(!model.supports(Capability::ToolCalling));
    }

    #[test]
    fn test_static_catalog_unknown_model() {
        let err = catalog().get_model("mystery").unwrap_err();
        assert!(matches!(err, RelayError::ModelNotFound(name) if name == "mystery"));
    }

    #[test]
    fn test_empty_name_is_input_error_for_every_catalog() {
        assert!(matches!(
            catalog().get_model("?a=1"),
            Err(RelayError::InvalidArgument(_))
        ));
        assert!(matches!(
            FallbackCatalog::new("x").get_model(""),
            Err(RelayError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_fallback_catalog_synthesizes_full_model() {
        let catalog = FallbackCatalog::new("open").with_model("known", [Capability::InputText]);

        let known = catalog.get_model("known").unwrap();
        assert_eq!(known.capabilities().len(), 1);

        let synthesized = catalog.get_model("brand-new?seed=42").unwrap();
        assert_eq!(synthesized.family(), "open");
        assert_eq!(synthesized.capabilities().len(), Capability::ALL.len());
        assert_eq!(synthesized.options()["seed"], json!(42));
    }

    #[test]
    fn test_resolution_is_value_equal_across_calls() {
        let catalog = catalog();
        let first = catalog.get_model("chat-small?max_tokens=64").unwrap();
        let second = catalog.get_model("chat-small?max_tokens=64").unwrap();

        assert_eq!(first, second);
        assert_eq!(first.name(), second.name());
        assert_eq!(first.options(), second.options());
    }
}
