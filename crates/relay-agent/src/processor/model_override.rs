use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use relay_core::error::Result;
use relay_core::options::MODEL;
use relay_core::ModelCatalog;

use crate::agent::{Input, InputProcessor};

/// Replaces the call's model when a `model` option names another one
pub struct ModelOverrideProcessor {
    catalog: Arc<dyn ModelCatalog>,
}

impl ModelOverrideProcessor {
    pub fn new(catalog: Arc<dyn ModelCatalog>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl InputProcessor for ModelOverrideProcessor {
    async fn process_input(&self, input: &mut Input<'_>) -> Result<()> {
        let Some(Value::String(name)) = input.options.get(MODEL) else {
            return Ok(());
        };

        let model = self.catalog.get_model(name)?;
        tracing::debug!(from = %input.model, to = %model, "Overriding model");

        input.options.remove(MODEL);
        input.model = model;
        Ok(())
    }
}
