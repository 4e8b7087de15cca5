use std::sync::Arc;

use async_trait::async_trait;

use relay_core::error::Result;
use relay_core::result::TOKEN_USAGE;
use relay_core::TokenUsageExtractor;

use crate::agent::{Output, OutputProcessor};

/// Records provider token usage as `token_usage` metadata
pub struct TokenUsageProcessor {
    extractor: Arc<dyn TokenUsageExtractor>,
}

impl TokenUsageProcessor {
    pub fn new(extractor: impl TokenUsageExtractor + 'static) -> Self {
        Self {
            extractor: Arc::new(extractor),
        }
    }
}

#[async_trait]
impl OutputProcessor for TokenUsageProcessor {
    async fn process_output(&self, output: &mut Output<'_>) -> Result<()> {
        let Some(usage) = output.result.raw().and_then(|raw| self.extractor.extract(raw)) else {
            return Ok(());
        };

        output
            .result
            .metadata_mut()
            .add(TOKEN_USAGE, serde_json::to_value(usage)?);
        Ok(())
    }
}
