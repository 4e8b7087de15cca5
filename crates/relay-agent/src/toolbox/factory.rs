//! Tool Discovery
//!
//! A reference (usually a target name) is resolved into tools by asking each
//! factory in a chain; the first one that recognizes it wins.

use std::collections::HashMap;
use std::sync::Arc;

use super::Tool;

/// Resolves a reference into tools
pub trait ToolFactory: Send + Sync {
    /// `None` when the reference is unknown to this factory
    fn resolve(&self, reference: &str) -> Option<Vec<Tool>>;
}

/// Tools registered explicitly under a target name
#[derive(Clone, Debug, Default)]
pub struct MemoryToolFactory {
    entries: HashMap<String, Vec<Tool>>,
}

impl MemoryToolFactory {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_tool(mut self, tool: Tool) -> Self {
        self.add_tool(tool);
        self
    }

    /// Register a tool under its execution target
    pub fn add_tool(&mut self, tool: Tool) {
        self.entries
            .entry(tool.reference.target.clone())
            .or_default()
            .push(tool);
    }
}

impl ToolFactory for MemoryToolFactory {
    fn resolve(&self, reference: &str) -> Option<Vec<Tool>> {
        self.entries.get(reference).cloned()
    }
}

/// A component that declares its own tools
pub trait ToolProvider: Send + Sync {
    /// Name the provider is referenced by
    fn target(&self) -> &str;

    fn tools(&self) -> Vec<Tool>;
}

/// Factory over registered tool providers
#[derive(Clone, Default)]
pub struct ProviderToolFactory {
    providers: Vec<Arc<dyn ToolProvider>>,
}

impl ProviderToolFactory {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_provider(mut self, provider: impl ToolProvider + 'static) -> Self {
        self.providers.push(Arc::new(provider));
        self
    }
}

impl ToolFactory for ProviderToolFactory {
    fn resolve(&self, reference: &str) -> Option<Vec<Tool>> {
        self.providers
            .iter()
            .find(|p| p.target() == reference)
            .map(|p| p.tools())
    }
}

/// Tries each factory in order
#[derive(Clone, Default)]
pub struct ChainFactory {
    factories: Vec<Arc<dyn ToolFactory>>,
}

impl ChainFactory {
    pub fn new(factories: Vec<Arc<dyn ToolFactory>>) -> Self {
        Self { factories }
    }

    #[must_use]
    pub fn with(mut self, factory: impl ToolFactory + 'static) -> Self {
        self.factories.push(Arc::new(factory));
        self
    }
}

impl ToolFactory for ChainFactory {
    fn resolve(&self, reference: &str) -> Option<Vec<Tool>> {
        self.factories.iter().find_map(|f| f.resolve(reference))
    }
}
