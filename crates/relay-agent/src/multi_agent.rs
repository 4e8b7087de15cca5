//! Multi-Agent Hand-off
//!
//! An orchestrator agent classifies the latest request into labels; the
//! first hand-off whose trigger labels intersect the classification answers
//! the original conversation, otherwise the fallback does.
//!
//! Hand-off is single level: the chosen agent's result is returned as is.
//!
//! The classification is requested through `output_structure`. An
//! orchestrator without a [`StructuredOutputProcessor`] drops that option
//! and must answer with JSON text instead.
//!
//! [`StructuredOutputProcessor`]: crate::processor::StructuredOutputProcessor

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use relay_core::error::{RelayError, Result};
use relay_core::options::OUTPUT_STRUCTURE;
use relay_core::{Message, MessageBag, ModelResult, Options, ResultContent};

use crate::agent::AgentInterface;
use crate::processor::OutputStructure;

/// Metadata key naming the agent that answered
pub const HANDOFF_AGENT: &str = "handoff_agent";
/// Metadata key holding the orchestrator's labels
pub const HANDOFF_LABELS: &str = "handoff_labels";

/// Routing rule: target agent plus the labels that select it
#[derive(Clone)]
pub struct Handoff {
    agent: Arc<dyn AgentInterface>,
    labels: BTreeSet<String>,
}

impl Handoff {
    pub fn new<I, S>(agent: Arc<dyn AgentInterface>, labels: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let labels: BTreeSet<String> = labels
            .into_iter()
            .map(|label| label.as_ref().trim().to_lowercase())
            .filter(|label| !label.is_empty())
            .collect();

        if labels.is_empty() {
            return Err(RelayError::InvalidArgument(format!(
                "hand-off to '{}' needs at least one trigger label",
                agent.name()
            )));
        }

        Ok(Self { agent, labels })
    }

    pub fn agent(&self) -> &Arc<dyn AgentInterface> {
        &self.agent
    }

    pub const fn labels(&self) -> &BTreeSet<String> {
        &self.labels
    }

    fn matches(&self, classification: &Classification) -> bool {
        classification
            .labels
            .iter()
            .any(|label| self.labels.contains(&label.trim().to_lowercase()))
    }
}

/// Orchestrator's decision
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub reasoning: String,
}

impl Classification {
    fn structure() -> OutputStructure {
        OutputStructure::new(
            "classification",
            json!({
                "type": "object",
                "properties": {
                    "labels": { "type": "array", "items": { "type": "string" } },
                    "reasoning": { "type": "string" },
                },
                "required": ["labels", "reasoning"],
                "additionalProperties": false,
            }),
        )
    }

    /// Accepts an object result or text holding JSON
    fn from_result(result: &ModelResult) -> Option<Self> {
        match result.content() {
            ResultContent::Object(value) => serde_json::from_value(value.clone()).ok(),
            ResultContent::Text(text) => serde_json::from_str(text.trim()).ok(),
            _ => None,
        }
    }
}

/// Routes each call to one of several agents
pub struct MultiAgent {
    name: String,
    orchestrator: Arc<dyn AgentInterface>,
    handoffs: Vec<Handoff>,
    fallback: Arc<dyn AgentInterface>,
}

impl MultiAgent {
    pub fn new(
        name: impl Into<String>,
        orchestrator: Arc<dyn AgentInterface>,
        handoffs: Vec<Handoff>,
        fallback: Arc<dyn AgentInterface>,
    ) -> Result<Self> {
        if handoffs.is_empty() {
            return Err(RelayError::InvalidArgument(
                "a multi-agent needs at least one hand-off".into(),
            ));
        }

        Ok(Self {
            name: name.into(),
            orchestrator,
            handoffs,
            fallback,
        })
    }

    fn routing_prompt(&self, request: &str) -> String {
        let mut prompt = String::from(
            "You route requests to specialized agents. Classify the request below with \
             the labels of the agents that should handle it.\n\n## Agents\n\n",
        );
        for handoff in &self.handoffs {
            let labels: Vec<&str> = handoff.labels.iter().map(String::as_str).collect();
            prompt.push_str(&format!("- {}: {}\n", handoff.agent.name(), labels.join(", ")));
        }
        prompt.push_str(
            "\nAnswer with JSON: {\"labels\": [...], \"reasoning\": \"...\"}. \
             Use an empty label list when no agent fits.\n\n## Request\n\n",
        );
        prompt.push_str(request);
        prompt
    }

    /// Ask the orchestrator for labels; an unusable answer counts as none
    pub async fn classify(&self, messages: &MessageBag) -> Result<Classification> {
        let request = messages.last_user_text().unwrap_or_default();
        let mut routing = MessageBag::new();
        routing.push(Message::user(self.routing_prompt(&request)))?;

        let options = Options::new().with(
            OUTPUT_STRUCTURE,
            serde_json::to_value(Classification::structure())?,
        );
        let result = self.orchestrator.call(&mut routing, options).await?;

        Ok(Classification::from_result(&result).unwrap_or_else(|| {
            tracing::warn!(
                agent = %self.name,
                result = result.content().kind(),
                "Unparseable classification, using fallback"
            );
            Classification::default()
        }))
    }

    fn select(&self, classification: &Classification) -> &Arc<dyn AgentInterface> {
        self.handoffs
            .iter()
            .find(|handoff| handoff.matches(classification))
            .map_or(&self.fallback, |handoff| &handoff.agent)
    }
}

#[async_trait]
impl AgentInterface for MultiAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn call(&self, messages: &mut MessageBag, options: Options) -> Result<ModelResult> {
        let classification = self.classify(messages).await?;
        let agent = self.select(&classification);

        tracing::info!(
            agent = %self.name,
            target = %agent.name(),
            labels = ?classification.labels,
            reasoning = %classification.reasoning,
            "Handing off"
        );

        let mut result = agent.call(messages, options).await?;
        let labels: Vec<Value> = classification.labels.into_iter().map(Value::String).collect();
        result.metadata_mut().add(HANDOFF_AGENT, agent.name());
        result.metadata_mut().add(HANDOFF_LABELS, labels);

        Ok(result)
    }
}
