//! Structured edit intents
//!
//! Upstream tooling turns natural language into one of these; the kernel
//! never sees free text. Intents arrive as JSON tagged by `intent`.

use serde::{Deserialize, Serialize};

use crate::behavior::{Node, NodeId, OverrideId};
use crate::core::error::{KernelError, Result};
use crate::memory::MemoryValue;

/// One key/value assignment inside a SetFacts intent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactEdit {
    pub key: String,
    pub value: MemoryValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "intent", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
    /// Write facts; all are checked against the memory schema before any is written
    SetFacts { facts: Vec<FactEdit> },
    /// Strengthen (or weaken, with a negative delta) an association
    Associate { a: String, b: String, delta: f32 },
    InstallOverride {
        node: NodeId,
        priority: i32,
        substitute: Node,
    },
    RemoveOverride { id: OverrideId },
    /// Save the agent's tree, winning overrides baked in, as a named template
    PromoteTemplate { name: String },
}

impl Intent {
    pub fn name(&self) -> &'static str {
        match self {
            Intent::SetFacts { .. } => "SET_FACTS",
            Intent::Associate { .. } => "ASSOCIATE",
            Intent::InstallOverride { .. } => "INSTALL_OVERRIDE",
            Intent::RemoveOverride { .. } => "REMOVE_OVERRIDE",
            Intent::PromoteTemplate { .. } => "PROMOTE_TEMPLATE",
        }
    }
}

/// Parse an intent from its JSON form; anything else is rejected
pub fn parse_intent(text: &str) -> Result<Intent> {
    serde_json::from_str(text).map_err(|e| {
        tracing::warn!("Rejected intent: {}", e);
        KernelError::InvalidEdit(format!("malformed intent: {}", e))
    })
}

/// What applying an intent changed
#[derive(Debug, Clone, PartialEq)]
pub enum IntentOutcome {
    FactsSet(usize),
    Associated { weight: f32 },
    OverrideInstalled(OverrideId),
    OverrideRemoved { node: NodeId },
    TemplatePromoted(String),
}
