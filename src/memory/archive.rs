//! Archived memories of destroyed agents flagged persistent

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::types::{AgentId, Tick};
use crate::memory::store::MemoryStore;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchivedMemory {
    pub name: String,
    pub died_at: Tick,
    pub memory: MemoryStore,
}

/// Stores kept after their agent died, for learning continuity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryArchive {
    entries: BTreeMap<AgentId, ArchivedMemory>,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn archive(&mut self, agent: AgentId, name: String, memory: MemoryStore, tick: Tick) {
        tracing::debug!("Archiving memory of {} ({} facts)", agent, memory.fact_count());
        self.entries.insert(
            agent,
            ArchivedMemory {
                name,
                died_at: tick,
                memory,
            },
        );
    }

    pub fn get(&self, agent: AgentId) -> Option<&ArchivedMemory> {
        self.entries.get(&agent)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
