//! Per-agent knowledge base
//!
//! Three parts, all serializable so a store survives snapshot/restore and
//! archival:
//! - facts: key → value, last-write-wins by tick stamp
//! - log: append-only audit trail of everything that changed the store
//! - associations: undirected weighted graph used for learning; weights
//!   are reinforced by actions and decay periodically toward zero

use std::collections::BTreeMap;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::core::error::Result;
use crate::core::types::{AgentId, Tick};
use crate::memory::schema::{MemorySchema, MemoryValue};

/// A fact value with the tick it was written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StampedValue {
    pub value: MemoryValue,
    pub tick: Tick,
}

/// What happened to the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MemoryEventKind {
    FactWritten { key: String },
    /// A write stamped older than the stored value lost
    StaleWrite { key: String, stamp: Tick },
    MessageReceived { from: Option<AgentId>, payload: String },
    Reinforced { a: String, b: String, weight: f32 },
    EditApplied { keys: Vec<String> },
    Decayed { pruned: usize },
    Inherited { from: AgentId },
}

/// One entry of the append-only log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEvent {
    pub tick: Tick,
    pub kind: MemoryEventKind,
}

/// Knowledge base owned by a single agent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryStore {
    facts: BTreeMap<String, StampedValue>,
    log: Vec<MemoryEvent>,
    /// Keyed by the lexically smaller endpoint, then the larger one
    associations: BTreeMap<String, BTreeMap<String, f32>>,
}

/// Order an association pair so (x, y) and (y, x) share storage
fn edge<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // === FACTS ===

    pub fn get(&self, key: &str) -> Option<&MemoryValue> {
        self.facts.get(key).map(|s| &s.value)
    }

    pub fn get_stamped(&self, key: &str) -> Option<&StampedValue> {
        self.facts.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.facts.contains_key(key)
    }

    pub fn fact_count(&self) -> usize {
        self.facts.len()
    }

    pub fn facts(&self) -> impl Iterator<Item = (&String, &StampedValue)> {
        self.facts.iter()
    }

    /// Write a fact stamped with `tick`
    ///
    /// Returns false (and logs a stale write) when the stored value carries
    /// a later stamp. Equal stamps overwrite: within a tick the last write wins.
    pub fn set(&mut self, key: impl Into<String>, value: MemoryValue, tick: Tick) -> bool {
        let key = key.into();
        if let Some(existing) = self.facts.get(&key) {
            if existing.tick > tick {
                self.record(tick, MemoryEventKind::StaleWrite { key, stamp: tick });
                return false;
            }
        }
        self.facts.insert(key.clone(), StampedValue { value, tick });
        self.record(tick, MemoryEventKind::FactWritten { key });
        true
    }

    /// Apply a batch of externally requested writes
    ///
    /// Every entry is checked against the schema first; nothing is written
    /// unless all of them pass.
    pub fn apply_edit(
        &mut self,
        entries: &[(String, MemoryValue)],
        schema: &MemorySchema,
        tick: Tick,
    ) -> Result<()> {
        for (key, value) in entries {
            schema.check(key, value)?;
        }

        for (key, value) in entries {
            self.facts.insert(
                key.clone(),
                StampedValue {
                    value: value.clone(),
                    tick,
                },
            );
        }
        self.record(
            tick,
            MemoryEventKind::EditApplied {
                keys: entries.iter().map(|(k, _)| k.clone()).collect(),
            },
        );
        Ok(())
    }

    // === LOG ===

    pub fn record(&mut self, tick: Tick, kind: MemoryEventKind) {
        self.log.push(MemoryEvent { tick, kind });
    }

    pub fn log(&self) -> &[MemoryEvent] {
        &self.log
    }

    // === ASSOCIATIONS ===

    pub fn association(&self, a: &str, b: &str) -> f32 {
        let (lo, hi) = edge(a, b);
        self.associations
            .get(lo)
            .and_then(|m| m.get(hi))
            .copied()
            .unwrap_or(0.0)
    }

    /// Increase the weight of association (a, b) by `delta`
    ///
    /// Weights never go below zero; a non-positive result removes the edge.
    pub fn reinforce(&mut self, a: &str, b: &str, delta: f32, tick: Tick) -> f32 {
        let (lo, hi) = edge(a, b);
        let targets = self.associations.entry(lo.to_string()).or_default();
        let weight = targets.entry(hi.to_string()).or_insert(0.0);
        *weight = (*weight + delta).max(0.0);
        let new_weight = *weight;

        if new_weight <= 0.0 {
            targets.remove(hi);
            if targets.is_empty() {
                self.associations.remove(lo);
            }
        }

        self.record(
            tick,
            MemoryEventKind::Reinforced {
                a: lo.to_string(),
                b: hi.to_string(),
                weight: new_weight,
            },
        );
        new_weight
    }

    pub fn association_count(&self) -> usize {
        self.associations.values().map(|m| m.len()).sum()
    }

    /// Multiply every weight by `factor`, pruning those that fall below `floor`
    ///
    /// Returns the number of pruned associations.
    pub fn decay(&mut self, factor: f32, floor: f32, tick: Tick) -> usize {
        if self.associations.is_empty() {
            return 0;
        }

        let mut pruned = 0;
        for targets in self.associations.values_mut() {
            targets.retain(|_, w| {
                *w *= factor;
                let keep = *w >= floor;
                if !keep {
                    pruned += 1;
                }
                keep
            });
        }
        self.associations.retain(|_, targets| !targets.is_empty());

        if pruned > 0 {
            self.record(tick, MemoryEventKind::Decayed { pruned });
        }
        pruned
    }

    /// The `k` heaviest associations, heaviest first
    pub fn strongest_associations(&self, k: usize) -> Vec<(String, String, f32)> {
        let mut all: Vec<_> = self
            .associations
            .iter()
            .flat_map(|(a, targets)| targets.iter().map(move |(b, w)| (a.clone(), b.clone(), *w)))
            .collect();
        all.sort_by_key(|(a, b, w)| (std::cmp::Reverse(OrderedFloat(*w)), a.clone(), b.clone()));
        all.truncate(k);
        all
    }

    /// Seed this store from an archived one
    pub fn inherit(&mut self, from: AgentId, archived: &MemoryStore, tick: Tick) {
        for (key, stamped) in &archived.facts {
            self.facts.entry(key.clone()).or_insert_with(|| stamped.clone());
        }
        for (a, targets) in &archived.associations {
            let mine = self.associations.entry(a.clone()).or_default();
            for (b, w) in targets {
                let entry = mine.entry(b.clone()).or_insert(0.0);
                *entry = entry.max(*w);
            }
        }
        self.record(tick, MemoryEventKind::Inherited { from });
    }
}
