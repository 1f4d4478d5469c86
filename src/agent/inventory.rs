//! Resources an agent carries

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::world::chunk::ResourceKind;

/// Carry limit per resource kind when none is configured
pub const DEFAULT_CARRY_CAPACITY: f32 = 100.0;

/// Per-kind stockpile with a shared per-kind capacity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    capacity: f32,
    held: BTreeMap<ResourceKind, f32>,
}

impl Default for Inventory {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CARRY_CAPACITY)
    }
}

impl Inventory {
    pub fn with_capacity(capacity: f32) -> Self {
        Self {
            capacity: capacity.max(0.0),
            held: BTreeMap::new(),
        }
    }

    pub fn capacity(&self) -> f32 {
        self.capacity
    }

    pub fn get(&self, kind: ResourceKind) -> f32 {
        self.held.get(&kind).copied().unwrap_or(0.0)
    }

    /// Room left for `kind`
    pub fn space(&self, kind: ResourceKind) -> f32 {
        (self.capacity - self.get(kind)).max(0.0)
    }

    /// Add up to the capacity; returns how much was actually stored
    pub fn add(&mut self, kind: ResourceKind, amount: f32) -> f32 {
        let added = amount.clamp(0.0, self.space(kind));
        if added > 0.0 {
            *self.held.entry(kind).or_insert(0.0) += added;
        }
        added
    }

    /// Remove exactly `amount`, or nothing if there is not enough
    pub fn consume(&mut self, kind: ResourceKind, amount: f32) -> bool {
        let current = self.get(kind);
        if amount < 0.0 || current < amount {
            return false;
        }
        let left = current - amount;
        if left > 0.0 {
            self.held.insert(kind, left);
        } else {
            self.held.remove(&kind);
        }
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = (ResourceKind, f32)> + '_ {
        self.held.iter().map(|(k, v)| (*k, *v))
    }

    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }
}
