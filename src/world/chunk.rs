//! Chunks, tiles and terrain summaries

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};

use crate::core::types::Tick;
use crate::spatial::hex::{ChunkCoord, HexCoord};

/// Represents a biome in the world
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Biome {
    Plains,
    Forest,
    Desert,
    Mountains,
    Ocean,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Food,
    Water,
    Energy,
    Metal,
    Oxygen,
}

impl ResourceKind {
    /// Whether a depleted deposit grows back
    pub fn is_renewable(&self) -> bool {
        !matches!(self, ResourceKind::Metal)
    }
}

/// A stock of one resource lying on a tile
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceDeposit {
    pub kind: ResourceKind,
    pub amount: f32,
    /// Renewable deposits grow back up to this
    #[serde(default)]
    pub capacity: f32,
}

impl ResourceDeposit {
    pub fn full(kind: ResourceKind, capacity: f32) -> Self {
        Self {
            kind,
            amount: capacity,
            capacity,
        }
    }

    /// Remove up to `wanted`, returning how much was actually taken
    pub fn take(&mut self, wanted: f32) -> f32 {
        let taken = wanted.clamp(0.0, self.amount);
        self.amount -= taken;
        taken
    }

    /// Grow a renewable deposit toward its capacity; returns the growth
    pub fn regrow(&mut self, step: f32) -> f32 {
        if !self.kind.is_renewable() || self.amount >= self.capacity {
            return 0.0;
        }
        let grown = step.min(self.capacity - self.amount).max(0.0);
        self.amount += grown;
        grown
    }
}

/// A single hex cell, owned by exactly one chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    pub coord: HexCoord,
    pub biome: Biome,
    pub elevation: i32,
    pub resources: Vec<ResourceDeposit>,
}

impl Tile {
    pub fn deposit(&self, kind: ResourceKind) -> Option<&ResourceDeposit> {
        self.resources.iter().find(|d| d.kind == kind)
    }

    pub fn deposit_mut(&mut self, kind: ResourceKind) -> Option<&mut ResourceDeposit> {
        self.resources.iter_mut().find(|d| d.kind == kind)
    }
}

/// All tiles of a chunk, row-major from the chunk origin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileSet {
    pub coord: ChunkCoord,
    pub size: u32,
    pub tiles: Vec<Tile>,
}

impl TileSet {
    fn index_of(&self, hex: HexCoord) -> Option<usize> {
        let origin = self.coord.origin(self.size);
        let dq = hex.q - origin.q;
        let dr = hex.r - origin.r;
        let size = self.size as i32;
        if dq < 0 || dr < 0 || dq >= size || dr >= size {
            return None;
        }
        Some((dr * size + dq) as usize)
    }

    pub fn tile(&self, hex: HexCoord) -> Option<&Tile> {
        self.index_of(hex).and_then(|i| self.tiles.get(i))
    }

    pub fn tile_mut(&mut self, hex: HexCoord) -> Option<&mut Tile> {
        self.index_of(hex).and_then(move |i| self.tiles.get_mut(i))
    }

    /// Grow every renewable deposit by `step`; returns the total growth
    pub fn regrow(&mut self, step: f32) -> f32 {
        self.tiles
            .iter_mut()
            .flat_map(|t| t.resources.iter_mut())
            .map(|d| d.regrow(step))
            .sum()
    }

    /// Flat plains with no resources; committed when generation fails
    pub fn placeholder(coord: ChunkCoord, size: u32) -> Self {
        let tiles = coord
            .hexes(size)
            .map(|hex| Tile {
                coord: hex,
                biome: Biome::Plains,
                elevation: 0,
                resources: Vec::new(),
            })
            .collect();
        Self { coord, size, tiles }
    }

    pub fn summary(&self) -> ChunkSummary {
        let mut counts: BTreeMap<Biome, usize> = BTreeMap::new();
        let mut min = i32::MAX;
        let mut max = i32::MIN;
        let mut total: i64 = 0;
        for tile in &self.tiles {
            *counts.entry(tile.biome).or_default() += 1;
            min = min.min(tile.elevation);
            max = max.max(tile.elevation);
            total += tile.elevation as i64;
        }

        let dominant_biome = counts
            .iter()
            .max_by_key(|(biome, count)| (**count, std::cmp::Reverse(**biome)))
            .map(|(biome, _)| *biome)
            .unwrap_or(Biome::Plains);
        let n = self.tiles.len().max(1);

        ChunkSummary {
            dominant_biome,
            min_elevation: if self.tiles.is_empty() { 0 } else { min },
            max_elevation: if self.tiles.is_empty() { 0 } else { max },
            mean_elevation: total as f32 / n as f32,
        }
    }
}

/// Biome/elevation digest of a chunk
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChunkSummary {
    pub dominant_biome: Biome,
    pub min_elevation: i32,
    pub max_elevation: i32,
    pub mean_elevation: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoadState {
    Unloaded,
    Loading,
    Ready,
    /// Idle countdown running; returns to Ready if needed again
    Unloading,
}

/// Terrain shared between the manager, load tickets and agent actions
///
/// Writers take the exclusive lock only for the duration of a single edit.
#[derive(Debug)]
pub struct ChunkTerrain {
    tiles: RwLock<TileSet>,
}

impl ChunkTerrain {
    pub fn new(tiles: TileSet) -> Arc<Self> {
        Arc::new(Self {
            tiles: RwLock::new(tiles),
        })
    }

    pub fn read(&self) -> RwLockReadGuard<'_, TileSet> {
        // A panicked writer cannot leave a TileSet half-written: edits are single assignments
        self.tiles.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, TileSet> {
        self.tiles.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn snapshot(&self) -> TileSet {
        self.read().clone()
    }
}

/// A loaded (or loading) chunk
#[derive(Debug, Clone)]
pub struct Chunk {
    pub coord: ChunkCoord,
    pub state: LoadState,
    pub terrain: Arc<ChunkTerrain>,
    pub summary: ChunkSummary,
    /// Placeholder terrain committed after a failed or overrun generation
    pub degraded: bool,
    pub degraded_since: Option<Tick>,
    /// Terrain changed by agents since generation
    pub edited: bool,
    pub idle_ticks: u64,
    pub loaded_at: Tick,
}

impl Chunk {
    pub fn new(terrain: Arc<ChunkTerrain>, degraded: bool, tick: Tick) -> Self {
        let (coord, summary) = {
            let tiles = terrain.read();
            (tiles.coord, tiles.summary())
        };
        Self {
            coord,
            state: LoadState::Ready,
            terrain,
            summary,
            degraded,
            degraded_since: degraded.then_some(tick),
            edited: false,
            idle_ticks: 0,
            loaded_at: tick,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, LoadState::Ready | LoadState::Unloading)
    }
}
