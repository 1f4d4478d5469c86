//! Read-mostly view of Ready terrain handed to parallel phases

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::spatial::hex::{ChunkCoord, HexCoord};
use crate::world::chunk::{ChunkTerrain, ResourceKind};
use crate::world::streaming::SpatialChunkManager;

/// Anything that can answer "is this chunk Ready?"
pub trait ChunkReadiness {
    fn is_chunk_ready(&self, coord: ChunkCoord) -> bool;
}

impl ChunkReadiness for SpatialChunkManager {
    fn is_chunk_ready(&self, coord: ChunkCoord) -> bool {
        self.is_ready(coord)
    }
}

impl ChunkReadiness for BTreeSet<ChunkCoord> {
    fn is_chunk_ready(&self, coord: ChunkCoord) -> bool {
        self.contains(&coord)
    }
}

/// Ready chunks captured at the start of a phase
///
/// Holds shared handles, so terrain edits made through the view land in
/// the manager's chunks. Edits take the chunk write lock per tile.
#[derive(Debug, Clone, Default)]
pub struct TerrainView {
    chunk_size: u32,
    ready: BTreeMap<ChunkCoord, Arc<ChunkTerrain>>,
}

impl TerrainView {
    pub fn new(chunk_size: u32) -> Self {
        Self {
            chunk_size,
            ready: BTreeMap::new(),
        }
    }

    pub fn capture(manager: &SpatialChunkManager) -> Self {
        let ready = manager
            .chunks()
            .filter(|c| c.is_ready())
            .map(|c| (c.coord, Arc::clone(&c.terrain)))
            .collect();
        Self {
            chunk_size: manager.chunk_size(),
            ready,
        }
    }

    pub fn with_chunk(mut self, terrain: Arc<ChunkTerrain>) -> Self {
        let coord = terrain.read().coord;
        self.ready.insert(coord, terrain);
        self
    }

    pub fn chunk_size(&self) -> u32 {
        self.chunk_size
    }

    pub fn chunk_of(&self, hex: HexCoord) -> ChunkCoord {
        ChunkCoord::containing(hex, self.chunk_size)
    }

    pub fn elevation(&self, hex: HexCoord) -> Option<i32> {
        let terrain = self.ready.get(&self.chunk_of(hex))?;
        let tiles = terrain.read();
        tiles.tile(hex).map(|t| t.elevation)
    }

    /// Change a tile's elevation; None if its chunk is not Ready or the
    /// result would leave the `i32` range (the tile is left untouched)
    pub fn modify_elevation(&self, hex: HexCoord, delta: i32) -> Option<i32> {
        let terrain = self.ready.get(&self.chunk_of(hex))?;
        let mut tiles = terrain.write();
        let tile = tiles.tile_mut(hex)?;
        tile.elevation = tile.elevation.checked_add(delta)?;
        Some(tile.elevation)
    }

    /// Amount of `kind` lying on a tile (0 when there is none)
    pub fn resource(&self, hex: HexCoord, kind: ResourceKind) -> f32 {
        let Some(terrain) = self.ready.get(&self.chunk_of(hex)) else {
            return 0.0;
        };
        let tiles = terrain.read();
        tiles
            .tile(hex)
            .and_then(|t| t.deposit(kind))
            .map_or(0.0, |d| d.amount)
    }

    /// Take up to `wanted` of `kind` from a tile under the chunk write lock
    ///
    /// None if the chunk is not Ready or the tile holds no such deposit.
    pub fn take_resource(&self, hex: HexCoord, kind: ResourceKind, wanted: f32) -> Option<f32> {
        let terrain = self.ready.get(&self.chunk_of(hex))?;
        let mut tiles = terrain.write();
        let deposit = tiles.tile_mut(hex)?.deposit_mut(kind)?;
        Some(deposit.take(wanted))
    }
}

impl ChunkReadiness for TerrainView {
    fn is_chunk_ready(&self, coord: ChunkCoord) -> bool {
        self.ready.contains_key(&coord)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::chunk::{ChunkTerrain, ResourceDeposit, TileSet};

    #[test]
    fn test_view_edits_shared_terrain() {
        let terrain = ChunkTerrain::new(TileSet::placeholder(ChunkCoord::new(0, 0), 4));
        let view = TerrainView::new(4).with_chunk(Arc::clone(&terrain));

        assert!(view.is_chunk_ready(ChunkCoord::new(0, 0)));
        assert!(!view.is_chunk_ready(ChunkCoord::new(1, 0)));
        assert_eq!(view.modify_elevation(HexCoord::new(2, 2), -3), Some(-3));
        assert_eq!(terrain.read().tile(HexCoord::new(2, 2)).unwrap().elevation, -3);
        assert_eq!(view.modify_elevation(HexCoord::new(9, 0), 1), None);
    }

    #[test]
    fn test_elevation_overflow_rejected() {
        let terrain = ChunkTerrain::new(TileSet::placeholder(ChunkCoord::new(0, 0), 4));
        let view = TerrainView::new(4).with_chunk(Arc::clone(&terrain));
        let hex = HexCoord::new(1, 1);

        assert_eq!(view.modify_elevation(hex, 5), Some(5));
        assert_eq!(view.modify_elevation(hex, i32::MAX), None);
        assert_eq!(view.elevation(hex), Some(5));
        assert_eq!(view.modify_elevation(hex, i32::MIN), Some(i32::MIN + 5));
        assert_eq!(view.modify_elevation(hex, i32::MIN), None);
        assert_eq!(view.elevation(hex), Some(i32::MIN + 5));
    }

    #[test]
    fn test_take_resource_from_tile() {
        let mut tiles = TileSet::placeholder(ChunkCoord::new(0, 0), 4);
        tiles.tiles[0].resources.push(ResourceDeposit::full(ResourceKind::Food, 8.0));
        let view = TerrainView::new(4).with_chunk(ChunkTerrain::new(tiles));
        let hex = HexCoord::new(0, 0);

        assert_eq!(view.resource(hex, ResourceKind::Food), 8.0);
        assert_eq!(view.take_resource(hex, ResourceKind::Food, 5.0), Some(5.0));
        assert_eq!(view.take_resource(hex, ResourceKind::Food, 5.0), Some(3.0));
        assert_eq!(view.resource(hex, ResourceKind::Food), 0.0);
        assert_eq!(view.take_resource(hex, ResourceKind::Water, 1.0), None);
        assert_eq!(view.take_resource(HexCoord::new(9, 0), ResourceKind::Food, 1.0), None);
    }
}
