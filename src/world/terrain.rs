//! Terrain generation contract and the default seeded generator
//!
//! Generators must be deterministic: the same seed and chunk coordinate
//! always produce the same tiles, so an unloaded chunk can be reloaded
//! without persisting its terrain.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use thiserror::Error;

use crate::spatial::hex::ChunkCoord;
use crate::world::chunk::{Biome, ResourceDeposit, ResourceKind, Tile, TileSet};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenerationError {
    #[error("generator failed: {0}")]
    Failed(String),
    #[error("generation exceeded its {0}ms budget")]
    TimedOut(u64),
    #[error("generation task aborted: {0}")]
    Aborted(String),
}

/// External terrain collaborator
///
/// Called from blocking worker threads, never from the tick thread.
pub trait TerrainGenerator: Send + Sync + 'static {
    fn generate(&self, coord: ChunkCoord, seed: u64, chunk_size: u32) -> Result<TileSet, GenerationError>;
}

/// Seed an RNG from the world seed and a chunk coordinate
pub fn chunk_rng(seed: u64, coord: ChunkCoord) -> ChaCha8Rng {
    let mixed = seed
        ^ (coord.q as i64 as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ (coord.r as i64 as u64).wrapping_mul(0xC2B2_AE3D_27D4_EB4F);
    ChaCha8Rng::seed_from_u64(mixed)
}

/// Default generator: seeded elevation with biome bands
///
/// Deliberately simple; real worlds plug in their own generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeededTerrain;

impl SeededTerrain {
    fn biome_for(elevation: i32, moisture: f32) -> Biome {
        match elevation {
            e if e < -2 => Biome::Ocean,
            e if e > 6 => Biome::Mountains,
            _ if moisture > 0.6 => Biome::Forest,
            _ if moisture < 0.2 => Biome::Desert,
            _ => Biome::Plains,
        }
    }

    fn resources_for(biome: Biome, rng: &mut ChaCha8Rng) -> Vec<ResourceDeposit> {
        let kind = match biome {
            Biome::Plains | Biome::Forest => ResourceKind::Food,
            Biome::Ocean => ResourceKind::Water,
            Biome::Mountains => ResourceKind::Metal,
            Biome::Desert => ResourceKind::Energy,
        };
        if rng.gen_bool(0.25) {
            vec![ResourceDeposit::full(kind, rng.gen_range(10.0..100.0))]
        } else {
            Vec::new()
        }
    }
}

impl TerrainGenerator for SeededTerrain {
    fn generate(&self, coord: ChunkCoord, seed: u64, chunk_size: u32) -> Result<TileSet, GenerationError> {
        let mut rng = chunk_rng(seed, coord);
        let base: i32 = rng.gen_range(-4..=8);
        let moisture_base: f32 = rng.gen_range(0.0..1.0);

        let tiles = coord
            .hexes(chunk_size)
            .map(|hex| {
                let elevation = base + rng.gen_range(-2..=2);
                let moisture = (moisture_base + rng.gen_range(-0.15..0.15)).clamp(0.0, 1.0);
                let biome = Self::biome_for(elevation, moisture);
                let resources = Self::resources_for(biome, &mut rng);
                Tile {
                    coord: hex,
                    biome,
                    elevation,
                    resources,
                }
            })
            .collect();

        Ok(TileSet {
            coord,
            size: chunk_size,
            tiles,
        })
    }
}
