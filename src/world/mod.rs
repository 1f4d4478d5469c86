//! World terrain: chunks, generation, and streaming around agents

pub mod chunk;
pub mod streaming;
pub mod terrain;
pub mod view;

pub use chunk::{Biome, Chunk, ChunkSummary, ChunkTerrain, LoadState, ResourceDeposit, ResourceKind, Tile, TileSet};
pub use streaming::{LoadOutcome, LoadTicket, SpatialChunkManager, StreamReport};
pub use terrain::{GenerationError, SeededTerrain, TerrainGenerator};
pub use view::{ChunkReadiness, TerrainView};
