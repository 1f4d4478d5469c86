//! Hex-grid coordinates and chunk addressing

pub mod hex;

pub use hex::{ChunkCoord, HexCoord, HexPosition};
