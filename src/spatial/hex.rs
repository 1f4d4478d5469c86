//! Hex coordinate system (axial coordinates)
//!
//! Uses axial coordinates (q, r) for easy neighbor calculation. Chunks
//! partition the hex plane into `chunk_size × chunk_size` parallelograms
//! addressed by their own axial coordinate.

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Axial hex coordinate
#[derive(
    Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[display(fmt = "({}, {})", q, r)]
pub struct HexCoord {
    pub q: i32,
    pub r: i32,
}

impl HexCoord {
    pub fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    /// Cube coordinate S (derived from q and r)
    pub fn s(&self) -> i32 {
        -self.q - self.r
    }

    /// Manhattan distance in hex space
    pub fn distance(&self, other: &Self) -> u32 {
        let dq = (self.q - other.q).abs();
        let dr = (self.r - other.r).abs();
        let ds = (self.s() - other.s()).abs();
        ((dq + dr + ds) / 2) as u32
    }

    /// Get all 6 neighboring hex coordinates
    pub fn neighbors(&self) -> [HexCoord; 6] {
        [
            HexCoord::new(self.q + 1, self.r),
            HexCoord::new(self.q + 1, self.r - 1),
            HexCoord::new(self.q, self.r - 1),
            HexCoord::new(self.q - 1, self.r),
            HexCoord::new(self.q - 1, self.r + 1),
            HexCoord::new(self.q, self.r + 1),
        ]
    }

    /// Get all hexes within range (inclusive)
    pub fn hexes_in_range(&self, range: u32) -> Vec<HexCoord> {
        let range = range as i32;
        let mut results = Vec::new();
        for q in -range..=range {
            for r in (-range).max(-q - range)..=range.min(-q + range) {
                results.push(HexCoord::new(self.q + q, self.r + r));
            }
        }
        results
    }
}

/// An agent's location: hex cell plus elevation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct HexPosition {
    pub coord: HexCoord,
    pub elevation: i32,
}

impl HexPosition {
    pub fn new(coord: HexCoord, elevation: i32) -> Self {
        Self { coord, elevation }
    }

    pub fn at(q: i32, r: i32) -> Self {
        Self::new(HexCoord::new(q, r), 0)
    }
}

/// Axial coordinate of a chunk
#[derive(
    Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[display(fmt = "chunk({}, {})", q, r)]
pub struct ChunkCoord {
    pub q: i32,
    pub r: i32,
}

impl ChunkCoord {
    pub fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    /// The chunk that owns `hex` for a given chunk edge length
    pub fn containing(hex: HexCoord, chunk_size: u32) -> Self {
        let size = chunk_size.max(1) as i32;
        Self::new(hex.q.div_euclid(size), hex.r.div_euclid(size))
    }

    /// Distance between chunks measured on the chunk grid
    pub fn distance(&self, other: &Self) -> u32 {
        HexCoord::new(self.q, self.r).distance(&HexCoord::new(other.q, other.r))
    }

    /// All chunks within `radius` chunk steps (inclusive)
    pub fn chunks_in_range(&self, radius: u32) -> Vec<ChunkCoord> {
        HexCoord::new(self.q, self.r)
            .hexes_in_range(radius)
            .into_iter()
            .map(|h| ChunkCoord::new(h.q, h.r))
            .collect()
    }

    /// First hex (lowest q, lowest r) covered by this chunk
    pub fn origin(&self, chunk_size: u32) -> HexCoord {
        let size = chunk_size.max(1) as i32;
        HexCoord::new(self.q * size, self.r * size)
    }

    /// Every hex covered by this chunk in row-major order
    pub fn hexes(&self, chunk_size: u32) -> impl Iterator<Item = HexCoord> {
        let origin = self.origin(chunk_size);
        let size = chunk_size.max(1) as i32;
        (0..size).flat_map(move |dr| (0..size).map(move |dq| HexCoord::new(origin.q + dq, origin.r + dr)))
    }
}
