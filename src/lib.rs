//! Hexkernel - fixed-timestep agent simulation on a streamed hex world
//!
//! The kernel advances behavior-tree driven agents through six ordered
//! phases per tick while chunks of terrain are generated around them in
//! the background. Start at [`kernel::Kernel`].

pub mod agent;
pub mod behavior;
pub mod command;
pub mod core;
pub mod kernel;
pub mod memory;
pub mod messaging;
pub mod persistence;
pub mod simulation;
pub mod spatial;
pub mod world;

pub use kernel::{ChunkInfo, Kernel};
