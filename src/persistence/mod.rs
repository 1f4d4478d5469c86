//! Snapshot and restore

pub mod migration;
pub mod snapshot;

pub use migration::MigrationRegistry;
pub use snapshot::{AgentRecord, ChunkRecord, KernelState, StateBlob, SCHEMA_VERSION};
