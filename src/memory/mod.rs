//! Per-agent knowledge: facts, event log, association graph
//!
//! Each agent owns exactly one store; parallel phases only ever touch the
//! store of the agent being processed, so no locking is needed.

pub mod archive;
pub mod schema;
pub mod store;

pub use archive::{ArchivedMemory, MemoryArchive};
pub use schema::{MemorySchema, MemoryValue, ValueKind};
pub use store::{MemoryEvent, MemoryEventKind, MemoryStore, StampedValue};
