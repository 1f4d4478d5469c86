//! Schema migrations for snapshots written by older builds

use std::collections::BTreeMap;

use serde_json::Value;

use crate::core::error::{KernelError, Result};
use crate::persistence::snapshot::{StateBlob, SCHEMA_VERSION};

type MigrationFn = Box<dyn Fn(Value) -> Result<Value> + Send + Sync>;

/// Upgrade steps keyed by the version they upgrade from
///
/// A step registered for version `n` turns a version-`n` state into a
/// version-`n + 1` state.
#[derive(Default)]
pub struct MigrationRegistry {
    steps: BTreeMap<u32, MigrationFn>,
}

impl MigrationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, from_version: u32, step: F) -> &mut Self
    where
        F: Fn(Value) -> Result<Value> + Send + Sync + 'static,
    {
        self.steps.insert(from_version, Box::new(step));
        self
    }

    pub fn has_step(&self, from_version: u32) -> bool {
        self.steps.contains_key(&from_version)
    }

    /// Walk a blob up to the current version
    ///
    /// Fails with `SerializationVersionMismatch` if the blob is newer than
    /// this build or any step on the way is missing.
    pub fn upgrade(&self, blob: StateBlob) -> Result<StateBlob> {
        let found = blob.version;
        let mismatch = || KernelError::SerializationVersionMismatch {
            found,
            expected: SCHEMA_VERSION,
        };
        if found > SCHEMA_VERSION {
            return Err(mismatch());
        }

        let StateBlob {
            mut version,
            snapshot_id,
            mut state,
        } = blob;
        while version < SCHEMA_VERSION {
            let step = self.steps.get(&version).ok_or_else(mismatch)?;
            state = step(state)?;
            tracing::info!("Migrated snapshot {} from v{} to v{}", snapshot_id, version, version + 1);
            version += 1;
        }
        Ok(StateBlob {
            version,
            snapshot_id,
            state,
        })
    }
}

impl std::fmt::Debug for MigrationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationRegistry")
            .field("from_versions", &self.steps.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    fn blob(version: u32, state: Value) -> StateBlob {
        StateBlob {
            version,
            snapshot_id: Uuid::new_v4(),
            state,
        }
    }

    #[test]
    fn test_current_version_passes_through() {
        let registry = MigrationRegistry::new();
        let original = blob(SCHEMA_VERSION, json!({ "tick": 1 }));
        assert_eq!(registry.upgrade(original.clone()).unwrap(), original);
    }

    #[test]
    fn test_missing_step_is_mismatch() {
        let registry = MigrationRegistry::new();
        let err = registry.upgrade(blob(0, json!({}))).unwrap_err();
        assert!(matches!(
            err,
            KernelError::SerializationVersionMismatch { found: 0, .. }
        ));
    }

    #[test]
    fn test_step_applied() {
        let mut registry = MigrationRegistry::new();
        registry.register(0, |mut state| {
            state["migrated"] = json!(true);
            Ok(state)
        });
        let upgraded = registry.upgrade(blob(0, json!({}))).unwrap();
        assert_eq!(upgraded.version, SCHEMA_VERSION);
        assert_eq!(upgraded.state["migrated"], json!(true));
    }

    #[test]
    fn test_newer_blob_rejected() {
        let mut registry = MigrationRegistry::new();
        registry.register(SCHEMA_VERSION, Ok);
        assert!(registry.upgrade(blob(SCHEMA_VERSION + 1, json!({}))).is_err());
    }
}
