//! Snapshot / restore
//!
//! - Round trip keeps agents, memory, cursors, loaded chunks, edited terrain
//!   and pending messages
//! - A restored kernel continues exactly where the original left off
//! - Older schema versions need a registered migration

use std::collections::BTreeSet;

use hexkernel::agent::{SpawnRequest, TreeSource};
use hexkernel::behavior::{Action, BehaviorTree, MoveTarget, TreeBuilder};
use hexkernel::command::{FactEdit, Intent};
use hexkernel::core::config::KernelConfig;
use hexkernel::core::error::KernelError;
use hexkernel::core::types::{AgentId, MessagePriority};
use hexkernel::memory::MemoryValue;
use hexkernel::messaging::{MessageSender, Recipient};
use hexkernel::persistence::{KernelState, MigrationRegistry, StateBlob, SCHEMA_VERSION};
use hexkernel::spatial::hex::{ChunkCoord, HexCoord, HexPosition};
use hexkernel::world::terrain::SeededTerrain;
use hexkernel::Kernel;
use std::sync::Arc;

fn inline(tree: BehaviorTree) -> TreeSource {
    TreeSource::Inline { tree }
}

fn walker_tree() -> BehaviorTree {
    let mut b = TreeBuilder::new();
    let walk = b.action(Action::MoveTo {
        target: MoveTarget::Hex(HexCoord::new(3, 0)),
        ticks: 3,
    });
    let rest = b.action(Action::Wait { ticks: 1_000 });
    let root = b.sequence(vec![walk, rest]);
    b.build(root).unwrap()
}

fn digger_tree() -> BehaviorTree {
    let mut b = TreeBuilder::new();
    let dig = b.action(Action::ModifyTerrain { delta: 3 });
    let rest = b.action(Action::Wait { ticks: 1_000 });
    let root = b.sequence(vec![dig, rest]);
    b.build(root).unwrap()
}

struct World {
    kernel: Kernel,
    walker: AgentId,
    digger: AgentId,
}

fn world(rt: &tokio::runtime::Runtime) -> World {
    let mut config = KernelConfig::default();
    config.streaming.seed = 99;
    let mut kernel = Kernel::with_default_terrain(config, rt.handle().clone()).unwrap();

    let walker = kernel
        .spawn(SpawnRequest::new("walker", HexPosition::at(0, 0), inline(walker_tree())))
        .unwrap();
    let digger = kernel
        .spawn(SpawnRequest::new("digger", HexPosition::at(5, 5), inline(digger_tree())))
        .unwrap();
    let elder = kernel
        .spawn(SpawnRequest::new("elder", HexPosition::at(2, 2), inline(walker_tree())).persistent())
        .unwrap();

    kernel
        .apply_intent(
            walker,
            Intent::SetFacts {
                facts: vec![FactEdit {
                    key: "role".into(),
                    value: MemoryValue::Text("scout".into()),
                }],
            },
        )
        .unwrap();
    kernel
        .apply_intent(
            walker,
            Intent::Associate {
                a: "river".into(),
                b: "danger".into(),
                delta: 0.75,
            },
        )
        .unwrap();
    kernel.register_template("walk", &walker_tree()).unwrap();
    kernel.kill(elder).unwrap();

    kernel.run_ticks(2).unwrap();
    kernel
        .send(
            MessageSender::System,
            Recipient::Agent(walker),
            "regroup",
            MessagePriority::Normal,
        )
        .unwrap();

    World {
        kernel,
        walker,
        digger,
    }
}

fn restore(rt: &tokio::runtime::Runtime, blob: StateBlob) -> Result<Kernel, KernelError> {
    Kernel::restore(blob, KernelConfig::default(), Arc::new(SeededTerrain), rt.handle().clone())
}

fn loaded(k: &Kernel) -> BTreeSet<ChunkCoord> {
    k.context().chunks.loaded_coords().collect()
}

fn elevation(k: &Kernel, hex: HexCoord) -> i32 {
    let chunk = k.context().registry.chunk_of(hex);
    let terrain = &k.context().chunks.get(chunk).unwrap().terrain;
    let tiles = terrain.read();
    tiles.tile(hex).unwrap().elevation
}

#[test]
fn test_round_trip_preserves_state() {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let w = world(&rt);
    let original = &w.kernel;

    let json = original.snapshot().unwrap().to_json().unwrap();
    let restored = restore(&rt, StateBlob::from_json(&json).unwrap()).unwrap();

    assert_eq!(restored.tick(), 2);
    assert_eq!(restored.config().streaming.seed, 99);
    assert_eq!(loaded(&restored), loaded(original));

    let ids: Vec<AgentId> = original.agents().map(|a| a.id).collect();
    assert_eq!(ids, restored.agents().map(|a| a.id).collect::<Vec<_>>());
    for id in ids {
        let (a, b) = (original.get_agent(id).unwrap(), restored.get_agent(id).unwrap());
        assert_eq!(a.position, b.position);
        assert_eq!(a.chunk, b.chunk);
        assert_eq!(a.memory, b.memory);
        assert_eq!(a.exec, b.exec);
        assert_eq!(a.tree, b.tree);
    }
    assert!(restored.context().registry.index_consistent());

    // Edited terrain survives; untouched terrain is regenerated identically
    let dug = HexCoord::new(5, 5);
    assert_eq!(elevation(&restored, dug), elevation(original, dug));
    assert_eq!(
        elevation(&restored, HexCoord::new(1, 1)),
        elevation(original, HexCoord::new(1, 1))
    );
    assert!(restored.get_chunk(ChunkCoord::new(0, 0)).unwrap().edited);

    assert_eq!(restored.context().archive.len(), 1);
    assert!(restored.context().templates.get("walk").is_some());
    assert_eq!(restored.context().bus.pending_count(), 1);
    assert_eq!(
        restored.context().registry.next_id(),
        original.context().registry.next_id()
    );

    // Whole-state equality, pending message queue included
    assert_eq!(restored.context().bus, original.context().bus);
    let before = KernelState::capture(original.context());
    assert_eq!(KernelState::capture(restored.context()), before);
    let decoded = KernelState::from_blob(&original.snapshot().unwrap()).unwrap();
    assert_eq!(decoded, before);
}

#[test]
fn test_restored_kernel_resumes_cursors() {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut w = world(&rt);
    let mut restored = restore(&rt, w.kernel.snapshot().unwrap()).unwrap();

    // Walker was two ticks into a three-tick move
    assert!(restored.get_agent(w.walker).unwrap().exec.cursors().count() > 0);
    for k in [&mut w.kernel, &mut restored] {
        k.run_tick().unwrap();
        assert_eq!(k.get_agent(w.walker).unwrap().position.coord, HexCoord::new(0, 0));
        let stats = k.run_tick().unwrap();
        assert_eq!(stats.tick, 4);
        assert_eq!(k.get_agent(w.walker).unwrap().position.coord, HexCoord::new(3, 0));
        // The message queued before the snapshot arrived in tick 3
        assert_eq!(k.get_agent(w.walker).unwrap().inbox.len(), 1);
    }

    let digger_a = w.kernel.get_agent(w.digger).unwrap();
    let digger_b = restored.get_agent(w.digger).unwrap();
    assert_eq!(digger_a.exec, digger_b.exec);
}

#[test]
fn test_old_version_requires_migration() {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let w = world(&rt);
    let mut blob = w.kernel.snapshot().unwrap();

    // Pretend v0 called the agent list "population"
    let agents = blob.state.as_object_mut().unwrap().remove("agents").unwrap();
    blob.state["population"] = agents;
    blob.version = 0;

    match restore(&rt, blob.clone()) {
        Err(KernelError::SerializationVersionMismatch { found, expected }) => {
            assert_eq!(found, 0);
            assert_eq!(expected, SCHEMA_VERSION);
        }
        other => panic!("expected version mismatch, got {:?}", other.map(|k| k.tick())),
    }

    let mut migrations = MigrationRegistry::new();
    migrations.register(0, |mut state| {
        let population = state
            .as_object_mut()
            .and_then(|o| o.remove("population"))
            .ok_or_else(|| KernelError::InvalidEdit("missing population".into()))?;
        state["agents"] = population;
        Ok(state)
    });
    let restored = Kernel::restore_with_migrations(
        blob,
        &migrations,
        KernelConfig::default(),
        Arc::new(SeededTerrain),
        rt.handle().clone(),
    )
    .unwrap();
    assert_eq!(restored.agents().count(), 2);
}

#[test]
fn test_newer_version_rejected() {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let w = world(&rt);
    let mut blob = w.kernel.snapshot().unwrap();
    blob.version = SCHEMA_VERSION + 1;
    assert!(matches!(
        restore(&rt, blob),
        Err(KernelError::SerializationVersionMismatch { .. })
    ));
}
