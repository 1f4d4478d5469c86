//! Override injection through structured intents
//!
//! Highest priority wins, the latest install wins ties, removal reverts,
//! and malformed overrides leave the tree untouched.

use hexkernel::agent::{SpawnRequest, TreeSource};
use hexkernel::behavior::{Action, Node, NodeId, NodeKind, OverrideId, TreeBuilder};
use hexkernel::command::{Intent, IntentOutcome};
use hexkernel::core::config::KernelConfig;
use hexkernel::core::error::KernelError;
use hexkernel::core::types::AgentId;
use hexkernel::memory::MemoryValue;
use hexkernel::spatial::hex::HexPosition;
use hexkernel::Kernel;

fn set_mode(mode: &str) -> Action {
    Action::SetFact {
        key: "mode".into(),
        value: MemoryValue::Text(mode.into()),
    }
}

fn mode(k: &Kernel, id: AgentId) -> String {
    match k.get_agent(id).unwrap().memory.get("mode") {
        Some(MemoryValue::Text(s)) => s.clone(),
        other => panic!("unexpected mode {:?}", other),
    }
}

fn install(k: &mut Kernel, id: AgentId, priority: i32, substitute: Node) -> Result<OverrideId, KernelError> {
    match k.apply_intent(
        id,
        Intent::InstallOverride {
            node: NodeId(0),
            priority,
            substitute,
        },
    )? {
        IntentOutcome::OverrideInstalled(oid) => Ok(oid),
        other => panic!("unexpected outcome {:?}", other),
    }
}

/// Sequence(node#1) over SetFact(node#0)
fn guard(rt: &tokio::runtime::Runtime) -> (Kernel, AgentId) {
    let mut k = Kernel::with_default_terrain(KernelConfig::default(), rt.handle().clone()).unwrap();
    let mut b = TreeBuilder::new();
    let set = b.action(set_mode("base"));
    let root = b.sequence(vec![set]);
    let id = k
        .spawn(SpawnRequest::new(
            "guard",
            HexPosition::at(0, 0),
            TreeSource::Inline {
                tree: b.build(root).unwrap(),
            },
        ))
        .unwrap();
    (k, id)
}

#[test]
fn test_priority_then_recency_decides() {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let (mut k, id) = guard(&rt);

    k.run_tick().unwrap();
    assert_eq!(mode(&k, id), "base");

    install(&mut k, id, 1, Node::action(set_mode("p1"))).unwrap();
    k.run_tick().unwrap();
    assert_eq!(mode(&k, id), "p1");

    install(&mut k, id, 5, Node::action(set_mode("p5"))).unwrap();
    install(&mut k, id, 1, Node::action(set_mode("p1-late"))).unwrap();
    k.run_tick().unwrap();
    assert_eq!(mode(&k, id), "p5");

    let late = install(&mut k, id, 5, Node::action(set_mode("p5-late"))).unwrap();
    k.run_tick().unwrap();
    assert_eq!(mode(&k, id), "p5-late");

    let outcome = k.apply_intent(id, Intent::RemoveOverride { id: late }).unwrap();
    assert_eq!(outcome, IntentOutcome::OverrideRemoved { node: NodeId(0) });
    k.run_tick().unwrap();
    assert_eq!(mode(&k, id), "p5");
}

#[test]
fn test_malformed_overrides_rejected() {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let (mut k, id) = guard(&rt);
    install(&mut k, id, 2, Node::action(set_mode("kept"))).unwrap();

    // Unknown target
    let err = k
        .apply_intent(
            id,
            Intent::InstallOverride {
                node: NodeId(9),
                priority: 9,
                substitute: Node::action(set_mode("ghost")),
            },
        )
        .unwrap_err();
    assert!(matches!(err, KernelError::InvalidOverride(_)));

    // Leaf with children
    let err = install(&mut k, id, 9, Node::composite(NodeKind::Action(set_mode("x")), vec![NodeId(1)]));
    assert!(matches!(err, Err(KernelError::InvalidOverride(_))));

    // node#0 -> node#1 -> node#0
    let err = install(&mut k, id, 9, Node::composite(NodeKind::Sequence, vec![NodeId(1)]));
    assert!(matches!(err, Err(KernelError::InvalidOverride(_))));

    assert_eq!(k.get_agent(id).unwrap().tree.override_count(), 1);
    k.run_tick().unwrap();
    assert_eq!(mode(&k, id), "kept");
}

#[test]
fn test_promoted_template_carries_winning_override() {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let (mut k, id) = guard(&rt);
    install(&mut k, id, 3, Node::action(set_mode("promoted"))).unwrap();
    install(&mut k, id, 1, Node::action(set_mode("loser"))).unwrap();

    let outcome = k
        .apply_intent(id, Intent::PromoteTemplate { name: "sentry".into() })
        .unwrap();
    assert_eq!(outcome, IntentOutcome::TemplatePromoted("sentry".into()));

    let recruit = k
        .spawn(SpawnRequest::from_template("recruit", HexPosition::at(1, 0), "sentry"))
        .unwrap();
    assert_eq!(k.get_agent(recruit).unwrap().tree.override_count(), 0);

    // Overrides stay with the agent that owns them
    k.kill(id).unwrap();
    k.run_tick().unwrap();
    assert_eq!(mode(&k, recruit), "promoted");
}
