//! Message bus delivery through the kernel, plus ordering properties

use proptest::prelude::*;

use hexkernel::agent::{SpawnRequest, TreeSource};
use hexkernel::behavior::{Action, BehaviorTree, TreeBuilder};
use hexkernel::core::config::KernelConfig;
use hexkernel::core::types::{AgentId, MessagePriority};
use hexkernel::messaging::{MessageBus, MessageSender, Recipient};
use hexkernel::simulation::KernelEvent;
use hexkernel::spatial::hex::HexPosition;
use hexkernel::Kernel;

fn idle_tree() -> BehaviorTree {
    let mut b = TreeBuilder::new();
    let wait = b.action(Action::Wait { ticks: 1_000 });
    b.build(wait).unwrap()
}

fn spawn(k: &mut Kernel, name: &str, q: i32) -> AgentId {
    k.spawn(SpawnRequest::new(
        name,
        HexPosition::at(q, 0),
        TreeSource::Inline { tree: idle_tree() },
    ))
    .unwrap()
}

#[test]
fn test_broadcast_and_dead_recipient() {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut k = Kernel::with_default_terrain(KernelConfig::default(), rt.handle().clone()).unwrap();
    let a = spawn(&mut k, "a", 0);
    let b = spawn(&mut k, "b", 1);
    let c = spawn(&mut k, "c", 2);

    k.send(MessageSender::Agent(a), Recipient::Broadcast, "hello", MessagePriority::Normal)
        .unwrap();
    k.send(MessageSender::System, Recipient::Agent(c), "too late", MessagePriority::Normal)
        .unwrap();
    k.kill(c).unwrap();

    let stats = k.run_tick().unwrap();
    assert_eq!(stats.messages_delivered, 1);
    assert_eq!(stats.messages_failed, 1);
    assert!(k.get_agent(a).unwrap().inbox.is_empty());
    assert_eq!(k.get_agent(b).unwrap().inbox[0].payload, "hello");

    let failures: Vec<_> = k
        .drain_events()
        .into_iter()
        .filter(|e| matches!(e, KernelEvent::MessageDeliveryFailure { .. }))
        .collect();
    assert_eq!(failures.len(), 1);
    assert!(matches!(
        failures[0],
        KernelEvent::MessageDeliveryFailure { recipient: Some(r), .. } if r == c
    ));
}

#[test]
fn test_full_inbox_drops_oldest() {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut config = KernelConfig::default();
    config.agents.max_inbox = 3;
    let mut k = Kernel::with_default_terrain(config, rt.handle().clone()).unwrap();
    let deaf = spawn(&mut k, "deaf", 0);

    for i in 0..5 {
        k.send(
            MessageSender::System,
            Recipient::Agent(deaf),
            format!("m{}", i),
            MessagePriority::Normal,
        )
        .unwrap();
    }
    let stats = k.run_tick().unwrap();
    assert_eq!(stats.messages_delivered, 5);
    assert_eq!(stats.messages_overflowed, 2);

    let payloads: Vec<_> = k
        .get_agent(deaf)
        .unwrap()
        .inbox
        .iter()
        .map(|m| m.payload.as_str())
        .collect();
    assert_eq!(payloads, vec!["m2", "m3", "m4"]);

    k.send(MessageSender::System, Recipient::Agent(deaf), "m5", MessagePriority::Normal)
        .unwrap();
    k.run_tick().unwrap();
    assert_eq!(k.get_agent(deaf).unwrap().inbox.len(), 3);
    assert_eq!(k.get_agent(deaf).unwrap().inbox[0].payload, "m3");
}

#[test]
fn test_agent_reads_inbox_next_tick() {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut k = Kernel::with_default_terrain(KernelConfig::default(), rt.handle().clone()).unwrap();

    let mut b = TreeBuilder::new();
    let read = b.action(Action::ReadInbox {
        store_as: Some("heard".into()),
    });
    let reader = k
        .spawn(SpawnRequest::new(
            "reader",
            HexPosition::at(0, 0),
            TreeSource::Inline { tree: b.build(read).unwrap() },
        ))
        .unwrap();

    k.send(MessageSender::System, Recipient::Agent(reader), "north", MessagePriority::Normal)
        .unwrap();
    // Delivered in tick 1's message phase, after the reader already ran
    k.run_tick().unwrap();
    assert_eq!(k.get_agent(reader).unwrap().inbox.len(), 1);

    k.run_tick().unwrap();
    let agent = k.get_agent(reader).unwrap();
    assert!(agent.inbox.is_empty());
    assert_eq!(
        agent.memory.get("heard"),
        Some(&hexkernel::memory::MemoryValue::Text("north".into()))
    );
}

proptest! {
    #[test]
    fn prop_pair_order_matches_send_order(
        sends in prop::collection::vec((1u64..4, 1u64..4, any::<bool>()), 0..60)
    ) {
        let mut bus = MessageBus::new();
        for (i, (sender, recipient, urgent)) in sends.iter().enumerate() {
            let priority = if *urgent { MessagePriority::Priority } else { MessagePriority::Normal };
            bus.send(
                MessageSender::Agent(AgentId(*sender)),
                Recipient::Agent(AgentId(*recipient)),
                i.to_string(),
                priority,
                1,
            );
        }
        let live = (1..4).map(AgentId).collect();
        let report = bus.deliver(2, &live);
        prop_assert_eq!(report.delivered.len(), sends.len());

        for recipient in (1..4).map(AgentId) {
            let mine: Vec<_> = report
                .delivered
                .iter()
                .filter(|(r, _)| *r == recipient)
                .map(|(_, m)| m)
                .collect();

            // Priority first
            let first_normal = mine.iter().position(|m| m.priority == MessagePriority::Normal);
            if let Some(split) = first_normal {
                prop_assert!(mine[split..].iter().all(|m| m.priority == MessagePriority::Normal));
            }

            // Same sender, same class: send order
            for sender in (1..4).map(AgentId) {
                for class in [MessagePriority::Priority, MessagePriority::Normal] {
                    let seqs: Vec<u64> = mine
                        .iter()
                        .filter(|m| m.sender == MessageSender::Agent(sender) && m.priority == class)
                        .map(|m| m.seq)
                        .collect();
                    prop_assert!(seqs.windows(2).all(|w| w[0] < w[1]));
                }
            }
        }
    }
}
