//! Message bus with one-tick delivery latency
//!
//! Everything sent while tick T is running (or between T and T+1) is
//! stamped T and delivered in the message phase of T+1. Delivery order
//! for each recipient: Priority before Normal, then send order. Send
//! order is a single global sequence, so messages from one sender to one
//! recipient always arrive in the order they were sent.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::core::types::{AgentId, MessagePriority, Tick};

/// Who sent a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageSender {
    System,
    Agent(AgentId),
}

impl MessageSender {
    pub fn agent(&self) -> Option<AgentId> {
        match self {
            MessageSender::Agent(id) => Some(*id),
            MessageSender::System => None,
        }
    }
}

/// Who a message is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Recipient {
    Agent(AgentId),
    /// Every live agent except the sender
    Broadcast,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Global send sequence number
    pub seq: u64,
    pub sender: MessageSender,
    pub recipient: Recipient,
    pub payload: String,
    pub sent_tick: Tick,
    pub priority: MessagePriority,
}

/// A message not yet stamped by the bus (agent outboxes hold these)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    pub recipient: Recipient,
    pub payload: String,
    pub priority: MessagePriority,
}

/// Result of one delivery pass
#[derive(Debug, Default)]
pub struct DeliveryReport {
    /// (recipient, message) in delivery order
    pub delivered: Vec<(AgentId, Message)>,
    /// Messages whose recipient no longer exists
    pub failed: Vec<Message>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageBus {
    next_seq: u64,
    queue: Vec<Message>,
}

impl MessageBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a message; returns its sequence number
    pub fn send(
        &mut self,
        sender: MessageSender,
        recipient: Recipient,
        payload: impl Into<String>,
        priority: MessagePriority,
        tick: Tick,
    ) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Message {
            seq,
            sender,
            recipient,
            payload: payload.into(),
            sent_tick: tick,
            priority,
        });
        seq
    }

    /// Queue an agent's outbox in order
    pub fn send_all(
        &mut self,
        sender: AgentId,
        outbox: impl IntoIterator<Item = OutgoingMessage>,
        tick: Tick,
    ) {
        for out in outbox {
            self.send(
                MessageSender::Agent(sender),
                out.recipient,
                out.payload,
                out.priority,
                tick,
            );
        }
    }

    /// Deliver everything sent before `tick` to the agents in `live`
    pub fn deliver(&mut self, tick: Tick, live: &BTreeSet<AgentId>) -> DeliveryReport {
        let (due, later): (Vec<_>, Vec<_>) =
            self.queue.drain(..).partition(|m| m.sent_tick < tick);
        self.queue = later;

        let mut report = DeliveryReport::default();
        let mut expanded: Vec<(AgentId, Message)> = Vec::with_capacity(due.len());

        for message in due {
            match message.recipient {
                Recipient::Agent(id) => {
                    if live.contains(&id) {
                        expanded.push((id, message));
                    } else {
                        report.failed.push(message);
                    }
                }
                Recipient::Broadcast => {
                    let sender = message.sender.agent();
                    for &id in live.iter().filter(|&&id| Some(id) != sender) {
                        expanded.push((id, message.clone()));
                    }
                }
            }
        }

        expanded.sort_by_key(|(recipient, m)| {
            let class = match m.priority {
                MessagePriority::Priority => 0u8,
                MessagePriority::Normal => 1u8,
            };
            (*recipient, class, m.seq)
        });
        report.delivered = expanded;
        report
    }

    pub fn pending_count(&self) -> usize {
        self.queue.len()
    }

    /// Agents directly addressed by undelivered messages
    pub fn pending_recipients(&self) -> BTreeSet<AgentId> {
        self.queue
            .iter()
            .filter_map(|m| match m.recipient {
                Recipient::Agent(id) => Some(id),
                Recipient::Broadcast => None,
            })
            .collect()
    }

    pub fn pending(&self) -> &[Message] {
        &self.queue
    }
}
