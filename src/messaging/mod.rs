//! Agent/system communication

pub mod bus;

pub use bus::{DeliveryReport, Message, MessageBus, MessageSender, OutgoingMessage, Recipient};
