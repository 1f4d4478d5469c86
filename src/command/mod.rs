//! Command execution pipeline
//!
//! Agent trees emit `Command`s that are executed in the action phase;
//! external tooling submits structured `Intent`s applied through
//! `apply_intent`:
//! Intent JSON -> parse_intent -> Intent -> apply_intent -> IntentOutcome

pub mod executor;
pub mod intent;

pub use executor::{apply_intent, Command, CommandExecutor, ExecutionResult, Gathered};
pub use intent::{parse_intent, FactEdit, Intent, IntentOutcome};
