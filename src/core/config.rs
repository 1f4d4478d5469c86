//! Kernel configuration with documented constants
//!
//! All tunables are collected here with explanations of their purpose
//! and how they interact with each other. Every section can be loaded
//! from TOML; missing sections and fields fall back to the defaults.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::error::{KernelError, Result};
use crate::memory::schema::ValueKind;

/// Complete kernel configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KernelConfig {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub streaming: StreamingConfig,
    #[serde(default)]
    pub agents: AgentConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub resources: ResourceConfig,
}

/// Tick loop timing and worker pool
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Length of one simulated tick in milliseconds
    ///
    /// The accumulator converts wall-clock frame time into whole ticks of
    /// this length, so simulated time is independent of frame jitter.
    pub timestep_ms: u64,

    /// Maximum ticks run for a single frame
    ///
    /// Time beyond this stays in the accumulator and is caught up on
    /// later frames instead of being dropped.
    pub max_ticks_per_frame: u32,

    /// Soft budget for the behavior phase in milliseconds
    ///
    /// Agents that have not started evaluating when the budget runs out
    /// are marked Deferred and evaluated first next tick.
    pub behavior_budget_ms: u64,

    /// Hard deadline for any phase barrier in milliseconds
    ///
    /// Missing it is treated as a hang and aborts the loop. Must be
    /// larger than the behavior budget.
    pub phase_deadline_ms: u64,

    /// Number of worker threads used for per-agent parallel work
    pub worker_threads: usize,

    /// Minimum agent count before using parallel processing
    ///
    /// Below this threshold, thread overhead exceeds benefits.
    pub parallel_threshold: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            timestep_ms: 50,
            max_ticks_per_frame: 5,
            behavior_budget_ms: 20,
            phase_deadline_ms: 2_000,
            worker_threads: 4,
            parallel_threshold: 256,
        }
    }
}

impl SchedulerConfig {
    pub fn timestep(&self) -> Duration {
        Duration::from_millis(self.timestep_ms)
    }

    pub fn behavior_budget(&self) -> Duration {
        Duration::from_millis(self.behavior_budget_ms)
    }

    pub fn phase_deadline(&self) -> Duration {
        Duration::from_millis(self.phase_deadline_ms)
    }
}

/// Chunk streaming around agents
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// World seed passed to the terrain generator
    pub seed: u64,

    /// Edge length of a chunk in hexes (chunks hold size × size tiles)
    pub chunk_size: u32,

    /// Chunks within this many chunk steps of a live agent stay loaded
    pub stream_radius: u32,

    /// Consecutive idle ticks before an unneeded chunk is unloaded
    pub unload_after_ticks: u64,

    /// Time budget for a single generation task in milliseconds
    ///
    /// A task that overruns commits placeholder terrain flagged degraded.
    pub generation_budget_ms: u64,

    /// Immediate retries after a generator error before falling back to
    /// placeholder terrain
    pub max_generation_retries: u32,

    /// Ticks to wait before regenerating a degraded chunk
    pub regen_retry_ticks: u64,

    /// How long the stream phase may wait for in-flight loads before
    /// moving on (milliseconds, 0 = never wait)
    pub stream_wait_ms: u64,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            seed: 12345,
            chunk_size: 16,
            stream_radius: 2,
            unload_after_ticks: 100,
            generation_budget_ms: 250,
            max_generation_retries: 2,
            regen_retry_ticks: 200,
            stream_wait_ms: 0,
        }
    }
}

impl StreamingConfig {
    pub fn generation_budget(&self) -> Duration {
        Duration::from_millis(self.generation_budget_ms)
    }

    pub fn stream_wait(&self) -> Duration {
        Duration::from_millis(self.stream_wait_ms)
    }
}

/// Agent perception and inbox
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Hex radius of the perception query run every tick
    pub perception_radius: u32,

    /// Most unread messages an agent holds
    ///
    /// Delivery beyond this drops the oldest unread message first. Inboxes
    /// are part of every snapshot, so trees that never read stay bounded.
    pub max_inbox: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            perception_radius: 8,
            max_inbox: 64,
        }
    }
}

/// Tile deposits and what agents can carry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceConfig {
    /// Most of each resource kind one agent can hold
    pub carry_capacity: f32,

    /// Renewable deposits in loaded chunks grow back every this many ticks
    ///
    /// Only chunks agents have gathered from can be below capacity, so
    /// only those are visited.
    pub regrowth_interval: u64,

    /// Amount added to each depleted renewable deposit per regrowth
    pub regrowth_amount: f32,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            carry_capacity: 100.0,
            regrowth_interval: 20,
            regrowth_amount: 1.0,
        }
    }
}

/// Memory decay and the edit schema
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Association weights decay every this many ticks
    pub decay_interval: u64,

    /// Multiplier applied to every association weight on decay
    ///
    /// At 0.9 with the default interval, an unreinforced association
    /// halves in roughly 65 ticks.
    pub decay_factor: f32,

    /// Associations whose weight falls below this are pruned
    pub prune_floor: f32,

    /// Recognized fact keys and their value types for external edits
    pub schema: BTreeMap<String, ValueKind>,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        let mut schema = BTreeMap::new();
        schema.insert("goal".to_string(), ValueKind::Hex);
        schema.insert("home".to_string(), ValueKind::Hex);
        schema.insert("role".to_string(), ValueKind::Text);
        schema.insert("mood".to_string(), ValueKind::Text);
        schema.insert("alert".to_string(), ValueKind::Bool);
        schema.insert("hunger".to_string(), ValueKind::Float);
        schema.insert("patrol_count".to_string(), ValueKind::Int);

        Self {
            decay_interval: 10,
            decay_factor: 0.9,
            prune_floor: 0.01,
            schema,
        }
    }
}

impl KernelConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from TOML text and validate it
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: KernelConfig = toml::from_str(content)
            .map_err(|e| KernelError::Config(format!("Failed to parse config TOML: {}", e)))?;
        config.validate().map_err(KernelError::Config)?;
        Ok(config)
    }

    /// Load a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> std::result::Result<(), String> {
        let s = &self.scheduler;
        if s.timestep_ms == 0 {
            return Err("timestep_ms must be positive".into());
        }
        if s.max_ticks_per_frame == 0 {
            return Err("max_ticks_per_frame must be at least 1".into());
        }
        if s.phase_deadline_ms <= s.behavior_budget_ms {
            return Err(format!(
                "phase_deadline_ms ({}) should be > behavior_budget_ms ({})",
                s.phase_deadline_ms, s.behavior_budget_ms
            ));
        }
        if s.worker_threads == 0 {
            return Err("worker_threads must be at least 1".into());
        }

        if self.streaming.chunk_size == 0 {
            return Err("chunk_size must be positive".into());
        }
        if self.agents.max_inbox == 0 {
            return Err("max_inbox must be at least 1".into());
        }

        let r = &self.resources;
        if !r.carry_capacity.is_finite() || r.carry_capacity < 0.0 {
            return Err(format!("carry_capacity ({}) must be finite and not negative", r.carry_capacity));
        }
        if r.regrowth_interval == 0 {
            return Err("regrowth_interval must be positive".into());
        }
        if !r.regrowth_amount.is_finite() || r.regrowth_amount < 0.0 {
            return Err(format!("regrowth_amount ({}) must be finite and not negative", r.regrowth_amount));
        }

        let m = &self.memory;
        if m.decay_interval == 0 {
            return Err("decay_interval must be positive".into());
        }
        if !(0.0..1.0).contains(&m.decay_factor) {
            return Err(format!("decay_factor ({}) must be in [0, 1)", m.decay_factor));
        }
        if m.prune_floor < 0.0 {
            return Err("prune_floor must not be negative".into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(KernelConfig::default().validate().is_ok());
    }

    #[test]
    fn test_deadline_must_exceed_budget() {
        let mut config = KernelConfig::default();
        config.scheduler.phase_deadline_ms = config.scheduler.behavior_budget_ms;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = KernelConfig::from_toml_str(
            r#"
            [streaming]
            seed = 7
            stream_radius = 3

            [memory.schema]
            favorite = "text"
            "#,
        )
        .unwrap();

        assert_eq!(config.streaming.seed, 7);
        assert_eq!(config.streaming.stream_radius, 3);
        assert_eq!(config.streaming.chunk_size, 16);
        assert_eq!(config.scheduler.timestep_ms, 50);
        assert_eq!(config.memory.schema.get("favorite"), Some(&ValueKind::Text));
    }

    #[test]
    fn test_resource_section() {
        let config = KernelConfig::from_toml_str("[resources]\ncarry_capacity = 25.0\n").unwrap();
        assert_eq!(config.resources.carry_capacity, 25.0);
        assert_eq!(config.resources.regrowth_interval, 20);

        let result = KernelConfig::from_toml_str("[resources]\nregrowth_interval = 0\n");
        assert!(matches!(result, Err(KernelError::Config(_))));
    }

    #[test]
    fn test_zero_inbox_rejected() {
        let result = KernelConfig::from_toml_str("[agents]\nmax_inbox = 0\n");
        assert!(matches!(result, Err(KernelError::Config(_))));
    }

    #[test]
    fn test_bad_decay_factor_rejected() {
        let result = KernelConfig::from_toml_str("[memory]\ndecay_factor = 1.5\n");
        assert!(matches!(result, Err(KernelError::Config(_))));
    }
}
