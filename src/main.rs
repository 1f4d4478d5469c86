//! Hexkernel - headless host
//!
//! Builds a kernel on a tokio runtime, spawns a patrol population and runs
//! ticks either as fast as possible or through fixed-timestep frames.

use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tokio::runtime::Runtime;
use tracing_subscriber::EnvFilter;

use hexkernel::agent::SpawnRequest;
use hexkernel::behavior::{Action, BehaviorTree, Condition, MoveTarget, TreeBuilder};
use hexkernel::command::{FactEdit, Intent};
use hexkernel::core::config::KernelConfig;
use hexkernel::core::error::Result;
use hexkernel::core::types::MessagePriority;
use hexkernel::memory::MemoryValue;
use hexkernel::messaging::Recipient;
use hexkernel::simulation::TickStats;
use hexkernel::spatial::hex::{HexCoord, HexPosition};
use hexkernel::Kernel;

/// Run the simulation kernel headless
#[derive(Parser, Debug)]
#[command(name = "hexkernel")]
#[command(about = "Fixed-timestep agent simulation on a streamed hex world")]
struct Args {
    /// TOML config file (defaults are used when omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of ticks to run
    #[arg(long, default_value_t = 200)]
    ticks: u64,

    /// Number of patrolling agents to spawn
    #[arg(long, default_value_t = 100)]
    agents: usize,

    /// World seed (overrides the config file)
    #[arg(long)]
    seed: Option<u64>,

    /// Pace ticks against the wall clock instead of running flat out
    #[arg(long)]
    realtime: bool,

    /// Print kernel events as JSON lines
    #[arg(long)]
    events_json: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("hexkernel=info")))
        .init();

    let mut config = match &args.config {
        Some(path) => KernelConfig::load(path)?,
        None => KernelConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.streaming.seed = seed;
    }
    let seed = config.streaming.seed;

    let rt = Runtime::new()?;
    let mut kernel = Kernel::with_default_terrain(config, rt.handle().clone())?;
    kernel.register_template("patrol", &patrol_tree()?)?;
    spawn_population(&mut kernel, args.agents, seed)?;
    tracing::info!("Spawned {} agents", kernel.agents().count());

    if args.realtime {
        run_realtime(&mut kernel, &args)?;
    } else {
        for _ in 0..args.ticks {
            let stats = kernel.run_tick()?;
            report(&mut kernel, &stats, &args);
        }
    }

    println!("\n=== FINAL ===");
    println!("{}", kernel.tick_stats());
    println!(
        "agents: {}, chunks loaded: {}",
        kernel.agents().count(),
        kernel.context().chunks.loaded_count()
    );
    Ok(())
}

fn run_realtime(kernel: &mut Kernel, args: &Args) -> Result<()> {
    let step = kernel.config().scheduler.timestep();
    let mut last = Instant::now();
    while kernel.tick() < args.ticks {
        std::thread::sleep(step / 2);
        let now = Instant::now();
        let frame = kernel.frame(now - last)?;
        last = now;
        if let Some(stats) = &frame.last {
            report(kernel, stats, args);
        }
    }
    Ok(())
}

fn report(kernel: &mut Kernel, stats: &TickStats, args: &Args) {
    if args.events_json {
        for event in kernel.drain_events() {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{}", line),
                Err(e) => tracing::warn!("Failed to encode event: {}", e),
            }
        }
    } else {
        kernel.drain_events();
        if stats.tick % 20 == 0 {
            println!("{}", stats);
        }
    }
}

/// Walk to the goal, announce arrival, walk home; drop everything when alerted
fn patrol_tree() -> Result<BehaviorTree> {
    let mut b = TreeBuilder::new();

    let alerted = b.condition(Condition::HasMessage {
        payload: Some("alert".into()),
    });
    let read = b.action(Action::ReadInbox {
        store_as: Some("last_message".into()),
    });
    let flag = b.action(Action::SetFact {
        key: "alert".into(),
        value: MemoryValue::Bool(true),
    });
    let flee = b.action(Action::MoveTo {
        target: MoveTarget::Fact("home".into()),
        ticks: 2,
    });
    let respond = b.sequence(vec![alerted, read, flag, flee]);

    let out = b.action(Action::MoveTo {
        target: MoveTarget::Fact("goal".into()),
        ticks: 4,
    });
    let announce = b.action(Action::Send {
        to: Recipient::Broadcast,
        payload: "arrived".into(),
        priority: MessagePriority::Normal,
    });
    let learn = b.action(Action::Reinforce {
        a: "goal".into(),
        b: "arrived".into(),
        delta: 0.3,
    });
    let back = b.action(Action::MoveTo {
        target: MoveTarget::Fact("home".into()),
        ticks: 4,
    });
    let rest = b.action(Action::Wait { ticks: 2 });
    let read_all = b.action(Action::ReadInbox { store_as: None });
    let nothing_to_read = b.condition(Condition::Constant(true));
    let clear = b.selector(vec![read_all, nothing_to_read]);
    let patrol = b.sequence(vec![out, announce, learn, back, rest, clear]);

    let root = b.selector(vec![respond, patrol]);
    b.build(root)
}

fn spawn_population(kernel: &mut Kernel, count: usize, seed: u64) -> Result<()> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    for i in 0..count {
        let home = HexCoord::new(rng.gen_range(-24..24), rng.gen_range(-24..24));
        let goal = HexCoord::new(home.q + rng.gen_range(-6..=6), home.r + rng.gen_range(-6..=6));

        let id = kernel.spawn(SpawnRequest::from_template(
            format!("patrol_{}", i),
            HexPosition::new(home, 0),
            "patrol",
        ))?;
        kernel.apply_intent(
            id,
            Intent::SetFacts {
                facts: vec![
                    FactEdit {
                        key: "home".into(),
                        value: MemoryValue::Hex(home),
                    },
                    FactEdit {
                        key: "goal".into(),
                        value: MemoryValue::Hex(goal),
                    },
                    FactEdit {
                        key: "role".into(),
                        value: MemoryValue::Text("patrol".into()),
                    },
                ],
            },
        )?;
    }
    Ok(())
}
