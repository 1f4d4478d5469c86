use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use hexkernel::agent::{SpawnRequest, TreeSource};
use hexkernel::behavior::{Action, BehaviorTree, Condition, MoveTarget, TreeBuilder};
use hexkernel::core::config::KernelConfig;
use hexkernel::spatial::hex::{HexCoord, HexPosition};
use hexkernel::Kernel;

fn shuffle_tree(dq: i32) -> BehaviorTree {
    let mut b = TreeBuilder::new();
    let crowded = b.condition(Condition::AgentsNearby { radius: 3, min: 4 });
    let step = b.action(Action::MoveTo {
        target: MoveTarget::Hex(HexCoord::new(dq, 0)),
        ticks: 2,
    });
    let escape = b.sequence(vec![crowded, step]);
    let idle = b.action(Action::Wait { ticks: 3 });
    let root = b.selector(vec![escape, idle]);
    b.build(root).unwrap()
}

fn bench_tick(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("kernel/run_tick");

    for &n in &[1_000usize, 10_000usize] {
        let mut config = KernelConfig::default();
        config.scheduler.behavior_budget_ms = 1_000;
        config.scheduler.phase_deadline_ms = 60_000;
        let mut kernel = Kernel::with_default_terrain(config, rt.handle().clone()).unwrap();

        let side = (n as f32).sqrt().ceil() as i32;
        for i in 0..n as i32 {
            let (q, r) = (i % side, i / side);
            kernel
                .spawn(SpawnRequest::new(
                    format!("a{}", i),
                    HexPosition::at(q, r),
                    TreeSource::Inline {
                        tree: shuffle_tree((q + 1) % side),
                    },
                ))
                .unwrap();
        }

        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &_n| {
            b.iter(|| {
                let stats = kernel.run_tick().unwrap();
                black_box(stats.agents_evaluated);
                kernel.drain_events();
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_tick);
criterion_main!(benches);
