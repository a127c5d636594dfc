//! Tick throughput benchmarks.

use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ecosim::channel::{buffer_size_for, FramePublisher, SharedBuffer};
use ecosim::{GameLoop, PopulationConfig, SimConfig, TickMode, World};

fn populated_world(plant: u32, herbivore: u32, carnivore: u32) -> World {
    let config = SimConfig::default();
    let mut world = World::new(&config, 42).expect("default config is valid");
    world.populate(&PopulationConfig { plant, herbivore, carnivore });
    world
}

fn benchmark_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick");

    for scale in [1u32, 4] {
        let mut world = populated_world(600 * scale, 80 * scale, 20 * scale);
        let mut game = GameLoop::new(0, TickMode::Turbo, 1000);
        let mut now = 0u64;

        // Warm up
        for _ in 0..30 {
            now += 16;
            game.run_tick(&mut world, None, now).expect("tick");
        }

        group.bench_with_input(BenchmarkId::new("population", scale), &scale, |b, _| {
            b.iter(|| {
                now += 16;
                black_box(game.run_tick(&mut world, None, now).expect("tick"));
            });
        });
    }

    group.finish();
}

fn benchmark_publish(c: &mut Criterion) {
    let world = populated_world(600, 80, 20);
    let buffer = SharedBuffer::new(buffer_size_for(4096));
    let mut publisher = FramePublisher::new(buffer, Duration::from_millis(2));

    c.bench_function("publish_frame", |b| {
        b.iter(|| black_box(publisher.publish(&world, false).expect("publish")));
    });
}

fn benchmark_pairs(c: &mut Criterion) {
    let mut world = populated_world(0, 400, 100);

    c.bench_function("update_and_pairs", |b| {
        let mut now = 0u64;
        b.iter(|| {
            now += 16;
            world.step(now, 1.6).expect("step");
        });
    });
}

criterion_group!(benches, benchmark_tick, benchmark_publish, benchmark_pairs);
criterion_main!(benches);
