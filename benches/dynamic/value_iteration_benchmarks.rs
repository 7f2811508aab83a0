use bellman::dynamic::{TransitionMode, ValueIteration, ValueIterationConfig, VerifyScope};
use bellman::problems::{wendy_hunt, GridBoi};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn quiet(transitions: TransitionMode) -> ValueIterationConfig {
    ValueIterationConfig {
        verify: VerifyScope::Skip,
        transitions,
        report_progress: false,
        ..ValueIterationConfig::default()
    }
}

fn bench_wendy_hunt(c: &mut Criterion) {
    let mdp = wendy_hunt().unwrap();
    c.bench_function("wendy_hunt_dense", |b| {
        b.iter(|| {
            let mut solver =
                ValueIteration::with_config(&mdp, quiet(TransitionMode::Dense)).unwrap();
            black_box(solver.improve(2000, 1e-4))
        })
    });
}

fn bench_grid_boi_sweeps(c: &mut Criterion) {
    let mut group = c.benchmark_group("grid_boi_sweeps");
    group.sample_size(10);

    for side in [2, 3] {
        let grid = GridBoi::new(side, side).unwrap();
        for (name, mode) in [
            ("dense", TransitionMode::Dense),
            ("sparse", TransitionMode::Provided),
        ] {
            let mut solver = ValueIteration::with_config(&grid, quiet(mode)).unwrap();
            group.bench_with_input(BenchmarkId::new(name, side), &side, |b, _| {
                b.iter(|| black_box(solver.improve(10, 0.0)))
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_wendy_hunt, bench_grid_boi_sweeps);
criterion_main!(benches);
