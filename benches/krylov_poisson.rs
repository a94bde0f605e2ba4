use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use krysolve::preconditioner::{DummyPc, Relaxation};
use krysolve::solver::{GmresSolver, IdrsSolver, LinearSolver, PcgSolver};

#[path = "../demos/grid.rs"]
mod grid;

use grid::laplace_2d;

fn bench_poisson(c: &mut Criterion) {
    let mut group = c.benchmark_group("poisson_2d");
    for m in [16, 32] {
        let a = laplace_2d(m).unwrap();
        let n = m * m;
        let b: Vec<f64> = (0..n).map(|i| (i as f64 * 0.1).sin() + 1.0).collect();

        group.bench_with_input(BenchmarkId::new("pcg_none", m), &m, |ben, _| {
            let mut solver = PcgSolver::new(DummyPc, 1e-8, 2000);
            ben.iter(|| {
                let mut x = vec![0.0; n];
                solver.solve(black_box(&a), black_box(&b), &mut x).unwrap()
            })
        });

        group.bench_with_input(BenchmarkId::new("pcg_ssor", m), &m, |ben, _| {
            let mut solver = PcgSolver::new(Relaxation::ssor_pc(1.0), 1e-8, 2000);
            ben.iter(|| {
                let mut x = vec![0.0; n];
                solver.solve(black_box(&a), black_box(&b), &mut x).unwrap()
            })
        });

        group.bench_with_input(BenchmarkId::new("gmres30_ssor", m), &m, |ben, _| {
            let mut solver = GmresSolver::new(Relaxation::ssor_pc(1.0), 30, 1e-8, 2000);
            ben.iter(|| {
                let mut x = vec![0.0; n];
                solver.solve(black_box(&a), black_box(&b), &mut x).unwrap()
            })
        });

        group.bench_with_input(BenchmarkId::new("idr4_none", m), &m, |ben, _| {
            let mut solver = IdrsSolver::new(DummyPc, 4, 1e-8, 2000);
            ben.iter(|| {
                let mut x = vec![0.0; n];
                solver.solve(black_box(&a), black_box(&b), &mut x).unwrap()
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_poisson);
criterion_main!(benches);
