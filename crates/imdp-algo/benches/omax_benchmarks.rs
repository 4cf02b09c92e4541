use criterion::{black_box, criterion_group, criterion_main, Criterion};

use imdp_algo::{extremal_expectation, SortWorkspace};
use imdp_core::{DenseIntervalMatrix, Direction, IntervalMatrix};

fn column_of(n: usize) -> (DenseIntervalMatrix<f64>, Vec<f64>) {
    // Deterministic pseudo-random bounds with enough slack to keep the
    // column feasible.
    let mut lower = Vec::with_capacity(n);
    let mut upper = Vec::with_capacity(n);
    let mut values = Vec::with_capacity(n);
    let mut x = 88172645463325252u64;
    let mut next = || {
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        (x >> 11) as f64 / (1u64 << 53) as f64
    };
    for _ in 0..n {
        let lo = next() * 0.5 / n as f64;
        lower.push(lo);
        upper.push(lo + next() * 4.0 / n as f64);
        values.push(next());
    }
    let matrix = DenseIntervalMatrix::try_new(n, 1, lower, upper).unwrap();
    (matrix, values)
}

fn bench_omax(c: &mut Criterion) {
    let mut group = c.benchmark_group("omax");
    for n in [64usize, 1024, 16384] {
        let (matrix, values) = column_of(n);
        let mut ws = SortWorkspace::new();
        let mut assigned = Vec::new();
        group.bench_function(format!("upper/{n}"), |b| {
            b.iter(|| {
                extremal_expectation(
                    &matrix.column(0),
                    matrix.sum_lower(0),
                    None,
                    black_box(&values),
                    Direction::Upper,
                    &mut ws,
                    &mut assigned,
                )
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_omax);
criterion_main!(benches);
