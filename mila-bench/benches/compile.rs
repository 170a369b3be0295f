use criterion::{criterion_group, criterion_main, Criterion};
use mila::{
    compile,
    ir::interp::{self, Config},
};
use std::hint::black_box;

static INPUT: &str = include_str!("../../demos/big.mila");

fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("compile", |b| {
        b.iter(|| {
            let module = compile(black_box(INPUT)).unwrap();
            _ = black_box(module);
        });
    });

    let module = compile(INPUT).unwrap();
    let config = Config::default();
    c.bench_function("interpret", |b| {
        b.iter(|| {
            let outcome = interp::run(black_box(&module), [7, 3], &config).unwrap();
            _ = black_box(outcome);
        });
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
