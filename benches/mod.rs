use criterion::{criterion_group, criterion_main};

mod engine;

use engine::register_benchmarks as register_engine_benchmarks;

// Define the benchmark groups
criterion_group!(benches, register_engine_benchmarks);

criterion_main!(benches);
