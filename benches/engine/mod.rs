use criterion::Criterion;

mod add_orders;
mod match_orders;
mod mixed_operations;
mod queue;

pub fn register_benchmarks(c: &mut Criterion) {
    add_orders::benchmark(c);
    match_orders::benchmark(c);
    mixed_operations::benchmark(c);
    queue::benchmark(c);
}
