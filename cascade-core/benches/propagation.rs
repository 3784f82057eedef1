//! Propagation benchmarks: a long chain and a wide diamond fan-in, under
//! both delivery strategies.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use cascade_core::{Cached, Propagation, SignalFactory, Sink, Variable};

fn chain(factory: &SignalFactory, length: usize) -> (Variable<u64>, Cached<u64>) {
    let source = factory.variable(0u64);
    let first = source.clone();
    let mut tail = factory.cached(&[&source], move || Ok(first.get() + 1)).unwrap();
    for _ in 1..length {
        let previous = tail.clone();
        tail = factory.cached(&[&tail], move || Ok(previous.get()? + 1)).unwrap();
    }
    (source, tail)
}

fn fan_in(factory: &SignalFactory, width: usize) -> (Variable<u64>, Sink) {
    let source = factory.variable(0u64);
    let middle: Vec<Cached<u64>> = (0..width as u64)
        .map(|offset| {
            let input = source.clone();
            factory.cached(&[&source], move || Ok(input.get() + offset)).unwrap()
        })
        .collect();

    let deps: Vec<&dyn cascade_core::Dependency> = middle.iter().map(|c| c as &dyn cascade_core::Dependency).collect();
    let inputs = middle.clone();
    let sink = factory
        .sink(&deps, move || {
            let total: u64 = inputs.iter().map(|c| c.get()).sum::<cascade_core::Result<u64>>()?;
            black_box(total);
            Ok(())
        })
        .unwrap();
    (source, sink)
}

fn bench_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain_set_then_read");
    for length in [10usize, 100] {
        let factory = SignalFactory::new();
        let (source, tail) = chain(&factory, length);
        group.bench_with_input(BenchmarkId::from_parameter(length), &length, |b, _| {
            let mut n = 0;
            b.iter(|| {
                n += 1;
                source.set(n).unwrap();
                black_box(tail.get().unwrap())
            })
        });
    }
    group.finish();
}

fn bench_fan_in(c: &mut Criterion) {
    let mut group = c.benchmark_group("fan_in_set");
    for propagation in [Propagation::Ranked, Propagation::Direct] {
        let factory = match propagation {
            Propagation::Ranked => SignalFactory::ordered(),
            Propagation::Direct => SignalFactory::direct(),
        };
        let (source, _sink) = fan_in(&factory, 32);
        group.bench_function(format!("{propagation:?}"), |b| {
            let mut n = 0;
            b.iter(|| {
                n += 1;
                source.set(n).unwrap()
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_chain, bench_fan_in);
criterion_main!(benches);
