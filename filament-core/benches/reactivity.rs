//! Benchmarks for the reactivity hot paths: tracked reads, writes with and
//! without dependents, and effect creation.

use std::collections::HashMap;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use filament_core::{make_reactive, Effect};

fn bench_reads(c: &mut Criterion) {
    c.bench_function("untracked_read", |b| {
        let store = make_reactive(HashMap::from([("num", 0i64)]));
        b.iter(|| black_box(store.get(&"num")));
    });
}

fn bench_writes(c: &mut Criterion) {
    c.bench_function("write_without_dependents", |b| {
        let store = make_reactive(HashMap::from([("num", 0i64)]));
        let mut i = 0i64;
        b.iter(|| {
            i += 1;
            black_box(store.set("num", i));
        });
    });

    c.bench_function("write_with_one_dependent", |b| {
        let store = make_reactive(HashMap::from([("num", 0i64)]));
        let reader = store.clone();
        let _effect = Effect::new(move || {
            black_box(reader.get(&"num"));
        });

        let mut i = 0i64;
        b.iter(|| {
            i += 1;
            black_box(store.set("num", i));
        });
    });
}

fn bench_effect_creation(c: &mut Criterion) {
    c.bench_function("effect_create_and_dispose", |b| {
        let store = make_reactive(HashMap::from([("num", 0i64)]));
        b.iter(|| {
            let reader = store.clone();
            let effect = Effect::new(move || {
                black_box(reader.get(&"num"));
            });
            effect.dispose();
        });
    });
}

criterion_group!(benches, bench_reads, bench_writes, bench_effect_creation);
criterion_main!(benches);
