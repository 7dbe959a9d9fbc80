//! Benchmarks for the property payload math on the dispatch hot path.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use pointerd::mappers::{configure_button_layout, legacy_accel, libinput_accel};

fn bench_payloads(c: &mut Criterion) {
    c.bench_function("configure_button_layout", |b| {
        b.iter(|| {
            let mut map = [1u8, 2, 3, 4, 5, 6, 7];
            configure_button_layout(black_box(&mut map), black_box(true));
            map
        })
    });

    c.bench_function("legacy_accel", |b| {
        b.iter(|| legacy_accel(black_box(5.5), black_box(true)))
    });

    c.bench_function("libinput_accel", |b| {
        b.iter(|| libinput_accel(black_box(5.5), black_box(true)))
    });
}

criterion_group!(benches, bench_payloads);
criterion_main!(benches);
