use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use corelib::partitioner::RandomPartitioner;
use corelib::TokenGenerator;
use num_bigint::BigInt;

fn widest_gap_growth(c: &mut Criterion) {
    let mut group = c.benchmark_group("growing_cluster");
    for existing in [16usize, 256, 1024] {
        let mut seeded = TokenGenerator::new(&RandomPartitioner, BigInt::from(0));
        seeded.growing_cluster(existing).unwrap();
        while seeded.new_token().is_some() {}

        group.bench_with_input(BenchmarkId::from_parameter(existing), &seeded, |b, seeded| {
            b.iter(|| {
                let mut generator = seeded.clone();
                generator.growing_cluster(black_box(32)).unwrap();
                generator
            })
        });
    }
    group.finish();
}

criterion_group!(benches, widest_gap_growth);
criterion_main!(benches);
