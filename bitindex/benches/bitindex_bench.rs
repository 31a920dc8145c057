use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use kiosk_bitindex::{binarize, AccelerationProvider, BinaryVector, BitIndex, EntityRecord};

fn random_vector(state: &mut u64) -> BinaryVector {
    let mut next = || {
        *state ^= *state << 13;
        *state ^= *state >> 7;
        *state ^= *state << 17;
        *state
    };
    BinaryVector::from_words(128, vec![next(), next()]).unwrap()
}

fn filled(index: BitIndex, n: usize) -> BitIndex {
    let mut s = 42u64;
    for i in 0..n {
        index
            .upsert(EntityRecord::new(format!("person-{i:05}"), random_vector(&mut s)))
            .unwrap();
    }
    index
}

fn bench_query(c: &mut Criterion) {
    let scalar = filled(BitIndex::scalar(128).unwrap(), 5000);
    let native = filled(
        BitIndex::new(128, Arc::new(AccelerationProvider::native())).unwrap(),
        5000,
    );
    let mut s = 7u64;
    let probe = random_vector(&mut s);

    c.bench_function("bitindex_query_5k_scalar", |b| {
        b.iter(|| {
            let _ = black_box(scalar.query(black_box(&probe), 5));
        });
    });

    c.bench_function(&format!("bitindex_query_5k_{}", native.kernel_name()), |b| {
        b.iter(|| {
            let _ = black_box(native.query(black_box(&probe), 5));
        });
    });
}

fn bench_binarize(c: &mut Criterion) {
    let values: Vec<f32> = (0..128).map(|i| (i as f32 * 0.37).sin()).collect();

    c.bench_function("bitindex_binarize_128", |b| {
        b.iter(|| {
            let _ = black_box(binarize(black_box(&values), 0.0));
        });
    });
}

criterion_group!(benches, bench_query, bench_binarize);
criterion_main!(benches);
