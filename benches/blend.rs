use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use parmorph::blend::blend_into;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro128StarStar;

pub fn bench_blend(c: &mut Criterion) {
    c.bench_function("blend 1080p rgb", |b| {
        let mut rng = Xoshiro128StarStar::from_seed(*b"deadbeeflolcakes");
        let size = 1920 * 1080 * 3;
        let mut src1 = vec![0u8; size];
        let mut src2 = vec![0u8; size];
        let mut dest = vec![0u8; size];

        for p in src1.iter_mut() {
            *p = rng.random();
        }
        for p in src2.iter_mut() {
            *p = rng.random();
        }

        b.iter(|| {
            blend_into(
                black_box(&src1),
                black_box(&src2),
                black_box(&mut dest),
                black_box(0.35),
            )
        })
    });
}

pub fn bench_blend_small(c: &mut Criterion) {
    c.bench_function("blend 64x64 gray", |b| {
        let mut rng = Xoshiro128StarStar::from_seed(*b"deadbeeflolcakes");
        let size = 64 * 64;
        let mut src1 = vec![0u8; size];
        let mut src2 = vec![0u8; size];
        let mut dest = vec![0u8; size];

        for p in src1.iter_mut() {
            *p = rng.random();
        }
        for p in src2.iter_mut() {
            *p = rng.random();
        }

        b.iter(|| {
            blend_into(
                black_box(&src1),
                black_box(&src2),
                black_box(&mut dest),
                black_box(0.5),
            )
        })
    });
}

criterion_group!(benches, bench_blend, bench_blend_small);
criterion_main!(benches);
