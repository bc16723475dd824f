use criterion::{
  BatchSize,
  Criterion,
  criterion_group,
  criterion_main,
};
use salloc::prelude::*;
use std::hint::black_box;

#[derive(Clone, Copy)]
#[allow(dead_code)]
struct Vec2 {
  x: f32,
  y: f32,
}

fn bench_fixed_churn(c: &mut Criterion) {
  c.bench_function("fixed_alloc_free_100", |b| {
    let mut fba = FixedBlockAllocator::new(FixedConfig::for_type::<Vec2>().with_validation(Validation::Off));
    b.iter(|| {
      let blocks: Vec<Pooled> = (0..100).map(|_| fba.alloc_block().unwrap()).collect();
      for block in blocks {
        fba.free_block(block);
      }
    });
  });

  c.bench_function("fixed_cold_growth", |b| {
    b.iter_batched(
      || FixedBlockAllocator::new(FixedConfig::for_type::<Vec2>()),
      |mut fba| {
        for _ in 0..1000 {
          black_box(fba.alloc_block().unwrap());
        }
        fba
      },
      BatchSize::SmallInput,
    );
  });

  c.bench_function("fixed_typed", |b| {
    let mut fba = FixedBlockAllocator::for_type::<Vec2>();
    b.iter(|| {
      let v = fba.create(Vec2 { x: 1.0, y: 2.0 }).unwrap();
      black_box(fba.get(&v).x);
      fba.destroy(v);
    });
  });
}

criterion_group!(benches, bench_fixed_churn);
criterion_main!(benches);
