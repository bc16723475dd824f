use core::{
  ptr::NonNull,
  sync::atomic::{
    AtomicBool,
    Ordering,
  },
};

use rand::{
  Rng,
  seq::SliceRandom,
};
use salloc_sys::system::{
  HEAP_SYSTEM,
  SysError,
  SysResult,
  System,
};
use tracing_subscriber::{
  EnvFilter,
  layer::SubscriberExt,
  util::SubscriberInitExt,
};

use crate::prelude::*;

fn init_tracing() {
  let _ = tracing_subscriber::registry()
    .with(tracing_subscriber::fmt::layer().with_test_writer())
    .with(EnvFilter::from_default_env())
    .try_init();
}

/// Heap that refuses new memory while `failing` is set.
pub(crate) struct Flaky {
  failing: AtomicBool,
}

impl Flaky {
  pub const fn new() -> Self {
    Self {
      failing: AtomicBool::new(false),
    }
  }

  pub fn set_failing(&self, failing: bool) {
    self.failing.store(failing, Ordering::Relaxed);
  }
}

unsafe impl System for Flaky {
  fn name(&self) -> &'static str {
    "flaky"
  }

  unsafe fn alloc(&self, size: usize) -> SysResult<NonNull<u8>> {
    if self.failing.load(Ordering::Relaxed) {
      return Err(SysError::OutOfMemory(size));
    }
    unsafe { HEAP_SYSTEM.alloc(size) }
  }

  unsafe fn dealloc(&self, ptr: NonNull<u8>, size: usize) -> SysResult<()> {
    unsafe { HEAP_SYSTEM.dealloc(ptr, size) }
  }
}

/// Allocates random sizes, writes a distinct pattern into each, frees them in random
/// order, and checks every block kept its own bytes.
fn shuffle_and_free<A: Allocator>(alloc: &mut A, max: usize, rounds: usize) {
  let mut rng = rand::rng();
  let mut live = Vec::new();

  for round in 0..rounds {
    let size = rng.random_range(1..=max);
    let mut handle = alloc.allocate(size).unwrap().unwrap();
    alloc.bytes_mut(&mut handle).fill(round as u8);
    live.push((handle, size, round as u8));
  }

  live.shuffle(&mut rng);
  for (handle, size, tag) in live {
    assert!(alloc.bytes(&handle).iter().all(|&b| b == tag));
    assert_eq!(alloc.bytes(&handle).len(), size);
    alloc.free(handle, size);
  }
}

#[test]
fn pooled_allocators_survive_random_order() {
  init_tracing();

  let mut sa = SegregatedAllocator::predefined();
  shuffle_and_free(&mut sa, 900, 2000);
  assert_eq!(sa.block_count(), 0);

  let mut qa = SegregatedAllocator::quantized();
  shuffle_and_free(&mut qa, 1024, 2000);
  assert_eq!(qa.block_count(), 0);

  let mut fba = FixedBlockAllocator::new(FixedConfig::new(48).with_block_capacity(16));
  shuffle_and_free(&mut fba, 48, 500);
  assert_eq!(fba.block_count(), 0);

  let mut capacity = 16;
  let mut total = 0;
  for _ in 0..fba.chunk_count() {
    total += capacity;
    capacity += capacity / 2;
  }
  assert_eq!(fba.free_count(), total);
}

#[test]
fn warm_pool_does_not_grow() {
  let mut sa = SegregatedAllocator::quantized();
  let mut rng = rand::rng();
  let sizes: Vec<usize> = (0..500).map(|_| rng.random_range(1..=1024)).collect();

  let handles: Vec<Block> = sizes.iter().map(|&s| sa.allocate(s).unwrap().unwrap()).collect();
  for (handle, &size) in handles.into_iter().zip(&sizes) {
    sa.free(handle, size);
  }
  let chunks = sa.chunk_count();

  let handles: Vec<Block> = sizes.iter().map(|&s| sa.allocate(s).unwrap().unwrap()).collect();
  assert_eq!(sa.chunk_count(), chunks);
  for (handle, &size) in handles.into_iter().zip(&sizes) {
    sa.free(handle, size);
  }
}

#[test]
fn scoped_allocators_unwind_in_reverse() {
  init_tracing();

  let mut la = LinearAllocator::new(LinearConfig::default().with_capacity(4096)).unwrap();
  let mut st = StackAllocator::<4096, 64>::new();
  let mut rng = rand::rng();

  for _ in 0..20 {
    let sizes: Vec<usize> = (0..rng.random_range(1..=64))
      .map(|_| rng.random_range(1..=256))
      .collect();

    let mut linear: Vec<Scoped> = sizes.iter().map(|&s| la.allocate(s).unwrap().unwrap()).collect();
    let mut stack: Vec<Scoped> = sizes.iter().map(|&s| st.allocate(s).unwrap().unwrap()).collect();
    assert_eq!(la.allocation(), sizes.iter().sum::<usize>());
    assert_eq!(la.allocation(), st.allocation());
    assert_eq!(la.index(), st.index());

    for &size in sizes.iter().rev() {
      la.free(linear.pop().unwrap(), size);
      st.free(stack.pop().unwrap(), size);
    }
    assert_eq!(la.index(), 0);
    assert_eq!(st.index(), 0);
  }
  assert_eq!(la.max_allocation(), st.max_allocation());
}

#[test]
fn clear_resets_every_allocator() {
  let mut fba = FixedBlockAllocator::new(FixedConfig::new(32));
  let mut sa = SegregatedAllocator::predefined();
  let mut la = LinearAllocator::default();

  for size in 1..=32 {
    let _ = fba.allocate(size).unwrap();
    let _ = sa.allocate(size * 20).unwrap();
    let _ = la.allocate(size).unwrap();
  }

  fba.clear();
  sa.clear();
  la.clear();

  assert_eq!((fba.block_count(), fba.chunk_count()), (0, 0));
  assert_eq!((sa.block_count(), sa.chunk_count()), (0, 0));
  assert_eq!((la.depth(), la.index(), la.max_allocation()), (0, 0, 0));
}

#[test]
#[should_panic(expected = "not issued by this allocator")]
fn handles_do_not_cross_instances() {
  let mut first = SegregatedAllocator::predefined();
  let mut second = SegregatedAllocator::predefined();
  let block = first.allocate(24).unwrap().unwrap();
  let _own = second.allocate(24).unwrap().unwrap();
  second.free(block, 24);
}
