use getset::CopyGetters;
use salloc_list::{
  FreeList,
  SlotRef,
};
use salloc_sys::{
  extent::Extent,
  math::grow_half,
  system::System,
};
use tracing::{
  debug,
  trace,
};

use crate::{
  Allocator,
  block::{
    Block,
    Pooled,
  },
  chunk::Chunks,
  classes::{
    ClassIndex,
    SizeClassMap,
  },
  config::SegregatedConfig,
  error::{
    AllocError,
    AllocResult,
  },
  next_epoch,
  validate::{
    Validation,
    check_owned,
  },
};

#[derive(Debug)]
struct ClassState {
  free: FreeList,
  chunk_size: usize,
  chunks: usize,
}

impl ClassState {
  fn new(chunk_size: usize) -> Self {
    Self {
      free: FreeList::new(),
      chunk_size,
      chunks: 0,
    }
  }
}

/// Slab allocator serving many small sizes, one free list and one growing chunk
/// sequence per size class.
///
/// Requests above the largest class bypass pooling and are served as
/// [`Block::Large`] straight from the system.
#[derive(CopyGetters)]
pub struct SegregatedAllocator {
  /// Live pooled blocks. Large blocks are not counted.
  #[getset(get_copy = "pub")]
  block_count: usize,
  #[getset(get_copy = "pub")]
  initial_chunk_size: usize,
  #[getset(get_copy = "pub")]
  validation: Validation,
  map: SizeClassMap,
  classes: Vec<ClassState>,
  chunks: Chunks,
  epoch: u64,
  system: &'static dyn System,
}

impl SegregatedAllocator {
  pub fn new(config: SegregatedConfig) -> Self {
    assert!(config.chunk_size > 0, "chunk size must be non-zero");

    let map = SizeClassMap::new(&config.classes);
    let classes = (0..map.len())
      .map(|_| ClassState::new(config.chunk_size))
      .collect();

    Self {
      block_count: 0,
      initial_chunk_size: config.chunk_size,
      validation: config.validation,
      map,
      classes,
      chunks: Chunks::new(),
      epoch: next_epoch(),
      system: config.system,
    }
  }

  pub fn predefined() -> Self {
    Self::new(SegregatedConfig::predefined())
  }

  pub fn quantized() -> Self {
    Self::new(SegregatedConfig::quantized())
  }

  pub fn chunk_count(&self) -> usize {
    self.chunks.len()
  }

  pub fn class_count(&self) -> usize {
    self.map.len()
  }

  pub fn max_class_size(&self) -> usize {
    self.map.max_class_size()
  }

  pub fn size_map(&self) -> &SizeClassMap {
    &self.map
  }

  /// Chunk size the class serving `size` is currently at.
  pub fn chunk_size_for(&self, size: usize) -> Option<usize> {
    let index = self.map.classify(size)?;
    Some(self.classes[index.get()].chunk_size)
  }

  /// Free blocks queued in the class serving `size`.
  pub fn free_count(&self, size: usize) -> Option<usize> {
    let index = self.map.classify(size)?;
    Some(self.classes[index.get()].free.len())
  }

  fn grow(&mut self, index: ClassIndex) -> AllocResult<()> {
    let class_size = self.map.class_size(index);
    let state = &self.classes[index.get()];

    let chunk_size = match state.chunks {
      0 => state.chunk_size,
      _ => grow_half(state.chunk_size).ok_or(AllocError::Overflow)?,
    };

    let capacity = (chunk_size / class_size).max(1);
    let capacity = u32::try_from(capacity).map_err(|_| AllocError::Overflow)?;
    let id = self.chunks.push(class_size, capacity, self.system)?;

    let state = &mut self.classes[index.get()];
    state.free.thread(&mut self.chunks, id, capacity);
    state.chunk_size = chunk_size;
    state.chunks += 1;

    debug!(
      class_size,
      chunk_size = state.chunk_size,
      capacity,
      "size class grew"
    );
    Ok(())
  }

  fn next_slot(&mut self, index: ClassIndex) -> AllocResult<SlotRef> {
    loop {
      if let Some(at) = self.classes[index.get()].free.pop(&mut self.chunks) {
        self.block_count += 1;
        return Ok(at);
      }
      self.grow(index)?;
    }
  }

  fn check_epoch(&self, pooled: &Pooled) {
    assert_eq!(
      pooled.epoch(),
      self.epoch,
      "block was not issued by this allocator since its last clear"
    );
  }

  fn release(&mut self, pooled: Pooled, size: usize) {
    self.check_epoch(&pooled);
    let Some(index) = self.map.classify(size) else {
      panic!("pooled block freed with size {size}, outside every size class");
    };

    if self.validation.enabled() {
      check_owned(&self.chunks, pooled.at(), self.map.class_size(index));
    }

    if let Err(err) = self.classes[index.get()]
      .free
      .push(&mut self.chunks, pooled.at())
    {
      panic!("double free: {err}");
    }
    self.block_count -= 1;
  }
}

impl Default for SegregatedAllocator {
  fn default() -> Self {
    Self::predefined()
  }
}

impl Allocator for SegregatedAllocator {
  type Handle = Block;

  fn allocate(&mut self, size: usize) -> AllocResult<Option<Block>> {
    if size == 0 {
      return Ok(None);
    }

    let Some(index) = self.map.classify(size) else {
      trace!(size, "request above the largest class, using the system");
      let extent = Extent::new_in(size, self.system)?;
      return Ok(Some(Block::Large(extent)));
    };

    let at = self.next_slot(index)?;
    Ok(Some(Block::Pooled(Pooled::new(self.epoch, at, size))))
  }

  fn free(&mut self, handle: Block, size: usize) {
    match handle {
      Block::Pooled(pooled) => self.release(pooled, size),
      Block::Large(extent) => {
        assert!(
          size > self.map.max_class_size() && size == extent.len(),
          "large block of {} bytes freed with size {size}",
          extent.len()
        );
        drop(extent);
      }
    }
  }

  fn clear(&mut self) {
    debug!(
      chunks = self.chunks.len(),
      live = self.block_count,
      "segregated allocator cleared"
    );

    self.chunks.clear();
    for state in &mut self.classes {
      *state = ClassState::new(self.initial_chunk_size);
    }
    self.block_count = 0;
    self.epoch = next_epoch();
  }

  fn bytes<'a>(&'a self, handle: &'a Block) -> &'a [u8] {
    match handle {
      Block::Pooled(pooled) => {
        self.check_epoch(pooled);
        self.chunks.block(pooled.at(), pooled.len())
      }
      Block::Large(extent) => extent.as_ref(),
    }
  }

  fn bytes_mut<'a>(&'a mut self, handle: &'a mut Block) -> &'a mut [u8] {
    match handle {
      Block::Pooled(pooled) => {
        self.check_epoch(pooled);
        self.chunks.block_mut(pooled.at(), pooled.len())
      }
      Block::Large(extent) => extent.as_mut(),
    }
  }
}

#[cfg(test)]
mod tests {
  use crate::{
    classes::{
      ClassError,
      SizeClassTable,
    },
    config::{
      DEFAULT_CHUNK_SIZE,
      DEFAULT_CLASSES,
      QUANTUM_MAX,
      QUANTUM_UNIT,
    },
    tests::Flaky,
  };

  use super::*;

  fn alloc(sa: &mut SegregatedAllocator, size: usize) -> Block {
    sa.allocate(size).unwrap().unwrap()
  }

  #[test]
  fn one_chunk_per_class() {
    let mut sa = SegregatedAllocator::predefined();
    let mut live: Vec<Block> = DEFAULT_CLASSES.iter().map(|&s| alloc(&mut sa, s)).collect();

    assert_eq!(sa.chunk_count(), sa.class_count());
    assert_eq!(sa.block_count(), sa.class_count());

    for size in [17, 18, 19] {
      live.push(alloc(&mut sa, size));
    }
    assert_eq!(sa.chunk_count(), 14);
    assert_eq!(sa.block_count(), 17);
  }

  #[test]
  fn alloc_free_pair_restores_counts() {
    let mut sa = SegregatedAllocator::predefined();
    let _warm = alloc(&mut sa, 100);
    let (blocks, chunks) = (sa.block_count(), sa.chunk_count());

    for size in [1, 64, 100, 639, 640] {
      let block = alloc(&mut sa, size);
      sa.free(block, size);
    }

    assert_eq!(sa.block_count(), blocks);
    assert_eq!(sa.chunk_count(), chunks);
  }

  #[test]
  fn large_requests_bypass_pooling() {
    let mut sa = SegregatedAllocator::predefined();
    let mut block = alloc(&mut sa, 641);

    assert!(block.is_large());
    assert_eq!(sa.block_count(), 0);
    assert_eq!(sa.chunk_count(), 0);

    sa.bytes_mut(&mut block)[640] = 3;
    assert_eq!(sa.bytes(&block)[640], 3);
    sa.free(block, 641);
  }

  #[test]
  fn every_quantized_size_shares_initial_chunk_size() {
    let mut sa = SegregatedAllocator::quantized();
    let _live: Vec<Block> = (1..=QUANTUM_MAX).map(|s| alloc(&mut sa, s)).collect();

    assert_eq!(sa.chunk_count(), QUANTUM_MAX / QUANTUM_UNIT);
    assert_eq!(sa.block_count(), QUANTUM_MAX);

    let base = sa.chunk_size_for(1).unwrap();
    assert_eq!(base, DEFAULT_CHUNK_SIZE);
    for size in 1..=QUANTUM_MAX {
      assert_eq!(sa.chunk_size_for(size), Some(base));
    }
  }

  #[test]
  fn growth_is_per_class_and_reset_by_clear() {
    let mut sa = SegregatedAllocator::quantized();
    let base = sa.chunk_size_for(1).unwrap();
    let per_chunk = base / QUANTUM_UNIT;

    // Slot tags live outside the chunk, so the whole chunk holds blocks.
    let _first: Vec<Block> = (0..=per_chunk).map(|_| alloc(&mut sa, 1)).collect();
    let grown = base + base / 2;
    assert_eq!(sa.chunk_count(), 2);
    assert_eq!(sa.chunk_size_for(1), Some(grown));
    assert_eq!(sa.chunk_size_for(8), Some(grown));
    assert_eq!(sa.chunk_size_for(9), Some(base));

    sa.clear();
    assert_eq!(sa.chunk_count(), 0);
    assert_eq!(sa.block_count(), 0);
    assert_eq!(sa.chunk_size_for(1), Some(base));

    let _second: Vec<Block> = (0..=per_chunk).map(|_| alloc(&mut sa, 1)).collect();
    assert_eq!(sa.chunk_size_for(1), Some(grown));
  }

  #[test]
  fn failed_growth_keeps_chunk_size() {
    static SYSTEM: Flaky = Flaky::new();
    let config = SegregatedConfig::predefined()
      .with_chunk_size(64)
      .with_system(&SYSTEM);
    let mut sa = SegregatedAllocator::new(config);

    let _first: Vec<Block> = (0..4).map(|_| alloc(&mut sa, 16)).collect();
    assert_eq!(sa.chunk_size_for(16), Some(64));

    SYSTEM.set_failing(true);
    for _ in 0..5 {
      assert!(sa.allocate(16).is_err());
    }
    assert_eq!(sa.chunk_size_for(16), Some(64));
    assert_eq!(sa.chunk_count(), 1);

    SYSTEM.set_failing(false);
    let _fifth = alloc(&mut sa, 16);
    assert_eq!(sa.chunk_size_for(16), Some(96));
    assert_eq!(sa.chunk_count(), 2);
  }

  #[test]
  fn custom_sizes_are_validated() {
    let config = SegregatedConfig::predefined().with_sizes(vec![8, 24, 200]).unwrap();
    let sa = SegregatedAllocator::new(config);
    assert_eq!(sa.size_map().sizes(), &[8, 24, 200]);
    assert_eq!(sa.max_class_size(), 200);

    let err = SegregatedConfig::predefined().with_sizes(vec![24, 8]).err();
    assert!(matches!(err, Some(AllocError::Classes(ClassError::NotAscending { .. }))));
  }

  #[test]
  fn class_larger_than_chunk_gets_one_block() {
    let config = SegregatedConfig::predefined()
      .with_classes(SizeClassTable::new(vec![64, 4096]).unwrap())
      .with_chunk_size(1024);
    let mut sa = SegregatedAllocator::new(config);

    let _a = alloc(&mut sa, 2000);
    assert_eq!(sa.free_count(2000), Some(0));
    let _b = alloc(&mut sa, 2000);
    assert_eq!(sa.chunk_count(), 2);
  }

  #[test]
  #[should_panic(expected = "freed as a 32-byte block")]
  fn wrong_size_free_is_caught() {
    let config = SegregatedConfig::predefined().with_validation(Validation::Bounds);
    let mut sa = SegregatedAllocator::new(config);
    let _other = alloc(&mut sa, 32);
    let block = alloc(&mut sa, 16);
    sa.free(block, 32);
  }

  #[test]
  #[should_panic(expected = "outside every size class")]
  fn pooled_block_freed_as_large_panics() {
    let mut sa = SegregatedAllocator::predefined();
    let block = alloc(&mut sa, 16);
    sa.free(block, 4096);
  }

  #[test]
  #[should_panic(expected = "freed with size 16")]
  fn large_block_freed_as_pooled_panics() {
    let mut sa = SegregatedAllocator::predefined();
    let block = alloc(&mut sa, 1000);
    sa.free(block, 16);
  }
}
