use getset::CopyGetters;
use salloc_list::{
  FreeList,
  SlotRef,
};
use salloc_sys::{
  math::grow_half,
  system::System,
};
use tracing::debug;

use crate::{
  Allocator,
  block::Pooled,
  chunk::Chunks,
  config::FixedConfig,
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

/// Slab of equally sized blocks.
///
/// The first chunk holds the configured number of blocks; every further chunk is 50%
/// larger than the previous one. Freed blocks are reused most-recent-first.
#[derive(CopyGetters)]
pub struct FixedBlockAllocator {
  #[getset(get_copy = "pub")]
  block_size: usize,
  /// Capacity of the most recent chunk, or of the first one before any exists.
  #[getset(get_copy = "pub")]
  block_capacity: usize,
  /// Live blocks.
  #[getset(get_copy = "pub")]
  block_count: usize,
  #[getset(get_copy = "pub")]
  validation: Validation,
  initial_capacity: usize,
  chunks: Chunks,
  free: FreeList,
  epoch: u64,
  system: &'static dyn System,
}

impl FixedBlockAllocator {
  pub fn new(config: FixedConfig) -> Self {
    assert!(config.block_size > 0, "fixed blocks must be at least one byte");
    assert!(config.block_capacity > 0, "chunks must hold at least one block");

    Self {
      block_size: config.block_size,
      block_capacity: config.block_capacity,
      block_count: 0,
      validation: config.validation,
      initial_capacity: config.block_capacity,
      chunks: Chunks::new(),
      free: FreeList::new(),
      epoch: next_epoch(),
      system: config.system,
    }
  }

  pub fn for_type<T>() -> Self {
    Self::new(FixedConfig::for_type::<T>())
  }

  pub fn chunk_count(&self) -> usize {
    self.chunks.len()
  }

  pub fn free_count(&self) -> usize {
    self.free.len()
  }

  fn grow(&mut self) -> AllocResult<()> {
    let block_capacity = match self.chunks.is_empty() {
      true => self.block_capacity,
      false => grow_half(self.block_capacity).ok_or(AllocError::Overflow)?,
    };

    let capacity = u32::try_from(block_capacity).map_err(|_| AllocError::Overflow)?;
    let id = self.chunks.push(self.block_size, capacity, self.system)?;
    self.free.thread(&mut self.chunks, id, capacity);
    self.block_capacity = block_capacity;

    debug!(
      block_size = self.block_size,
      capacity,
      chunks = self.chunks.len(),
      "fixed allocator grew"
    );
    Ok(())
  }

  fn next_slot(&mut self) -> AllocResult<SlotRef> {
    loop {
      if let Some(at) = self.free.pop(&mut self.chunks) {
        self.block_count += 1;
        return Ok(at);
      }
      self.grow()?;
    }
  }

  /// Allocates one whole block.
  pub fn alloc_block(&mut self) -> AllocResult<Pooled> {
    let at = self.next_slot()?;
    Ok(Pooled::new(self.epoch, at, self.block_size))
  }

  pub fn free_block(&mut self, block: Pooled) {
    self.release(block, self.block_size);
  }

  fn check_epoch(&self, block: &Pooled) {
    assert_eq!(
      block.epoch(),
      self.epoch,
      "block was not issued by this allocator since its last clear"
    );
  }

  fn release(&mut self, block: Pooled, size: usize) {
    self.check_epoch(&block);
    assert!(
      0 < self.block_count && !self.chunks.is_empty(),
      "free on an allocator without live blocks"
    );

    if self.validation.enabled() {
      assert!(
        size <= self.block_size,
        "{size} bytes freed into {}-byte blocks",
        self.block_size
      );
      check_owned(&self.chunks, block.at(), self.block_size);
    }

    if let Err(err) = self.free.push(&mut self.chunks, block.at()) {
      panic!("double free: {err}");
    }
    self.block_count -= 1;
  }
}

impl Allocator for FixedBlockAllocator {
  type Handle = Pooled;

  fn allocate(&mut self, size: usize) -> AllocResult<Option<Pooled>> {
    if size == 0 {
      return Ok(None);
    }
    assert!(
      size <= self.block_size,
      "{size} bytes requested from {}-byte blocks",
      self.block_size
    );

    let at = self.next_slot()?;
    Ok(Some(Pooled::new(self.epoch, at, size)))
  }

  fn free(&mut self, handle: Pooled, size: usize) {
    self.release(handle, size);
  }

  fn clear(&mut self) {
    debug!(
      chunks = self.chunks.len(),
      live = self.block_count,
      "fixed allocator cleared"
    );

    self.chunks.clear();
    self.free.clear();
    self.block_count = 0;
    self.block_capacity = self.initial_capacity;
    self.epoch = next_epoch();
  }

  fn bytes<'a>(&'a self, handle: &'a Pooled) -> &'a [u8] {
    self.check_epoch(handle);
    self.chunks.block(handle.at(), handle.len())
  }

  fn bytes_mut<'a>(&'a mut self, handle: &'a mut Pooled) -> &'a mut [u8] {
    self.check_epoch(handle);
    self.chunks.block_mut(handle.at(), handle.len())
  }
}
