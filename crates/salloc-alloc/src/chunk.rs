//! Chunks: one system extent carved into equal blocks, plus the slot tags that the
//! free lists thread through. All block offset arithmetic lives here.

use core::ops::Range;

use getset::CopyGetters;
use salloc_list::{
  HasSlots,
  Slot,
  SlotRef,
};
use salloc_sys::{
  extent::Extent,
  system::System,
};

use crate::error::{
  AllocError,
  AllocResult,
};

#[derive(Debug, CopyGetters)]
pub struct Chunk {
  #[getset(get_copy = "pub")]
  id: u32,
  #[getset(get_copy = "pub")]
  block_size: usize,
  #[getset(get_copy = "pub")]
  capacity: u32,
  extent: Extent,
  slots: Vec<Slot>,
}

impl Chunk {
  pub fn new(
    id: u32,
    block_size: usize,
    capacity: u32,
    system: &'static dyn System,
  ) -> AllocResult<Self> {
    let bytes = block_size
      .checked_mul(capacity as usize)
      .ok_or(AllocError::Overflow)?;
    let extent = Extent::new_in(bytes, system)?;

    Ok(Self {
      id,
      block_size,
      capacity,
      extent,
      slots: vec![Slot::Occupied; capacity as usize],
    })
  }

  /// Whether `at` names one of this chunk's blocks.
  pub fn contains(&self, at: SlotRef) -> bool {
    at.chunk() == self.id && at.slot() < self.capacity
  }

  pub fn byte_len(&self) -> usize {
    self.extent.len()
  }

  fn block_range(&self, slot: u32, len: usize) -> Range<usize> {
    assert!(
      len <= self.block_size,
      "{len} bytes requested from a {}-byte block",
      self.block_size
    );
    let start = slot as usize * self.block_size;
    start..start + len
  }

  pub fn block(&self, slot: u32, len: usize) -> &[u8] {
    let range = self.block_range(slot, len);
    &self.extent.as_ref()[range]
  }

  pub fn block_mut(&mut self, slot: u32, len: usize) -> &mut [u8] {
    let range = self.block_range(slot, len);
    &mut self.extent.as_mut()[range]
  }
}

/// Every chunk owned by one allocator instance, addressed by id.
#[derive(Debug, Default)]
pub struct Chunks {
  list: Vec<Chunk>,
}

impl Chunks {
  pub const fn new() -> Self {
    Self { list: Vec::new() }
  }

  pub fn push(
    &mut self,
    block_size: usize,
    capacity: u32,
    system: &'static dyn System,
  ) -> AllocResult<u32> {
    let id = u32::try_from(self.list.len()).map_err(|_| AllocError::Overflow)?;
    self
      .list
      .push(Chunk::new(id, block_size, capacity, system)?);
    Ok(id)
  }

  pub fn get(&self, id: u32) -> &Chunk {
    &self.list[id as usize]
  }

  pub fn get_mut(&mut self, id: u32) -> &mut Chunk {
    &mut self.list[id as usize]
  }

  pub fn iter(&self) -> impl Iterator<Item = &Chunk> {
    self.list.iter()
  }

  pub fn len(&self) -> usize {
    self.list.len()
  }

  pub fn is_empty(&self) -> bool {
    self.list.is_empty()
  }

  /// Releases every chunk back to its system.
  pub fn clear(&mut self) {
    self.list.clear();
  }

  pub fn block(&self, at: SlotRef, len: usize) -> &[u8] {
    self.get(at.chunk()).block(at.slot(), len)
  }

  pub fn block_mut(&mut self, at: SlotRef, len: usize) -> &mut [u8] {
    self.get_mut(at.chunk()).block_mut(at.slot(), len)
  }
}

impl HasSlots for Chunks {
  fn slot(&self, at: SlotRef) -> &Slot {
    &self.get(at.chunk()).slots[at.slot() as usize]
  }

  fn slot_mut(&mut self, at: SlotRef) -> &mut Slot {
    &mut self.get_mut(at.chunk()).slots[at.slot() as usize]
  }
}
