use salloc_list::SlotRef;
use salloc_sys::extent::Extent;

/// A block taken from a pool. Owned; `free` consumes it.
#[must_use = "a dropped block stays allocated until the allocator is cleared"]
#[derive(Debug, PartialEq, Eq)]
pub struct Pooled {
  epoch: u64,
  at: SlotRef,
  len: usize,
}

impl Pooled {
  pub(crate) fn new(epoch: u64, at: SlotRef, len: usize) -> Self {
    Self { epoch, at, len }
  }

  pub(crate) fn epoch(&self) -> u64 {
    self.epoch
  }

  pub(crate) fn at(&self) -> SlotRef {
    self.at
  }

  /// The requested size, at most the block size.
  pub fn len(&self) -> usize {
    self.len
  }

  pub fn is_empty(&self) -> bool {
    self.len == 0
  }
}

/// Handle of the segregated allocator: a pooled block, or a request above the largest
/// class served straight from the system.
#[must_use = "a dropped block stays allocated until the allocator is cleared"]
#[derive(Debug)]
pub enum Block {
  Pooled(Pooled),
  Large(Extent),
}

impl Block {
  pub fn len(&self) -> usize {
    match self {
      Block::Pooled(pooled) => pooled.len(),
      Block::Large(extent) => extent.len(),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn is_large(&self) -> bool {
    matches!(self, Block::Large(_))
  }
}
