//! Ownership checks run on `free` when bounds validation is enabled.

use salloc_list::SlotRef;

use crate::chunk::Chunks;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validation {
  Off,
  /// Walk the chunk list on every free and check the block really is ours.
  Bounds,
}

impl Validation {
  pub const fn enabled(self) -> bool {
    matches!(self, Validation::Bounds)
  }
}

impl Default for Validation {
  fn default() -> Self {
    if cfg!(debug_assertions) {
      Validation::Bounds
    } else {
      Validation::Off
    }
  }
}

/// Panics unless `at` lies inside a chunk of `chunks` whose blocks are `block_size`
/// bytes wide.
pub(crate) fn check_owned(chunks: &Chunks, at: SlotRef, block_size: usize) {
  let Some(chunk) = chunks.iter().find(|chunk| chunk.contains(at)) else {
    panic!("block {at:?} does not belong to any chunk of this allocator");
  };

  assert_eq!(
    chunk.block_size(),
    block_size,
    "block {at:?} lives in a {}-byte chunk but was freed as a {block_size}-byte block",
    chunk.block_size()
  );
}

#[cfg(test)]
mod tests {
  use salloc_sys::GLOBAL_SYSTEM;

  use super::*;

  fn two_chunks() -> Chunks {
    let mut chunks = Chunks::new();
    chunks.push(16, 4, GLOBAL_SYSTEM).unwrap();
    chunks.push(32, 4, GLOBAL_SYSTEM).unwrap();
    chunks
  }

  #[test]
  fn owned_block_passes() {
    let chunks = two_chunks();
    check_owned(&chunks, SlotRef::new(0, 3), 16);
    check_owned(&chunks, SlotRef::new(1, 0), 32);
  }

  #[test]
  #[should_panic(expected = "does not belong to any chunk")]
  fn foreign_block_fails() {
    let chunks = two_chunks();
    check_owned(&chunks, SlotRef::new(0, 4), 16);
  }

  #[test]
  #[should_panic(expected = "freed as a 32-byte block")]
  fn cross_class_free_fails() {
    let chunks = two_chunks();
    check_owned(&chunks, SlotRef::new(0, 1), 32);
  }

  #[test]
  fn default_follows_build() {
    assert_eq!(Validation::default().enabled(), cfg!(debug_assertions));
  }
}
