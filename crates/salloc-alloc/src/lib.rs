//! Pooled and scoped allocators that sit in front of a [`System`] heap.
//!
//! Every strategy implements [`Allocator`]. Callers receive owned handles instead of
//! addresses; block contents are reached through [`Allocator::bytes`] and
//! [`Allocator::bytes_mut`], or through the typed layer in [`typed`].
//!
//! [`System`]: salloc_sys::system::System

use core::sync::atomic::{
  AtomicU64,
  Ordering,
};

pub mod block;
pub mod chunk;
pub mod classes;
pub mod config;
pub mod error;
pub mod fixed;
pub mod linear;
pub mod scope;
pub mod segregated;
pub mod stack;
pub mod typed;
pub mod validate;

use crate::error::AllocResult;

/// The capability shared by every allocator strategy.
///
/// `free` must receive the size that was passed to `allocate` for the same handle.
/// Breaking that contract, freeing a handle issued by another instance or before a
/// [`Allocator::clear`], or freeing scoped allocations out of order, panics.
pub trait Allocator {
  type Handle;

  /// Returns `Ok(None)` for `size == 0` without touching any bookkeeping.
  fn allocate(&mut self, size: usize) -> AllocResult<Option<Self::Handle>>;

  fn free(&mut self, handle: Self::Handle, size: usize);

  /// Returns the instance to its initial empty state. Outstanding handles become stale.
  fn clear(&mut self);

  fn bytes<'a>(&'a self, handle: &'a Self::Handle) -> &'a [u8];

  fn bytes_mut<'a>(&'a mut self, handle: &'a mut Self::Handle) -> &'a mut [u8];
}

static EPOCH: AtomicU64 = AtomicU64::new(1);

/// Process-wide unique tag, drawn on construction and on every clear.
pub(crate) fn next_epoch() -> u64 {
  EPOCH.fetch_add(1, Ordering::Relaxed)
}

pub mod prelude {
  pub use super::{
    Allocator,
    block::{
      Block,
      Pooled,
    },
    classes::{
      ClassError,
      ClassIndex,
      SizeClassMap,
      SizeClassTable,
    },
    config::{
      FixedConfig,
      LinearConfig,
      SegregatedConfig,
    },
    error::{
      AllocError,
      AllocResult,
    },
    fixed::FixedBlockAllocator,
    linear::LinearAllocator,
    scope::Scoped,
    segregated::SegregatedAllocator,
    stack::StackAllocator,
    typed::{
      Typed,
      TypedAlloc,
    },
    validate::Validation,
  };
}

#[cfg(test)]
mod tests;
