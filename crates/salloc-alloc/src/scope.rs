//! Bookkeeping shared by the scoped allocators: handles, the records kept on their
//! LIFO stacks, and the outstanding totals.

use getset::CopyGetters;
use salloc_sys::{
  extent::Extent,
  system::System,
};
use tracing::trace;

use crate::error::AllocResult;

/// A scoped allocation. Must be freed in reverse allocation order.
#[must_use = "a dropped scope blocks every earlier scope from being freed"]
#[derive(Debug, PartialEq, Eq)]
pub struct Scoped {
  epoch: u64,
  seq: u64,
  len: usize,
}

impl Scoped {
  pub(crate) fn new(epoch: u64, seq: u64, len: usize) -> Self {
    Self { epoch, seq, len }
  }

  pub(crate) fn epoch(&self) -> u64 {
    self.epoch
  }

  pub(crate) fn seq(&self) -> u64 {
    self.seq
  }

  pub fn len(&self) -> usize {
    self.len
  }

  pub fn is_empty(&self) -> bool {
    self.len == 0
  }
}

#[derive(Debug)]
pub(crate) enum Backing {
  /// Offset into the bump region.
  Region(usize),
  Heap(Extent),
}

#[derive(Debug)]
pub(crate) struct Record {
  pub seq: u64,
  pub size: usize,
  pub backing: Backing,
}

impl Record {
  pub fn is_heap(&self) -> bool {
    matches!(self.backing, Backing::Heap(_))
  }
}

/// Outstanding bytes and their high-water mark.
#[derive(Debug, Default, Clone, Copy, CopyGetters)]
pub(crate) struct Totals {
  #[getset(get_copy = "pub")]
  allocation: usize,
  #[getset(get_copy = "pub")]
  max_allocation: usize,
}

impl Totals {
  pub fn add(&mut self, size: usize) {
    self.allocation += size;
    self.max_allocation = self.max_allocation.max(self.allocation);
  }

  pub fn sub(&mut self, size: usize) {
    self.allocation -= size;
  }

  pub fn reset(&mut self) {
    *self = Self::default();
  }
}

pub(crate) fn fallback(size: usize, system: &'static dyn System) -> AllocResult<Extent> {
  trace!(size, system = system.name(), "region exhausted, falling back to the heap");
  Ok(Extent::new_in(size, system)?)
}

/// Panics unless `top` is the record `handle` was issued for, freed with the same size.
pub(crate) fn check_top(top: Option<&Record>, handle: &Scoped, size: usize) {
  let Some(top) = top else {
    panic!("scoped free with no live allocations");
  };

  assert_eq!(
    top.seq,
    handle.seq(),
    "scoped allocations must be freed in reverse order"
  );
  assert_eq!(
    top.size, size,
    "scoped allocation of {} bytes freed with size {size}",
    top.size
  );
}

/// Looks a live record up by its handle, newest first.
pub(crate) fn find<'a>(
  mut records: impl DoubleEndedIterator<Item = &'a Record>,
  handle: &Scoped,
) -> &'a Record {
  match records.rfind(|record| record.seq == handle.seq()) {
    Some(record) => record,
    None => panic!("scoped allocation is no longer live"),
  }
}

/// Borrows the bytes a record refers to, `region` being the bump region.
pub(crate) fn view<'a>(record: &'a Record, region: &'a [u8], len: usize) -> &'a [u8] {
  match &record.backing {
    Backing::Region(start) => &region[*start..*start + len],
    Backing::Heap(extent) => &extent.as_ref()[..len],
  }
}

pub(crate) fn view_mut<'a>(
  record: &'a mut Record,
  region: &'a mut [u8],
  len: usize,
) -> &'a mut [u8] {
  match &mut record.backing {
    Backing::Region(start) => &mut region[*start..*start + len],
    Backing::Heap(extent) => &mut extent.as_mut()[..len],
  }
}
