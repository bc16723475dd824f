use salloc_fixed::Fixed;
use salloc_sys::{
  GLOBAL_SYSTEM,
  system::System,
};
use tracing::{
  debug,
  warn,
};

use crate::{
  Allocator,
  config::{
    DEFAULT_STACK_ENTRIES,
    DEFAULT_STACK_SIZE,
  },
  error::AllocResult,
  next_epoch,
  scope::{
    self,
    Backing,
    Record,
    Scoped,
    Totals,
  },
};

#[repr(C, align(16))]
struct Inline<const N: usize>([u8; N]);

/// Arena over an inline region of `SIZE` bytes with at most `ENTRIES` live scopes.
///
/// Region overflow falls back to the heap like [`crate::linear::LinearAllocator`];
/// the scope stack does not grow.
pub struct StackAllocator<
  const SIZE: usize = { DEFAULT_STACK_SIZE },
  const ENTRIES: usize = { DEFAULT_STACK_ENTRIES },
> {
  region: Inline<SIZE>,
  fixed: Fixed,
  records: [Option<Record>; ENTRIES],
  depth: usize,
  totals: Totals,
  seq: u64,
  epoch: u64,
  system: &'static dyn System,
}

impl<const SIZE: usize, const ENTRIES: usize> StackAllocator<SIZE, ENTRIES> {
  pub fn new() -> Self {
    Self::with_system(GLOBAL_SYSTEM)
  }

  /// `system` serves the requests that overflow the inline region.
  pub fn with_system(system: &'static dyn System) -> Self {
    Self {
      region: Inline([0; SIZE]),
      fixed: Fixed::new(SIZE),
      records: core::array::from_fn(|_| None),
      depth: 0,
      totals: Totals::default(),
      seq: 0,
      epoch: next_epoch(),
      system,
    }
  }

  pub fn capacity(&self) -> usize {
    SIZE
  }

  pub fn max_entries(&self) -> usize {
    ENTRIES
  }

  pub fn index(&self) -> usize {
    self.fixed.offset()
  }

  pub fn depth(&self) -> usize {
    self.depth
  }

  pub fn allocation(&self) -> usize {
    self.totals.allocation()
  }

  pub fn max_allocation(&self) -> usize {
    self.totals.max_allocation()
  }

  pub fn is_heap(&self, handle: &Scoped) -> bool {
    self.check_epoch(handle);
    scope::find(self.live().iter().flatten(), handle).is_heap()
  }

  fn live(&self) -> &[Option<Record>] {
    &self.records[..self.depth]
  }

  fn check_epoch(&self, handle: &Scoped) {
    assert_eq!(
      handle.epoch(),
      self.epoch,
      "scope was not issued by this stack allocator since its last clear"
    );
  }
}

impl<const SIZE: usize, const ENTRIES: usize> Default for StackAllocator<SIZE, ENTRIES> {
  fn default() -> Self {
    Self::new()
  }
}

impl<const SIZE: usize, const ENTRIES: usize> Allocator for StackAllocator<SIZE, ENTRIES> {
  type Handle = Scoped;

  fn allocate(&mut self, size: usize) -> AllocResult<Option<Scoped>> {
    if size == 0 {
      return Ok(None);
    }
    assert!(
      self.depth < ENTRIES,
      "stack allocator holds at most {ENTRIES} live scopes"
    );

    let backing = match self.fixed.allocate(size) {
      Ok(range) => Backing::Region(range.start),
      Err(_) => Backing::Heap(scope::fallback(size, self.system)?),
    };

    self.seq += 1;
    self.records[self.depth] = Some(Record {
      seq: self.seq,
      size,
      backing,
    });
    self.depth += 1;
    self.totals.add(size);

    Ok(Some(Scoped::new(self.epoch, self.seq, size)))
  }

  fn free(&mut self, handle: Scoped, size: usize) {
    self.check_epoch(&handle);
    let top = self.live().last().and_then(Option::as_ref);
    scope::check_top(top, &handle, size);

    self.depth -= 1;
    if let Some(Record {
      backing: Backing::Region(_),
      ..
    }) = self.records[self.depth].take()
    {
      if let Err(err) = self.fixed.rewind(size) {
        panic!("scope stack out of step with the region: {err}");
      }
    }
    self.totals.sub(size);
  }

  fn clear(&mut self) {
    debug!(
      live = self.depth,
      index = self.fixed.offset(),
      "stack allocator cleared"
    );

    self.records.iter_mut().for_each(|record| *record = None);
    self.depth = 0;
    self.fixed.reset();
    self.totals.reset();
    self.epoch = next_epoch();
  }

  fn bytes<'a>(&'a self, handle: &'a Scoped) -> &'a [u8] {
    self.check_epoch(handle);
    let record = scope::find(self.live().iter().flatten(), handle);
    scope::view(record, &self.region.0, handle.len())
  }

  fn bytes_mut<'a>(&'a mut self, handle: &'a mut Scoped) -> &'a mut [u8] {
    self.check_epoch(handle);
    let seq = handle.seq();
    let Some(record) = self.records[..self.depth]
      .iter_mut()
      .flatten()
      .rfind(|record| record.seq == seq)
    else {
      panic!("scoped allocation is no longer live");
    };
    scope::view_mut(record, &mut self.region.0, handle.len())
  }
}

impl<const SIZE: usize, const ENTRIES: usize> Drop for StackAllocator<SIZE, ENTRIES> {
  fn drop(&mut self) {
    if self.depth > 0 {
      warn!(
        live = self.depth,
        allocation = self.totals.allocation(),
        "stack allocator dropped with live scopes"
      );
    }
  }
}
