use salloc_fixed::Fixed;
use salloc_sys::{
  extent::Extent,
  math::grow_half,
  system::System,
};
use tracing::{
  debug,
  warn,
};

use crate::{
  Allocator,
  config::LinearConfig,
  error::{
    AllocError,
    AllocResult,
  },
  next_epoch,
  scope::{
    self,
    Backing,
    Record,
    Scoped,
    Totals,
  },
};

/// Growable bump arena with LIFO scopes.
///
/// Requests that do not fit the remaining region are served from the system heap and
/// still take a place on the scope stack. The region itself only grows through
/// [`LinearAllocator::grow_memory`], and only while nothing is live.
pub struct LinearAllocator {
  region: Extent,
  fixed: Fixed,
  records: Vec<Record>,
  record_capacity: usize,
  totals: Totals,
  seq: u64,
  epoch: u64,
  system: &'static dyn System,
}

impl LinearAllocator {
  pub fn new(config: LinearConfig) -> AllocResult<Self> {
    let region = Extent::new_in(config.capacity, config.system)?;
    let record_capacity = config.record_capacity.max(1);

    debug!(
      capacity = config.capacity,
      record_capacity,
      system = config.system.name(),
      "linear arena created"
    );

    Ok(Self {
      fixed: Fixed::new(region.len()),
      region,
      records: Vec::with_capacity(record_capacity),
      record_capacity,
      totals: Totals::default(),
      seq: 0,
      epoch: next_epoch(),
      system: config.system,
    })
  }

  pub fn with_capacity(capacity: usize) -> AllocResult<Self> {
    Self::new(LinearConfig::default().with_capacity(capacity))
  }

  pub fn capacity(&self) -> usize {
    self.fixed.max()
  }

  /// Bump offset into the region.
  pub fn index(&self) -> usize {
    self.fixed.offset()
  }

  pub fn allocation(&self) -> usize {
    self.totals.allocation()
  }

  pub fn max_allocation(&self) -> usize {
    self.totals.max_allocation()
  }

  /// Live scopes.
  pub fn depth(&self) -> usize {
    self.records.len()
  }

  pub fn record_capacity(&self) -> usize {
    self.record_capacity
  }

  /// Whether the scope `handle` names was served from the heap.
  pub fn is_heap(&self, handle: &Scoped) -> bool {
    self.check_epoch(handle);
    scope::find(self.records.iter(), handle).is_heap()
  }

  /// Replaces the region with one 50% larger once the high-water mark has reached
  /// the current capacity. Regions too small to grow by half (0 or 1 byte) are left
  /// as they are and report `false`.
  ///
  /// # Panics
  ///
  /// When any scope is live.
  pub fn grow_memory(&mut self) -> AllocResult<bool> {
    assert!(
      self.fixed.is_rewound() && self.records.is_empty(),
      "grow_memory on an arena with {} live scopes",
      self.records.len()
    );

    if self.totals.max_allocation() < self.capacity() {
      return Ok(false);
    }

    let capacity = grow_half(self.capacity()).ok_or(AllocError::Overflow)?;
    if capacity == self.capacity() {
      return Ok(false);
    }
    self.region.replace(capacity, 0)?;
    self.fixed.resize(capacity)?;

    debug!(
      capacity,
      high_water = self.totals.max_allocation(),
      "linear arena grew"
    );
    Ok(true)
  }

  fn reserve_record(&mut self) -> AllocResult<()> {
    if self.records.len() < self.record_capacity {
      return Ok(());
    }

    let grown = grow_half(self.record_capacity).ok_or(AllocError::Overflow)?;
    self.record_capacity = grown.max(self.records.len() + 1);
    self
      .records
      .reserve_exact(self.record_capacity - self.records.len());

    debug!(record_capacity = self.record_capacity, "scope stack grew");
    Ok(())
  }

  fn check_epoch(&self, handle: &Scoped) {
    assert_eq!(
      handle.epoch(),
      self.epoch,
      "scope was not issued by this arena since its last clear"
    );
  }
}

impl Default for LinearAllocator {
  /// # Panics
  ///
  /// When the system cannot provide the default region.
  fn default() -> Self {
    match Self::new(LinearConfig::default()) {
      Ok(arena) => arena,
      Err(err) => panic!("default linear arena: {err}"),
    }
  }
}

impl Allocator for LinearAllocator {
  type Handle = Scoped;

  fn allocate(&mut self, size: usize) -> AllocResult<Option<Scoped>> {
    if size == 0 {
      return Ok(None);
    }
    self.reserve_record()?;

    let backing = match self.fixed.allocate(size) {
      Ok(range) => Backing::Region(range.start),
      Err(_) => Backing::Heap(scope::fallback(size, self.system)?),
    };

    self.seq += 1;
    self.records.push(Record {
      seq: self.seq,
      size,
      backing,
    });
    self.totals.add(size);

    Ok(Some(Scoped::new(self.epoch, self.seq, size)))
  }

  fn free(&mut self, handle: Scoped, size: usize) {
    self.check_epoch(&handle);
    scope::check_top(self.records.last(), &handle, size);

    if let Some(Record {
      backing: Backing::Region(_),
      ..
    }) = self.records.pop()
    {
      if let Err(err) = self.fixed.rewind(size) {
        panic!("scope stack out of step with the region: {err}");
      }
    }
    self.totals.sub(size);
  }

  fn clear(&mut self) {
    debug!(
      live = self.records.len(),
      index = self.fixed.offset(),
      "linear arena cleared"
    );

    self.records.clear();
    self.fixed.reset();
    self.totals.reset();
    self.epoch = next_epoch();
  }

  fn bytes<'a>(&'a self, handle: &'a Scoped) -> &'a [u8] {
    self.check_epoch(handle);
    let record = scope::find(self.records.iter(), handle);
    scope::view(record, self.region.as_ref(), handle.len())
  }

  fn bytes_mut<'a>(&'a mut self, handle: &'a mut Scoped) -> &'a mut [u8] {
    self.check_epoch(handle);
    let seq = handle.seq();
    let Some(record) = self.records.iter_mut().rfind(|record| record.seq == seq) else {
      panic!("scoped allocation is no longer live");
    };
    scope::view_mut(record, self.region.as_mut(), handle.len())
  }
}

impl Drop for LinearAllocator {
  fn drop(&mut self) {
    if !self.records.is_empty() {
      warn!(
        live = self.records.len(),
        allocation = self.totals.allocation(),
        "linear arena dropped with live scopes"
      );
    }
  }
}
