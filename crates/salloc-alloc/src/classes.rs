use crate::config::{
  DEFAULT_CLASSES,
  QUANTUM_MAX,
  QUANTUM_UNIT,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClassError {
  #[error("a size class table needs at least one class")]
  Empty,
  #[error("size classes must be non-zero")]
  ZeroClass,
  #[error("class {index} ({size} bytes) does not exceed the previous class ({previous} bytes)")]
  NotAscending {
    index: usize,
    previous: usize,
    size: usize,
  },
  #[error("{max} is not a multiple of the {unit}-byte unit")]
  UnitMismatch { unit: usize, max: usize },
}

pub type ClassResult<T> = Result<T, ClassError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClassIndex(usize);

impl ClassIndex {
  pub const fn get(self) -> usize {
    self.0
  }
}

/// A strictly ascending list of canonical block sizes, validated once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeClassTable {
  sizes: Vec<usize>,
}

impl SizeClassTable {
  pub fn new(sizes: impl Into<Vec<usize>>) -> ClassResult<Self> {
    let sizes = sizes.into();
    match sizes.first() {
      None => return Err(ClassError::Empty),
      Some(0) => return Err(ClassError::ZeroClass),
      Some(_) => {}
    }

    for (index, pair) in sizes.windows(2).enumerate() {
      if pair[1] <= pair[0] {
        return Err(ClassError::NotAscending {
          index: index + 1,
          previous: pair[0],
          size: pair[1],
        });
      }
    }

    Ok(Self { sizes })
  }

  /// `unit, 2 * unit, …, max`.
  pub fn uniform(unit: usize, max: usize) -> ClassResult<Self> {
    if unit == 0 {
      return Err(ClassError::ZeroClass);
    }
    if max == 0 || max % unit != 0 {
      return Err(ClassError::UnitMismatch { unit, max });
    }

    Self::new((1..=max / unit).map(|step| step * unit).collect::<Vec<_>>())
  }

  pub fn quantized() -> Self {
    Self {
      sizes: (1..=QUANTUM_MAX / QUANTUM_UNIT)
        .map(|step| step * QUANTUM_UNIT)
        .collect(),
    }
  }

  pub fn sizes(&self) -> &[usize] {
    &self.sizes
  }

  pub fn len(&self) -> usize {
    self.sizes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.sizes.is_empty()
  }

  pub fn max(&self) -> usize {
    self.sizes[self.sizes.len() - 1]
  }
}

impl Default for SizeClassTable {
  fn default() -> Self {
    Self {
      sizes: DEFAULT_CLASSES.to_vec(),
    }
  }
}

/// O(1) mapping from a request size to the smallest class that holds it.
///
/// The lookup table has one entry per byte up to the largest class, filled by a single
/// forward walk over the class list.
#[derive(Debug, Clone)]
pub struct SizeClassMap {
  sizes: Vec<usize>,
  lookup: Vec<u32>,
}

impl SizeClassMap {
  pub fn new(table: &SizeClassTable) -> Self {
    let sizes = table.sizes().to_vec();
    let max = table.max();

    let mut lookup = vec![0u32; max + 1];
    let mut class = 0;
    for (size, entry) in lookup.iter_mut().enumerate().skip(1) {
      if size > sizes[class] {
        class += 1;
      }
      *entry = class as u32;
    }

    Self { sizes, lookup }
  }

  /// `None` for zero and for sizes above [`SizeClassMap::max_class_size`].
  #[inline]
  pub fn classify(&self, size: usize) -> Option<ClassIndex> {
    if size == 0 {
      return None;
    }
    self
      .lookup
      .get(size)
      .map(|&class| ClassIndex(class as usize))
  }

  pub fn class_size(&self, index: ClassIndex) -> usize {
    self.sizes[index.0]
  }

  pub fn max_class_size(&self) -> usize {
    self.sizes[self.sizes.len() - 1]
  }

  pub fn len(&self) -> usize {
    self.sizes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.sizes.is_empty()
  }

  pub fn sizes(&self) -> &[usize] {
    &self.sizes
  }
}

impl Default for SizeClassMap {
  fn default() -> Self {
    Self::new(&SizeClassTable::default())
  }
}
