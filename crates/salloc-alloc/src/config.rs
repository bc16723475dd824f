use salloc_sys::{
  GLOBAL_SYSTEM,
  system::System,
};

use crate::{
  classes::SizeClassTable,
  error::AllocResult,
  validate::Validation,
};

pub const DEFAULT_CHUNK_SIZE: usize = 16 * 1024;
pub const DEFAULT_BLOCK_CAPACITY: usize = 64;
pub const DEFAULT_LINEAR_CAPACITY: usize = 16 * 1024;
pub const DEFAULT_RECORD_CAPACITY: usize = 32;
pub const DEFAULT_STACK_SIZE: usize = 100 * 1024;
pub const DEFAULT_STACK_ENTRIES: usize = 32;

pub const DEFAULT_CLASSES: [usize; 14] = [
  16, 32, 64, 96, 128, 160, 192, 224, 256, 320, 384, 448, 512, 640,
];

/// Step and ceiling of the quantised class table.
pub const QUANTUM_UNIT: usize = 8;
pub const QUANTUM_MAX: usize = 1024;

#[derive(Clone)]
pub struct FixedConfig {
  pub block_size: usize,
  pub block_capacity: usize,
  pub validation: Validation,
  pub system: &'static dyn System,
}

impl FixedConfig {
  pub fn new(block_size: usize) -> Self {
    Self {
      block_size,
      block_capacity: DEFAULT_BLOCK_CAPACITY,
      validation: Validation::default(),
      system: GLOBAL_SYSTEM,
    }
  }

  pub fn for_type<T>() -> Self {
    Self::new(core::mem::size_of::<T>())
  }

  pub fn with_block_capacity(mut self, block_capacity: usize) -> Self {
    self.block_capacity = block_capacity;
    self
  }

  pub fn with_validation(mut self, validation: Validation) -> Self {
    self.validation = validation;
    self
  }

  pub fn with_system(mut self, system: &'static dyn System) -> Self {
    self.system = system;
    self
  }
}

#[derive(Clone)]
pub struct SegregatedConfig {
  pub classes: SizeClassTable,
  pub chunk_size: usize,
  pub validation: Validation,
  pub system: &'static dyn System,
}

impl SegregatedConfig {
  /// The fourteen-class table.
  pub fn predefined() -> Self {
    Self {
      classes: SizeClassTable::default(),
      chunk_size: DEFAULT_CHUNK_SIZE,
      validation: Validation::default(),
      system: GLOBAL_SYSTEM,
    }
  }

  /// Uniform `QUANTUM_UNIT` steps up to `QUANTUM_MAX`.
  pub fn quantized() -> Self {
    Self::predefined().with_classes(SizeClassTable::quantized())
  }

  pub fn with_classes(mut self, classes: SizeClassTable) -> Self {
    self.classes = classes;
    self
  }

  /// Validates `sizes` into a class table.
  pub fn with_sizes(self, sizes: impl Into<Vec<usize>>) -> AllocResult<Self> {
    Ok(self.with_classes(SizeClassTable::new(sizes)?))
  }

  pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
    self.chunk_size = chunk_size;
    self
  }

  pub fn with_validation(mut self, validation: Validation) -> Self {
    self.validation = validation;
    self
  }

  pub fn with_system(mut self, system: &'static dyn System) -> Self {
    self.system = system;
    self
  }
}

impl Default for SegregatedConfig {
  fn default() -> Self {
    Self::predefined()
  }
}

#[derive(Clone)]
pub struct LinearConfig {
  pub capacity: usize,
  pub record_capacity: usize,
  pub system: &'static dyn System,
}

impl LinearConfig {
  pub fn with_capacity(mut self, capacity: usize) -> Self {
    self.capacity = capacity;
    self
  }

  pub fn with_record_capacity(mut self, record_capacity: usize) -> Self {
    self.record_capacity = record_capacity;
    self
  }

  pub fn with_system(mut self, system: &'static dyn System) -> Self {
    self.system = system;
    self
  }
}

impl Default for LinearConfig {
  fn default() -> Self {
    Self {
      capacity: DEFAULT_LINEAR_CAPACITY,
      record_capacity: DEFAULT_RECORD_CAPACITY,
      system: GLOBAL_SYSTEM,
    }
  }
}
