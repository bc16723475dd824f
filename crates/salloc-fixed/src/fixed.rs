use core::ops::Range;

use getset::CopyGetters;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FixedError {
  #[error("{needed} bytes do not fit at offset {offset} of {max}")]
  OutOfMemory {
    needed: usize,
    offset: usize,
    max: usize,
  },
  #[error("cannot rewind {size} bytes from offset {offset}")]
  Underflow { size: usize, offset: usize },
  #[error("cannot shrink to {max} bytes below offset {offset}")]
  Shrink { max: usize, offset: usize },
}

pub type FixedResult<T> = Result<T, FixedError>;

/// Bump offset over a region of `max` bytes.
///
/// `Fixed` only does the offset bookkeeping; the bytes live wherever the owner keeps
/// them. Reservations are carved back to back without padding, and are given back by
/// rewinding in reverse order.
#[derive(Debug, Clone, CopyGetters)]
pub struct Fixed {
  #[getset(get_copy = "pub")]
  max: usize,
  #[getset(get_copy = "pub")]
  offset: usize,
}

impl Fixed {
  pub const fn new(max: usize) -> Self {
    Self { max, offset: 0 }
  }

  pub fn has(&self, needed: usize) -> bool {
    if self.max < needed {
      return false;
    }
    self.offset <= self.max - needed
  }

  pub fn remaining(&self) -> usize {
    self.max - self.offset
  }

  pub fn is_rewound(&self) -> bool {
    self.offset == 0
  }

  pub fn allocate(&mut self, size: usize) -> FixedResult<Range<usize>> {
    if !self.has(size) {
      return Err(FixedError::OutOfMemory {
        needed: size,
        offset: self.offset,
        max: self.max,
      });
    }

    let start = self.offset;
    self.offset += size;
    Ok(start..self.offset)
  }

  pub fn rewind(&mut self, size: usize) -> FixedResult<()> {
    self.offset = self
      .offset
      .checked_sub(size)
      .ok_or(FixedError::Underflow {
        size,
        offset: self.offset,
      })?;
    Ok(())
  }

  pub fn reset(&mut self) {
    self.offset = 0;
  }

  pub fn resize(&mut self, max: usize) -> FixedResult<()> {
    if max < self.offset {
      return Err(FixedError::Shrink {
        max,
        offset: self.offset,
      });
    }

    self.max = max;
    Ok(())
  }
}
