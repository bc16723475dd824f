use salloc_fixed::FixedError;
use salloc_sys::extent::ExtentError;

use crate::classes::ClassError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AllocError {
  #[error(transparent)]
  Extent(#[from] ExtentError),
  #[error(transparent)]
  Classes(#[from] ClassError),
  #[error(transparent)]
  Region(#[from] FixedError),
  #[error("size arithmetic overflowed")]
  Overflow,
  #[error("zero-sized values have no storage to live in")]
  ZeroSized,
  #[error("storage at {addr:#x} is not aligned to {align} bytes")]
  Misaligned { addr: usize, align: usize },
}

pub type AllocResult<T> = Result<T, AllocError>;
