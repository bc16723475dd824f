use core::ptr::NonNull;
use std::alloc::{
  Layout,
  alloc_zeroed,
  dealloc,
};

use crate::prim::min_align;

#[cfg(unix)]
pub use crate::unix::PageSystem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SysError {
  #[error("system memory is not supported on this platform")]
  Unsupported,
  #[error("system is out of memory ({0} bytes requested)")]
  OutOfMemory(usize),
  #[error("invalid argument passed to the system allocator")]
  InvalidArgument,
}

pub type SysResult<T> = Result<T, SysError>;

/// Upstream memory source that every allocator chunk and heap fallback comes from.
///
/// # Safety
///
/// Implementors must ensure that:
/// - `alloc` returns zeroed memory of at least `size` bytes aligned to [`min_align`]
/// - `dealloc` only operates on memory previously returned by `alloc` of the same system
/// - memory is not handed out twice while it is live
pub unsafe trait System
where
  Self: Send + Sync,
{
  fn name(&self) -> &'static str;

  /// Allocates `size` bytes, `size` is never zero.
  ///
  /// # Safety
  ///
  /// The returned memory must be released with `dealloc` on the same system using
  /// the same `size`.
  unsafe fn alloc(&self, size: usize) -> SysResult<NonNull<u8>> {
    _ = size;
    Err(SysError::Unsupported)
  }

  /// Releases memory previously obtained through `alloc`.
  ///
  /// # Safety
  ///
  /// Caller must ensure `ptr` came from this system with the same `size` and will not
  /// be accessed after this call.
  unsafe fn dealloc(&self, ptr: NonNull<u8>, size: usize) -> SysResult<()> {
    _ = (ptr, size);
    Err(SysError::Unsupported)
  }
}

/// The process heap, the default upstream.
pub struct HeapSystem {}

impl HeapSystem {
  fn layout(size: usize) -> SysResult<Layout> {
    Layout::from_size_align(size, min_align()).map_err(|_| SysError::InvalidArgument)
  }
}

unsafe impl System for HeapSystem {
  fn name(&self) -> &'static str {
    "heap"
  }

  unsafe fn alloc(&self, size: usize) -> SysResult<NonNull<u8>> {
    if size == 0 {
      return Err(SysError::InvalidArgument);
    }

    let layout = Self::layout(size)?;
    let ptr = unsafe { alloc_zeroed(layout) };
    NonNull::new(ptr).ok_or(SysError::OutOfMemory(size))
  }

  unsafe fn dealloc(&self, ptr: NonNull<u8>, size: usize) -> SysResult<()> {
    let layout = Self::layout(size)?;
    unsafe { dealloc(ptr.as_ptr(), layout) };
    Ok(())
  }
}

#[cfg(not(unix))]
pub struct PageSystem {}

#[cfg(not(unix))]
unsafe impl System for PageSystem {
  fn name(&self) -> &'static str {
    "pages"
  }
}

pub static HEAP_SYSTEM: HeapSystem = HeapSystem {};
pub static PAGE_SYSTEM: PageSystem = PageSystem {};

pub static GLOBAL_SYSTEM: &dyn System = &HEAP_SYSTEM;
