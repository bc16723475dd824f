#[cfg(unix)]
use core::ptr::NonNull;

#[cfg(unix)]
use crate::{
  prim::page_align,
  system::{
    SysError,
    SysResult,
    System,
  },
};

/// Anonymous private mappings, rounded up to whole pages.
#[cfg(unix)]
pub struct PageSystem {}

#[cfg(unix)]
impl PageSystem {
  const fn prot() -> i32 {
    libc::PROT_READ | libc::PROT_WRITE
  }

  const fn flags() -> i32 {
    libc::MAP_PRIVATE | libc::MAP_ANONYMOUS
  }

  fn mapped_len(size: usize) -> SysResult<usize> {
    page_align(size).ok_or(SysError::InvalidArgument)
  }
}

#[cfg(unix)]
unsafe impl System for PageSystem {
  fn name(&self) -> &'static str {
    "pages"
  }

  unsafe fn alloc(&self, size: usize) -> SysResult<NonNull<u8>> {
    if size == 0 {
      return Err(SysError::InvalidArgument);
    }

    let len = Self::mapped_len(size)?;
    let ptr = unsafe { libc::mmap(core::ptr::null_mut(), len, Self::prot(), Self::flags(), -1, 0) };

    match ptr {
      libc::MAP_FAILED => Err(SysError::OutOfMemory(size)),
      _ => NonNull::new(ptr as *mut u8).ok_or(SysError::OutOfMemory(size)),
    }
  }

  unsafe fn dealloc(&self, ptr: NonNull<u8>, size: usize) -> SysResult<()> {
    let len = Self::mapped_len(size)?;
    let result = unsafe { libc::munmap(ptr.as_ptr() as *mut libc::c_void, len) };
    if result == 0 {
      return Ok(());
    }

    Err(SysError::InvalidArgument)
  }
}
