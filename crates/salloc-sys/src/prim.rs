use core::sync::atomic::{
  AtomicUsize,
  Ordering,
};

use crate::math::align_up;

#[cfg(not(unix))]
const COMMON_PAGE_SIZE: usize = 4096;

pub const fn word_width() -> usize {
  core::mem::size_of::<usize>()
}

/// Alignment of every region handed out by a [`crate::system::System`].
pub const fn min_align() -> usize {
  core::mem::align_of::<u128>()
}

#[cfg(unix)]
fn page_size_helper() -> usize {
  unsafe { libc::sysconf(libc::_SC_PAGESIZE) as usize }
}

#[cfg(not(unix))]
fn page_size_helper() -> usize {
  COMMON_PAGE_SIZE
}

pub fn page_size() -> usize {
  static PAGE_SIZE: AtomicUsize = AtomicUsize::new(0);

  match PAGE_SIZE.load(Ordering::Acquire) {
    0 => {
      let size = page_size_helper();
      PAGE_SIZE.store(size, Ordering::Release);
      size
    }
    size => size,
  }
}

pub fn page_align(value: usize) -> Option<usize> {
  align_up(value, page_size())
}
