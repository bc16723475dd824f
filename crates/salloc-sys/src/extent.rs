use core::{
  fmt,
  ops::Range,
  ptr::NonNull,
};

use crate::{
  GLOBAL_SYSTEM,
  system::{
    SysError,
    System,
  },
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtentError {
  #[error(transparent)]
  System(#[from] SysError),
  #[error("range {start}..{end} is outside an extent of {len} bytes")]
  OutOfBounds { start: usize, end: usize, len: usize },
}

pub type ExtentResult<T> = Result<T, ExtentError>;

/// One contiguous, exclusively owned region obtained from a [`System`].
///
/// The region is zeroed on creation and released to its system on drop.
pub struct Extent {
  ptr: NonNull<u8>,
  len: usize,
  system: &'static dyn System,
}

impl Extent {
  pub fn new(size: usize) -> ExtentResult<Extent> {
    Self::new_in(size, GLOBAL_SYSTEM)
  }

  pub fn new_in(size: usize, system: &'static dyn System) -> ExtentResult<Extent> {
    let ptr = match size {
      0 => Self::dangling(),
      _ => unsafe { system.alloc(size) }?,
    };

    Ok(Extent {
      ptr,
      len: size,
      system,
    })
  }

  fn dangling() -> NonNull<u8> {
    // Never dereferenced, only used as the base of empty slices.
    NonNull::<u128>::dangling().cast()
  }

  pub fn len(&self) -> usize {
    self.len
  }

  pub fn is_empty(&self) -> bool {
    self.len == 0
  }

  pub fn system(&self) -> &'static dyn System {
    self.system
  }

  pub fn check(&self, range: &Range<usize>) -> ExtentResult<()> {
    if range.start > range.end || range.end > self.len {
      return Err(ExtentError::OutOfBounds {
        start: range.start,
        end: range.end,
        len: self.len,
      });
    }
    Ok(())
  }

  pub fn slice(&self, range: Range<usize>) -> ExtentResult<&[u8]> {
    self.check(&range)?;
    Ok(&self.as_ref()[range])
  }

  pub fn slice_mut(&mut self, range: Range<usize>) -> ExtentResult<&mut [u8]> {
    self.check(&range)?;
    Ok(&mut self.as_mut()[range])
  }

  /// Swaps in a fresh region of `size` bytes from the same system, carrying over the
  /// first `preserve` bytes. The old region is released only after the copy.
  pub fn replace(&mut self, size: usize, preserve: usize) -> ExtentResult<()> {
    let mut fresh = Extent::new_in(size, self.system)?;
    let keep = preserve.min(self.len).min(size);
    fresh.as_mut()[..keep].copy_from_slice(&self.as_ref()[..keep]);

    core::mem::swap(self, &mut fresh);
    Ok(())
  }
}

impl AsRef<[u8]> for Extent {
  fn as_ref(&self) -> &[u8] {
    unsafe { core::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
  }
}

impl AsMut<[u8]> for Extent {
  fn as_mut(&mut self) -> &mut [u8] {
    unsafe { core::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
  }
}

impl fmt::Debug for Extent {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Extent")
      .field("ptr", &self.ptr)
      .field("len", &self.len)
      .field("system", &self.system.name())
      .finish()
  }
}

impl Drop for Extent {
  fn drop(&mut self) {
    if self.len == 0 {
      return;
    }
    let _ = unsafe { self.system.dealloc(self.ptr, self.len) };
  }
}

// SAFETY: the region is exclusively owned and `System` is `Send + Sync`.
unsafe impl Send for Extent {}
unsafe impl Sync for Extent {}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    prim::min_align,
    system::PAGE_SYSTEM,
  };

  #[test]
  fn extent_new_is_zeroed() {
    let extent = Extent::new(256).unwrap();
    assert_eq!(extent.len(), 256);
    assert!(extent.as_ref().iter().all(|&b| b == 0));
    assert_eq!(extent.as_ref().as_ptr() as usize % min_align(), 0);
  }

  #[test]
  fn extent_zero_size() {
    let extent = Extent::new(0).unwrap();
    assert!(extent.is_empty());
    assert_eq!(extent.as_ref().len(), 0);
  }

  #[test]
  fn extent_check_ranges() {
    let extent = Extent::new(64).unwrap();
    assert!(extent.check(&(0..64)).is_ok());
    assert!(extent.check(&(10..10)).is_ok());
    assert_eq!(
      extent.check(&(0..65)),
      Err(ExtentError::OutOfBounds {
        start: 0,
        end: 65,
        len: 64
      })
    );
    #[allow(clippy::reversed_empty_ranges)]
    let reversed = 40..20;
    assert!(extent.check(&reversed).is_err());
  }

  #[test]
  fn extent_slices() {
    let mut extent = Extent::new(32).unwrap();
    extent.slice_mut(8..12).unwrap().copy_from_slice(&[1, 2, 3, 4]);
    assert_eq!(extent.slice(8..12).unwrap(), &[1, 2, 3, 4]);
    assert!(extent.slice(30..40).is_err());
  }

  #[test]
  fn extent_replace_preserves_prefix() {
    let mut extent = Extent::new(16).unwrap();
    extent.as_mut()[..4].copy_from_slice(&[9, 8, 7, 6]);
    extent.as_mut()[8] = 1;

    extent.replace(24, 4).unwrap();
    assert_eq!(extent.len(), 24);
    assert_eq!(&extent.as_ref()[..4], &[9, 8, 7, 6]);
    assert_eq!(extent.as_ref()[8], 0);
  }

  #[test]
  #[cfg(unix)]
  fn extent_in_page_system() {
    let mut extent = Extent::new_in(100, &PAGE_SYSTEM).unwrap();
    assert_eq!(extent.system().name(), "pages");
    extent.as_mut()[99] = 5;
    assert_eq!(extent.as_ref()[99], 5);
  }
}
