use spin::{
  Mutex,
  MutexGuard,
};

/// One allocator instance guarded as a whole.
///
/// The allocators keep no internal locks; wrapping one here serialises every call.
pub struct Locked<A> {
  inner: Mutex<A>,
}

impl<A> Locked<A> {
  pub const fn new(alloc: A) -> Self {
    Self {
      inner: Mutex::new(alloc),
    }
  }

  pub fn lock(&self) -> MutexGuard<'_, A> {
    self.inner.lock()
  }

  /// Runs `f` with the lock held.
  pub fn with<R>(&self, f: impl FnOnce(&mut A) -> R) -> R {
    let mut guard = self.inner.lock();
    f(&mut guard)
  }

  pub fn into_inner(self) -> A {
    self.inner.into_inner()
  }
}

impl<A: Default> Default for Locked<A> {
  fn default() -> Self {
    Self::new(A::default())
  }
}
