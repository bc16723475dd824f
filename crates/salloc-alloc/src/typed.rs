//! Values of `T` stored in allocator-owned blocks.
//!
//! A [`Typed`] owns both the value and the handle of the block holding it; the
//! allocator that created it is needed to reach or release the value. Dropping a
//! `Typed` without [`TypedAlloc::destroy`] or [`TypedAlloc::take`] leaks both.

use core::{
  fmt,
  marker::PhantomData,
  mem,
};

use salloc_sys::math::is_aligned;

use crate::{
  Allocator,
  error::{
    AllocError,
    AllocResult,
  },
};

#[must_use = "dropping a typed value leaks it and its block"]
pub struct Typed<T, H> {
  handle: H,
  marker: PhantomData<T>,
}

impl<T, H> Typed<T, H> {
  /// The untyped handle underneath.
  pub fn handle(&self) -> &H {
    &self.handle
  }
}

impl<T, H: fmt::Debug> fmt::Debug for Typed<T, H> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Typed")
      .field("type", &core::any::type_name::<T>())
      .field("handle", &self.handle)
      .finish()
  }
}

/// Typed construction and destruction on top of any [`Allocator`].
pub trait TypedAlloc: Allocator {
  /// Moves `value` into a block of `size_of::<T>()` bytes.
  ///
  /// Fails with [`AllocError::ZeroSized`] for zero-sized types and with
  /// [`AllocError::Misaligned`] when the block cannot hold a `T`; in the latter case
  /// the block is released before returning.
  fn create<T>(&mut self, value: T) -> AllocResult<Typed<T, Self::Handle>> {
    let size = mem::size_of::<T>();
    let Some(mut handle) = self.allocate(size)? else {
      return Err(AllocError::ZeroSized);
    };

    let ptr = self.bytes_mut(&mut handle).as_mut_ptr();
    let align = mem::align_of::<T>();
    if !is_aligned(ptr as usize, align).unwrap_or(false) {
      self.free(handle, size);
      return Err(AllocError::Misaligned {
        addr: ptr as usize,
        align,
      });
    }

    // SAFETY: `ptr` is aligned for `T` and starts `size_of::<T>()` writable bytes.
    unsafe { ptr.cast::<T>().write(value) };

    Ok(Typed {
      handle,
      marker: PhantomData,
    })
  }

  fn get<'a, T>(&'a self, typed: &'a Typed<T, Self::Handle>) -> &'a T {
    let bytes = self.bytes(&typed.handle);
    debug_assert_eq!(bytes.len(), mem::size_of::<T>());
    // SAFETY: `create` wrote an aligned `T` here and the block stays put while the
    // handle is live; `bytes` rejects handles this allocator no longer backs.
    unsafe { &*bytes.as_ptr().cast::<T>() }
  }

  fn get_mut<'a, T>(&'a mut self, typed: &'a mut Typed<T, Self::Handle>) -> &'a mut T {
    let bytes = self.bytes_mut(&mut typed.handle);
    debug_assert_eq!(bytes.len(), mem::size_of::<T>());
    // SAFETY: as in `get`, with the allocator borrowed mutably.
    unsafe { &mut *bytes.as_mut_ptr().cast::<T>() }
  }

  /// Moves the value out and frees its block.
  fn take<T>(&mut self, mut typed: Typed<T, Self::Handle>) -> T {
    let ptr = self.bytes_mut(&mut typed.handle).as_ptr();
    // SAFETY: the block holds an initialised `T` that is read exactly once, since
    // `typed` is consumed and its block released right after.
    let value = unsafe { ptr.cast::<T>().read() };
    self.free(typed.handle, mem::size_of::<T>());
    value
  }

  /// Drops the value and frees its block.
  fn destroy<T>(&mut self, typed: Typed<T, Self::Handle>) {
    drop(self.take(typed));
  }
}

impl<A: Allocator + ?Sized> TypedAlloc for A {}
