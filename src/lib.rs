//! Pooled, segregated and scoped allocators over a pluggable system heap.
//!
//! The allocators live in `salloc-alloc`; this crate gathers them behind one prelude
//! and adds [`sync::Locked`] for callers that share an instance between threads.

pub mod sync;

pub mod prelude {
  pub use salloc_alloc::prelude::*;
  pub use salloc_sys::prelude::*;

  pub use crate::sync::Locked;
}
