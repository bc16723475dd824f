//! Index-linked LIFO free lists over tagged slots.
//!
//! A slot is either [`Slot::Occupied`] (owned by a caller) or [`Slot::Free`] holding
//! the link to the next free slot. Links are `(chunk, slot)` pairs so a single list can
//! thread through every chunk of a size class.

use getset::CopyGetters;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, CopyGetters)]
pub struct SlotRef {
  #[getset(get_copy = "pub")]
  chunk: u32,
  #[getset(get_copy = "pub")]
  slot: u32,
}

impl SlotRef {
  pub const fn new(chunk: u32, slot: u32) -> Self {
    Self { chunk, slot }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
  Occupied,
  Free(Option<SlotRef>),
}

impl Slot {
  pub const fn is_free(&self) -> bool {
    matches!(self, Slot::Free(_))
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ListError {
  #[error("slot {0:?} is already free")]
  AlreadyFree(SlotRef),
}

pub type ListResult<T> = Result<T, ListError>;

/// Storage that owns the slots a [`FreeList`] threads through.
pub trait HasSlots {
  fn slot(&self, at: SlotRef) -> &Slot;
  fn slot_mut(&mut self, at: SlotRef) -> &mut Slot;
}

#[derive(Debug, Default, CopyGetters)]
pub struct FreeList {
  #[getset(get_copy = "pub")]
  head: Option<SlotRef>,
  #[getset(get_copy = "pub")]
  len: usize,
}

impl FreeList {
  pub const fn new() -> Self {
    Self { head: None, len: 0 }
  }

  pub fn is_empty(&self) -> bool {
    self.head.is_none()
  }

  /// Links slots `0..capacity` of `chunk` in ascending order in front of the current
  /// head, so the lowest slot is handed out first.
  pub fn thread<S>(&mut self, store: &mut S, chunk: u32, capacity: u32)
  where
    S: HasSlots,
  {
    let mut next = self.head;
    for slot in (0..capacity).rev() {
      let at = SlotRef::new(chunk, slot);
      *store.slot_mut(at) = Slot::Free(next);
      next = Some(at);
    }

    self.head = next;
    self.len += capacity as usize;
  }

  pub fn pop<S>(&mut self, store: &mut S) -> Option<SlotRef>
  where
    S: HasSlots,
  {
    let at = self.head?;
    let slot = store.slot_mut(at);
    let Slot::Free(next) = *slot else {
      unreachable!("free list head {at:?} is occupied");
    };

    *slot = Slot::Occupied;
    self.head = next;
    self.len -= 1;
    Some(at)
  }

  pub fn push<S>(&mut self, store: &mut S, at: SlotRef) -> ListResult<()>
  where
    S: HasSlots,
  {
    let slot = store.slot_mut(at);
    if slot.is_free() {
      return Err(ListError::AlreadyFree(at));
    }

    *slot = Slot::Free(self.head);
    self.head = Some(at);
    self.len += 1;
    Ok(())
  }

  /// Forgets every link. The slots themselves are left to their owner.
  pub fn clear(&mut self) {
    self.head = None;
    self.len = 0;
  }

  pub fn iter<'list, S>(&self, store: &'list S) -> FreeIter<'list, S>
  where
    S: HasSlots,
  {
    FreeIter {
      next: self.head,
      store,
    }
  }
}

pub struct FreeIter<'list, S>
where
  S: HasSlots,
{
  next: Option<SlotRef>,
  store: &'list S,
}

impl<S> Iterator for FreeIter<'_, S>
where
  S: HasSlots,
{
  type Item = SlotRef;

  fn next(&mut self) -> Option<Self::Item> {
    let current = self.next?;
    self.next = match self.store.slot(current) {
      Slot::Free(next) => *next,
      Slot::Occupied => None,
    };
    Some(current)
  }
}
