//! A single, fixed-capacity generation of the growable table.
//!
//! `BaseTable` implements open addressing over an array of [`Slot`]s. It
//! knows nothing about growth: once full, its operations report
//! [`OpCode::UnsuccessFull`] and the caller (a [`Handle`]) is responsible
//! for triggering a migration to a larger generation. This mirrors growt's
//! `base_circular`/`base_linear` split between the addressing scheme and
//! the migration-aware wrapper around it.
//!
//! [`Handle`]: crate::handle::Handle

use crate::array::Array;
use crate::key::is_valid_user_key;
use crate::key::mix;
use crate::params::Capacity;
use crate::params::Mapping;
use crate::params::Params;
use crate::params::Probing;
use crate::slot::Slot;
use crate::slot::UpdateOutcome;
use crate::sync::atomic::AtomicUsize;
use crate::sync::atomic::Ordering;
use crate::word::AtomicUpdate;
use crate::word::Word;
use crate::code::OpCode;

/// The result of a key lookup.
pub(crate) enum Lookup<V> {
  Found(V),
  NotFound,
  Invalid,
}

pub(crate) struct BaseTable<V, P>
where
  V: Word,
  P: Params,
{
  /// Addressable (home-index) capacity; always a power of two.
  capacity: usize,
  /// Total slot count, including any overflow tail.
  alloc_len: usize,
  bitmask: usize,
  home_shift: u32,
  slots: Array<Slot<V>>,
  /// Next unclaimed index into the migration sweep; shared by every
  /// helper migrating this generation away.
  pub(crate) migration_cursor: AtomicUsize,
  /// Monotonically increasing generation id.
  pub(crate) version: u64,
  marker: core::marker::PhantomData<P>,
}

impl<V, P> BaseTable<V, P>
where
  V: Word,
  P: Params,
{
  pub(crate) fn new(capacity: Capacity, version: u64) -> Self {
    let capacity: usize = capacity.as_usize();
    let overflow: usize = match P::PROBING {
      Probing::Cyclic => 0,
      Probing::LinearWithOverflow => crate::params::OVERFLOW_TAIL,
    };
    let alloc_len: usize = capacity + overflow;

    Self {
      capacity,
      alloc_len,
      bitmask: capacity - 1,
      home_shift: 64 - capacity.trailing_zeros(),
      slots: Array::new(alloc_len, |_| Slot::new_empty()),
      migration_cursor: AtomicUsize::new(0),
      version,
      marker: core::marker::PhantomData,
    }
  }

  #[inline]
  pub(crate) const fn cap(&self) -> usize {
    self.capacity
  }

  #[inline]
  pub(crate) const fn alloc_len(&self) -> usize {
    self.alloc_len
  }

  #[inline]
  pub(crate) fn slot_at(&self, index: usize) -> &Slot<V> {
    // SAFETY: every caller derives `index` from `home_index`/`next_index`,
    // both of which stay within `0..self.alloc_len`.
    unsafe { self.slots.get_unchecked(index) }
  }

  #[inline]
  fn home_index(&self, key: u64) -> usize {
    let hash: u64 = mix(key);
    match P::MAPPING {
      Mapping::LowBits => (hash as usize) & self.bitmask,
      Mapping::HighBits => (hash >> self.home_shift) as usize,
    }
  }

  #[inline]
  fn next_index(&self, index: usize) -> Option<usize> {
    match P::PROBING {
      Probing::Cyclic => Some((index + 1) & self.bitmask),
      Probing::LinearWithOverflow => {
        let next: usize = index + 1;
        if next < self.alloc_len {
          Some(next)
        } else {
          None
        }
      }
    }
  }

  /// Iterates over a key's full probe sequence, bounded to one pass over
  /// the table so a pathologically full table can never spin forever.
  fn probe_limit(&self) -> usize {
    self.alloc_len
  }

  pub(crate) fn insert(&self, key: u64, value: V) -> OpCode {
    debug_assert!(is_valid_user_key(key));

    let mut index: usize = self.home_index(key);
    let mut steps: usize = 0;

    loop {
      let slot = self.slot_at(index);
      let snapshot = slot.load(Ordering::Acquire);

      if snapshot.key.is_marked() {
        return OpCode::UnsuccessInvalid;
      }

      if snapshot.key.is_live() {
        if snapshot.key.compare_key(key) {
          return OpCode::UnsuccessAlready;
        }
      } else if snapshot.key.is_deleted() {
        if !P::GROWTH_SUPPORTED {
          match slot.try_reclaim(key, value) {
            Ok(()) => return OpCode::SuccessIn,
            Err(found) => {
              if found.key.is_marked() {
                return OpCode::UnsuccessInvalid;
              }
              continue;
            }
          }
        }
      } else {
        match slot.try_claim(key, value) {
          Ok(()) => return OpCode::SuccessIn,
          Err(found) => {
            if found.key.is_marked() {
              return OpCode::UnsuccessInvalid;
            }
            continue;
          }
        }
      }

      steps += 1;
      index = match self.next_index(index) {
        Some(next) => next,
        None => return OpCode::UnsuccessFull,
      };

      if steps >= self.probe_limit() {
        return OpCode::UnsuccessFull;
      }
    }
  }

  pub(crate) fn find(&self, key: u64) -> Lookup<V> {
    let mut index: usize = self.home_index(key);
    let mut steps: usize = 0;

    loop {
      let slot = self.slot_at(index);
      let snapshot = slot.load(Ordering::Acquire);

      if snapshot.key.is_marked() {
        return Lookup::Invalid;
      }

      if snapshot.key.is_live() && snapshot.key.compare_key(key) {
        return Lookup::Found(slot.value(Ordering::Acquire));
      }

      if snapshot.key.is_empty() {
        return Lookup::NotFound;
      }

      steps += 1;
      index = match self.next_index(index) {
        Some(next) => next,
        None => return Lookup::NotFound,
      };

      if steps >= self.probe_limit() {
        return Lookup::NotFound;
      }
    }
  }

  pub(crate) fn update<F>(&self, key: u64, f: F) -> (OpCode, Option<V>)
  where
    F: Fn(V) -> V,
  {
    let mut index: usize = self.home_index(key);
    let mut steps: usize = 0;

    loop {
      let slot = self.slot_at(index);
      let snapshot = slot.load(Ordering::Acquire);

      if snapshot.key.is_marked() {
        return (OpCode::UnsuccessInvalid, None);
      }

      if snapshot.key.is_live() && snapshot.key.compare_key(key) {
        return match slot.atomic_update(f) {
          UpdateOutcome::Updated(value) => (OpCode::SuccessUp, Some(value)),
          UpdateOutcome::Invalid => (OpCode::UnsuccessInvalid, None),
        };
      }

      if snapshot.key.is_empty() {
        return (OpCode::UnsuccessNotFound, None);
      }

      steps += 1;
      index = match self.next_index(index) {
        Some(next) => next,
        None => return (OpCode::UnsuccessNotFound, None),
      };

      if steps >= self.probe_limit() {
        return (OpCode::UnsuccessNotFound, None);
      }
    }
  }

  pub(crate) fn update_atomic<F>(&self, key: u64, f: &F) -> (OpCode, Option<V>)
  where
    F: AtomicUpdate<V>,
  {
    let mut index: usize = self.home_index(key);
    let mut steps: usize = 0;

    loop {
      let slot = self.slot_at(index);
      let snapshot = slot.load(Ordering::Acquire);

      if snapshot.key.is_marked() {
        return (OpCode::UnsuccessInvalid, None);
      }

      if snapshot.key.is_live() && snapshot.key.compare_key(key) {
        return match slot.atomic_update_fast(f) {
          UpdateOutcome::Updated(value) => (OpCode::SuccessUp, Some(value)),
          UpdateOutcome::Invalid => (OpCode::UnsuccessInvalid, None),
        };
      }

      if snapshot.key.is_empty() {
        return (OpCode::UnsuccessNotFound, None);
      }

      steps += 1;
      index = match self.next_index(index) {
        Some(next) => next,
        None => return (OpCode::UnsuccessNotFound, None),
      };

      if steps >= self.probe_limit() {
        return (OpCode::UnsuccessNotFound, None);
      }
    }
  }

  pub(crate) fn insert_or_update<F>(&self, key: u64, value: V, f: F) -> (OpCode, Option<V>)
  where
    F: Fn(V) -> V,
  {
    debug_assert!(is_valid_user_key(key));

    let mut index: usize = self.home_index(key);
    let mut steps: usize = 0;

    loop {
      let slot = self.slot_at(index);
      let snapshot = slot.load(Ordering::Acquire);

      if snapshot.key.is_marked() {
        return (OpCode::UnsuccessInvalid, None);
      }

      if snapshot.key.is_live() {
        if snapshot.key.compare_key(key) {
          return match slot.atomic_update(f) {
            UpdateOutcome::Updated(v) => (OpCode::SuccessUp, Some(v)),
            UpdateOutcome::Invalid => (OpCode::UnsuccessInvalid, None),
          };
        }
      } else if snapshot.key.is_deleted() {
        if !P::GROWTH_SUPPORTED {
          match slot.try_reclaim(key, value) {
            Ok(()) => return (OpCode::SuccessIn, Some(value)),
            Err(found) => {
              if found.key.is_marked() {
                return (OpCode::UnsuccessInvalid, None);
              }
              continue;
            }
          }
        }
      } else {
        match slot.try_claim(key, value) {
          Ok(()) => return (OpCode::SuccessIn, Some(value)),
          Err(found) => {
            if found.key.is_marked() {
              return (OpCode::UnsuccessInvalid, None);
            }
            continue;
          }
        }
      }

      steps += 1;
      index = match self.next_index(index) {
        Some(next) => next,
        None => return (OpCode::UnsuccessFull, None),
      };

      if steps >= self.probe_limit() {
        return (OpCode::UnsuccessFull, None);
      }
    }
  }

  pub(crate) fn erase(&self, key: u64) -> OpCode {
    if !P::DELETIONS_SUPPORTED {
      return OpCode::UnsuccessNotFound;
    }

    let mut index: usize = self.home_index(key);
    let mut steps: usize = 0;

    loop {
      let slot = self.slot_at(index);
      let snapshot = slot.load(Ordering::Acquire);

      if snapshot.key.is_marked() {
        return OpCode::UnsuccessInvalid;
      }

      if snapshot.key.is_live() && snapshot.key.compare_key(key) {
        return match slot.atomic_delete(snapshot.key) {
          Ok(_) => OpCode::SuccessDel,
          Err(found) if found.key.is_marked() => OpCode::UnsuccessInvalid,
          Err(_) => OpCode::UnsuccessNotFound,
        };
      }

      if snapshot.key.is_empty() {
        return OpCode::UnsuccessNotFound;
      }

      steps += 1;
      index = match self.next_index(index) {
        Some(next) => next,
        None => return OpCode::UnsuccessNotFound,
      };

      if steps >= self.probe_limit() {
        return OpCode::UnsuccessNotFound;
      }
    }
  }

  /// As [`BaseTable::erase`], but only deletes if `pred(current_value)` is
  /// `true`. If the predicate rejects the value, reports
  /// [`OpCode::UnsuccessNotFound`]: from the caller's perspective, no
  /// entry matching their deletion condition exists.
  pub(crate) fn erase_if<F>(&self, key: u64, pred: F) -> OpCode
  where
    F: Fn(&V) -> bool,
  {
    if !P::DELETIONS_SUPPORTED {
      return OpCode::UnsuccessNotFound;
    }

    let mut index: usize = self.home_index(key);
    let mut steps: usize = 0;

    loop {
      let slot = self.slot_at(index);
      let snapshot = slot.load(Ordering::Acquire);

      if snapshot.key.is_marked() {
        return OpCode::UnsuccessInvalid;
      }

      if snapshot.key.is_live() && snapshot.key.compare_key(key) {
        let value: V = slot.value(Ordering::Acquire);

        if !pred(&value) {
          return OpCode::UnsuccessNotFound;
        }

        return match slot.atomic_delete(snapshot.key) {
          Ok(_) => OpCode::SuccessDel,
          Err(found) if found.key.is_marked() => OpCode::UnsuccessInvalid,
          Err(_) => OpCode::UnsuccessNotFound,
        };
      }

      if snapshot.key.is_empty() {
        return OpCode::UnsuccessNotFound;
      }

      steps += 1;
      index = match self.next_index(index) {
        Some(next) => next,
        None => return OpCode::UnsuccessNotFound,
      };

      if steps >= self.probe_limit() {
        return OpCode::UnsuccessNotFound;
      }
    }
  }

  /// Iterates live `(key, value)` pairs. Weak: entries inserted or removed
  /// during iteration may or may not be observed.
  pub(crate) fn iter(&self) -> impl Iterator<Item = (u64, V)> + '_ {
    self.slots.as_slice().iter().filter_map(|slot| {
      let snapshot = slot.load(Ordering::Acquire);
      (!snapshot.key.is_marked() && snapshot.key.is_live()).then(|| (snapshot.key.key_bits(), slot.value(Ordering::Acquire)))
    })
  }

  /// Claims the next unswept block of source indices for migration. Covers
  /// the full allocation (including any [`Probing::LinearWithOverflow`]
  /// tail) so that a live key which overflowed past the addressable
  /// capacity is not stranded in the generation being abandoned.
  pub(crate) fn take_migration_block(&self, block_size: usize) -> Option<(usize, usize)> {
    let start: usize = self.migration_cursor.fetch_add(block_size, Ordering::AcqRel);

    if start >= self.alloc_len {
      None
    } else {
      Some((start, (start + block_size).min(self.alloc_len)))
    }
  }
}
