//! The atomic slot state machine.
//!
//! A slot packs its key and mark bit into one `AtomicU64` (see
//! [`crate::key`]) and keeps its value in a second, independent
//! `AtomicU64`. growt's original `markable_element` CASes key and value
//! together as one 128-bit word, which has no stable equivalent on this
//! platform. Instead, every value mutation here re-validates the key word
//! afterwards: if the slot was marked for migration while the value CAS
//! was in flight, the mutation reports [`UpdateOutcome::Invalid`] and the
//! caller (a [`BaseTable`] operation) retries against the table's current
//! generation rather than trusting a value it wrote into a slot a
//! migration may already have copied away.
//!
//! [`BaseTable`]: crate::base::BaseTable

use core::marker::PhantomData;

use crate::key::PackedKey;
use crate::sync::atomic::AtomicU64;
use crate::sync::atomic::Ordering;
use crate::word::AtomicUpdate;
use crate::word::Word;

/// The logical state of a slot, decoded from its key word.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum SlotState {
  Empty,
  Live,
  Deleted,
  MarkedEmpty,
  MarkedLive,
  MarkedDeleted,
}

/// A snapshot of a slot's key word, taken by a single atomic load.
#[derive(Clone, Copy)]
pub(crate) struct SlotSnapshot {
  pub(crate) key: PackedKey,
}

impl SlotSnapshot {
  pub(crate) const fn state(self) -> SlotState {
    match (self.key.is_marked(), self.key.is_empty(), self.key.is_deleted()) {
      (false, true, _) => SlotState::Empty,
      (false, false, true) => SlotState::Deleted,
      (false, false, false) => SlotState::Live,
      (true, true, _) => SlotState::MarkedEmpty,
      (true, false, true) => SlotState::MarkedDeleted,
      (true, false, false) => SlotState::MarkedLive,
    }
  }
}

/// The outcome of a value-word mutation.
pub(crate) enum UpdateOutcome<V> {
  Updated(V),
  Invalid,
}

/// One table cell: a packed key word plus an independent value word.
#[repr(C)]
pub(crate) struct Slot<V> {
  key: AtomicU64,
  value: AtomicU64,
  marker: PhantomData<fn() -> V>,
}

impl<V: Word> Slot<V> {
  pub(crate) fn new_empty() -> Self {
    Self {
      key: AtomicU64::new(PackedKey::empty().bits()),
      value: AtomicU64::new(0),
      marker: PhantomData,
    }
  }

  #[inline]
  pub(crate) fn load(&self, order: Ordering) -> SlotSnapshot {
    SlotSnapshot {
      key: PackedKey::from_bits(self.key.load(order)),
    }
  }

  #[inline]
  pub(crate) fn value(&self, order: Ordering) -> V {
    V::from_bits(self.value.load(order))
  }

  #[inline]
  fn cas_key(&self, expected: PackedKey, desired: PackedKey, success: Ordering, failure: Ordering) -> Result<PackedKey, PackedKey> {
    self
      .key
      .compare_exchange(expected.bits(), desired.bits(), success, failure)
      .map(PackedKey::from_bits)
      .map_err(PackedKey::from_bits)
  }

  /// Attempts to claim an empty slot for `key`.
  ///
  /// The value word is written first so that a thread winning the key CAS
  /// (acquire-release) observes a fully-initialized value: the release on
  /// the key CAS orders the prior relaxed value store before it.
  pub(crate) fn try_claim(&self, key: u64, value: V) -> Result<(), SlotSnapshot> {
    self.value.store(value.to_bits(), Ordering::Relaxed);

    match self.cas_key(PackedKey::empty(), PackedKey::live(key), Ordering::AcqRel, Ordering::Acquire) {
      Ok(_) => Ok(()),
      Err(found) => Err(SlotSnapshot { key: found }),
    }
  }

  /// Reclaims a slot's key directly from `Deleted` to `Live`, for the
  /// non-growable, deletions-reuse-in-place configuration.
  pub(crate) fn try_reclaim(&self, key: u64, value: V) -> Result<(), SlotSnapshot> {
    self.value.store(value.to_bits(), Ordering::Relaxed);

    match self.cas_key(PackedKey::deleted(), PackedKey::live(key), Ordering::AcqRel, Ordering::Acquire) {
      Ok(_) => Ok(()),
      Err(found) => Err(SlotSnapshot { key: found }),
    }
  }

  /// Marks a slot (of any key state) as claimed by an in-progress
  /// migration, preventing any further value mutation from committing.
  pub(crate) fn atomic_mark(&self, expected: PackedKey) -> Result<PackedKey, PackedKey> {
    self.cas_key(expected, expected.marked(), Ordering::AcqRel, Ordering::Acquire)
  }

  /// Transitions a live slot straight to `Deleted`.
  pub(crate) fn atomic_delete(&self, expected: PackedKey) -> Result<PackedKey, PackedKey> {
    self.cas_key(expected, PackedKey::deleted(), Ordering::AcqRel, Ordering::Acquire)
  }

  /// Computes `f(old)`, writes it to the value word, then re-validates that
  /// the key word is still unmarked. See the module docs for why the
  /// re-validation is required in place of a single combined CAS.
  pub(crate) fn atomic_update<F>(&self, f: F) -> UpdateOutcome<V>
  where
    F: Fn(V) -> V,
  {
    loop {
      let old_bits: u64 = self.value.load(Ordering::Acquire);
      let old: V = V::from_bits(old_bits);
      let new: V = f(old);

      if self
        .value
        .compare_exchange_weak(old_bits, new.to_bits(), Ordering::AcqRel, Ordering::Acquire)
        .is_err()
      {
        continue; // lost the race on the value word; retry with a fresh read
      }

      return if self.load(Ordering::Acquire).key.is_marked() {
        UpdateOutcome::Invalid
      } else {
        UpdateOutcome::Updated(new)
      };
    }
  }

  /// As [`Slot::atomic_update`], but applies `f`'s atomic fast path instead
  /// of a compute-then-CAS loop.
  pub(crate) fn atomic_update_fast<F>(&self, f: &F) -> UpdateOutcome<V>
  where
    F: AtomicUpdate<V>,
  {
    let new: V = f.atomic_apply(&self.value, Ordering::AcqRel);

    if self.load(Ordering::Acquire).key.is_marked() {
      UpdateOutcome::Invalid
    } else {
      UpdateOutcome::Updated(new)
    }
  }

  /// Updates the value word without synchronization.
  ///
  /// # Safety
  ///
  /// The caller must have exclusive access to this slot (e.g. during
  /// migration, before the slot is published to other threads).
  pub(crate) unsafe fn non_atomic_update<F>(&self, f: F) -> V
  where
    F: FnOnce(V) -> V,
  {
    let old: V = V::from_bits(self.value.load(Ordering::Relaxed));
    let new: V = f(old);
    self.value.store(new.to_bits(), Ordering::Relaxed);
    new
  }
}
