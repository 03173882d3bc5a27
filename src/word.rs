//! Values stored inline in a slot must fit in a single 64-bit word.

use crate::sync::atomic::AtomicU64;
use crate::sync::atomic::Ordering;

/// A value type that can be packed into the 64-bit value lane of a slot.
///
/// This is the Rust encoding of growt's `Data` type parameter, which the
/// original restricts (via its `single_word_slot`) to whatever fits
/// alongside the key in one machine word.
pub trait Word: Copy + Send + Sync + 'static {
  /// Packs `self` into its bit representation.
  fn to_bits(self) -> u64;

  /// Unpacks a value from its bit representation.
  fn from_bits(bits: u64) -> Self;
}

macro_rules! impl_word_uint {
  ($($ty:ty),* $(,)?) => {
    $(
      impl Word for $ty {
        #[inline]
        fn to_bits(self) -> u64 {
          self as u64
        }

        #[inline]
        fn from_bits(bits: u64) -> Self {
          bits as Self
        }
      }
    )*
  };
}

impl_word_uint!(u8, u16, u32, u64, usize);

impl Word for bool {
  #[inline]
  fn to_bits(self) -> u64 {
    self as u64
  }

  #[inline]
  fn from_bits(bits: u64) -> Self {
    bits != 0
  }
}

/// A value-update functor exposing a lock-free fetch-and-modify fast path.
///
/// Implementing this trait unlocks [`GrowTable::update_atomic`][u]'s atomic
/// fast path (spec: the slot applies the update with a single atomic RMW on
/// the value lane, rather than a compute-then-CAS loop). This is the Rust
/// encoding of growt's SFINAE-detected `.atomic()` member on update
/// functors: stable Rust has no specialization, so the fast path is a
/// distinct trait and a distinct [`GrowTable`][g] method rather than an
/// automatically-detected overload.
///
/// [u]: crate::growable::GrowTable::update_atomic
/// [g]: crate::growable::GrowTable
pub trait AtomicUpdate<V: Word> {
  /// Computes the new value from the old one. Used as the fallback when a
  /// slot's key word is already marked and the atomic fast path must be
  /// abandoned in favor of a re-validated compute-then-CAS.
  fn apply(&self, old: V) -> V;

  /// Applies the update directly to the packed value word using an atomic
  /// read-modify-write, returning the new value.
  fn atomic_apply(&self, word: &AtomicU64, order: Ordering) -> V;
}

/// A ready-made [`AtomicUpdate`] functor: `value + n`, applied with
/// `fetch_add`.
#[derive(Clone, Copy, Debug)]
pub struct Increment(pub u64);

impl AtomicUpdate<u64> for Increment {
  #[inline]
  fn apply(&self, old: u64) -> u64 {
    old.wrapping_add(self.0)
  }

  #[inline]
  fn atomic_apply(&self, word: &AtomicU64, order: Ordering) -> u64 {
    word.fetch_add(self.0, order).wrapping_add(self.0)
  }
}

/// A ready-made [`AtomicUpdate`] functor: unconditionally set the value to
/// `n`, applied with `swap`.
#[derive(Clone, Copy, Debug)]
pub struct Assign(pub u64);

impl AtomicUpdate<u64> for Assign {
  #[inline]
  fn apply(&self, _old: u64) -> u64 {
    self.0
  }

  #[inline]
  fn atomic_apply(&self, word: &AtomicU64, order: Ordering) -> u64 {
    word.swap(self.0, order);
    self.0
  }
}
