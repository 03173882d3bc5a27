//! Packed key encoding shared by every slot in a base table.
//!
//! A slot's key occupies a single `u64`. The top bit is the migration mark
//! (orthogonal to the key's logical state); the low 63 bits encode the key
//! itself, with `0` reserved for "empty" and all-ones reserved for
//! "deleted" (the tombstone sentinel). This mirrors growt's
//! `markable_element`, whose 128-bit combined key+data word has no stable
//! equivalent on this platform; see [`crate::slot`] for how the value
//! lane is kept consistent without one.

use core::fmt;

pub(crate) const MARK_BIT: u64 = 1 << 63;
pub(crate) const KEY_MASK: u64 = MARK_BIT - 1;
const EMPTY_KEY: u64 = 0;
const DELETED_KEY: u64 = KEY_MASK;

/// The smallest valid user key.
pub const MIN_KEY: u64 = 1;

/// The largest valid user key.
pub const MAX_KEY: u64 = KEY_MASK - 1;

/// Returns `true` if `key` may be stored as a live entry.
///
/// `0` and `u64::MAX >> 1` are reserved sentinels, and the top bit is
/// reserved for the migration mark.
#[inline]
pub const fn is_valid_user_key(key: u64) -> bool {
  key != EMPTY_KEY && key != DELETED_KEY && key & MARK_BIT == 0
}

/// A slot's key word, decoded.
#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) struct PackedKey(u64);

impl PackedKey {
  #[inline]
  pub(crate) const fn empty() -> Self {
    Self(EMPTY_KEY)
  }

  #[inline]
  pub(crate) const fn deleted() -> Self {
    Self(DELETED_KEY)
  }

  #[inline]
  pub(crate) const fn live(key: u64) -> Self {
    debug_assert!(is_valid_user_key(key));
    Self(key)
  }

  #[inline]
  pub(crate) const fn bits(self) -> u64 {
    self.0
  }

  #[inline]
  pub(crate) const fn from_bits(bits: u64) -> Self {
    Self(bits)
  }

  #[inline]
  pub(crate) const fn marked(self) -> Self {
    Self(self.0 | MARK_BIT)
  }

  #[inline]
  pub(crate) const fn is_marked(self) -> bool {
    self.0 & MARK_BIT != 0
  }

  #[inline]
  pub(crate) const fn key_bits(self) -> u64 {
    self.0 & KEY_MASK
  }

  #[inline]
  pub(crate) const fn is_empty(self) -> bool {
    self.key_bits() == EMPTY_KEY
  }

  #[inline]
  pub(crate) const fn is_deleted(self) -> bool {
    self.key_bits() == DELETED_KEY
  }

  #[inline]
  pub(crate) const fn is_live(self) -> bool {
    !self.is_empty() && !self.is_deleted()
  }

  #[inline]
  pub(crate) const fn compare_key(self, key: u64) -> bool {
    self.key_bits() == key
  }
}

impl fmt::Debug for PackedKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("PackedKey")
      .field("key", &self.key_bits())
      .field("marked", &self.is_marked())
      .finish()
  }
}

/// The default, fixed-seed key hash used to spread keys across slots.
///
/// Choice of hash function is out of scope for this crate (a caller with
/// pathological key distributions should pre-mix their keys); this is the
/// `SplitMix64` finalizer, used only to decorrelate sequential keys from
/// the mapping policy.
#[inline]
pub(crate) const fn mix(key: u64) -> u64 {
  let mut z = key.wrapping_add(0x9E37_79B9_7F4A_7C15);
  z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
  z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
  z ^ (z >> 31)
}
