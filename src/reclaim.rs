//! Epoch-protected pointer to a [`BaseTable`] generation.
//!
//! Adapted from the teacher's `sdd`-backed `Atomic`/`Shared`/`Guard` trio
//! (originally wrapping an arbitrary entry type) to specifically manage
//! whole base-table generations for the async exclusion strategy.
//!
//! [`BaseTable`]: crate::base::BaseTable

use core::hint;
use core::sync::atomic::Ordering;

/// An atomic pointer to a `T`, reclaimed once no guard can still observe
/// the value it replaced.
#[repr(transparent)]
pub(crate) struct Atomic<T> {
  inner: sdd::AtomicOwned<T>,
}

impl<T> Atomic<T> {
  #[inline]
  pub(crate) const fn null() -> Self {
    Self {
      inner: sdd::AtomicOwned::null(),
    }
  }

  #[inline]
  pub(crate) fn load<'guard>(&self, order: Ordering, guard: &'guard Guard) -> Shared<'guard, T> {
    Shared {
      inner: self.inner.load(order, &guard.inner),
    }
  }

  /// Initializes and stores a value, asserting the pointer was previously
  /// empty. Used once, to publish a table's first generation.
  #[inline]
  pub(crate) fn write<F>(&self, order: Ordering, init: F)
  where
    F: FnOnce() -> T,
    T: 'static,
  {
    let value: sdd::Owned<T> = sdd::Owned::new_with(init);
    let old: (Option<sdd::Owned<T>>, sdd::Tag) = self.inner.swap((Some(value), sdd::Tag::None), order);

    debug_assert!(old.0.is_none(), "Atomic<T> is occupied!");
    debug_assert!(old.1 == sdd::Tag::None, "Atomic<T> is tagged!");

    // SAFETY: the slot is allocated empty, so `write` is only ever called
    // once against it before any `replace`.
    unsafe {
      hint::assert_unchecked(old.0.is_none());
      hint::assert_unchecked(old.1 == sdd::Tag::None);
    }
  }

  /// Replaces whatever value is currently stored with a freshly built one.
  /// The previous value is retired through the epoch GC: it is not
  /// actually freed until every guard that could have observed it has
  /// been dropped.
  #[inline]
  pub(crate) fn replace<F>(&self, order: Ordering, init: F)
  where
    F: FnOnce() -> T,
    T: 'static,
  {
    let value: sdd::Owned<T> = sdd::Owned::new_with(init);
    let _old: (Option<sdd::Owned<T>>, sdd::Tag) = self.inner.swap((Some(value), sdd::Tag::None), order);
  }
}

/// A pointer to a value protected by the epoch GC, valid for `'guard`.
#[repr(transparent)]
pub(crate) struct Shared<'guard, T> {
  inner: sdd::Ptr<'guard, T>,
}

impl<'guard, T> Shared<'guard, T> {
  /// Returns a shared reference to the value.
  ///
  /// Every [`Atomic<T>`] used by this crate is written exactly once before
  /// ever being loaded, so the pointer is never null in practice; callers
  /// still get `Option` back rather than an unchecked dereference.
  #[inline]
  pub(crate) const fn as_ref(&self) -> Option<&'guard T> {
    // SAFETY: the pointer originates from `Atomic::write`/`replace`, which
    // always store a fully initialized `T` through `sdd::Owned`, and carry
    // no tag bits.
    unsafe { self.inner.as_ref_unchecked() }
  }
}

/// A guard that keeps the current thread pinned to the epoch, protecting
/// whatever `Shared` values are loaded through it from reclamation.
#[repr(transparent)]
pub(crate) struct Guard {
  inner: sdd::Guard,
}

impl Guard {
  #[inline]
  pub(crate) fn new() -> Self {
    Self {
      inner: sdd::Guard::new(),
    }
  }
}

impl Default for Guard {
  #[inline]
  fn default() -> Self {
    Self::new()
  }
}
