//! Futex-equivalent counting-wait primitive used by the pool worker
//! strategy to park threads between migrations.
//!
//! Grounded on spec.md §9 ("Counting-wait primitive") and the upstream
//! `counting_wait` class's `wait_if`/`inc_if`/`wake` trio. `ptab`'s own
//! dependency set reaches for `std::sync::{Mutex,
//! Condvar}` whenever it needs anything beyond lock-free atomics (it has no
//! precedent for parking threads at all, being lock-free throughout), so
//! this stays on `std` rather than pulling in a dedicated futex crate.

use std::sync::Condvar;
use std::sync::Mutex;

use crate::sync::atomic::AtomicU32;
use crate::sync::atomic::Ordering;

/// A generation counter threads can block on until it changes.
pub(crate) struct CountingWait {
  generation: AtomicU32,
  lock: Mutex<()>,
  condvar: Condvar,
}

impl Default for CountingWait {
  fn default() -> Self {
    Self {
      generation: AtomicU32::new(0),
      lock: Mutex::new(()),
      condvar: Condvar::new(),
    }
  }
}

impl CountingWait {
  /// Returns the current generation.
  #[inline]
  pub(crate) fn value(&self) -> u32 {
    self.generation.load(Ordering::Acquire)
  }

  /// Blocks the calling thread until the generation no longer equals
  /// `expected`.
  pub(crate) fn wait_if(&self, expected: u32) {
    if self.generation.load(Ordering::Acquire) != expected {
      return;
    }

    let guard = self.lock.lock().unwrap_or_else(|poison| poison.into_inner());

    let _unused = self
      .condvar
      .wait_while(guard, |()| self.generation.load(Ordering::Acquire) == expected)
      .unwrap_or_else(|poison| poison.into_inner());
  }

  /// Advances the generation if it still equals `expected`. Returns `true`
  /// if this call performed the advance (spec: used to decide whether the
  /// caller, not a racing peer, should also call [`wake`](Self::wake)).
  pub(crate) fn inc_if(&self, expected: u32) -> bool {
    let _guard = self.lock.lock().unwrap_or_else(|poison| poison.into_inner());

    self
      .generation
      .compare_exchange(expected, expected.wrapping_add(1), Ordering::AcqRel, Ordering::Acquire)
      .is_ok()
  }

  /// Wakes every thread parked in [`wait_if`](Self::wait_if).
  pub(crate) fn wake(&self) {
    let _guard = self.lock.lock().unwrap_or_else(|poison| poison.into_inner());
    self.condvar.notify_all();
  }
}
