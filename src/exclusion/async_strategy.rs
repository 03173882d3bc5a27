//! Lock-free, epoch-protected exclusion (spec.md §4.4.a).
//!
//! Grounded on the upstream `EStratAsync` class. The original guards its
//! `g_table_r`/`g_table_w` `shared_ptr`s with a plain `std::mutex`; growth is
//! rare enough that a lock around the *metadata* is not a correctness or
//! throughput concern, only the per-operation table access needs to be
//! lock-free, which is
//! what [`crate::reclaim`]'s epoch-protected pointer provides for
//! [`Exclusion::acquire`]. This crate follows the same split: a
//! [`std::sync::Mutex`] serializes the rare "allocate/publish/retire a
//! generation" bookkeeping, while reads go through [`crate::reclaim::Atomic`]
//! unconditionally.

use std::sync::Arc;
use std::sync::Mutex;

use crate::base::BaseTable;
use crate::exclusion::AcquireResult;
use crate::exclusion::Exclusion;
use crate::exclusion::Protected;
use crate::exclusion::ProtectedKind;
use crate::migration;
use crate::params::Capacity;
use crate::params::Params;
use crate::reclaim::Atomic;
use crate::reclaim::Guard;
use crate::sync::atomic::AtomicU64;
use crate::sync::atomic::AtomicUsize;
use crate::sync::atomic::Ordering;
use crate::word::Word;

struct GrowthState<V, P>
where
  V: Word,
  P: Params,
{
  /// `Some` for exactly as long as a grow is in progress; doubles as the
  /// "are we growing" flag (spec.md §3: `write = read+1` iff migrating).
  successor: Option<Arc<BaseTable<V, P>>>,
}

pub struct AsyncExclusion<V, P>
where
  V: Word,
  P: Params,
{
  current: Atomic<BaseTable<V, P>>,
  current_version: AtomicU64,
  growth: Mutex<GrowthState<V, P>>,
  /// Threads presently inside [`Exclusion::migrate_once`]; `finish_grow`
  /// waits for this to reach zero before swapping (spec.md §9's
  /// conservative resolution of the `help_grow`/counted-pointer race).
  helpers: AtomicUsize,
}

impl<V, P> AsyncExclusion<V, P>
where
  V: Word,
  P: Params,
{
  fn grow_target_capacity(&self, live_estimate: usize, current_capacity: usize) -> Capacity {
    let needed: Capacity = Capacity::new((live_estimate as f64 / f64::from(P::MAX_FILL_FACTOR)).ceil() as usize);

    if needed.as_usize() > current_capacity {
      Capacity::new(current_capacity).scaled(2)
    } else {
      // Tombstone-heavy table: grow to the same capacity to flush deletes.
      Capacity::new(current_capacity)
    }
  }
}

impl<V, P> Exclusion<V, P> for AsyncExclusion<V, P>
where
  V: Word,
  P: Params,
{
  type Token = ();

  fn new(capacity: Capacity) -> Self {
    let current: Atomic<BaseTable<V, P>> = Atomic::null();
    current.write(Ordering::Release, || BaseTable::new(capacity, 0));

    Self {
      current,
      current_version: AtomicU64::new(0),
      growth: Mutex::new(GrowthState { successor: None }),
      helpers: AtomicUsize::new(0),
    }
  }

  #[inline]
  fn register(&self) -> Self::Token {}

  #[inline]
  fn deregister(&self, _token: &Self::Token) {}

  fn acquire(&self, _token: &Self::Token) -> AcquireResult<V, P> {
    let guard: Guard = Guard::new();
    let shared = self.current.load(Ordering::Acquire, &guard);

    // SAFETY: `current` is written once in `new` and only ever replaced
    // (never evicted to null) by `finish_grow`, so it is never null.
    let table_ref: &BaseTable<V, P> = shared.as_ref().expect("current generation is always initialized");

    AcquireResult::Ready(Protected {
      table: core::ptr::NonNull::from(table_ref),
      kind: ProtectedKind::Async { _guard: guard },
    })
  }

  #[inline]
  fn current_version(&self) -> u64 {
    self.current_version.load(Ordering::Acquire)
  }

  fn capacity_hint(&self) -> usize {
    let guard: Guard = Guard::new();
    self
      .current
      .load(Ordering::Acquire, &guard)
      .as_ref()
      .expect("current generation is always initialized")
      .cap()
  }

  fn begin_grow(&self, observed_version: u64, live_estimate: usize) -> bool {
    let mut state = self.growth.lock().unwrap_or_else(|poison| poison.into_inner());

    if state.successor.is_some() {
      return false;
    }

    if self.current_version.load(Ordering::Acquire) != observed_version {
      // Our view is already stale; somebody else's grow already landed.
      return false;
    }

    let guard: Guard = Guard::new();
    let current_capacity: usize = self
      .current
      .load(Ordering::Acquire, &guard)
      .as_ref()
      .expect("current generation is always initialized")
      .cap();

    let capacity: Capacity = self.grow_target_capacity(live_estimate, current_capacity);
    let successor: BaseTable<V, P> = BaseTable::new(capacity, observed_version + 1);

    state.successor = Some(Arc::new(successor));
    true
  }

  fn migrate_once(&self) -> u64 {
    self.helpers.fetch_add(1, Ordering::AcqRel);

    let successor: Option<Arc<BaseTable<V, P>>> = {
      let state = self.growth.lock().unwrap_or_else(|poison| poison.into_inner());
      state.successor.clone()
    };

    let Some(successor) = successor else {
      self.helpers.fetch_sub(1, Ordering::Release);
      return self.current_version.load(Ordering::Acquire);
    };

    let guard: Guard = Guard::new();
    let current_ref: &BaseTable<V, P> = self
      .current
      .load(Ordering::Acquire, &guard)
      .as_ref()
      .expect("current generation is always initialized");

    if current_ref.version < successor.version {
      migration::run(current_ref, &successor);
    }

    let version: u64 = successor.version;

    // Drop our clone (and the epoch guard) before announcing we're no
    // longer a helper: `finish_grow` treats `helpers == 0` as its signal
    // that it alone holds the last reference to `successor`, so the clone
    // must already be gone by the time the counter reaches zero.
    drop(successor);
    drop(guard);
    self.helpers.fetch_sub(1, Ordering::Release);
    version
  }

  fn finish_grow(&self, observed_version: u64) {
    // Spec.md §9: helpers must drain before the current-pointer swap. This
    // is only a cheap fast-path wait: a helper can still observe `helpers
    // == 0` here and then, after this loop exits but before the lock below
    // is taken, bump the counter again and clone `state.successor` for
    // itself. The `Arc::try_unwrap` loop further down is what actually
    // guarantees no outstanding clone remains before the swap.
    while self.helpers.load(Ordering::Acquire) > 0 {
      core::hint::spin_loop();
    }

    let mut successor: Arc<BaseTable<V, P>> = {
      let mut state = self.growth.lock().unwrap_or_else(|poison| poison.into_inner());

      if self.current_version.load(Ordering::Acquire) != observed_version {
        return;
      }

      match state.successor.take() {
        Some(successor) => successor,
        None => return,
      }
    };

    // `state.successor` is already cleared under the lock above, so no new
    // `migrate_once` call can clone this generation from here on; a helper
    // that raced us and cloned it beforehand still holds its reference
    // until it finishes migrating and drops it (see `migrate_once`), so
    // retry until that drains rather than assuming it already has.
    let owned: BaseTable<V, P> = loop {
      match Arc::try_unwrap(successor) {
        Ok(owned) => break owned,
        Err(still_shared) => {
          successor = still_shared;
          core::hint::spin_loop();
        }
      }
    };

    let new_version: u64 = owned.version;

    self.current.replace(Ordering::Release, move || owned);
    self.current_version.store(new_version, Ordering::Release);
  }
}
