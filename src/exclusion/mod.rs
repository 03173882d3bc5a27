//! Exclusion strategies: how a [`GrowTable`] protects a base-table
//! generation from destruction while operations are in flight on it, and
//! how the current/successor pointers are swapped once a migration
//! completes.
//!
//! Two implementations are provided, matching spec.md §4.4.a/§4.4.b:
//! [`async_strategy::AsyncExclusion`] (lock-free, epoch-protected, marker-
//! driven) and [`sync_strategy::SyncExclusion`] (staged, handle-flag-driven,
//! markless).
//!
//! [`GrowTable`]: crate::growable::GrowTable

pub(crate) mod async_strategy;
pub(crate) mod sync_strategy;

use core::ops::Deref;
use core::ptr::NonNull;

use crate::base::BaseTable;
use crate::params::Capacity;
use crate::params::Params;
use crate::sync::atomic::AtomicU32;
use crate::sync::atomic::Ordering;
use crate::word::Word;

/// A protected reference to one base-table generation.
///
/// Dereferences to the [`BaseTable`] itself. Dropping it releases whatever
/// the owning strategy needed held: for [`async_strategy`] this unpins the
/// epoch guard; for [`sync_strategy`] this clears the handle's `table_op`
/// registry flag.
pub(crate) struct Protected<V, P>
where
  V: Word,
  P: Params,
{
  table: NonNull<BaseTable<V, P>>,
  kind: ProtectedKind<V, P>,
}

enum ProtectedKind<V, P>
where
  V: Word,
  P: Params,
{
  Async {
    // Keeps the epoch pinned for as long as `Protected` is alive; never
    // read directly, only held.
    _guard: crate::reclaim::Guard,
  },
  Sync {
    // Keeps the generation's allocation alive for as long as `Protected`
    // is alive; never read directly, only held.
    _table: std::sync::Arc<BaseTable<V, P>>,
    flag: NonNull<AtomicU32>,
  },
}

impl<V, P> Protected<V, P>
where
  V: Word,
  P: Params,
{
  #[inline]
  fn table(&self) -> &BaseTable<V, P> {
    // SAFETY: see the constructors in `async_strategy`/`sync_strategy`;
    // async keeps the epoch guard (and therefore the generation) alive for
    // as long as this value exists; sync relies on the protocol invariant
    // that a set `table_op` flag blocks any swap of the generation it
    // points at.
    unsafe { self.table.as_ref() }
  }
}

impl<V, P> Deref for Protected<V, P>
where
  V: Word,
  P: Params,
{
  type Target = BaseTable<V, P>;

  #[inline]
  fn deref(&self) -> &BaseTable<V, P> {
    self.table()
  }
}

impl<V, P> Drop for Protected<V, P>
where
  V: Word,
  P: Params,
{
  fn drop(&mut self) {
    if let ProtectedKind::Sync { flag, .. } = self.kind {
      // SAFETY: `flag` points into this handle's registry slot, which
      // outlives any `Protected` it hands out.
      unsafe { flag.as_ref() }.store(0, Ordering::Release);
    }
  }
}

// SAFETY: `Protected` only exposes shared access to a `Send + Sync`
// `BaseTable`, and the pointer it wraps is never mutated through it.
unsafe impl<V, P> Send for Protected<V, P>
where
  V: Word,
  P: Params,
{
}

/// Outcome of [`Exclusion::acquire`].
pub(crate) enum AcquireResult<V, P>
where
  V: Word,
  P: Params,
{
  /// The caller holds a protected reference and may proceed.
  Ready(Protected<V, P>),
  /// A migration is in flight and this strategy requires the caller to
  /// help it along (via [`Exclusion::migrate_once`]) before retrying.
  Growing,
}

/// Governs access to and growth of the generation chain behind a
/// [`GrowTable`](crate::growable::GrowTable).
pub(crate) trait Exclusion<V, P>: Send + Sync + Sized + 'static
where
  V: Word,
  P: Params,
{
  /// Per-handle registration state (spec.md §4.5's handle registry entry).
  type Token: Send;

  fn new(capacity: Capacity) -> Self;

  /// Registers a new handle, returning the token it must present to every
  /// other method on this trait.
  fn register(&self) -> Self::Token;

  /// Deregisters a handle. Called once, from the owning handle's `Drop`.
  fn deregister(&self, token: &Self::Token);

  /// Acquires a protected reference to the generation this handle should
  /// currently operate against.
  ///
  /// Returns [`AcquireResult::Growing`] for strategies that cannot let an
  /// operation proceed while a migration is in flight (spec.md §4.4.b: the
  /// sync strategy "immediately clears the flag and enters `help_grow()`
  /// instead"). The async strategy never returns this; its operations
  /// detect an in-flight migration from the base table's own
  /// `UNSUCCESS_INVALID` return code instead.
  fn acquire(&self, token: &Self::Token) -> AcquireResult<V, P>;

  /// The version of the generation currently being read (spec.md §3:
  /// `current.version`).
  fn current_version(&self) -> u64;

  /// A best-effort, unsynchronized read of the current generation's
  /// capacity, for diagnostics (spec.md §8's supplemented `capacity()`).
  fn capacity_hint(&self) -> usize;

  /// Starts a grow if none is already in progress for the generation at
  /// `observed_version`. Returns `true` if this call allocated the
  /// successor (so the caller is the grow's initiator, not a helper).
  fn begin_grow(&self, observed_version: u64, live_estimate: usize) -> bool;

  /// Executes one migration sweep of whatever remains of the in-progress
  /// grow's source table. Safe to call concurrently from any number of
  /// threads. Returns the successor's version, or the current version if
  /// no grow is in progress.
  fn migrate_once(&self) -> u64;

  /// Waits for every concurrent [`migrate_once`](Self::migrate_once) caller
  /// to finish, then swaps the successor into the read position if it is
  /// still newer than what is currently readable.
  fn finish_grow(&self, observed_version: u64);
}
