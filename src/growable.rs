//! The growable, concurrent hash table (spec.md §8).
//!
//! Grounded on the upstream `migration_table` class, generalized over the
//! exclusion and worker strategies defined in
//! [`crate::exclusion`]/[`crate::worker`] the same way the original is
//! templated over `ESTRAT`/`WSTRAT`. Most operations live on [`Handle`]
//! (spec.md §4.5); `GrowTable` itself only holds the state shared by every
//! handle and offers a few convenience methods that internally spin up a
//! throwaway handle.

use std::sync::Arc;

use crate::exclusion::Exclusion;
use crate::handle::Handle;
use crate::params::Capacity;
use crate::params::DefaultParams;
use crate::params::Params;
use crate::sync::atomic::AtomicI64;
use crate::sync::atomic::Ordering;
use crate::word::Word;
use crate::worker::user::UserWorker;
use crate::worker::Worker;

/// A growable, concurrent hash table mapping `u64` keys to values of type
/// `V`.
///
/// `V` must implement [`Word`] (fit in 64 bits, see that trait for the
/// built-in implementations). `P` configures capacity, mapping/probing
/// policy, and growth behavior (see [`Params`]); `E` and `W` select the
/// exclusion and worker strategies.
///
/// Most operations are reached through a [`Handle`] obtained from
/// [`handle`](Self::handle): create one handle per thread and reuse it,
/// rather than calling [`GrowTable`]'s own convenience methods from a hot
/// loop.
///
/// `E` and `W` are an internal extension point (the exclusion and worker
/// strategy traits are not public, this crate does not yet commit to
/// supporting externally-defined strategies), hence the `private_bounds`
/// allowance below; callers select among the built-in strategies via the
/// type aliases in this module rather than naming the strategy traits
/// directly.
#[allow(private_bounds, private_interfaces)]
pub struct GrowTable<V, P = DefaultParams, E = crate::exclusion::async_strategy::AsyncExclusion<V, P>, W = UserWorker<V, P, E>>
where
  V: Word,
  P: Params,
  E: Exclusion<V, P>,
  W: Worker<V, P, E>,
{
  exclusion: Arc<E>,
  worker_global: Arc<W::Global>,
  /// Approximate live-entry count, folded in from handles' local deltas
  /// every [`Params::COUNTER_FLUSH_INTERVAL`] operations. Never exact under
  /// concurrent access; see spec.md §8.
  approx_len: AtomicI64,
}

#[allow(private_bounds, private_interfaces)]
impl<V, P, E, W> GrowTable<V, P, E, W>
where
  V: Word,
  P: Params,
  E: Exclusion<V, P>,
  W: Worker<V, P, E>,
{
  /// Creates a new, empty table with [`Params::INITIAL_CAPACITY`].
  #[must_use]
  pub fn new() -> Arc<Self> {
    Self::with_capacity(P::INITIAL_CAPACITY)
  }

  /// Creates a new, empty table with at least `capacity` slots.
  #[must_use]
  pub fn with_capacity(capacity: Capacity) -> Arc<Self> {
    <P as crate::params::ParamsExt>::validate();

    Arc::new(Self {
      exclusion: Arc::new(E::new(capacity)),
      worker_global: Arc::new(W::Global::default()),
      approx_len: AtomicI64::new(0),
    })
  }

  /// Creates a new handle for the calling thread.
  ///
  /// Cheap but not free: registers a slot in the exclusion strategy's
  /// handle registry, and under the pool worker strategy spawns a
  /// dedicated background thread. Keep one handle per thread.
  #[must_use]
  pub fn handle(self: &Arc<Self>) -> Handle<V, P, E, W> {
    Handle::new(Arc::clone(self))
  }

  pub(crate) fn exclusion(&self) -> &E {
    &self.exclusion
  }

  pub(crate) fn exclusion_arc(&self) -> &Arc<E> {
    &self.exclusion
  }

  pub(crate) fn worker_global(&self) -> &Arc<W::Global> {
    &self.worker_global
  }

  pub(crate) fn adjust_len(&self, delta: i64) {
    self.approx_len.fetch_add(delta, Ordering::Relaxed);
  }

  pub(crate) fn approx_len(&self) -> i64 {
    self.approx_len.load(Ordering::Relaxed)
  }

  /// An approximate count of live entries (spec.md §8's supplemented
  /// `len()`). Never exact under concurrent mutation.
  #[must_use]
  pub fn len(&self) -> usize {
    self.approx_len().max(0) as usize
  }

  /// Returns `true` if the table has no entries, approximately.
  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// The current generation's addressable capacity (spec.md §8's
  /// supplemented `capacity()`).
  #[must_use]
  pub fn capacity(&self) -> usize {
    self.exclusion.capacity_hint()
  }

  /// Ensures the table can hold at least `additional` more entries beyond
  /// its current approximate length without needing a grow mid-operation
  /// (spec.md §8's supplemented `reserve()`).
  ///
  /// Always performs any needed migration work inline on the calling
  /// thread, regardless of the table's configured worker strategy.
  pub fn reserve(&self, additional: usize) {
    let target = self.len().saturating_add(additional);

    loop {
      let observed = self.exclusion.current_version();
      let current_capacity = self.exclusion.capacity_hint();

      if (target as f64) <= current_capacity as f64 * f64::from(P::MAX_FILL_FACTOR) {
        return;
      }

      self.exclusion.begin_grow(observed, target);
      self.exclusion.migrate_once();
      self.exclusion.finish_grow(observed);
    }
  }
}

/// Lock-free exclusion, migration helped inline by whichever thread next
/// touches the table. The default `GrowTable<V, P>` alias, and the right
/// choice unless a handle's caller cannot tolerate an occasional migration
/// pause on its own thread.
pub type AsyncUserTable<V, P = DefaultParams> =
  GrowTable<V, P, crate::exclusion::async_strategy::AsyncExclusion<V, P>, UserWorker<V, P, crate::exclusion::async_strategy::AsyncExclusion<V, P>>>;

/// Lock-free exclusion, migration handled by a dedicated background thread
/// per handle. Use when callers need every operation to return quickly and
/// can afford one parked thread per handle.
pub type AsyncPoolTable<V, P = DefaultParams> = GrowTable<
  V,
  P,
  crate::exclusion::async_strategy::AsyncExclusion<V, P>,
  crate::worker::pool::PoolWorker<V, P, crate::exclusion::async_strategy::AsyncExclusion<V, P>>,
>;

/// Staged exclusion with a bounded handle registry (no epoch reclamation),
/// migration helped inline. Use when `MAX_HANDLES` is known up front and
/// avoiding `sdd`'s epoch bookkeeping is worth the bound.
pub type SyncUserTable<V, P = DefaultParams> =
  GrowTable<V, P, crate::exclusion::sync_strategy::SyncExclusion<V, P>, UserWorker<V, P, crate::exclusion::sync_strategy::SyncExclusion<V, P>>>;

/// Staged exclusion with a bounded handle registry, migration handled by a
/// dedicated background thread per handle.
pub type SyncPoolTable<V, P = DefaultParams> = GrowTable<
  V,
  P,
  crate::exclusion::sync_strategy::SyncExclusion<V, P>,
  crate::worker::pool::PoolWorker<V, P, crate::exclusion::sync_strategy::SyncExclusion<V, P>>,
>;

