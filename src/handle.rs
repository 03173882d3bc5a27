//! Per-thread access point to a [`GrowTable`] (spec.md §4.5).
//!
//! Grounded on the upstream `migration_table_handle` class (declared
//! alongside `migration_table` itself): every operation follows the same
//! dispatch loop, acquire a protected reference to the current generation,
//! attempt the operation, and on `UNSUCCESS_FULL`/`UNSUCCESS_INVALID` either
//! start or help along a migration before retrying. Handles are not
//! `Send`/`Sync` upstream either (they're meant to be created once per
//! thread via `get_handle()`); this port keeps that convention without
//! enforcing it in the type system, matching `ptab`'s own `Detached` handle
//! design.

use std::cell::Cell;
use std::sync::Arc;

use crate::base::Lookup;
use crate::code::OpCode;
use crate::exclusion::AcquireResult;
use crate::exclusion::Exclusion;
use crate::growable::GrowTable;
use crate::params::DefaultParams;
use crate::params::Params;
use crate::sync::atomic::Ordering;
use crate::word::AtomicUpdate;
use crate::word::Word;
use crate::worker::Worker;
use crate::worker::user::UserWorker;

/// A thread-local access point to a [`GrowTable`]'s operations.
///
/// Obtained from [`GrowTable::handle`]. Cheap to create but not free: each
/// handle registers a slot in the exclusion strategy's registry (and, under
/// the pool worker strategy, spawns a background thread), so callers
/// should keep one handle per thread rather than one per operation.
#[allow(private_bounds, private_interfaces)]
pub struct Handle<V, P = DefaultParams, E = crate::exclusion::async_strategy::AsyncExclusion<V, P>, W = UserWorker<V, P, E>>
where
  V: Word,
  P: Params,
  E: Exclusion<V, P>,
  W: Worker<V, P, E>,
{
  table: Arc<GrowTable<V, P, E, W>>,
  token: E::Token,
  worker: W::Local,
  /// Local operation counter folded into the table's approximate length
  /// every [`Params::COUNTER_FLUSH_INTERVAL`] operations (the upstream
  /// handle's `_updates`/handle-local delta accounting).
  pending_delta: Cell<i64>,
  ops_since_flush: Cell<u32>,
}

#[allow(private_bounds, private_interfaces)]
impl<V, P, E, W> Handle<V, P, E, W>
where
  V: Word,
  P: Params,
  E: Exclusion<V, P>,
  W: Worker<V, P, E>,
{
  pub(crate) fn new(table: Arc<GrowTable<V, P, E, W>>) -> Self {
    let token = table.exclusion().register();
    let worker = W::new_local(Arc::clone(table.exclusion_arc()), Arc::clone(table.worker_global()));

    Self {
      table,
      token,
      worker,
      pending_delta: Cell::new(0),
      ops_since_flush: Cell::new(0),
    }
  }

  fn note_delta(&self, delta: i64) {
    self.pending_delta.set(self.pending_delta.get() + delta);
    let ops = self.ops_since_flush.get() + 1;

    if ops >= P::COUNTER_FLUSH_INTERVAL {
      self.flush();
    } else {
      self.ops_since_flush.set(ops);
    }
  }

  fn flush(&self) {
    let delta = self.pending_delta.replace(0);
    self.ops_since_flush.set(0);

    if delta != 0 {
      self.table.adjust_len(delta);
    }

    self.maybe_grow();
  }

  /// Spec.md §4.4: "if the resulting live count exceeds `max_fill_factor
  /// × capacity`, calls `grow()`." Folding the local counters in is what
  /// can push the approximate count over the threshold, so this is always
  /// checked right after a flush; that is what makes growth proactive
  /// rather than something only discovered by a probe sequence running
  /// dry.
  fn maybe_grow(&self) {
    let live_estimate = self.table.approx_len().max(0) as usize;
    let observed = self.table.exclusion().current_version();
    let capacity = self.table.exclusion().capacity_hint();

    if live_estimate as f64 > capacity as f64 * f64::from(P::MAX_FILL_FACTOR) {
      self.grow(observed);
    }
  }

  fn help_grow(&self) {
    let observed = self.table.exclusion().current_version();
    W::execute_migration(&self.worker, self.table.exclusion());
    self.table.exclusion().finish_grow(observed);
  }

  fn grow(&self, observed: u64) {
    let live_estimate = self.table.approx_len().max(0) as usize;
    let _initiated = self.table.exclusion().begin_grow(observed, live_estimate);
    W::execute_migration(&self.worker, self.table.exclusion());
    self.table.exclusion().finish_grow(observed);
  }

  /// Inserts `key` with `value` if no live entry for `key` exists yet.
  /// Returns `true` if the insert took effect.
  pub fn insert(&self, key: u64, value: V) -> bool {
    loop {
      let protected = match self.table.exclusion().acquire(&self.token) {
        AcquireResult::Ready(protected) => protected,
        AcquireResult::Growing => {
          self.help_grow();
          continue;
        }
      };

      let version = protected.version;
      let code = protected.insert(key, value);
      drop(protected);

      match code {
        OpCode::SuccessIn => {
          self.note_delta(1);
          return true;
        }
        OpCode::UnsuccessAlready => return false,
        OpCode::UnsuccessFull => {
          self.grow(version);
        }
        OpCode::UnsuccessInvalid => {
          self.help_grow();
        }
        _ => unreachable!("insert never returns {code:?}"),
      }
    }
  }

  /// Looks up the live value for `key`, if any.
  pub fn get(&self, key: u64) -> Option<V> {
    loop {
      let protected = match self.table.exclusion().acquire(&self.token) {
        AcquireResult::Ready(protected) => protected,
        AcquireResult::Growing => {
          self.help_grow();
          continue;
        }
      };

      match protected.find(key) {
        Lookup::Found(value) => return Some(value),
        Lookup::NotFound => return None,
        Lookup::Invalid => {
          drop(protected);
          self.help_grow();
        }
      }
    }
  }

  /// Applies `f` to `key`'s current value, storing the result. No-op (and
  /// returns `None`) if `key` has no live entry.
  pub fn update<F>(&self, key: u64, f: F) -> Option<V>
  where
    F: Fn(V) -> V,
  {
    loop {
      let protected = match self.table.exclusion().acquire(&self.token) {
        AcquireResult::Ready(protected) => protected,
        AcquireResult::Growing => {
          self.help_grow();
          continue;
        }
      };

      let (code, value) = protected.update(key, &f);
      drop(protected);

      match code {
        OpCode::SuccessUp => return value,
        OpCode::UnsuccessNotFound => return None,
        OpCode::UnsuccessInvalid => self.help_grow(),
        _ => unreachable!("update never returns {code:?}"),
      }
    }
  }

  /// As [`update`](Self::update), but applies `f`'s lock-free fast path
  /// ([`AtomicUpdate::atomic_apply`]) instead of a compute-then-CAS loop.
  pub fn update_atomic<F>(&self, key: u64, f: &F) -> Option<V>
  where
    F: AtomicUpdate<V>,
  {
    loop {
      let protected = match self.table.exclusion().acquire(&self.token) {
        AcquireResult::Ready(protected) => protected,
        AcquireResult::Growing => {
          self.help_grow();
          continue;
        }
      };

      let (code, value) = protected.update_atomic(key, f);
      drop(protected);

      match code {
        OpCode::SuccessUp => return value,
        OpCode::UnsuccessNotFound => return None,
        OpCode::UnsuccessInvalid => self.help_grow(),
        _ => unreachable!("update_atomic never returns {code:?}"),
      }
    }
  }

  /// Inserts `value` if `key` has no live entry, otherwise updates the
  /// existing entry with `f`.
  pub fn insert_or_update<F>(&self, key: u64, value: V, f: F) -> V
  where
    F: Fn(V) -> V,
  {
    loop {
      let protected = match self.table.exclusion().acquire(&self.token) {
        AcquireResult::Ready(protected) => protected,
        AcquireResult::Growing => {
          self.help_grow();
          continue;
        }
      };

      let version = protected.version;
      let (code, result) = protected.insert_or_update(key, value, &f);
      drop(protected);

      match code {
        OpCode::SuccessIn => {
          self.note_delta(1);
          return result.expect("insert path always returns the inserted value");
        }
        OpCode::SuccessUp => return result.expect("update path always returns the updated value"),
        OpCode::UnsuccessFull => self.grow(version),
        OpCode::UnsuccessInvalid => self.help_grow(),
        _ => unreachable!("insert_or_update never returns {code:?}"),
      }
    }
  }

  /// Removes `key`'s live entry, if any. Returns `true` if an entry was
  /// removed.
  pub fn remove(&self, key: u64) -> bool {
    self.remove_if(key, |_| true)
  }

  /// Returns a weakly-consistent snapshot of this table's live entries
  /// (spec.md §8). Entries inserted, removed, or migrated concurrently may
  /// or may not be observed.
  pub fn iter(&self) -> crate::iter::Keys<V> {
    loop {
      let protected = match self.table.exclusion().acquire(&self.token) {
        AcquireResult::Ready(protected) => protected,
        AcquireResult::Growing => {
          self.help_grow();
          continue;
        }
      };

      let items: Vec<(u64, V)> = protected.iter().collect();
      return crate::iter::Keys::new(items);
    }
  }

  /// As [`remove`](Self::remove), but only removes the entry if
  /// `pred(current_value)` is `true`.
  pub fn remove_if<F>(&self, key: u64, pred: F) -> bool
  where
    F: Fn(&V) -> bool,
  {
    loop {
      let protected = match self.table.exclusion().acquire(&self.token) {
        AcquireResult::Ready(protected) => protected,
        AcquireResult::Growing => {
          self.help_grow();
          continue;
        }
      };

      let code = protected.erase_if(key, &pred);
      drop(protected);

      match code {
        OpCode::SuccessDel => {
          self.note_delta(-1);
          return true;
        }
        OpCode::UnsuccessNotFound => return false,
        OpCode::UnsuccessInvalid => self.help_grow(),
        _ => unreachable!("remove_if never returns {code:?}"),
      }
    }
  }
}

#[allow(private_bounds, private_interfaces)]
impl<V, P, E, W> Drop for Handle<V, P, E, W>
where
  V: Word,
  P: Params,
  E: Exclusion<V, P>,
  W: Worker<V, P, E>,
{
  fn drop(&mut self) {
    self.flush();
    self.table.exclusion().deregister(&self.token);
  }
}
