//! Worker strategies: who actually performs the copying work of a
//! migration once an [`Exclusion`] strategy has decided one is needed.
//!
//! Two implementations are provided, matching spec.md §4.4's worker
//! strategies: [`user::UserWorker`] (the calling thread migrates inline,
//! grounded on the upstream `WStratUser` class) and [`pool::PoolWorker`] (a
//! dedicated background thread per handle helps, woken through
//! [`crate::countwait::CountingWait`], grounded on the upstream
//! `WStratPool` class).

pub(crate) mod pool;
pub(crate) mod user;

use std::sync::Arc;

use crate::exclusion::Exclusion;
use crate::params::Params;
use crate::word::Word;

/// Drives the actual migration work on behalf of a [`Handle`].
///
/// [`Handle`]: crate::handle::Handle
pub(crate) trait Worker<V, P, E>: Sized + Send + Sync + 'static
where
  V: Word,
  P: Params,
  E: Exclusion<V, P>,
{
  /// State shared by every handle on the same [`GrowTable`]
  /// (the upstream strategy's `global_data_t`).
  ///
  /// [`GrowTable`]: crate::growable::GrowTable
  type Global: Send + Sync + Default;

  /// Per-handle state (the upstream strategy's `local_data_t`).
  type Local: Send;

  fn new_local(exclusion: Arc<E>, global: Arc<Self::Global>) -> Self::Local;

  /// Helps along whatever migration is currently in progress, if any.
  /// A no-op if none is.
  fn execute_migration(local: &Self::Local, exclusion: &E);
}
