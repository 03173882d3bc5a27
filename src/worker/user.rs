//! Inline worker strategy (spec.md §4.4, "user" variant).
//!
//! Grounded on the upstream `WStratUser` class:
//! "Whenever the table is growing, all new operations help migrating the old
//! table, before the operation is executed. This is a very simple technique,
//! therefore nothing has to be saved/initialized." Both `Global` and `Local`
//! are zero-sized; migration happens synchronously on the calling thread.

use std::sync::Arc;

use crate::exclusion::Exclusion;
use crate::params::Params;
use crate::word::Word;
use crate::worker::Worker;

#[non_exhaustive]
pub struct UserWorker<V, P, E>(core::marker::PhantomData<fn(V, P, E)>)
where
  V: Word,
  P: Params,
  E: Exclusion<V, P>;

impl<V, P, E> Worker<V, P, E> for UserWorker<V, P, E>
where
  V: Word,
  P: Params,
  E: Exclusion<V, P>,
{
  type Global = ();
  type Local = ();

  #[inline]
  fn new_local(_exclusion: Arc<E>, _global: Arc<Self::Global>) -> Self::Local {}

  #[inline]
  fn execute_migration(_local: &Self::Local, exclusion: &E) {
    exclusion.migrate_once();
  }
}
