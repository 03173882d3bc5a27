//! Dedicated background-thread worker strategy (spec.md §4.4, "pool"
//! variant).
//!
//! Grounded on the upstream `WStratPool` class: every handle spawns one
//! migration thread on construction; the thread
//! parks on a shared `counting_wait` pair and wakes to run exactly one
//! [`Exclusion::migrate_once`] whenever any handle's
//! [`execute_migration`](Worker::execute_migration) bumps the generation.
//! The original pins the thread to its creating core's affinity mask; this
//! port has no portable equivalent and leaves scheduling to the OS, noted as
//! a deliberate drop in `DESIGN.md`.

use std::sync::Arc;
use std::thread;
use std::thread::JoinHandle;

use crate::countwait::CountingWait;
use crate::exclusion::Exclusion;
use crate::params::Params;
use crate::sync::atomic::AtomicUsize;
use crate::sync::atomic::Ordering;
use crate::word::Word;
use crate::worker::Worker;

/// Table-wide waiting pair, shared by every handle's background thread.
#[derive(Default)]
pub(crate) struct PoolGlobal {
  grow_wait: CountingWait,
  user_wait: CountingWait,
}

pub(crate) struct PoolLocal {
  global: Arc<PoolGlobal>,
  finished: Arc<AtomicUsize>,
  thread: Option<JoinHandle<()>>,
}

impl Drop for PoolLocal {
  fn drop(&mut self) {
    let Some(thread) = self.thread.take() else {
      return;
    };

    self.finished.store(1, Ordering::Release);

    // `wake` alone only notifies already-changed waiters; the parked
    // worker's `wait_if` only returns once the generation itself has
    // moved, so shutdown must advance it, not just ring the condvar.
    while self.finished.load(Ordering::Acquire) < 2 {
      let epoch = self.global.grow_wait.value();
      self.global.grow_wait.inc_if(epoch);
      self.global.grow_wait.wake();
    }

    let _ = thread.join();
  }
}

fn grow_thread_body<V, P, E>(exclusion: Arc<E>, global: Arc<PoolGlobal>, finished: Arc<AtomicUsize>)
where
  V: Word,
  P: Params,
  E: Exclusion<V, P>,
{
  let mut epoch: u32 = global.grow_wait.value();

  loop {
    global.grow_wait.wait_if(epoch);

    if finished.load(Ordering::Acquire) != 0 {
      break;
    }

    let _ = exclusion.migrate_once();

    if global.user_wait.inc_if(epoch) {
      global.user_wait.wake();
    }

    epoch = global.grow_wait.value();
  }

  finished.store(2, Ordering::Release);
}

#[non_exhaustive]
pub struct PoolWorker<V, P, E>(core::marker::PhantomData<fn(V, P, E)>)
where
  V: Word,
  P: Params,
  E: Exclusion<V, P>;

impl<V, P, E> Worker<V, P, E> for PoolWorker<V, P, E>
where
  V: Word,
  P: Params,
  E: Exclusion<V, P>,
{
  type Global = PoolGlobal;
  type Local = PoolLocal;

  fn new_local(exclusion: Arc<E>, global: Arc<Self::Global>) -> Self::Local {
    let finished = Arc::new(AtomicUsize::new(0));

    let thread = thread::spawn({
      let global = Arc::clone(&global);
      let finished = Arc::clone(&finished);
      move || grow_thread_body::<V, P, E>(exclusion, global, finished)
    });

    PoolLocal {
      global,
      finished,
      thread: Some(thread),
    }
  }

  fn execute_migration(local: &Self::Local, _exclusion: &E) {
    let epoch = local.global.grow_wait.value();

    if local.global.grow_wait.inc_if(epoch) {
      local.global.grow_wait.wake();
    }

    local.global.user_wait.wait_if(epoch);
  }
}
