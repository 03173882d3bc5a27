//! Exercises every `(Exclusion, Worker)` combination through the public
//! [`GrowTable`] surface, rather than poking `AsyncExclusion`/`SyncExclusion`
//! directly: these strategies only make sense wired up through a
//! [`Handle`]'s retry loop.

use std::sync::Arc;
use std::thread;

use crate::exclusion::async_strategy::AsyncExclusion;
use crate::exclusion::sync_strategy::SyncExclusion;
use crate::growable::GrowTable;
use crate::params::ConstParams;
use crate::params::Params;
use crate::worker::pool::PoolWorker;
use crate::worker::user::UserWorker;

type Small = ConstParams<16>;

type AsyncUser<V = u64, P = Small> = GrowTable<V, P, AsyncExclusion<V, P>, UserWorker<V, P, AsyncExclusion<V, P>>>;
type AsyncPool<V = u64, P = Small> = GrowTable<V, P, AsyncExclusion<V, P>, PoolWorker<V, P, AsyncExclusion<V, P>>>;
type SyncUser<V = u64, P = Small> = GrowTable<V, P, SyncExclusion<V, P>, UserWorker<V, P, SyncExclusion<V, P>>>;
type SyncPool<V = u64, P = Small> = GrowTable<V, P, SyncExclusion<V, P>, PoolWorker<V, P, SyncExclusion<V, P>>>;

macro_rules! each_strategy_test {
  ($name:ident, $body:expr) => {
    mod $name {
      use super::*;

      #[test]
      fn async_user() {
        let table: Arc<AsyncUser> = AsyncUser::new();
        ($body)(table);
      }

      #[test]
      fn async_pool() {
        let table: Arc<AsyncPool> = AsyncPool::new();
        ($body)(table);
      }

      #[test]
      fn sync_user() {
        let table: Arc<SyncUser> = SyncUser::new();
        ($body)(table);
      }

      #[test]
      fn sync_pool() {
        let table: Arc<SyncPool> = SyncPool::new();
        ($body)(table);
      }
    }
  };
}

each_strategy_test!(basic_insert_get_remove, |table: Arc<_>| {
  let handle = table.handle();

  assert!(handle.insert(1, 100));
  assert_eq!(handle.get(1), Some(100));
  assert!(!handle.insert(1, 200), "re-inserting a live key must not take effect");
  assert_eq!(handle.get(1), Some(100));

  assert!(handle.remove(1));
  assert_eq!(handle.get(1), None);
  assert!(!handle.remove(1), "removing an absent key must report false");
});

each_strategy_test!(update_and_insert_or_update, |table: Arc<_>| {
  let handle = table.handle();

  assert_eq!(handle.update(1, |v| v + 1), None, "update against an absent key is a no-op");

  assert_eq!(handle.insert_or_update(1, 10, |v| v + 1), 10);
  assert_eq!(handle.insert_or_update(1, 10, |v| v + 1), 11);
  assert_eq!(handle.update(1, |v| v * 2), Some(22));
  assert_eq!(handle.get(1), Some(22));
});

each_strategy_test!(remove_if_respects_predicate, |table: Arc<_>| {
  let handle = table.handle();
  handle.insert(1, 10);

  assert!(!handle.remove_if(1, |v| *v == 999));
  assert_eq!(handle.get(1), Some(10));

  assert!(handle.remove_if(1, |v| *v == 10));
  assert_eq!(handle.get(1), None);
});

each_strategy_test!(grows_past_initial_capacity, |table: Arc<_>| {
  let handle = table.handle();

  for key in 1..=5000u64 {
    assert!(handle.insert(key, key * 2), "insert of key {key} should succeed");
  }

  for key in 1..=5000u64 {
    assert_eq!(handle.get(key), Some(key * 2), "key {key} missing after growth");
  }

  assert!(table.capacity() > Small::INITIAL_CAPACITY.as_usize(), "table should have grown past its initial capacity");
});

each_strategy_test!(iter_yields_every_live_entry_after_growth, |table: Arc<_>| {
  let handle = table.handle();

  for key in 1..=5000u64 {
    handle.insert(key, key);
  }
  for key in (1..=5000u64).step_by(3) {
    handle.remove(key);
  }

  let mut seen: Vec<(u64, u64)> = handle.iter().collect();
  seen.sort_unstable();

  let mut expected: Vec<(u64, u64)> = (1..=5000u64).filter(|k| k % 3 != 0).map(|k| (k, k)).collect();
  expected.sort_unstable();

  assert_eq!(seen, expected);
});

each_strategy_test!(concurrent_inserts_from_multiple_threads_all_land, |table: Arc<_>| {
  let thread_count: u64 = 4;
  let per_thread: u64 = 200;

  let handles: Vec<_> = (0..thread_count)
    .map(|t| {
      let table = Arc::clone(&table);
      thread::spawn(move || {
        let handle = table.handle();
        for i in 0..per_thread {
          let key = t * per_thread + i + 1;
          assert!(handle.insert(key, key));
        }
      })
    })
    .collect();

  for h in handles {
    h.join().unwrap();
  }

  let handle = table.handle();
  for key in 1..=(thread_count * per_thread) {
    assert_eq!(handle.get(key), Some(key));
  }
});
