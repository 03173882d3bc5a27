//! A lock-free, concurrent, growable hash table.
//!
//! `growt` maps `u64` keys to values of type `V` (anything that fits in a
//! single machine word, see [`Word`]) across any number of reader/writer
//! threads, growing its backing storage online while operations continue to
//! execute. It is a Rust port of the concurrency protocol described by
//! TooBiased/growt, a fixed-size lock-free open-addressing table composed
//! across generations by a migration protocol, with a choice of strategies
//! for protecting a generation from destruction while it's being read and
//! for deciding which thread performs the copying work of a migration.
//!
//! # Usage
//!
//! ```
//! use growt::GrowTable;
//!
//! // Create a table with default capacity and strategies (async exclusion,
//! // user-thread migration).
//! let table: std::sync::Arc<GrowTable<u64>> = GrowTable::new();
//! let handle = table.handle();
//!
//! assert!(handle.insert(1, 100));
//! assert_eq!(handle.get(1), Some(100));
//! assert!(handle.remove(1));
//! assert_eq!(handle.get(1), None);
//! ```
//!
//! # Configuration
//!
//! Table behavior is configured at compile time through the [`Params`]
//! trait. The default configuration ([`DefaultParams`]) starts at 4,096
//! slots, grows at a 2/3 fill factor, and supports both growth and
//! deletions:
//!
//! ```
//! use growt::{GrowTable, DefaultParams};
//!
//! // These are equivalent:
//! let table1: std::sync::Arc<GrowTable<u64>> = GrowTable::new();
//! let table2: std::sync::Arc<GrowTable<u64, DefaultParams>> = GrowTable::new();
//! ```
//!
//! For a custom initial capacity, use [`ConstParams`]:
//!
//! ```
//! use growt::{GrowTable, ConstParams};
//!
//! let table: std::sync::Arc<GrowTable<u64, ConstParams<4096>>> = GrowTable::new();
//! assert_eq!(table.capacity(), 4096);
//! ```
//!
//! Capacity is always rounded up to the nearest power of two and clamped to
//! the range <code>[Capacity::MIN]..=[Capacity::MAX]</code>.
//!
//! # Concurrency
//!
//! Every operation reached through a [`Handle`] is thread-safe. Multiple
//! threads can concurrently insert, update, remove, and read entries,
//! including while the table is growing, without blocking on each other's
//! single-key operations.
//!
//! ```no_run
//! use growt::{GrowTable, ConstParams};
//! use std::sync::Arc;
//! use std::thread;
//!
//! let table: Arc<GrowTable<u64, ConstParams<4096>>> = GrowTable::new();
//!
//! let handles: Vec<_> = (0..4)
//!   .map(|thread_id| {
//!     let table = Arc::clone(&table);
//!     thread::spawn(move || {
//!       let handle = table.handle();
//!       for i in 0..100_000 {
//!         handle.insert(thread_id * 1_000_000 + i + 1, i);
//!       }
//!     })
//!   })
//!   .collect();
//!
//! for handle in handles {
//!   handle.join().unwrap();
//! }
//! ```
//!
//! ## Memory Reclamation
//!
//! A base-table generation is retired once no handle can still observe it,
//! either through epoch-based reclamation via [`sdd`] (the async exclusion
//! strategy), or by waiting for every handle to clear its per-operation flag
//! (the sync exclusion strategy, which needs no GC at all).
//!
//! # Key Domain
//!
//! Keys are `u64` values in `1..=u64::MAX >> 1`; `0` and `u64::MAX >> 1` are
//! reserved sentinels (see [`is_valid_user_key`]) and the top bit is reserved
//! for the internal migration mark.
//!
//! [`sdd`]: https://docs.rs/sdd
//! [`is_valid_user_key`]: crate::key::is_valid_user_key

mod array;
mod base;
mod code;
mod countwait;
mod exclusion;
mod growable;
mod handle;
mod iter;
mod key;
mod migration;
mod padded;
mod params;
mod reclaim;
mod slot;
mod word;
mod worker;

#[cfg(all(test, not(any(loom, shuttle))))]
mod tests;

pub use self::exclusion::async_strategy::AsyncExclusion;
pub use self::exclusion::sync_strategy::SyncExclusion;
pub use self::growable::AsyncPoolTable;
pub use self::growable::AsyncUserTable;
pub use self::growable::GrowTable;
pub use self::growable::SyncPoolTable;
pub use self::growable::SyncUserTable;
pub use self::handle::Handle;
pub use self::iter::Keys;
pub use self::worker::pool::PoolWorker;
pub use self::worker::user::UserWorker;
pub use self::key::MAX_KEY;
pub use self::key::MIN_KEY;
pub use self::key::is_valid_user_key;
pub use self::code::OpCode;
pub use self::params::CACHE_LINE;
pub use self::params::CACHE_LINE_SLOTS;
pub use self::params::Capacity;
pub use self::params::ConstParams;
pub use self::params::DebugParams;
pub use self::params::DefaultParams;
pub use self::params::Mapping;
pub use self::params::Params;
pub use self::params::ParamsExt;
pub use self::params::Probing;
pub use self::word::AtomicUpdate;
pub use self::word::Assign;
pub use self::word::Increment;
pub use self::word::Word;

mod alloc {
  #[cfg(loom)]
  mod exports {
    pub(crate) use ::loom::alloc::alloc;
    pub(crate) use ::loom::alloc::dealloc;
    pub(crate) use ::std::alloc::handle_alloc_error;
  }

  #[cfg(not(loom))]
  mod exports {
    pub(crate) use ::std::alloc::alloc;
    pub(crate) use ::std::alloc::dealloc;
    pub(crate) use ::std::alloc::handle_alloc_error;
  }

  pub(crate) use self::exports::*;
}

mod sync {
  #[cfg(all(loom, shuttle))]
  compile_error!("cannot use loom and shuttle at once");

  #[cfg(not(any(loom, shuttle)))]
  mod exports {
    pub(crate) mod atomic {
      pub(crate) use ::core::sync::atomic::AtomicI64;
      pub(crate) use ::core::sync::atomic::AtomicU32;
      pub(crate) use ::core::sync::atomic::AtomicU64;
      pub(crate) use ::core::sync::atomic::AtomicUsize;
      pub(crate) use ::core::sync::atomic::Ordering;
    }
  }

  #[cfg(loom)]
  mod exports {
    pub(crate) mod atomic {
      pub(crate) use ::loom::sync::atomic::AtomicI64;
      pub(crate) use ::loom::sync::atomic::AtomicU32;
      pub(crate) use ::loom::sync::atomic::AtomicU64;
      pub(crate) use ::loom::sync::atomic::AtomicUsize;
      pub(crate) use ::loom::sync::atomic::Ordering;
    }
  }

  #[cfg(shuttle)]
  mod exports {
    pub(crate) mod atomic {
      #[repr(transparent)]
      pub(crate) struct AtomicUsize {
        inner: Box<::shuttle::sync::atomic::AtomicUsize>,
      }

      impl AtomicUsize {
        #[inline]
        pub(crate) fn new(value: usize) -> Self {
          Self {
            inner: Box::new(::shuttle::sync::atomic::AtomicUsize::new(value)),
          }
        }
      }

      impl ::core::ops::Deref for AtomicUsize {
        type Target = ::shuttle::sync::atomic::AtomicUsize;

        #[inline]
        fn deref(&self) -> &Self::Target {
          &self.inner
        }
      }

      pub(crate) use ::shuttle::sync::atomic::AtomicI64;
      pub(crate) use ::shuttle::sync::atomic::AtomicU32;
      pub(crate) use ::shuttle::sync::atomic::AtomicU64;
      pub(crate) use ::shuttle::sync::atomic::Ordering;
    }
  }

  pub(crate) use self::exports::*;
}
