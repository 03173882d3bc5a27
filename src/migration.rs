//! The block-claiming migration sweep that copies one base-table
//! generation into the next.
//!
//! Any number of threads (the inserting thread itself under the user
//! worker strategy, or a dedicated background thread under the pool
//! strategy, see [`crate::worker`]) may call [`run`] concurrently against
//! the same `(source, target)` pair; each claims disjoint index ranges via
//! a shared `fetch_add` cursor on `source`, so no coordination beyond that
//! one atomic is required.
//!
//! Each slot is first CAS-marked (preventing any further mutation from
//! committing, see [`crate::slot`]), then, if it held a live key, inserted
//! into `target`. Unlike growt's scheme, which exploits a mapping policy
//! under which a source slot's physical position predicts a disjoint,
//! exclusively-owned sub-range of the target array, this insertion goes
//! through `target`'s normal CAS-guarded [`BaseTable::insert`], so
//! correctness does not depend on that structural property: two helpers
//! racing to place different keys into overlapping target territory
//! simply CAS past each other, at negligible cost since true collisions
//! between concurrently migrating keys are rare. `target` is allocated
//! fully pre-zeroed by [`BaseTable::new`], so there is no separate
//! sub-range zero-initialization step to perform.

use crate::base::BaseTable;
use crate::params::Params;
use crate::sync::atomic::Ordering;
use crate::word::Word;

/// Claims and migrates blocks of `source` into `target` until the source
/// is fully swept. Safe to call from multiple threads concurrently.
pub(crate) fn run<V, P>(source: &BaseTable<V, P>, target: &BaseTable<V, P>)
where
  V: Word,
  P: Params,
{
  while let Some((start, end)) = source.take_migration_block(P::BLOCK_SIZE) {
    migrate_block(source, target, start, end);
  }
}

/// Migrates `[start, end)`, extending past `end` (run completion) while
/// the most recently processed slot was non-empty, so a probe run that
/// straddles the block boundary is never left half-marked.
fn migrate_block<V, P>(source: &BaseTable<V, P>, target: &BaseTable<V, P>, start: usize, end: usize)
where
  V: Word,
  P: Params,
{
  let limit: usize = source.alloc_len();
  let mut index: usize = start;
  let mut boundary: usize = end;

  while index < limit && index < boundary {
    let slot = source.slot_at(index);

    let was_empty: bool = loop {
      let snapshot = slot.load(Ordering::Acquire);

      if snapshot.key.is_marked() {
        break snapshot.key.is_empty();
      }

      match slot.atomic_mark(snapshot.key) {
        Ok(previous) => {
          if previous.is_live() {
            let value = slot.value(Ordering::Acquire);
            target.insert(previous.key_bits(), value);
          }
          break previous.is_empty();
        }
        Err(_) => continue,
      }
    };

    index += 1;

    if index == boundary && !was_empty {
      boundary += 1;
    }
  }
}
